use gradient_roles::{RemoteError, RoleError};

use super::lifecycle_harness::{self, Op};

#[tokio::test]
async fn cleanup_deletes_unheld_roles_and_keeps_held_ones() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 3).await;
    h.gateway.give("guild", &ids[1], "member-1");

    let report = h.manager.clear_unused("guild").await.unwrap();

    assert_eq!(report.deleted, vec![ids[0].clone(), ids[2].clone()]);
    assert!(report.reconciled.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(report.removed_count(), 2);

    let remaining: Vec<String> = h
        .tracked("guild")
        .await
        .into_iter()
        .map(|role| role.role_id)
        .collect();
    assert_eq!(remaining, vec![ids[1].clone()]);
    assert!(h.gateway.role("guild", &ids[0]).is_none());
    assert!(h.gateway.role("guild", &ids[1]).is_some());
}

#[tokio::test]
async fn cleanup_forgets_roles_deleted_out_of_band() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 2).await;
    h.gateway.give("guild", &ids[1], "member-1");
    h.gateway.delete_out_of_band("guild", &ids[0]);

    let report = h.manager.clear_unused("guild").await.unwrap();

    assert_eq!(report.reconciled, vec![ids[0].clone()]);
    assert!(report.deleted.is_empty());
    assert_eq!(report.removed_count(), 1);
    assert_eq!(h.tracked("guild").await.len(), 1);
}

#[tokio::test]
async fn second_cleanup_pass_changes_nothing() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 2).await;
    h.gateway.give("guild", &ids[0], "member-1");

    h.manager.clear_unused("guild").await.unwrap();
    let deletes = h.gateway.calls(Op::Delete);
    let again = h.manager.clear_unused("guild").await.unwrap();

    assert_eq!(again.removed_count(), 0);
    assert!(again.failed.is_empty());
    assert_eq!(h.gateway.calls(Op::Delete), deletes);
    assert_eq!(h.tracked("guild").await.len(), 1);
}

#[tokio::test]
async fn one_failing_role_does_not_stop_the_pass() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 3).await;
    h.gateway
        .fail_next(Op::HolderCount, RemoteError::Unavailable("rate limited".into()));

    let report = h.manager.clear_unused("guild").await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, ids[0]);
    assert_eq!(report.deleted, vec![ids[1].clone(), ids[2].clone()]);
    assert_eq!(
        h.tracked("guild").await.into_iter().map(|r| r.role_id).collect::<Vec<_>>(),
        vec![ids[0].clone()]
    );
}

#[tokio::test]
async fn failed_remote_delete_keeps_role_tracked() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 1).await;
    h.gateway
        .fail_next(Op::Delete, RemoteError::PermissionDenied("role above bot".into()));

    let report = h.manager.clear_unused("guild").await.unwrap();

    assert!(report.deleted.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].1, RemoteError::PermissionDenied(_)));
    assert_eq!(h.tracked("guild").await.len(), 1);
    assert!(h.gateway.role("guild", &ids[0]).is_some());
}

#[tokio::test]
async fn cleanup_of_unknown_server_is_empty() {
    let h = lifecycle_harness::harness();

    let report = h.manager.clear_unused("fresh").await.unwrap();

    assert_eq!(report.removed_count(), 0);
    assert_eq!(h.gateway.calls(Op::HolderCount), 0);
}

#[tokio::test]
async fn delete_one_is_idempotent() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 2).await;
    h.gateway.give("guild", &ids[0], "member-1");

    assert!(h.manager.delete_one("guild", &ids[0]).await.unwrap());
    assert!(!h.manager.delete_one("guild", &ids[0]).await.unwrap());

    assert!(h.gateway.role("guild", &ids[0]).is_none());
    assert_eq!(h.gateway.calls(Op::Delete), 1);
    assert_eq!(h.tracked("guild").await.len(), 1);
}

#[tokio::test]
async fn delete_one_tolerates_role_already_gone() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 1).await;
    h.gateway.delete_out_of_band("guild", &ids[0]);

    assert!(h.manager.delete_one("guild", &ids[0]).await.unwrap());
    assert!(h.tracked("guild").await.is_empty());
}

#[tokio::test]
async fn delete_one_keeps_registry_when_platform_refuses() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 1).await;
    h.gateway
        .fail_next(Op::Delete, RemoteError::PermissionDenied("forbidden".into()));

    let err = h.manager.delete_one("guild", &ids[0]).await.unwrap_err();

    assert!(matches!(
        err,
        RoleError::Remote(RemoteError::PermissionDenied(_))
    ));
    assert_eq!(h.tracked("guild").await.len(), 1);
}

#[tokio::test]
async fn delete_one_never_touches_foreign_roles() {
    let h = lifecycle_harness::harness();
    let foreign = h.gateway.create_foreign_role("guild");

    assert!(!h.manager.delete_one("guild", &foreign).await.unwrap());
    assert!(h.gateway.role("guild", &foreign).is_some());
    assert_eq!(h.gateway.calls(Op::Delete), 0);
}
