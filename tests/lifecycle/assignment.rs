use std::collections::BTreeSet;

use gradient_roles::{RemoteError, RoleError};

use super::lifecycle_harness::{self, Op};

fn set(ids: &[&String]) -> BTreeSet<String> {
    ids.iter().map(|id| (*id).clone()).collect()
}

#[tokio::test]
async fn picking_a_new_role_replaces_the_previous_one() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 2).await;

    h.manager.assign("guild", "member", &ids[0]).await.unwrap();
    let assignment = h.manager.assign("guild", "member", &ids[1]).await.unwrap();

    assert_eq!(assignment.role_id, ids[1]);
    assert_eq!(assignment.removed, vec![ids[0].clone()]);
    assert_eq!(h.gateway.member_roles("guild", "member"), set(&[&ids[1]]));
}

#[tokio::test]
async fn picking_leaves_untracked_roles_alone() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 1).await;
    let moderator = h.gateway.create_foreign_role("guild");
    h.gateway.give("guild", &moderator, "member");

    let assignment = h.manager.assign("guild", "member", &ids[0]).await.unwrap();

    assert!(assignment.removed.is_empty());
    assert_eq!(
        h.gateway.member_roles("guild", "member"),
        set(&[&ids[0], &moderator])
    );
}

#[tokio::test]
async fn picking_the_held_role_again_keeps_it() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 1).await;
    h.manager.assign("guild", "member", &ids[0]).await.unwrap();

    let assignment = h.manager.assign("guild", "member", &ids[0]).await.unwrap();

    assert!(assignment.removed.is_empty());
    assert_eq!(h.gateway.calls(Op::Unassign), 0);
    assert_eq!(h.gateway.member_roles("guild", "member"), set(&[&ids[0]]));
}

#[tokio::test]
async fn untracked_role_is_rejected_without_remote_calls() {
    let h = lifecycle_harness::harness();
    h.seed("guild", 1).await;
    let foreign = h.gateway.create_foreign_role("guild");

    let err = h.manager.assign("guild", "member", &foreign).await.unwrap_err();

    assert!(matches!(err, RoleError::RoleNotTracked { ref role_id } if *role_id == foreign));
    assert_eq!(h.gateway.calls(Op::MemberRoles), 0);
    assert_eq!(h.gateway.calls(Op::Assign), 0);
}

#[tokio::test]
async fn picking_a_role_deleted_out_of_band_reconciles_it() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 2).await;
    h.gateway.delete_out_of_band("guild", &ids[0]);

    let err = h.manager.assign("guild", "member", &ids[0]).await.unwrap_err();

    assert!(matches!(err, RoleError::Remote(RemoteError::NotFound(_))));
    let tracked: Vec<String> = h
        .tracked("guild")
        .await
        .into_iter()
        .map(|role| role.role_id)
        .collect();
    assert_eq!(tracked, vec![ids[1].clone()]);
}

#[tokio::test]
async fn permission_failure_is_surfaced() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 1).await;
    h.gateway
        .fail_next(Op::Assign, RemoteError::PermissionDenied("hierarchy".into()));

    let err = h.manager.assign("guild", "member", &ids[0]).await.unwrap_err();

    assert!(matches!(
        err,
        RoleError::Remote(RemoteError::PermissionDenied(_))
    ));
    assert_eq!(h.tracked("guild").await.len(), 1);
}

#[tokio::test]
async fn clearing_member_roles_removes_only_tracked_ones() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 2).await;
    let foreign = h.gateway.create_foreign_role("guild");
    h.gateway.give("guild", &ids[0], "member");
    h.gateway.give("guild", &ids[1], "member");
    h.gateway.give("guild", &foreign, "member");

    let mut removed = h.manager.clear_member_roles("guild", "member").await.unwrap();
    removed.sort();

    let mut expected = vec![ids[0].clone(), ids[1].clone()];
    expected.sort();
    assert_eq!(removed, expected);
    assert_eq!(h.gateway.member_roles("guild", "member"), set(&[&foreign]));
}

#[tokio::test]
async fn clearing_without_tracked_roles_is_a_no_op() {
    let h = lifecycle_harness::harness();

    let removed = h.manager.clear_member_roles("guild", "member").await.unwrap();

    assert!(removed.is_empty());
    assert_eq!(h.gateway.calls(Op::MemberRoles), 0);
}
