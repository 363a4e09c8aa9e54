use std::sync::atomic::Ordering;

use gradient_roles::registry::MAX_ROLES_PER_SERVER;
use gradient_roles::{Candidate, RemoteError, RoleError};

use super::lifecycle_harness::{self, Op};

#[tokio::test]
async fn proposal_then_confirm_tracks_exactly_one_role() {
    let h = lifecycle_harness::harness();

    let candidate = h.manager.propose("guild").await.expect("room for a proposal");
    let role = h
        .manager
        .commit("guild", candidate)
        .await
        .expect("commit should succeed");

    assert_eq!(h.tracked("guild").await, vec![role.clone()]);
    let remote = h.gateway.role("guild", &role.role_id).expect("role exists remotely");
    assert_eq!(remote.colors, Some((candidate.primary, candidate.secondary)));
    assert_eq!(remote.name, format!("Gradient-{}", candidate.primary));
}

#[tokio::test]
async fn full_server_refuses_proposals_without_touching_anything() {
    let h = lifecycle_harness::harness();
    h.seed("guild", MAX_ROLES_PER_SERVER).await;
    let creates = h.gateway.calls(Op::Create);

    let err = h.manager.propose("guild").await.unwrap_err();
    assert!(matches!(
        err,
        RoleError::CapacityExceeded { limit, .. } if limit == MAX_ROLES_PER_SERVER
    ));
    assert_eq!(h.tracked("guild").await.len(), MAX_ROLES_PER_SERVER);
    assert_eq!(h.gateway.calls(Op::Create), creates);
}

#[tokio::test]
async fn stale_proposal_is_rechecked_at_commit() {
    let h = lifecycle_harness::harness();
    h.seed("guild", MAX_ROLES_PER_SERVER - 1).await;

    let stale = h.manager.propose("guild").await.unwrap();
    h.seed("guild", 1).await;
    let creates = h.gateway.calls(Op::Create);

    let err = h.manager.commit("guild", stale).await.unwrap_err();
    assert!(matches!(err, RoleError::CapacityExceeded { .. }));
    assert_eq!(h.gateway.calls(Op::Create), creates);
    assert_eq!(h.tracked("guild").await.len(), MAX_ROLES_PER_SERVER);
}

#[tokio::test]
async fn create_failure_leaves_no_trace() {
    let h = lifecycle_harness::harness();
    h.gateway
        .fail_next(Op::Create, RemoteError::PermissionDenied("missing Manage Roles".into()));

    let err = h
        .manager
        .commit("guild", Candidate::new(0x00FF_0000, 0x0000_00FF))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RoleError::RoleCreateFailed {
            source: RemoteError::PermissionDenied(_)
        }
    ));
    assert_eq!(h.gateway.role_count("guild"), 0);
    assert!(h.tracked("guild").await.is_empty());
    assert_eq!(h.gateway.calls(Op::SetGradient), 0);
}

#[tokio::test]
async fn gradient_failure_reports_orphan_and_keeps_registry_clean() {
    let h = lifecycle_harness::harness();
    h.gateway
        .fail_next(Op::SetGradient, RemoteError::Unavailable("502".into()));

    let err = h
        .manager
        .commit("guild", Candidate::new(0x11_2233, 0x44_5566))
        .await
        .unwrap_err();

    let orphan = match &err {
        RoleError::GradientApplyFailed { orphan_role_id, .. } => orphan_role_id.clone(),
        other => panic!("unexpected error: {other:?}"),
    };
    assert_eq!(err.role_id(), Some(orphan.as_str()));
    assert!(h.tracked("guild").await.is_empty());

    let remote = h.gateway.role("guild", &orphan).expect("orphan stays remotely");
    assert_eq!(remote.colors, None);
    assert_eq!(h.manager.orphans_of("guild").await.unwrap(), vec![orphan.clone()]);
    assert_eq!(h.stored_orphans("guild").await, vec![orphan]);
}

#[tokio::test]
async fn orphan_can_be_deleted_after_a_restart() {
    let h = lifecycle_harness::harness();
    h.gateway
        .fail_next(Op::SetGradient, RemoteError::Unavailable("502".into()));
    let err = h.manager.commit("guild", Candidate::new(1, 2)).await.unwrap_err();
    let orphan = err.role_id().expect("orphan id is reported").to_string();

    let restarted = h.restarted();
    assert_eq!(restarted.orphans_of("guild").await.unwrap(), vec![orphan.clone()]);
    assert!(restarted.delete_one("guild", &orphan).await.unwrap());

    assert!(h.gateway.role("guild", &orphan).is_none());
    assert!(h.stored_orphans("guild").await.is_empty());
    assert!(!restarted.delete_one("guild", &orphan).await.unwrap());
}

#[tokio::test]
async fn cleanup_after_a_restart_sweeps_recorded_orphans() {
    let h = lifecycle_harness::harness();
    let kept = h.seed("guild", 1).await;
    h.gateway.give("guild", &kept[0], "member");
    h.gateway
        .fail_next(Op::SetGradient, RemoteError::Unavailable("502".into()));
    let err = h.manager.commit("guild", Candidate::new(1, 2)).await.unwrap_err();
    let orphan = err.role_id().expect("orphan id is reported").to_string();

    let report = h.restarted().clear_unused("guild").await.unwrap();

    assert_eq!(report.deleted, vec![orphan.clone()]);
    assert!(h.gateway.role("guild", &orphan).is_none());
    assert!(h.stored_orphans("guild").await.is_empty());
    assert_eq!(h.tracked("guild").await.len(), 1);
}

#[tokio::test]
async fn orphans_do_not_count_against_capacity() {
    let h = lifecycle_harness::harness();
    h.seed("guild", MAX_ROLES_PER_SERVER - 1).await;
    h.gateway
        .fail_next(Op::SetGradient, RemoteError::Unavailable("timeout".into()));
    let _ = h.manager.commit("guild", Candidate::new(1, 2)).await;

    h.manager
        .commit("guild", Candidate::new(3, 4))
        .await
        .expect("orphan should not take a slot");
    assert_eq!(h.tracked("guild").await.len(), MAX_ROLES_PER_SERVER);
    assert_eq!(h.gateway.role_count("guild"), MAX_ROLES_PER_SERVER + 1);
}

#[tokio::test]
async fn registry_write_failure_keeps_role_id_for_reconciliation() {
    let h = lifecycle_harness::harness();
    h.registry.fail_next_add.store(true, Ordering::SeqCst);

    let err = h
        .manager
        .commit("guild", Candidate::new(7, 8))
        .await
        .unwrap_err();

    let role_id = err.role_id().expect("remote role id is reported").to_string();
    assert!(matches!(err, RoleError::RegistryIo { .. }));
    assert!(h.gateway.role("guild", &role_id).is_some());
    assert!(h.tracked("guild").await.is_empty());

    // The write failure fenced the server; the storage is healthy again so
    // cleanup lifts the fence and removes the unregistered role.
    let report = h.manager.clear_unused("guild").await.unwrap();
    assert_eq!(report.deleted, vec![role_id.clone()]);
    assert!(h.gateway.role("guild", &role_id).is_none());
    assert!(!h.manager.is_fenced("guild"));
}

#[tokio::test]
async fn refused_registration_is_reported_and_deletable() {
    let h = lifecycle_harness::harness();
    h.registry.refuse_adds.store(true, Ordering::SeqCst);

    let err = h
        .manager
        .commit("guild", Candidate::new(9, 10))
        .await
        .unwrap_err();
    let role_id = match err {
        RoleError::RegistrationRejected { role_id } => role_id,
        other => panic!("unexpected error: {other:?}"),
    };

    assert!(h.manager.delete_one("guild", &role_id).await.unwrap());
    assert!(h.gateway.role("guild", &role_id).is_none());
    assert!(h.manager.orphans_of("guild").await.unwrap().is_empty());
}

#[tokio::test]
async fn out_of_range_candidate_never_reaches_the_platform() {
    let h = lifecycle_harness::harness();

    let err = h
        .manager
        .commit("guild", Candidate::new(1, 0x0100_0000))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RoleError::InvalidCandidate {
            secondary: 0x0100_0000,
            ..
        }
    ));
    assert_eq!(h.gateway.calls(Op::Create), 0);
}
