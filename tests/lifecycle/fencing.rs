use std::sync::atomic::Ordering;

use gradient_roles::{Candidate, RoleError};

use super::lifecycle_harness::{self, Op};

#[tokio::test]
async fn registry_outage_pauses_mutations_until_it_recovers() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 1).await;

    h.registry.broken.store(true, Ordering::SeqCst);
    let err = h.manager.list_roles("guild").await.unwrap_err();
    assert!(matches!(err, RoleError::RegistryIo { role_id: None, .. }));
    assert!(h.manager.is_fenced("guild"));

    let creates = h.gateway.calls(Op::Create);
    for err in [
        h.manager.commit("guild", Candidate::new(1, 2)).await.unwrap_err(),
        h.manager.delete_one("guild", &ids[0]).await.unwrap_err(),
        h.manager.clear_unused("guild").await.unwrap_err(),
        h.manager.assign("guild", "member", &ids[0]).await.map(|_| ()).unwrap_err(),
        h.manager.clear_member_roles("guild", "member").await.map(|_| ()).unwrap_err(),
    ] {
        assert!(
            matches!(err, RoleError::StorageFenced { ref server_id } if server_id == "guild"),
            "unexpected error: {err:?}"
        );
    }
    assert_eq!(h.gateway.calls(Op::Create), creates);
    assert_eq!(h.gateway.calls(Op::Delete), 0);

    h.registry.broken.store(false, Ordering::SeqCst);
    h.manager.commit("guild", Candidate::new(1, 2)).await.unwrap();
    assert!(!h.manager.is_fenced("guild"));
    assert_eq!(h.tracked("guild").await.len(), 2);
}

#[tokio::test]
async fn fence_is_scoped_to_the_failing_server() {
    let h = lifecycle_harness::harness();

    h.registry.fail_next_add.store(true, Ordering::SeqCst);
    let _ = h.manager.commit("broken", Candidate::new(1, 2)).await;
    assert!(h.manager.is_fenced("broken"));

    h.manager
        .commit("healthy", Candidate::new(3, 4))
        .await
        .expect("other servers keep working");
    assert!(!h.manager.is_fenced("healthy"));
}

#[tokio::test]
async fn registry_read_failure_fences_before_any_remote_call() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 1).await;
    h.registry.broken.store(true, Ordering::SeqCst);

    let err = h.manager.delete_one("guild", &ids[0]).await.unwrap_err();
    assert!(matches!(err, RoleError::RegistryIo { .. }));
    assert!(h.manager.is_fenced("guild"));
    assert_eq!(h.gateway.calls(Op::Delete), 0);
}

#[tokio::test]
async fn orphan_held_through_an_outage_is_recorded_once_storage_recovers() {
    let h = lifecycle_harness::harness();
    h.registry.fail_next_add.store(true, Ordering::SeqCst);
    h.registry.fail_orphan_writes.store(true, Ordering::SeqCst);

    let err = h.manager.commit("guild", Candidate::new(7, 8)).await.unwrap_err();
    let orphan = err.role_id().expect("remote role id is reported").to_string();
    assert!(matches!(err, RoleError::RegistryIo { .. }));
    assert!(h.manager.is_fenced("guild"));
    assert!(h.stored_orphans("guild").await.is_empty());
    assert_eq!(h.manager.orphans_of("guild").await.unwrap(), vec![orphan.clone()]);

    h.registry.fail_orphan_writes.store(false, Ordering::SeqCst);
    h.manager.commit("guild", Candidate::new(1, 2)).await.unwrap();
    assert!(!h.manager.is_fenced("guild"));
    assert_eq!(h.stored_orphans("guild").await, vec![orphan.clone()]);

    let report = h.restarted().clear_unused("guild").await.unwrap();
    assert!(report.deleted.contains(&orphan));
    assert!(h.gateway.role("guild", &orphan).is_none());
}
