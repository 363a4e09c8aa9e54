use std::collections::BTreeSet;
use std::sync::Arc;

use gradient_roles::registry::MAX_ROLES_PER_SERVER;
use gradient_roles::{Candidate, LifecycleManager, RoleError};

use super::lifecycle_harness::{self, Op};

async fn race_commits(
    manager: &Arc<LifecycleManager>,
    server_id: &str,
    attempts: u32,
) -> Vec<Result<String, RoleError>> {
    let tasks: Vec<_> = (0..attempts)
        .map(|index| {
            let manager = Arc::clone(manager);
            let server_id = server_id.to_string();
            tokio::spawn(async move {
                manager
                    .commit(&server_id, Candidate::new(index, index + 1))
                    .await
                    .map(|role| role.role_id)
            })
        })
        .collect();

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        results.push(task.await.expect("commit task panicked"));
    }
    results
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_commits_never_exceed_capacity() {
    let h = lifecycle_harness::harness();
    h.seed("guild", MAX_ROLES_PER_SERVER - 3).await;

    let results = race_commits(&h.manager, "guild", 12).await;

    let committed = results.iter().filter(|result| result.is_ok()).count();
    let refused = results
        .iter()
        .filter(|result| matches!(result, Err(RoleError::CapacityExceeded { .. })))
        .count();
    assert_eq!(committed, 3);
    assert_eq!(refused, 9);
    assert_eq!(h.tracked("guild").await.len(), MAX_ROLES_PER_SERVER);
    // Refused commits must not leave roles behind on the platform.
    assert_eq!(h.gateway.role_count("guild"), MAX_ROLES_PER_SERVER);
    assert_eq!(h.gateway.calls(Op::Create), MAX_ROLES_PER_SERVER);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn servers_fill_up_independently() {
    let h = lifecycle_harness::harness();

    let (left, right) = tokio::join!(
        race_commits(&h.manager, "left", 25),
        race_commits(&h.manager, "right", 25),
    );

    for results in [&left, &right] {
        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), MAX_ROLES_PER_SERVER);
    }
    assert_eq!(h.tracked("left").await.len(), MAX_ROLES_PER_SERVER);
    assert_eq!(h.tracked("right").await.len(), MAX_ROLES_PER_SERVER);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cleanup_racing_commits_keeps_registry_within_capacity() {
    let h = lifecycle_harness::harness();
    let held = h.seed("guild", MAX_ROLES_PER_SERVER).await;
    for role_id in &held[..10] {
        h.gateway.give("guild", role_id, "member");
    }

    let manager = Arc::clone(&h.manager);
    let cleanup = tokio::spawn(async move { manager.clear_unused("guild").await });
    let commits = race_commits(&h.manager, "guild", 15).await;
    let report = cleanup.await.unwrap().unwrap();

    let committed = commits.iter().filter(|result| result.is_ok()).count();
    let tracked = h.tracked("guild").await.len();
    assert!(tracked <= MAX_ROLES_PER_SERVER);
    assert_eq!(tracked, MAX_ROLES_PER_SERVER - report.deleted.len() + committed);
    assert!(committed <= report.deleted.len());
}

#[tokio::test]
async fn simultaneous_picks_by_one_member_leave_one_tracked_role() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 2).await;

    let (first, second) = tokio::join!(
        h.manager.assign("guild", "member", &ids[0]),
        h.manager.assign("guild", "member", &ids[1]),
    );
    first.unwrap();
    let second = second.unwrap();

    assert_eq!(second.removed, vec![ids[0].clone()]);
    assert_eq!(
        h.gateway.member_roles("guild", "member"),
        BTreeSet::from([ids[1].clone()])
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn burst_of_picks_keeps_member_exclusive() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 4).await;

    let tasks: Vec<_> = ids
        .iter()
        .cycle()
        .take(12)
        .cloned()
        .map(|role_id| {
            let manager = Arc::clone(&h.manager);
            tokio::spawn(async move { manager.assign("guild", "member", &role_id).await })
        })
        .collect();
    for task in tasks {
        task.await.expect("pick task panicked").unwrap();
    }

    let held = h.gateway.member_roles("guild", "member");
    assert_eq!(held.len(), 1);
    assert!(ids.contains(held.iter().next().unwrap()));
}

#[tokio::test]
async fn different_members_pick_without_waiting_on_each_other() {
    let h = lifecycle_harness::harness();
    let ids = h.seed("guild", 1).await;

    let (alice, bob) = tokio::join!(
        h.manager.assign("guild", "alice", &ids[0]),
        h.manager.assign("guild", "bob", &ids[0]),
    );
    alice.unwrap();
    bob.unwrap();

    let holders = h.gateway.role("guild", &ids[0]).unwrap().holders;
    assert_eq!(holders, BTreeSet::from(["alice".to_string(), "bob".to_string()]));
}
