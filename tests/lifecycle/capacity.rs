use gradient_roles::registry::MAX_ROLES_PER_SERVER;
use gradient_roles::{Candidate, RemoteError, RoleError};
use rand::Rng;

use super::lifecycle_harness::{self, Op};

#[derive(Debug, Clone, Copy)]
enum Step {
    Commit,
    CommitWithBrokenGradient,
    DeleteTracked(usize),
    HoldTracked(usize),
    Cleanup,
}

fn random_steps(count: usize) -> Vec<Step> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| match rng.random_range(0..10) {
            0..=4 => Step::Commit,
            5 => Step::CommitWithBrokenGradient,
            6 => Step::DeleteTracked(rng.random_range(0..MAX_ROLES_PER_SERVER)),
            7 | 8 => Step::HoldTracked(rng.random_range(0..MAX_ROLES_PER_SERVER)),
            _ => Step::Cleanup,
        })
        .collect()
}

#[tokio::test]
async fn registry_never_exceeds_capacity_under_mixed_operations() {
    let h = lifecycle_harness::harness();
    let steps = random_steps(300);

    for (index, step) in steps.into_iter().enumerate() {
        let tracked = h.tracked("guild").await;
        match step {
            Step::Commit => {
                let result = h.manager.commit("guild", Candidate::new(1, 2)).await;
                if tracked.len() >= MAX_ROLES_PER_SERVER {
                    assert!(matches!(result, Err(RoleError::CapacityExceeded { .. })));
                } else {
                    result.unwrap();
                }
            }
            Step::CommitWithBrokenGradient if tracked.len() < MAX_ROLES_PER_SERVER => {
                h.gateway
                    .fail_next(Op::SetGradient, RemoteError::Unavailable("flaky".into()));
                let _ = h.manager.commit("guild", Candidate::new(3, 4)).await;
                assert_eq!(h.tracked("guild").await.len(), tracked.len());
            }
            Step::CommitWithBrokenGradient => {}
            Step::DeleteTracked(slot) => {
                if let Some(role) = tracked.get(slot) {
                    assert!(h.manager.delete_one("guild", &role.role_id).await.unwrap());
                }
            }
            Step::HoldTracked(slot) => {
                if let Some(role) = tracked.get(slot) {
                    h.gateway.give("guild", &role.role_id, &format!("member-{index}"));
                }
            }
            Step::Cleanup => {
                h.manager.clear_unused("guild").await.unwrap();
            }
        }
        assert!(h.tracked("guild").await.len() <= MAX_ROLES_PER_SERVER);
    }

    // Whatever is left unheld goes away, and a second pass is a no-op.
    h.manager.clear_unused("guild").await.unwrap();
    let again = h.manager.clear_unused("guild").await.unwrap();
    assert_eq!(again.removed_count(), 0);
    assert!(h.manager.orphans_of("guild").await.unwrap().is_empty());
}
