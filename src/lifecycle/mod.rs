//! Gradient role lifecycle: propose, commit, assign and clean up.

pub mod candidate;
pub mod locks;
pub mod manager;

pub use candidate::Candidate;
pub use locks::ServerLocks;
pub use manager::{Assignment, ClearReport, DEFAULT_NAME_PREFIX, LifecycleManager};
