//! Remote role operations the lifecycle depends on.
//!
//! Each method maps to one platform call and is never retried here; failures
//! come back as [`RemoteError`] for the caller to classify.

pub mod discord;

use std::future::Future;
use std::pin::Pin;

use crate::error::RemoteError;

pub use discord::DiscordRoleGateway;

pub trait RoleGateway: Send + Sync {
    /// Create a role with no color and return its platform identifier.
    fn create_empty_role<'a>(
        &'a self,
        server_id: &'a str,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, RemoteError>> + Send + 'a>>;

    /// Apply a two-stop gradient; the third stop is left absent.
    fn set_gradient<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
        primary: u32,
        secondary: u32,
    ) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + 'a>>;

    fn delete_role<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + 'a>>;

    /// Number of members currently holding the role; `NotFound` if it is gone.
    fn current_holder_count<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<usize, RemoteError>> + Send + 'a>>;

    /// Role ids the member currently holds on the server.
    fn member_role_ids<'a>(
        &'a self,
        server_id: &'a str,
        member_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, RemoteError>> + Send + 'a>>;

    fn assign_role<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
        member_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + 'a>>;

    fn unassign_role<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
        member_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + 'a>>;
}
