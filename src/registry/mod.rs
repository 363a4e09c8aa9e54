//! Durable per-server record of the gradient roles this bot created.
//!
//! Every backend implements [`RoleRegistry`]. Mutations are committed before
//! the returned future resolves, and each backend serializes its own
//! read-modify-persist cycles so that two tasks appending to the same server
//! cannot lose an update.

pub mod factory;
pub mod import;
pub mod json;
pub mod memory;
pub mod sqlite;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

use crate::error::RegistryError;

pub use factory::create_registry;
pub use import::{ImportSummary, import_document};
pub use json::JsonFileRegistry;
pub use memory::InMemoryRoleRegistry;
pub use sqlite::SqliteRoleRegistry;

/// Hard cap on tracked gradient roles per server.
pub const MAX_ROLES_PER_SERVER: usize = 20;

/// Largest value a 24-bit RGB color can take.
pub const MAX_COLOR: u32 = 0x00FF_FFFF;

/// A role created and tracked by this bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradientRole {
    #[serde(rename = "id")]
    pub role_id: String,
    #[serde(default, skip_serializing)]
    pub server_id: String,
    #[serde(rename = "primary")]
    pub primary_color: u32,
    #[serde(rename = "secondary")]
    pub secondary_color: u32,
}

impl GradientRole {
    pub fn new(
        server_id: impl Into<String>,
        role_id: impl Into<String>,
        primary_color: u32,
        secondary_color: u32,
    ) -> Self {
        Self {
            role_id: role_id.into(),
            server_id: server_id.into(),
            primary_color,
            secondary_color,
        }
    }
}

/// Tracked roles of one server, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerRegistry {
    pub server_id: String,
    pub roles: Vec<GradientRole>,
    /// Roles created on the platform by a commit that never got tracked.
    /// They do not count against the cap.
    pub orphans: Vec<String>,
}

impl ServerRegistry {
    pub fn empty(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            roles: Vec::new(),
            orphans: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.roles.len() >= MAX_ROLES_PER_SERVER
    }

    pub fn contains(&self, role_id: &str) -> bool {
        self.roles.iter().any(|role| role.role_id == role_id)
    }

    pub fn role_ids(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|role| role.role_id.as_str())
    }

    pub fn is_orphan(&self, role_id: &str) -> bool {
        self.orphans.iter().any(|id| id == role_id)
    }
}

/// Async persistence contract for tracked gradient roles.
pub trait RoleRegistry: Send + Sync {
    /// Backend name for logs and diagnostics.
    fn name(&self) -> &str;

    /// Return the server's record, creating and persisting an empty one on
    /// first access.
    fn get_server<'a>(
        &'a self,
        server_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ServerRegistry, RegistryError>> + Send + 'a>>;

    /// Append `role` unless the server already holds
    /// [`MAX_ROLES_PER_SERVER`] roles, in which case nothing changes and
    /// `false` is returned.
    fn add_role<'a>(
        &'a self,
        role: &'a GradientRole,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>>;

    /// Remove a role by id. Returns whether a row was actually removed.
    fn remove_role<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>>;

    /// Record a role left on the platform by a failed commit. Returns
    /// `false` when the id was already recorded.
    fn add_orphan<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>>;

    fn remove_orphan<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>>;

    /// Cheap check that the storage can be read and written again.
    fn health_check<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), RegistryError>> + Send + 'a>> {
        Box::pin(async move { Ok(()) })
    }
}
