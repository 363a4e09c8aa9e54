use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::Mutex;

use super::{GradientRole, MAX_ROLES_PER_SERVER, RoleRegistry, ServerRegistry};
use crate::error::RegistryError;

/// Process-local registry. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryRoleRegistry {
    servers: Mutex<HashMap<String, ServerRegistry>>,
}

impl InMemoryRoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoleRegistry for InMemoryRoleRegistry {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_server<'a>(
        &'a self,
        server_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ServerRegistry, RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            let mut servers = self.servers.lock().await;
            Ok(servers
                .entry(server_id.to_string())
                .or_insert_with(|| ServerRegistry::empty(server_id))
                .clone())
        })
    }

    fn add_role<'a>(
        &'a self,
        role: &'a GradientRole,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            let mut servers = self.servers.lock().await;
            let server = servers
                .entry(role.server_id.clone())
                .or_insert_with(|| ServerRegistry::empty(&role.server_id));
            if server.roles.len() >= MAX_ROLES_PER_SERVER || server.contains(&role.role_id) {
                return Ok(false);
            }
            server.roles.push(role.clone());
            Ok(true)
        })
    }

    fn remove_role<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            let mut servers = self.servers.lock().await;
            let Some(server) = servers.get_mut(server_id) else {
                return Ok(false);
            };
            let before = server.roles.len();
            server.roles.retain(|role| role.role_id != role_id);
            Ok(server.roles.len() != before)
        })
    }

    fn add_orphan<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            let mut servers = self.servers.lock().await;
            let server = servers
                .entry(server_id.to_string())
                .or_insert_with(|| ServerRegistry::empty(server_id));
            if server.is_orphan(role_id) {
                return Ok(false);
            }
            server.orphans.push(role_id.to_string());
            Ok(true)
        })
    }

    fn remove_orphan<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            let mut servers = self.servers.lock().await;
            let Some(server) = servers.get_mut(server_id) else {
                return Ok(false);
            };
            let before = server.orphans.len();
            server.orphans.retain(|id| id != role_id);
            Ok(server.orphans.len() != before)
        })
    }
}
