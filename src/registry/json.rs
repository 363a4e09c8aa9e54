use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::sync::Mutex;

use super::{GradientRole, MAX_ROLES_PER_SERVER, RoleRegistry, ServerRegistry};
use crate::error::RegistryError;

/// On-disk layout shared with the legacy `db.json` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub servers: BTreeMap<String, ServerDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerDocument {
    #[serde(default)]
    pub roles: Vec<GradientRole>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orphans: Vec<String>,
}

impl RegistryDocument {
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let mut document: Self = serde_json::from_str(raw)?;
        for (server_id, server) in &mut document.servers {
            for role in &mut server.roles {
                role.server_id.clone_from(server_id);
            }
        }
        Ok(document)
    }

    pub async fn load(path: &Path) -> Result<Self, RegistryError> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => Self::parse(&raw),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(error.into()),
        }
    }
}

/// Whole-document JSON registry, rewritten atomically on every mutation.
pub struct JsonFileRegistry {
    path: PathBuf,
    document: Mutex<RegistryDocument>,
}

impl JsonFileRegistry {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let document = RegistryDocument::load(&path).await?;
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, document: &RegistryDocument) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let encoded = serde_json::to_vec_pretty(document)?;
        write_atomic(&self.path, &encoded).await
    }

    async fn mutate<F>(&self, server_id: &str, change: F) -> Result<bool, RegistryError>
    where
        F: FnOnce(&mut ServerDocument) -> bool,
    {
        let mut document = self.document.lock().await;
        let mut next = document.clone();
        if !change(next.servers.entry(server_id.to_string()).or_default()) {
            return Ok(false);
        }
        self.persist(&next).await?;
        *document = next;
        Ok(true)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RegistryError> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    if let Err(error) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(error.into());
    }
    Ok(())
}

impl RoleRegistry for JsonFileRegistry {
    fn name(&self) -> &str {
        "json"
    }

    fn get_server<'a>(
        &'a self,
        server_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ServerRegistry, RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            let mut document = self.document.lock().await;
            if !document.servers.contains_key(server_id) {
                let mut next = document.clone();
                next.servers
                    .insert(server_id.to_string(), ServerDocument::default());
                self.persist(&next).await?;
                *document = next;
            }
            let server = document.servers.get(server_id).cloned().unwrap_or_default();
            Ok(ServerRegistry {
                server_id: server_id.to_string(),
                roles: server.roles,
                orphans: server.orphans,
            })
        })
    }

    fn add_role<'a>(
        &'a self,
        role: &'a GradientRole,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>> {
        Box::pin(self.mutate(&role.server_id, move |server| {
            if server.roles.len() >= MAX_ROLES_PER_SERVER
                || server.roles.iter().any(|existing| existing.role_id == role.role_id)
            {
                return false;
            }
            server.roles.push(role.clone());
            true
        }))
    }

    fn remove_role<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>> {
        Box::pin(self.mutate(server_id, move |server| {
            let before = server.roles.len();
            server.roles.retain(|role| role.role_id != role_id);
            server.roles.len() != before
        }))
    }

    fn add_orphan<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>> {
        Box::pin(self.mutate(server_id, move |server| {
            if server.orphans.iter().any(|id| id == role_id) {
                return false;
            }
            server.orphans.push(role_id.to_string());
            true
        }))
    }

    fn remove_orphan<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, RegistryError>> + Send + 'a>> {
        Box::pin(self.mutate(server_id, move |server| {
            let before = server.orphans.len();
            server.orphans.retain(|id| id != role_id);
            server.orphans.len() != before
        }))
    }

    fn health_check<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            let document = self.document.lock().await;
            self.persist(&document).await
        })
    }
}
