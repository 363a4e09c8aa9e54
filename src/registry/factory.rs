use crate::config::RegistryConfig;

use super::{InMemoryRoleRegistry, JsonFileRegistry, RoleRegistry, SqliteRoleRegistry};

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_SQLITE_FILE: &str = "registry.db";
pub const DEFAULT_JSON_FILE: &str = "db.json";

pub async fn create_registry(
    config: &RegistryConfig,
    data_dir: &Path,
) -> anyhow::Result<Arc<dyn RoleRegistry>> {
    let registry: Arc<dyn RoleRegistry> = match config.backend.as_str() {
        "sqlite" => {
            let path = config
                .path
                .clone()
                .unwrap_or_else(|| data_dir.join(DEFAULT_SQLITE_FILE));
            let registry = SqliteRoleRegistry::open(&path)
                .await
                .with_context(|| format!("open sqlite registry at {}", path.display()))?;
            Arc::new(registry)
        }
        "json" => {
            let path = config
                .path
                .clone()
                .unwrap_or_else(|| data_dir.join(DEFAULT_JSON_FILE));
            let registry = JsonFileRegistry::open(&path)
                .await
                .with_context(|| format!("open json registry at {}", path.display()))?;
            Arc::new(registry)
        }
        "memory" => Arc::new(InMemoryRoleRegistry::new()),
        other => {
            anyhow::bail!("Unknown registry backend '{other}'. Supported: sqlite, json, memory");
        }
    };

    tracing::info!(backend = registry.name(), "registry initialized");
    Ok(registry)
}
