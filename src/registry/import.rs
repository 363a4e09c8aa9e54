use super::json::RegistryDocument;
use super::{MAX_COLOR, RoleRegistry};
use crate::error::RegistryError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Already present, over the per-server cap, or carrying invalid colors.
    pub skipped: usize,
    /// Untracked roles carried over so cleanup can still find them.
    pub orphans: usize,
}

/// Copy every role of a legacy document into `registry`, in document order.
pub async fn import_document(
    registry: &dyn RoleRegistry,
    document: &RegistryDocument,
) -> Result<ImportSummary, RegistryError> {
    let mut summary = ImportSummary::default();
    for (server_id, server) in &document.servers {
        registry.get_server(server_id).await?;
        for role in &server.roles {
            if role.primary_color > MAX_COLOR || role.secondary_color > MAX_COLOR {
                tracing::warn!(server_id = %server_id, role_id = %role.role_id, "skipping role with invalid colors");
                summary.skipped += 1;
                continue;
            }
            if registry.add_role(role).await? {
                summary.imported += 1;
            } else {
                summary.skipped += 1;
            }
        }
        for role_id in &server.orphans {
            if registry.add_orphan(server_id, role_id).await? {
                summary.orphans += 1;
            }
        }
    }
    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped,
        orphans = summary.orphans,
        backend = registry.name(),
        "legacy import finished"
    );
    Ok(summary)
}
