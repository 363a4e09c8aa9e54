use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use super::candidate::Candidate;
use super::locks::ServerLocks;
use crate::error::{RegistryError, RemoteError, RoleError};
use crate::registry::{GradientRole, MAX_ROLES_PER_SERVER, RoleRegistry, ServerRegistry};
use crate::remote::RoleGateway;

pub const DEFAULT_NAME_PREFIX: &str = "Gradient";

/// Result of a successful pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub role_id: String,
    /// Tracked roles taken away from the member to keep the pick exclusive.
    pub removed: Vec<String>,
}

/// Per-role results of one cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Roles with no holders, deleted remotely and dropped from the registry.
    pub deleted: Vec<String>,
    /// Roles already gone remotely, dropped from the registry.
    pub reconciled: Vec<String>,
    /// Roles left in place because their remote check or delete failed.
    pub failed: Vec<(String, RemoteError)>,
}

impl ClearReport {
    pub fn removed_count(&self) -> usize {
        self.deleted.len() + self.reconciled.len()
    }
}

enum Sweep {
    Deleted,
    Reconciled,
    Kept,
    Failed(RemoteError),
}

/// Orchestrates proposal, commit, cleanup and member assignment of gradient
/// roles on top of a [`RoleRegistry`] and a [`RoleGateway`].
///
/// Commit, single delete and cleanup are serialized per server so the
/// capacity check and the registry append cannot interleave with another
/// commit. Picks and clears are serialized per member. A registry failure
/// fences the server: mutations are refused with
/// [`RoleError::StorageFenced`] until [`RoleRegistry::health_check`] passes.
///
/// Orphans are written to the registry. Ones that could not be written
/// because storage was failing are held here and written once the fence
/// lifts.
pub struct LifecycleManager {
    registry: Arc<dyn RoleRegistry>,
    gateway: Arc<dyn RoleGateway>,
    locks: ServerLocks,
    member_locks: ServerLocks,
    fenced: Mutex<HashSet<String>>,
    unrecorded_orphans: Mutex<HashMap<String, BTreeSet<String>>>,
    name_prefix: String,
}

impl LifecycleManager {
    pub fn new(registry: Arc<dyn RoleRegistry>, gateway: Arc<dyn RoleGateway>) -> Self {
        Self {
            registry,
            gateway,
            locks: ServerLocks::new(),
            member_locks: ServerLocks::new(),
            fenced: Mutex::new(HashSet::new()),
            unrecorded_orphans: Mutex::new(HashMap::new()),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
        }
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn registry(&self) -> &Arc<dyn RoleRegistry> {
        &self.registry
    }

    /// Offer a fresh pair of colors if the server still has room.
    ///
    /// The capacity check here is optimistic; [`Self::commit`] checks again
    /// under the server lock.
    pub async fn propose(&self, server_id: &str) -> Result<Candidate, RoleError> {
        let server = self.load(server_id).await?;
        if server.is_full() {
            return Err(capacity_exceeded(server_id));
        }
        let candidate = Candidate::random(&mut rand::rng());
        tracing::debug!(
            server_id,
            primary = candidate.primary,
            secondary = candidate.secondary,
            "proposed gradient"
        );
        Ok(candidate)
    }

    /// Materialize `candidate` as a remote role and track it.
    ///
    /// When the gradient cannot be applied, the freshly created role stays on
    /// the platform and is returned as the orphan of
    /// [`RoleError::GradientApplyFailed`]. It is recorded as an orphan, not
    /// as a tracked role, so a later cleanup or delete can still remove it.
    pub async fn commit(
        &self,
        server_id: &str,
        candidate: Candidate,
    ) -> Result<GradientRole, RoleError> {
        let candidate = candidate.validate()?;
        self.ensure_writable(server_id).await?;
        let _guard = self.locks.acquire(server_id).await;

        let server = self.load(server_id).await?;
        if server.is_full() {
            return Err(capacity_exceeded(server_id));
        }

        let name = format!("{}-{}", self.name_prefix, candidate.primary);
        let role_id = self
            .gateway
            .create_empty_role(server_id, &name)
            .await
            .map_err(|source| {
                tracing::warn!(server_id, error = %source, "role creation failed");
                RoleError::RoleCreateFailed { source }
            })?;
        tracing::info!(server_id, role_id = %role_id, "created empty role");

        if let Err(source) = self
            .gateway
            .set_gradient(server_id, &role_id, candidate.primary, candidate.secondary)
            .await
        {
            tracing::warn!(
                server_id,
                role_id = %role_id,
                error = %source,
                "gradient apply failed; role left in place"
            );
            self.remember_orphan(server_id, &role_id).await;
            return Err(RoleError::GradientApplyFailed {
                orphan_role_id: role_id,
                source,
            });
        }

        let role = GradientRole::new(server_id, role_id, candidate.primary, candidate.secondary);
        match self.registry.add_role(&role).await {
            Ok(true) => {
                tracing::info!(
                    server_id,
                    role_id = %role.role_id,
                    primary = role.primary_color,
                    secondary = role.secondary_color,
                    "gradient role committed"
                );
                Ok(role)
            }
            Ok(false) => {
                tracing::error!(
                    server_id,
                    role_id = %role.role_id,
                    "registry refused committed role"
                );
                self.remember_orphan(server_id, &role.role_id).await;
                Err(RoleError::RegistrationRejected {
                    role_id: role.role_id,
                })
            }
            Err(source) => {
                self.remember_orphan(server_id, &role.role_id).await;
                Err(self.storage_failure(server_id, Some(&role.role_id), source))
            }
        }
    }

    pub async fn list_roles(&self, server_id: &str) -> Result<Vec<GradientRole>, RoleError> {
        Ok(self.load(server_id).await?.roles)
    }

    /// Give `member_id` the tracked role `role_id`, first taking away every
    /// other tracked role the member holds.
    pub async fn assign(
        &self,
        server_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<Assignment, RoleError> {
        self.ensure_writable(server_id).await?;
        let _guard = self.member_locks.acquire(&member_key(server_id, member_id)).await;
        let server = self.load(server_id).await?;
        if !server.contains(role_id) {
            return Err(RoleError::RoleNotTracked {
                role_id: role_id.to_string(),
            });
        }

        let held = self.gateway.member_role_ids(server_id, member_id).await?;
        let previous: Vec<&String> = held
            .iter()
            .filter(|id| id.as_str() != role_id && server.contains(id))
            .collect();
        let removed = self.unassign_all(server_id, member_id, previous).await?;

        if let Err(error) = self
            .gateway
            .assign_role(server_id, role_id, member_id)
            .await
        {
            if error.is_not_found() {
                self.reconcile_missing(server_id, role_id).await?;
            }
            return Err(error.into());
        }

        tracing::info!(server_id, member_id, role_id, removed = removed.len(), "assigned gradient role");
        Ok(Assignment {
            role_id: role_id.to_string(),
            removed,
        })
    }

    /// Take away every tracked role the member holds. Returns the removed ids.
    pub async fn clear_member_roles(
        &self,
        server_id: &str,
        member_id: &str,
    ) -> Result<Vec<String>, RoleError> {
        self.ensure_writable(server_id).await?;
        let _guard = self.member_locks.acquire(&member_key(server_id, member_id)).await;
        let server = self.load(server_id).await?;
        if server.roles.is_empty() {
            return Ok(Vec::new());
        }

        let held = self.gateway.member_role_ids(server_id, member_id).await?;
        let tracked: Vec<&String> = held.iter().filter(|id| server.contains(id)).collect();
        let removed = self.unassign_all(server_id, member_id, tracked).await?;
        if !removed.is_empty() {
            tracing::info!(server_id, member_id, removed = removed.len(), "cleared member gradient roles");
        }
        Ok(removed)
    }

    /// Delete one tracked or orphaned role. Returns whether anything was
    /// removed; unknown ids are left alone.
    pub async fn delete_one(&self, server_id: &str, role_id: &str) -> Result<bool, RoleError> {
        self.ensure_writable(server_id).await?;
        let _guard = self.locks.acquire(server_id).await;

        let server = self.load(server_id).await?;
        if !server.contains(role_id) && !self.is_orphan(&server, role_id) {
            tracing::debug!(server_id, role_id, "delete of untracked role ignored");
            return Ok(false);
        }

        match self.gateway.delete_role(server_id, role_id).await {
            Ok(()) => tracing::info!(server_id, role_id, "deleted gradient role"),
            Err(error) if error.is_not_found() => {
                tracing::info!(server_id, role_id, "role already gone remotely");
            }
            Err(error) => return Err(error.into()),
        }
        self.forget(server_id, role_id).await?;
        Ok(true)
    }

    /// Delete every tracked or orphaned role nobody holds and drop the ones
    /// that no longer exist remotely.
    ///
    /// A remote failure on one role is recorded in the report and the pass
    /// moves on; a registry failure ends the pass.
    pub async fn clear_unused(&self, server_id: &str) -> Result<ClearReport, RoleError> {
        self.ensure_writable(server_id).await?;
        let _guard = self.locks.acquire(server_id).await;

        let server = self.load(server_id).await?;
        let orphans = self.orphan_ids(&server);
        let candidates = server.role_ids().map(str::to_string).chain(orphans);

        let mut report = ClearReport::default();
        for role_id in candidates {
            match self.sweep(server_id, &role_id).await? {
                Sweep::Deleted => report.deleted.push(role_id),
                Sweep::Reconciled => report.reconciled.push(role_id),
                Sweep::Kept => {}
                Sweep::Failed(error) => {
                    tracing::warn!(server_id, role_id = %role_id, error = %error, "cleanup skipped role");
                    report.failed.push((role_id, error));
                }
            }
        }

        tracing::info!(
            server_id,
            deleted = report.deleted.len(),
            reconciled = report.reconciled.len(),
            failed = report.failed.len(),
            "cleanup pass finished"
        );
        Ok(report)
    }

    /// Roles left on the platform by failed commits, in the order they were
    /// recorded.
    pub async fn orphans_of(&self, server_id: &str) -> Result<Vec<String>, RoleError> {
        let server = self.load(server_id).await?;
        Ok(self.orphan_ids(&server))
    }

    pub fn is_fenced(&self, server_id: &str) -> bool {
        self.fenced
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(server_id)
    }

    async fn sweep(&self, server_id: &str, role_id: &str) -> Result<Sweep, RoleError> {
        let holders = match self.gateway.current_holder_count(server_id, role_id).await {
            Ok(holders) => holders,
            Err(error) if error.is_not_found() => {
                self.reconcile_missing(server_id, role_id).await?;
                return Ok(Sweep::Reconciled);
            }
            Err(error) => return Ok(Sweep::Failed(error)),
        };
        if holders > 0 {
            return Ok(Sweep::Kept);
        }

        match self.gateway.delete_role(server_id, role_id).await {
            Ok(()) => {
                self.forget(server_id, role_id).await?;
                Ok(Sweep::Deleted)
            }
            Err(error) if error.is_not_found() => {
                self.reconcile_missing(server_id, role_id).await?;
                Ok(Sweep::Reconciled)
            }
            Err(error) => Ok(Sweep::Failed(error)),
        }
    }

    async fn unassign_all(
        &self,
        server_id: &str,
        member_id: &str,
        role_ids: Vec<&String>,
    ) -> Result<Vec<String>, RoleError> {
        let mut removed = Vec::with_capacity(role_ids.len());
        for role_id in role_ids {
            match self
                .gateway
                .unassign_role(server_id, role_id, member_id)
                .await
            {
                Ok(()) => removed.push(role_id.clone()),
                Err(error) if error.is_not_found() => {
                    self.reconcile_missing(server_id, role_id).await?;
                }
                Err(error) => return Err(error.into()),
            }
        }
        Ok(removed)
    }

    async fn reconcile_missing(&self, server_id: &str, role_id: &str) -> Result<(), RoleError> {
        tracing::info!(server_id, role_id, "role missing remotely; dropping from registry");
        self.forget(server_id, role_id).await
    }

    async fn forget(&self, server_id: &str, role_id: &str) -> Result<(), RoleError> {
        self.drop_unrecorded(server_id, role_id);
        let storage = |source| self.storage_failure(server_id, Some(role_id), source);
        self.registry
            .remove_role(server_id, role_id)
            .await
            .map_err(storage)?;
        self.registry
            .remove_orphan(server_id, role_id)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn load(&self, server_id: &str) -> Result<ServerRegistry, RoleError> {
        self.registry
            .get_server(server_id)
            .await
            .map_err(|source| self.storage_failure(server_id, None, source))
    }

    async fn ensure_writable(&self, server_id: &str) -> Result<(), RoleError> {
        if !self.is_fenced(server_id) {
            return Ok(());
        }
        match self.registry.health_check().await {
            Ok(()) => {
                self.fenced
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(server_id);
                tracing::info!(server_id, backend = self.registry.name(), "storage healthy; mutations resumed");
                self.record_unrecorded(server_id).await
            }
            Err(error) => {
                tracing::warn!(server_id, error = %error, "storage still unhealthy");
                Err(RoleError::StorageFenced {
                    server_id: server_id.to_string(),
                })
            }
        }
    }

    fn storage_failure(
        &self,
        server_id: &str,
        role_id: Option<&str>,
        source: RegistryError,
    ) -> RoleError {
        self.fence(server_id, role_id, &source);
        RoleError::RegistryIo {
            role_id: role_id.map(str::to_string),
            source,
        }
    }

    fn fence(&self, server_id: &str, role_id: Option<&str>, source: &RegistryError) {
        tracing::error!(
            server_id,
            role_id = role_id.unwrap_or_default(),
            backend = self.registry.name(),
            error = %source,
            "registry failure; fencing server"
        );
        self.fenced
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(server_id.to_string());
    }

    async fn remember_orphan(&self, server_id: &str, role_id: &str) {
        match self.registry.add_orphan(server_id, role_id).await {
            Ok(_) => tracing::info!(server_id, role_id, "orphan role recorded"),
            Err(source) => {
                self.fence(server_id, Some(role_id), &source);
                self.unrecorded_orphans
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(server_id.to_string())
                    .or_default()
                    .insert(role_id.to_string());
            }
        }
    }

    /// Write orphans held back by a storage failure.
    async fn record_unrecorded(&self, server_id: &str) -> Result<(), RoleError> {
        let pending: Vec<String> = self
            .unrecorded_orphans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(server_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        for role_id in pending {
            self.registry
                .add_orphan(server_id, &role_id)
                .await
                .map_err(|source| self.storage_failure(server_id, Some(&role_id), source))?;
            self.drop_unrecorded(server_id, &role_id);
            tracing::info!(server_id, role_id = %role_id, "orphan role recorded after recovery");
        }
        Ok(())
    }

    fn drop_unrecorded(&self, server_id: &str, role_id: &str) {
        let mut orphans = self
            .unrecorded_orphans
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(ids) = orphans.get_mut(server_id) {
            ids.remove(role_id);
            if ids.is_empty() {
                orphans.remove(server_id);
            }
        }
    }

    /// Recorded orphans followed by unrecorded ones, skipping tracked ids.
    fn orphan_ids(&self, server: &ServerRegistry) -> Vec<String> {
        let mut ids: Vec<String> = server
            .orphans
            .iter()
            .filter(|id| !server.contains(id))
            .cloned()
            .collect();
        if let Some(unrecorded) = self
            .unrecorded_orphans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&server.server_id)
        {
            for id in unrecorded {
                if !server.contains(id) && !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }

    fn is_orphan(&self, server: &ServerRegistry, role_id: &str) -> bool {
        self.orphan_ids(server).iter().any(|id| id == role_id)
    }
}

fn member_key(server_id: &str, member_id: &str) -> String {
    format!("{server_id}/{member_id}")
}

fn capacity_exceeded(server_id: &str) -> RoleError {
    RoleError::CapacityExceeded {
        server_id: server_id.to_string(),
        limit: MAX_ROLES_PER_SERVER,
    }
}
