use thiserror::Error;

// ─── Remote platform errors ─────────────────────────────────────────────────

/// Failure of a single remote role call.
///
/// Every gateway operation maps to exactly one platform request and is never
/// retried locally, so the variant reflects how that one request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("remote platform unavailable: {0}")]
    Unavailable(String),

    #[error("remote platform denied permission: {0}")]
    PermissionDenied(String),

    #[error("remote role not found: {0}")]
    NotFound(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// ─── Registry errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("document encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("corrupt registry record: {0}")]
    Corrupt(String),
}

// ─── Lifecycle errors ───────────────────────────────────────────────────────

/// Outcome taxonomy of the gradient role lifecycle.
///
/// Remote and registry failures are forwarded verbatim; the lifecycle layer
/// only adds context such as the identifier of a role left behind by a
/// partial commit.
#[derive(Debug, Error)]
pub enum RoleError {
    #[error("server {server_id} already tracks {limit} gradient roles")]
    CapacityExceeded { server_id: String, limit: usize },

    #[error("failed to create role: {source}")]
    RoleCreateFailed {
        #[source]
        source: RemoteError,
    },

    #[error("failed to apply gradient to role {orphan_role_id}: {source}")]
    GradientApplyFailed {
        orphan_role_id: String,
        #[source]
        source: RemoteError,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("registry failure{}: {source}", role_suffix(.role_id))]
    RegistryIo {
        role_id: Option<String>,
        #[source]
        source: RegistryError,
    },

    #[error("mutations for server {server_id} are paused until storage is healthy")]
    StorageFenced { server_id: String },

    #[error("role {role_id} is not tracked")]
    RoleNotTracked { role_id: String },

    #[error("candidate colors out of range: primary={primary:#x} secondary={secondary:#x}")]
    InvalidCandidate { primary: u32, secondary: u32 },

    #[error("role {role_id} was committed remotely but the registry refused it")]
    RegistrationRejected { role_id: String },
}

fn role_suffix(role_id: &Option<String>) -> String {
    role_id
        .as_deref()
        .map(|id| format!(" (role {id})"))
        .unwrap_or_default()
}

impl RoleError {
    pub(crate) fn registry(source: RegistryError) -> Self {
        Self::RegistryIo {
            role_id: None,
            source,
        }
    }

    /// Role identifier the caller needs for later reconciliation, if any.
    pub fn role_id(&self) -> Option<&str> {
        match self {
            Self::GradientApplyFailed { orphan_role_id, .. } => Some(orphan_role_id),
            Self::RegistryIo { role_id, .. } => role_id.as_deref(),
            Self::RoleNotTracked { role_id } | Self::RegistrationRejected { role_id } => {
                Some(role_id)
            }
            _ => None,
        }
    }
}

// ─── Preview rendering ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid swatch size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("png encoding: {0}")]
    Encoding(#[from] png::EncodingError),
}

// ─── Interaction errors ─────────────────────────────────────────────────────

/// Failure carried back to the interaction adapter for rendering.
#[derive(Debug, Error)]
pub enum InteractionError {
    #[error(transparent)]
    Lifecycle(#[from] RoleError),

    #[error("preview: {0}")]
    Render(#[from] RenderError),
}
