//! Platform-neutral inbound actions and their typed outcomes.
//!
//! Adapters parse user input into an [`Action`], hand it to
//! [`InteractionHandler::handle`], and format the returned [`Outcome`]. No
//! user-facing text is produced here.

pub mod handler;

use crate::error::InteractionError;
use crate::lifecycle::{Assignment, Candidate, ClearReport};
use crate::registry::GradientRole;

pub use handler::InteractionHandler;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    StartProposal {
        server_id: String,
    },
    ConfirmProposal {
        server_id: String,
        candidate: Candidate,
    },
    CancelProposal,
    ListRoles {
        server_id: String,
    },
    PickRole {
        server_id: String,
        member_id: String,
        role_id: String,
    },
    DeleteRole {
        server_id: String,
        role_id: String,
    },
    ClearUnused {
        server_id: String,
    },
    ClearMemberRoles {
        server_id: String,
        member_id: String,
    },
}

impl Action {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartProposal { .. } => "start_proposal",
            Self::ConfirmProposal { .. } => "confirm_proposal",
            Self::CancelProposal => "cancel_proposal",
            Self::ListRoles { .. } => "list_roles",
            Self::PickRole { .. } => "pick_role",
            Self::DeleteRole { .. } => "delete_role",
            Self::ClearUnused { .. } => "clear_unused",
            Self::ClearMemberRoles { .. } => "clear_member_roles",
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Proposed {
        candidate: Candidate,
        preview: Vec<u8>,
    },
    Committed(GradientRole),
    Cancelled,
    Roles(Vec<GradientRole>),
    Assigned(Assignment),
    Deleted {
        role_id: String,
        removed: bool,
    },
    Cleared(ClearReport),
    MemberCleared(Vec<String>),
    Failed(InteractionError),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}
