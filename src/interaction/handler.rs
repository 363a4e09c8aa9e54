use std::sync::Arc;

use super::{Action, Outcome};
use crate::error::InteractionError;
use crate::lifecycle::LifecycleManager;
use crate::render::SwatchRenderer;

/// Dispatches one [`Action`] to the lifecycle manager.
pub struct InteractionHandler {
    manager: Arc<LifecycleManager>,
    renderer: Arc<dyn SwatchRenderer>,
}

impl InteractionHandler {
    pub fn new(manager: Arc<LifecycleManager>, renderer: Arc<dyn SwatchRenderer>) -> Self {
        Self { manager, renderer }
    }

    pub fn manager(&self) -> &Arc<LifecycleManager> {
        &self.manager
    }

    pub async fn handle(&self, action: Action) -> Outcome {
        let kind = action.kind();
        let outcome = match self.dispatch(action).await {
            Ok(outcome) => outcome,
            Err(error) => Outcome::Failed(error),
        };
        if let Outcome::Failed(error) = &outcome {
            tracing::warn!(action = kind, error = %error, "interaction failed");
        } else {
            tracing::debug!(action = kind, "interaction handled");
        }
        outcome
    }

    async fn dispatch(&self, action: Action) -> Result<Outcome, InteractionError> {
        match action {
            Action::StartProposal { server_id } => {
                let candidate = self.manager.propose(&server_id).await?;
                let preview = self.renderer.render(candidate.primary, candidate.secondary)?;
                Ok(Outcome::Proposed { candidate, preview })
            }
            Action::ConfirmProposal {
                server_id,
                candidate,
            } => Ok(Outcome::Committed(
                self.manager.commit(&server_id, candidate).await?,
            )),
            Action::CancelProposal => Ok(Outcome::Cancelled),
            Action::ListRoles { server_id } => {
                Ok(Outcome::Roles(self.manager.list_roles(&server_id).await?))
            }
            Action::PickRole {
                server_id,
                member_id,
                role_id,
            } => Ok(Outcome::Assigned(
                self.manager
                    .assign(&server_id, &member_id, &role_id)
                    .await?,
            )),
            Action::DeleteRole { server_id, role_id } => {
                let removed = self.manager.delete_one(&server_id, &role_id).await?;
                Ok(Outcome::Deleted { role_id, removed })
            }
            Action::ClearUnused { server_id } => {
                Ok(Outcome::Cleared(self.manager.clear_unused(&server_id).await?))
            }
            Action::ClearMemberRoles {
                server_id,
                member_id,
            } => Ok(Outcome::MemberCleared(
                self.manager
                    .clear_member_roles(&server_id, &member_id)
                    .await?,
            )),
        }
    }
}
