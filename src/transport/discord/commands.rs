//! Slash-command definitions and parsing of inbound interactions into
//! [`Action`]s.

use serde_json::json;

use super::gateway::InboundInteraction;
use super::types::{InteractionType, permissions};
use crate::interaction::Action;
use crate::lifecycle::Candidate;

pub const CONFIRM_PREFIX: &str = "gradient:confirm:";
pub const CANCEL_ID: &str = "gradient:cancel";
pub const PICK_ID: &str = "gradient:pick";
pub const DELETE_ID: &str = "gradient:delete";

/// Which reply layout an outcome should be rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Proposal,
    Confirmation,
    Cancellation,
    RoleList,
    Pick,
    DeletePrompt,
    Deletion,
    Cleanup,
    NoColor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub action: Action,
    pub view: View,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Sent outside a server.
    GuildOnly,
    /// Not one of ours.
    Unsupported,
}

/// `(name, locale key of the description, restricted to role managers)`.
const COMMANDS: [(&str, &str, bool); 5] = [
    ("random", "commands.random", false),
    ("list", "commands.list", false),
    ("delete", "commands.delete", true),
    ("clear", "commands.clear", true),
    ("nocolor", "commands.nocolor", false),
];

pub fn build_commands(manage_roles_only: bool) -> Vec<serde_json::Value> {
    COMMANDS
        .iter()
        .map(|(name, description_key, restricted)| {
            let mut command = json!({
                "name": name,
                "description": t!(*description_key, locale = "en"),
                "description_localizations": {
                    "ru": t!(*description_key, locale = "ru"),
                },
                "type": 1,
                "dm_permission": false,
            });
            if manage_roles_only && *restricted {
                command["default_member_permissions"] =
                    json!(permissions::MANAGE_ROLES.to_string());
            }
            command
        })
        .collect()
}

pub fn confirm_custom_id(candidate: Candidate) -> String {
    format!("{CONFIRM_PREFIX}{}:{}", candidate.primary, candidate.secondary)
}

fn parse_confirm(custom_id: &str) -> Option<Candidate> {
    let rest = custom_id.strip_prefix(CONFIRM_PREFIX)?;
    let (primary, secondary) = rest.split_once(':')?;
    Some(Candidate::new(primary.parse().ok()?, secondary.parse().ok()?))
}

fn first_value(data: &serde_json::Value) -> Option<String> {
    data.get("values")?
        .as_array()?
        .first()?
        .as_str()
        .map(str::to_string)
}

pub fn route(interaction: &InboundInteraction) -> Result<Route, Rejection> {
    let kind = InteractionType::from_u64(interaction.kind).ok_or(Rejection::Unsupported)?;
    let data = &interaction.data;

    let (action, view) = match kind {
        InteractionType::ApplicationCommand => {
            let name = data
                .get("name")
                .and_then(serde_json::Value::as_str)
                .ok_or(Rejection::Unsupported)?;
            if !COMMANDS.iter().any(|(known, ..)| *known == name) {
                return Err(Rejection::Unsupported);
            }
            let server_id = interaction.guild_id.clone().ok_or(Rejection::GuildOnly)?;
            match name {
                "random" => (Action::StartProposal { server_id }, View::Proposal),
                "list" => (Action::ListRoles { server_id }, View::RoleList),
                "delete" => (Action::ListRoles { server_id }, View::DeletePrompt),
                "clear" => (Action::ClearUnused { server_id }, View::Cleanup),
                _ => (
                    Action::ClearMemberRoles {
                        server_id,
                        member_id: interaction.user_id.clone(),
                    },
                    View::NoColor,
                ),
            }
        }
        InteractionType::MessageComponent => {
            let custom_id = data
                .get("custom_id")
                .and_then(serde_json::Value::as_str)
                .ok_or(Rejection::Unsupported)?;
            if custom_id == CANCEL_ID {
                return Ok(Route {
                    action: Action::CancelProposal,
                    view: View::Cancellation,
                });
            }
            let known = custom_id == PICK_ID
                || custom_id == DELETE_ID
                || custom_id.starts_with(CONFIRM_PREFIX);
            if !known {
                return Err(Rejection::Unsupported);
            }
            let server_id = interaction.guild_id.clone().ok_or(Rejection::GuildOnly)?;
            match custom_id {
                PICK_ID => (
                    Action::PickRole {
                        server_id,
                        member_id: interaction.user_id.clone(),
                        role_id: first_value(data).ok_or(Rejection::Unsupported)?,
                    },
                    View::Pick,
                ),
                DELETE_ID => (
                    Action::DeleteRole {
                        server_id,
                        role_id: first_value(data).ok_or(Rejection::Unsupported)?,
                    },
                    View::Deletion,
                ),
                _ => (
                    Action::ConfirmProposal {
                        server_id,
                        candidate: parse_confirm(custom_id).ok_or(Rejection::Unsupported)?,
                    },
                    View::Confirmation,
                ),
            }
        }
        _ => return Err(Rejection::Unsupported),
    };
    Ok(Route { action, view })
}
