//! Localized Discord reply payloads for interaction outcomes.

use serde_json::json;

use super::commands::{CANCEL_ID, DELETE_ID, PICK_ID, View, confirm_custom_id};
use super::http_client::FileAttachment;
use super::types::{ButtonStyle, ComponentType, MAX_SELECT_OPTIONS};
use crate::error::{InteractionError, RemoteError, RoleError};
use crate::interaction::Outcome;
use crate::lifecycle::candidate::hex;
use crate::registry::GradientRole;
use crate::render::PREVIEW_FILE_NAME;

/// A rendered reply: the message body plus an optional upload.
#[derive(Debug)]
pub struct Reply {
    pub payload: serde_json::Value,
    pub file: Option<FileAttachment>,
}

impl Reply {
    fn text(content: impl Into<String>) -> Self {
        Self {
            payload: json!({
                "content": content.into(),
                "embeds": [],
                "components": [],
            }),
            file: None,
        }
    }
}

pub fn guild_only(locale: &str) -> Reply {
    Reply::text(t!("errors.guild_only", locale = locale))
}

pub fn render(outcome: Outcome, view: View, locale: &str) -> Reply {
    match outcome {
        Outcome::Proposed { candidate, preview } => Reply {
            payload: json!({
                "content": t!("proposal.prompt", locale = locale),
                "components": [{
                    "type": ComponentType::ActionRow as u8,
                    "components": [
                        {
                            "type": ComponentType::Button as u8,
                            "style": ButtonStyle::Success as u8,
                            "label": t!("proposal.yes", locale = locale),
                            "custom_id": confirm_custom_id(candidate),
                        },
                        {
                            "type": ComponentType::Button as u8,
                            "style": ButtonStyle::Danger as u8,
                            "label": t!("proposal.no", locale = locale),
                            "custom_id": CANCEL_ID,
                        }
                    ]
                }],
                "attachments": [{"id": 0, "filename": PREVIEW_FILE_NAME}],
            }),
            file: Some(FileAttachment {
                filename: PREVIEW_FILE_NAME.to_string(),
                mime_type: "image/png".to_string(),
                bytes: preview,
            }),
        },
        Outcome::Committed(role) => Reply::text(t!(
            "commit.created",
            locale = locale,
            role = role.role_id
        )),
        Outcome::Cancelled => Reply::text(t!("proposal.cancelled", locale = locale)),
        Outcome::Roles(roles) => {
            if view == View::DeletePrompt {
                delete_prompt(&roles, locale)
            } else {
                role_list(&roles, locale)
            }
        }
        Outcome::Assigned(assignment) => Reply::text(t!(
            "pick.assigned",
            locale = locale,
            role = assignment.role_id
        )),
        Outcome::Deleted { role_id, removed } => {
            if removed {
                Reply::text(t!("delete.done", locale = locale, role = role_id))
            } else {
                Reply::text(t!("delete.unknown", locale = locale, role = role_id))
            }
        }
        Outcome::Cleared(report) => {
            // Roles already gone remotely are not counted.
            let mut content = if report.deleted.is_empty() {
                t!("clear.none", locale = locale).to_string()
            } else {
                t!("clear.done", locale = locale, count = report.deleted.len()).to_string()
            };
            if !report.failed.is_empty() {
                content.push('\n');
                content.push_str(&t!(
                    "clear.failed",
                    locale = locale,
                    count = report.failed.len()
                ));
            }
            Reply::text(content)
        }
        Outcome::MemberCleared(removed) => {
            if removed.is_empty() {
                Reply::text(t!("nocolor.none", locale = locale))
            } else {
                Reply::text(t!("nocolor.done", locale = locale, count = removed.len()))
            }
        }
        Outcome::Failed(error) => Reply::text(error_text(&error, view, locale)),
    }
}

fn role_list(roles: &[GradientRole], locale: &str) -> Reply {
    if roles.is_empty() {
        return Reply::text(t!("list.empty", locale = locale));
    }
    let description = roles
        .iter()
        .map(|role| {
            t!(
                "list.entry",
                locale = locale,
                role = role.role_id,
                primary = hex(role.primary_color),
                secondary = hex(role.secondary_color)
            )
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n");

    Reply {
        payload: json!({
            "content": "",
            "embeds": [{
                "title": t!("list.title", locale = locale),
                "description": description,
                "color": roles[0].primary_color,
            }],
            "components": [select_row(PICK_ID, roles, locale)],
        }),
        file: None,
    }
}

fn delete_prompt(roles: &[GradientRole], locale: &str) -> Reply {
    if roles.is_empty() {
        return Reply::text(t!("delete.empty", locale = locale));
    }
    Reply {
        payload: json!({
            "content": t!("delete.prompt", locale = locale),
            "embeds": [],
            "components": [select_row(DELETE_ID, roles, locale)],
        }),
        file: None,
    }
}

fn select_row(custom_id: &str, roles: &[GradientRole], locale: &str) -> serde_json::Value {
    let options: Vec<serde_json::Value> = roles
        .iter()
        .take(MAX_SELECT_OPTIONS)
        .map(|role| {
            json!({
                "label": t!("list.option", locale = locale, role = role.role_id),
                "description": format!(
                    "{} → {}",
                    hex(role.primary_color),
                    hex(role.secondary_color)
                ),
                "value": role.role_id,
            })
        })
        .collect();

    json!({
        "type": ComponentType::ActionRow as u8,
        "components": [{
            "type": ComponentType::StringSelect as u8,
            "custom_id": custom_id,
            "placeholder": t!("list.placeholder", locale = locale),
            "options": options,
        }]
    })
}

fn remote_text(error: &RemoteError, locale: &str) -> String {
    match error {
        RemoteError::PermissionDenied(_) => t!("errors.permission", locale = locale),
        RemoteError::NotFound(_) => t!("errors.not_found", locale = locale),
        RemoteError::Unavailable(_) => t!("errors.unavailable", locale = locale),
    }
    .to_string()
}

pub fn error_text(error: &InteractionError, view: View, locale: &str) -> String {
    let error = match error {
        InteractionError::Render(_) => return t!("errors.render", locale = locale).to_string(),
        InteractionError::Lifecycle(error) => error,
    };
    match error {
        RoleError::CapacityExceeded { limit, .. } => {
            t!("errors.capacity", locale = locale, limit = limit).to_string()
        }
        RoleError::RoleCreateFailed { .. } => t!("errors.create_failed", locale = locale).to_string(),
        RoleError::GradientApplyFailed { orphan_role_id, .. } => {
            t!("errors.apply_failed", locale = locale, role = orphan_role_id).to_string()
        }
        RoleError::Remote(RemoteError::PermissionDenied(_)) if view == View::NoColor => {
            t!("nocolor.failed", locale = locale).to_string()
        }
        RoleError::Remote(remote) => remote_text(remote, locale),
        RoleError::RegistryIo { .. } | RoleError::StorageFenced { .. } => {
            t!("errors.storage", locale = locale).to_string()
        }
        RoleError::RoleNotTracked { .. } => t!("errors.not_tracked", locale = locale).to_string(),
        RoleError::InvalidCandidate { .. } => {
            t!("errors.invalid_candidate", locale = locale).to_string()
        }
        RoleError::RegistrationRejected { role_id } => {
            t!("errors.rejected", locale = locale, role = role_id).to_string()
        }
    }
}
