use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::RoleGateway;
use crate::error::RemoteError;
use crate::transport::discord::http_client::{DiscordHttpClient, DiscordHttpError};
use crate::transport::discord::types::MEMBER_PAGE_LIMIT;

const CREATE_REASON: &str = "Gradient role created via /random";
const DELETE_REASON: &str = "Gradient role removed";

/// Discord JSON error code for "Unknown Role".
const UNKNOWN_ROLE_CODE: u64 = 10011;

/// [`RoleGateway`] backed by the Discord REST API.
pub struct DiscordRoleGateway {
    http: Arc<DiscordHttpClient>,
}

impl DiscordRoleGateway {
    pub fn new(http: Arc<DiscordHttpClient>) -> Self {
        Self { http }
    }
}

/// Map a REST failure onto the remote error taxonomy.
///
/// Only an unknown role is `NotFound`; a 404 for a missing member or guild
/// must not make the caller drop a role that still exists.
fn classify(error: DiscordHttpError) -> RemoteError {
    let message = error.to_string();
    match &error {
        DiscordHttpError::Status { status: 403, .. } => RemoteError::PermissionDenied(message),
        DiscordHttpError::Status {
            status: 404, body, ..
        } => {
            let code = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|value| value.get("code").and_then(serde_json::Value::as_u64));
            match code {
                None | Some(UNKNOWN_ROLE_CODE) => RemoteError::NotFound(message),
                Some(_) => RemoteError::Unavailable(message),
            }
        }
        _ => RemoteError::Unavailable(message),
    }
}

fn string_ids(value: Option<&serde_json::Value>) -> Vec<String> {
    value
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl RoleGateway for DiscordRoleGateway {
    fn create_empty_role<'a>(
        &'a self,
        server_id: &'a str,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, RemoteError>> + Send + 'a>> {
        Box::pin(async move {
            let role = self
                .http
                .create_role(server_id, name, Some(CREATE_REASON))
                .await
                .map_err(classify)?;
            role.get("id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    RemoteError::Unavailable("Discord create role response has no id".into())
                })
        })
    }

    fn set_gradient<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
        primary: u32,
        secondary: u32,
    ) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + 'a>> {
        Box::pin(async move {
            self.http
                .modify_role_colors(server_id, role_id, primary, secondary)
                .await
                .map_err(classify)
        })
    }

    fn delete_role<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + 'a>> {
        Box::pin(async move {
            self.http
                .delete_role(server_id, role_id, Some(DELETE_REASON))
                .await
                .map_err(classify)
        })
    }

    fn current_holder_count<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<usize, RemoteError>> + Send + 'a>> {
        Box::pin(async move {
            self.http
                .get_role(server_id, role_id)
                .await
                .map_err(classify)?;

            let mut holders = 0;
            let mut after: Option<String> = None;
            loop {
                let page = self
                    .http
                    .list_members(server_id, after.as_deref())
                    .await
                    .map_err(classify)?;

                holders += page
                    .iter()
                    .filter(|member| {
                        string_ids(member.get("roles"))
                            .iter()
                            .any(|held| held == role_id)
                    })
                    .count();

                if page.len() < MEMBER_PAGE_LIMIT {
                    break;
                }
                after = page
                    .last()
                    .and_then(|member| member.get("user"))
                    .and_then(|user| user.get("id"))
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string);
                if after.is_none() {
                    break;
                }
            }
            Ok(holders)
        })
    }

    fn member_role_ids<'a>(
        &'a self,
        server_id: &'a str,
        member_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, RemoteError>> + Send + 'a>> {
        Box::pin(async move {
            let member = self
                .http
                .get_member(server_id, member_id)
                .await
                .map_err(classify)?;
            Ok(string_ids(member.get("roles")))
        })
    }

    fn assign_role<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
        member_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + 'a>> {
        Box::pin(async move {
            self.http
                .add_member_role(server_id, member_id, role_id)
                .await
                .map_err(classify)
        })
    }

    fn unassign_role<'a>(
        &'a self,
        server_id: &'a str,
        role_id: &'a str,
        member_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + 'a>> {
        Box::pin(async move {
            self.http
                .remove_member_role(server_id, member_id, role_id)
                .await
                .map_err(classify)
        })
    }
}
