use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::json;
use thiserror::Error;

use super::rate_limit::{self, RateLimiter};
use super::types::{API_BASE, MEMBER_PAGE_LIMIT};

const MAX_RATE_LIMIT_RETRIES: u8 = 3;

#[derive(Debug, Error)]
pub enum DiscordHttpError {
    #[error("Discord request {method} {url} could not be sent: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Discord request {method} {url} failed ({status}): {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Discord request {method} {url} exceeded rate limit after {} retries", MAX_RATE_LIMIT_RETRIES)]
    RateLimited { method: String, url: String },

    #[error("Discord response for {url} could not be decoded: {message}")]
    Decode { url: String, message: String },
}

impl DiscordHttpError {
    /// HTTP status of a rejected request, if the request reached Discord.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// File uploaded alongside an interaction response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

enum RequestBody<'a> {
    Empty,
    Json(&'a serde_json::Value),
    Multipart {
        payload: &'a serde_json::Value,
        file: &'a FileAttachment,
    },
}

pub struct DiscordHttpClient {
    client: reqwest::Client,
    bot_token: String,
    base_url: String,
    limits: RateLimiter,
}

impl DiscordHttpClient {
    #[must_use]
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self::with_base_url(bot_token, API_BASE)
    }

    #[must_use]
    pub fn with_base_url(bot_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token: bot_token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limits: RateLimiter::default(),
        }
    }

    // ── Roles ───────────────────────────────────────────────────────────

    pub async fn create_role(
        &self,
        guild_id: &str,
        name: &str,
        reason: Option<&str>,
    ) -> Result<serde_json::Value, DiscordHttpError> {
        let url = format!("{}/guilds/{guild_id}/roles", self.base_url);
        let body = json!({ "name": name, "permissions": "0" });
        let response = self
            .request(Method::POST, &url, RequestBody::Json(&body), reason)
            .await?;
        Self::decode_json(&url, response).await
    }

    /// Set a role's two-stop gradient; the third stop is cleared explicitly.
    pub async fn modify_role_colors(
        &self,
        guild_id: &str,
        role_id: &str,
        primary: u32,
        secondary: u32,
    ) -> Result<(), DiscordHttpError> {
        let url = format!("{}/guilds/{guild_id}/roles/{role_id}", self.base_url);
        let body = json!({
            "colors": {
                "primary_color": primary,
                "secondary_color": secondary,
                "tertiary_color": null,
            }
        });
        let _response = self
            .request(Method::PATCH, &url, RequestBody::Json(&body), None)
            .await?;
        Ok(())
    }

    pub async fn delete_role(
        &self,
        guild_id: &str,
        role_id: &str,
        reason: Option<&str>,
    ) -> Result<(), DiscordHttpError> {
        let url = format!("{}/guilds/{guild_id}/roles/{role_id}", self.base_url);
        let _response = self
            .request(Method::DELETE, &url, RequestBody::Empty, reason)
            .await?;
        Ok(())
    }

    pub async fn get_role(
        &self,
        guild_id: &str,
        role_id: &str,
    ) -> Result<serde_json::Value, DiscordHttpError> {
        let url = format!("{}/guilds/{guild_id}/roles/{role_id}", self.base_url);
        let response = self
            .request(Method::GET, &url, RequestBody::Empty, None)
            .await?;
        Self::decode_json(&url, response).await
    }

    // ── Members ─────────────────────────────────────────────────────────

    /// One page of guild members with ids greater than `after`.
    pub async fn list_members(
        &self,
        guild_id: &str,
        after: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, DiscordHttpError> {
        let mut url = format!(
            "{}/guilds/{guild_id}/members?limit={MEMBER_PAGE_LIMIT}",
            self.base_url
        );
        if let Some(after) = after {
            url.push_str("&after=");
            url.push_str(after);
        }
        let response = self
            .request(Method::GET, &url, RequestBody::Empty, None)
            .await?;
        Self::decode_json(&url, response).await
    }

    pub async fn get_member(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<serde_json::Value, DiscordHttpError> {
        let url = format!("{}/guilds/{guild_id}/members/{user_id}", self.base_url);
        let response = self
            .request(Method::GET, &url, RequestBody::Empty, None)
            .await?;
        Self::decode_json(&url, response).await
    }

    pub async fn add_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), DiscordHttpError> {
        let url = format!(
            "{}/guilds/{guild_id}/members/{user_id}/roles/{role_id}",
            self.base_url
        );
        let _response = self
            .request(Method::PUT, &url, RequestBody::Empty, None)
            .await?;
        Ok(())
    }

    pub async fn remove_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), DiscordHttpError> {
        let url = format!(
            "{}/guilds/{guild_id}/members/{user_id}/roles/{role_id}",
            self.base_url
        );
        let _response = self
            .request(Method::DELETE, &url, RequestBody::Empty, None)
            .await?;
        Ok(())
    }

    // ── Interactions & commands ─────────────────────────────────────────

    pub async fn create_interaction_response(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        response_type: u8,
        data: Option<serde_json::Value>,
    ) -> Result<(), DiscordHttpError> {
        let url = format!(
            "{}/interactions/{interaction_id}/{interaction_token}/callback",
            self.base_url
        );
        let mut body = json!({ "type": response_type });
        if let Some(payload) = data {
            body["data"] = payload;
        }
        let _response = self
            .request(Method::POST, &url, RequestBody::Json(&body), None)
            .await?;
        Ok(())
    }

    /// Replace the deferred reply of an interaction, optionally uploading one file.
    pub async fn edit_original_interaction_response(
        &self,
        application_id: &str,
        interaction_token: &str,
        payload: &serde_json::Value,
        file: Option<&FileAttachment>,
    ) -> Result<(), DiscordHttpError> {
        let url = format!(
            "{}/webhooks/{application_id}/{interaction_token}/messages/@original",
            self.base_url
        );
        let body = match file {
            Some(file) => RequestBody::Multipart { payload, file },
            None => RequestBody::Json(payload),
        };
        let _response = self.request(Method::PATCH, &url, body, None).await?;
        Ok(())
    }

    pub async fn register_commands(
        &self,
        application_id: &str,
        guild_id: Option<&str>,
        commands: &[serde_json::Value],
    ) -> Result<(), DiscordHttpError> {
        let url = if let Some(guild) = guild_id {
            format!(
                "{}/applications/{application_id}/guilds/{guild}/commands",
                self.base_url
            )
        } else {
            format!("{}/applications/{application_id}/commands", self.base_url)
        };

        let body = json!(commands);
        let _response = self
            .request(Method::PUT, &url, RequestBody::Json(&body), None)
            .await?;
        Ok(())
    }

    pub async fn get_current_application(&self) -> Result<serde_json::Value, DiscordHttpError> {
        let url = format!("{}/applications/@me", self.base_url);
        let response = self
            .request(Method::GET, &url, RequestBody::Empty, None)
            .await?;
        Self::decode_json(&url, response).await
    }

    pub async fn get_gateway_bot(&self) -> Result<serde_json::Value, DiscordHttpError> {
        let url = format!("{}/gateway/bot", self.base_url);
        let response = self
            .request(Method::GET, &url, RequestBody::Empty, None)
            .await?;
        Self::decode_json(&url, response).await
    }

    // ── Plumbing ────────────────────────────────────────────────────────

    async fn decode_json<T: serde::de::DeserializeOwned>(
        url: &str,
        response: Response,
    ) -> Result<T, DiscordHttpError> {
        response
            .json()
            .await
            .map_err(|error| DiscordHttpError::Decode {
                url: url.to_string(),
                message: error.to_string(),
            })
    }

    fn build_request(
        &self,
        method: &Method,
        url: &str,
        body: &RequestBody<'_>,
        reason: Option<&str>,
    ) -> Result<RequestBuilder, DiscordHttpError> {
        let mut builder = self
            .client
            .request(method.clone(), url)
            .header("Authorization", format!("Bot {}", self.bot_token));
        if let Some(reason) = reason {
            builder = builder.header("X-Audit-Log-Reason", reason);
        }

        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(payload) => builder.json(payload),
            RequestBody::Multipart { payload, file } => {
                let part = reqwest::multipart::Part::bytes(file.bytes.clone())
                    .file_name(file.filename.clone())
                    .mime_str(&file.mime_type)
                    .map_err(|source| DiscordHttpError::Transport {
                        method: method.as_str().to_string(),
                        url: url.to_string(),
                        source,
                    })?;
                let form = reqwest::multipart::Form::new()
                    .text("payload_json", payload.to_string())
                    .part("files[0]", part);
                builder.multipart(form)
            }
        };
        Ok(builder)
    }

    /// Send one request, waiting out rate limits. A 429 is retried up to
    /// [`MAX_RATE_LIMIT_RETRIES`] times; any other failure is returned as is.
    async fn request(
        &self,
        method: Method,
        url: &str,
        body: RequestBody<'_>,
        reason: Option<&str>,
    ) -> Result<Response, DiscordHttpError> {
        let route = rate_limit::route_of(url);

        for attempt in 0..=MAX_RATE_LIMIT_RETRIES {
            self.limits.pause(&route).await;
            let response = self
                .build_request(&method, url, &body, reason)?
                .send()
                .await
                .map_err(|source| DiscordHttpError::Transport {
                    method: method.as_str().to_string(),
                    url: url.to_string(),
                    source,
                })?;
            self.limits.observe(&route, response.headers()).await;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = self.limits.throttled(&route, response.headers()).await;
                tracing::debug!(
                    route = %route,
                    attempt,
                    retry_after_ms = wait.as_millis(),
                    "Discord rate limited request"
                );
                continue;
            }
            if status.is_success() {
                return Ok(response);
            }

            let body = response
                .text()
                .await
                .unwrap_or_else(|error| format!("<unreadable body: {error}>"));
            return Err(DiscordHttpError::Status {
                method: method.as_str().to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Err(DiscordHttpError::RateLimited {
            method: method.as_str().to_string(),
            url: url.to_string(),
        })
    }
}
