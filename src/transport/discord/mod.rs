pub mod commands;
pub mod gateway;
pub mod http_client;
mod rate_limit;
pub mod response;
pub mod types;

use anyhow::Context;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

use self::commands::{Rejection, build_commands};
use self::gateway::{DiscordGateway, GatewayEvent, GatewaySession, InboundInteraction};
use self::http_client::DiscordHttpClient;
use self::types::{DEFERRED_CHANNEL_MESSAGE, DEFAULT_INTENTS, EPHEMERAL_FLAG};
use super::runtime::{Listener, drive_events};
use crate::config::{DiscordConfig, resolve_locale};
use crate::interaction::InteractionHandler;

/// The Discord side of the bot: keeps a gateway session, turns interactions
/// into actions and edits the deferred reply with the rendered outcome.
pub struct DiscordBot {
    http: Arc<DiscordHttpClient>,
    handler: Arc<InteractionHandler>,
    session: Arc<GatewaySession>,
    config: DiscordConfig,
    default_locale: String,
    application_id: Mutex<Option<String>>,
}

impl DiscordBot {
    pub fn new(
        config: DiscordConfig,
        default_locale: impl Into<String>,
        http: Arc<DiscordHttpClient>,
        handler: Arc<InteractionHandler>,
    ) -> Self {
        let application_id = config.application_id.clone();
        Self {
            http,
            handler,
            session: Arc::new(GatewaySession::default()),
            config,
            default_locale: default_locale.into(),
            application_id: Mutex::new(application_id),
        }
    }

    fn application_id(&self) -> Option<String> {
        self.application_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn matches_guild_filter(&self, guild_id: Option<&str>) -> bool {
        match &self.config.guild_id {
            Some(only) => guild_id.is_none_or(|guild| guild == only),
            None => true,
        }
    }

    /// Upload the slash commands, to one guild when configured or globally.
    pub async fn register_commands(&self) -> anyhow::Result<()> {
        let application_id = match self.application_id() {
            Some(id) => id,
            None => {
                let application = self
                    .http
                    .get_current_application()
                    .await
                    .context("look up Discord application id")?;
                let id = application
                    .get("id")
                    .and_then(serde_json::Value::as_str)
                    .context("Discord application has no id")?
                    .to_string();
                *self
                    .application_id
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(id.clone());
                id
            }
        };

        let commands = build_commands(self.config.manage_roles_only);
        self.http
            .register_commands(&application_id, self.config.guild_id.as_deref(), &commands)
            .await
            .context("register Discord slash commands")?;
        tracing::info!(
            count = commands.len(),
            guild_id = self.config.guild_id.as_deref().unwrap_or("global"),
            "slash commands registered"
        );
        Ok(())
    }

    async fn handle_event(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready { application_id, .. } => {
                if let Some(id) = application_id {
                    *self
                        .application_id
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(id);
                }
                tracing::info!("Discord gateway ready");
                if let Err(error) = self.register_commands().await {
                    tracing::warn!(error = %error, "slash command registration failed");
                }
            }
            GatewayEvent::Interaction(interaction) => self.respond(interaction).await,
        }
    }

    async fn respond(&self, interaction: InboundInteraction) {
        if !self.matches_guild_filter(interaction.guild_id.as_deref()) {
            return;
        }
        let route = match commands::route(&interaction) {
            Ok(route) => Some(route),
            Err(Rejection::GuildOnly) => None,
            Err(Rejection::Unsupported) => {
                tracing::debug!(interaction_id = %interaction.id, "ignoring unsupported interaction");
                return;
            }
        };
        let locale = resolve_locale(interaction.locale.as_deref(), &self.default_locale);

        if let Err(error) = self
            .http
            .create_interaction_response(
                &interaction.id,
                &interaction.token,
                DEFERRED_CHANNEL_MESSAGE,
                Some(json!({ "flags": EPHEMERAL_FLAG })),
            )
            .await
        {
            tracing::warn!(interaction_id = %interaction.id, error = %error, "failed to defer interaction");
            return;
        }

        let reply = match route {
            Some(route) => {
                let outcome = self.handler.handle(route.action).await;
                response::render(outcome, route.view, locale)
            }
            None => response::guild_only(locale),
        };

        let Some(application_id) = self.application_id() else {
            tracing::warn!("Discord application id unknown; cannot deliver reply");
            return;
        };
        if let Err(error) = self
            .http
            .edit_original_interaction_response(
                &application_id,
                &interaction.token,
                &reply.payload,
                reply.file.as_ref(),
            )
            .await
        {
            tracing::warn!(interaction_id = %interaction.id, error = %error, "failed to deliver reply");
        }
    }
}

impl Listener for DiscordBot {
    fn name(&self) -> &str {
        "discord"
    }

    fn listen<'a>(&'a self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let gateway = DiscordGateway::new(
                self.config.bot_token.clone(),
                DEFAULT_INTENTS,
                Arc::clone(&self.session),
            );
            let (event_tx, event_rx) = mpsc::channel::<GatewayEvent>(100);
            let http = Arc::clone(&self.http);
            let gateway_task = tokio::spawn(async move { gateway.run(&http, &event_tx).await });

            drive_events(event_rx, gateway_task, |event| self.handle_event(event))
                .await
                .context("Discord gateway")
        })
    }
}
