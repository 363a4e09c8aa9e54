use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::interaction::InteractionHandler;
use crate::lifecycle::LifecycleManager;
use crate::registry::{RoleRegistry, create_registry};
use crate::remote::DiscordRoleGateway;
use crate::render::LinearGradientRenderer;
use crate::transport::DiscordBot;
use crate::transport::discord::http_client::DiscordHttpClient;

/// Everything a command needs, built once from the config.
pub struct Services {
    pub http: Arc<DiscordHttpClient>,
    pub registry: Arc<dyn RoleRegistry>,
    pub manager: Arc<LifecycleManager>,
}

impl Services {
    pub async fn build(config: &Config) -> Result<Self> {
        let http = Arc::new(DiscordHttpClient::new(config.discord.bot_token.clone()));
        let registry = create_registry(&config.registry, &config.data_dir).await?;
        let gateway = Arc::new(DiscordRoleGateway::new(Arc::clone(&http)));
        let manager = Arc::new(
            LifecycleManager::new(Arc::clone(&registry), gateway)
                .with_name_prefix(config.roles.name_prefix.clone()),
        );
        Ok(Self {
            http,
            registry,
            manager,
        })
    }

    pub fn bot(&self, config: &Config) -> Result<DiscordBot> {
        let renderer = LinearGradientRenderer::new(config.preview.width, config.preview.height)
            .context("invalid preview size")?;
        let handler = InteractionHandler::new(Arc::clone(&self.manager), Arc::new(renderer));
        Ok(DiscordBot::new(
            config.discord.clone(),
            config.locale.clone(),
            Arc::clone(&self.http),
            Arc::new(handler),
        ))
    }
}
