use super::Config;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) =
            std::env::var("GRADIENT_ROLES_TOKEN").or_else(|_| std::env::var("TOKEN"))
            && !token.is_empty()
        {
            self.discord.bot_token = token;
        }

        if let Ok(application_id) = std::env::var("GRADIENT_ROLES_APPLICATION_ID")
            && !application_id.is_empty()
        {
            self.discord.application_id = Some(application_id);
        }

        if let Ok(guild_id) = std::env::var("GRADIENT_ROLES_GUILD_ID")
            && !guild_id.is_empty()
        {
            self.discord.guild_id = Some(guild_id);
        }

        if let Ok(path) = std::env::var("GRADIENT_ROLES_REGISTRY_PATH")
            && !path.is_empty()
        {
            self.registry.path = Some(PathBuf::from(path));
        }

        if let Ok(locale) = std::env::var("GRADIENT_ROLES_LOCALE")
            && !locale.trim().is_empty()
        {
            self.locale = locale.trim().to_lowercase();
        }
    }
}
