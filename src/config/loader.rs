use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

use crate::render::linear::MAX_DIMENSION as MAX_PREVIEW_SIDE;

const CONFIG_DIR_NAME: &str = ".gradient-roles";
const CONFIG_FILE_NAME: &str = "config.toml";

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let config_dir = home.join(CONFIG_DIR_NAME);

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .context("Failed to create .gradient-roles directory")?;
        }

        Self::load_from(&config_dir.join(CONFIG_FILE_NAME))
    }

    /// Load `path`, writing a default config there when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let data_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut config = if path.exists() {
            let contents = fs::read_to_string(path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = path.to_path_buf();
            config.data_dir = data_dir;
            config
        } else {
            let config = Self {
                config_path: path.to_path_buf(),
                data_dir,
                ..Self::default()
            };
            config.save()?;
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let preview = &self.preview;
        anyhow::ensure!(
            (1..=MAX_PREVIEW_SIDE).contains(&preview.width)
                && (1..=MAX_PREVIEW_SIDE).contains(&preview.height),
            "preview size {}x{} must be within 1..={MAX_PREVIEW_SIDE} on each side",
            preview.width,
            preview.height
        );
        anyhow::ensure!(
            !self.roles.name_prefix.trim().is_empty(),
            "roles.name_prefix must not be empty"
        );
        Ok(())
    }

    /// Checks that only matter when connecting to Discord.
    pub fn validate_for_run(&self) -> Result<()> {
        anyhow::ensure!(
            !self.discord.bot_token.trim().is_empty(),
            "discord.bot_token is empty; set it in {} or via GRADIENT_ROLES_TOKEN",
            self.config_path.display()
        );
        Ok(())
    }
}
