use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path the config was loaded from; computed, never persisted.
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Directory holding registry files; computed, never persisted.
    #[serde(skip)]
    pub data_dir: PathBuf,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub roles: RolesConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub reliability: ReliabilityConfig,
}

fn default_locale() -> String {
    "en".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            data_dir: PathBuf::new(),
            locale: default_locale(),
            discord: DiscordConfig::default(),
            registry: RegistryConfig::default(),
            roles: RolesConfig::default(),
            preview: PreviewConfig::default(),
            reliability: ReliabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub application_id: Option<String>,
    /// Register commands for a single guild instead of globally.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Gate `/delete` and `/clear` behind the Manage Roles permission.
    #[serde(default = "default_true")]
    pub manage_roles_only: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            application_id: None,
            guild_id: None,
            manage_roles_only: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// `sqlite`, `json` or `memory`.
    #[serde(default = "default_registry_backend")]
    pub backend: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_registry_backend() -> String {
    "sqlite".into()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: default_registry_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesConfig {
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

fn default_name_prefix() -> String {
    "Gradient".into()
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_preview_width")]
    pub width: u32,
    #[serde(default = "default_preview_height")]
    pub height: u32,
}

fn default_preview_width() -> u32 {
    800
}

fn default_preview_height() -> u32 {
    200
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: default_preview_width(),
            height: default_preview_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_channel_backoff_secs")]
    pub channel_initial_backoff_secs: u64,
    #[serde(default = "default_channel_backoff_max_secs")]
    pub channel_max_backoff_secs: u64,
}

fn default_channel_backoff_secs() -> u64 {
    2
}

fn default_channel_backoff_max_secs() -> u64 {
    60
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            channel_initial_backoff_secs: default_channel_backoff_secs(),
            channel_max_backoff_secs: default_channel_backoff_max_secs(),
        }
    }
}
