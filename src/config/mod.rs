mod env_overrides;
mod loader;
mod locale;
mod schema;
#[cfg(test)]
mod test_env;

pub use locale::{SUPPORTED_LOCALES, normalise_locale, resolve_locale};
pub use schema::{
    Config, DiscordConfig, PreviewConfig, RegistryConfig, ReliabilityConfig, RolesConfig,
};
