pub mod discord;
pub mod runtime;

pub use discord::DiscordBot;
pub use runtime::{Listener, backoff_settings, spawn_supervised};
