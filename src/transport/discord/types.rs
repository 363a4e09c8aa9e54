//! Discord API constants and type definitions.

/// Discord API base URL (v10).
pub const API_BASE: &str = "https://discord.com/api/v10";

/// Guild events plus the privileged member list needed to count holders.
pub const DEFAULT_INTENTS: u64 = intents::GUILDS | intents::GUILD_MEMBERS;

/// Heartbeat used when HELLO carries no interval, in milliseconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 41250;

/// Page size for `GET /guilds/{id}/members`.
pub const MEMBER_PAGE_LIMIT: usize = 1000;

/// Maximum options in a string select menu.
pub const MAX_SELECT_OPTIONS: usize = 25;

/// Message flag that hides a reply from everyone but the invoking user.
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

/// Gateway opcodes the bot sends or reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GatewayOpcode {
    Dispatch = 0,
    Heartbeat = 1,
    Identify = 2,
    Resume = 6,
    Reconnect = 7,
    InvalidSession = 9,
    Hello = 10,
    HeartbeatAck = 11,
}

impl GatewayOpcode {
    pub fn from_u64(value: u64) -> Option<Self> {
        Some(match value {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            6 => Self::Resume,
            7 => Self::Reconnect,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            _ => return None,
        })
    }
}

/// Interaction kinds that can reach the bot: slash commands and clicks on
/// the components it rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionType {
    ApplicationCommand,
    MessageComponent,
}

impl InteractionType {
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            2 => Some(Self::ApplicationCommand),
            3 => Some(Self::MessageComponent),
            _ => None,
        }
    }
}

/// Callback type acknowledging an interaction whose reply follows later.
pub const DEFERRED_CHANNEL_MESSAGE: u8 = 5;

/// Component types used in proposal prompts and role menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ComponentType {
    ActionRow = 1,
    Button = 2,
    StringSelect = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ButtonStyle {
    Success = 3,
    Danger = 4,
}

/// Individual intent bit flags.
pub mod intents {
    pub const GUILDS: u64 = 1 << 0;
    pub const GUILD_MEMBERS: u64 = 1 << 1;
}

/// Permission bit flags.
pub mod permissions {
    pub const MANAGE_ROLES: u64 = 1 << 28;
}
