use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `gradient-roles` - random gradient roles for Discord servers.
#[derive(Parser, Debug)]
#[command(name = "gradient-roles")]
#[command(version)]
#[command(about = "Discord bot that creates and manages two-color gradient roles.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.gradient-roles/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to Discord and serve slash commands until interrupted
    Run,

    /// Inspect and clean up tracked gradient roles
    Roles {
        #[command(subcommand)]
        roles_command: RolesCommands,
    },

    /// Manage slash command registration
    Commands {
        #[command(subcommand)]
        commands_command: CommandsCommands,
    },

    /// Copy roles from a legacy db.json document into the configured registry
    ImportLegacy {
        /// Path to the db.json file
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum RolesCommands {
    /// List tracked roles of a server
    List {
        #[arg(long)]
        server: String,
    },
    /// Delete one tracked role, or one left behind by a failed commit
    Delete {
        #[arg(long)]
        server: String,
        #[arg(long)]
        role: String,
    },
    /// Delete tracked roles nobody holds and forget roles that no longer exist
    Clear {
        #[arg(long)]
        server: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CommandsCommands {
    /// Upload /random, /list, /delete, /clear and /nocolor
    Register,
}
