use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use super::wiring::Services;
use crate::cli::{Cli, Commands, CommandsCommands, RolesCommands};
use crate::config::Config;
use crate::lifecycle::candidate::hex;
use crate::registry::import_document;
use crate::registry::json::RegistryDocument;
use crate::transport::{Listener, backoff_settings, spawn_supervised};

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    config.apply_locale();
    match cli.command {
        Commands::Run => run(&config).await,
        Commands::Roles { roles_command } => roles(&config, roles_command).await,
        Commands::Commands {
            commands_command: CommandsCommands::Register,
        } => {
            config.validate_for_run()?;
            let services = Services::build(&config).await?;
            services.bot(&config)?.register_commands().await
        }
        Commands::ImportLegacy { path } => import_legacy(&config, &path).await,
    }
}

async fn run(config: &Config) -> Result<()> {
    config.validate_for_run()?;
    let services = Services::build(config).await?;
    let bot: Arc<dyn Listener> = Arc::new(services.bot(config)?);

    let (initial, max) = backoff_settings(&config.reliability);
    tracing::info!(
        backend = services.registry.name(),
        locale = %config.locale,
        "starting gradient role bot"
    );
    let listener = spawn_supervised(bot, initial, max);

    tokio::signal::ctrl_c()
        .await
        .context("wait for shutdown signal")?;
    tracing::info!("shutting down");
    listener.abort();
    Ok(())
}

async fn roles(config: &Config, command: RolesCommands) -> Result<()> {
    match command {
        RolesCommands::List { server } => {
            let services = Services::build(config).await?;
            let roles = services.manager.list_roles(&server).await?;
            let orphans = services.manager.orphans_of(&server).await?;
            if roles.is_empty() {
                println!("No gradient roles tracked for server {server}.");
            } else {
                println!("Gradient roles for server {server} ({}):", roles.len());
                for role in roles {
                    println!(
                        "  {}  {} -> {}",
                        role.role_id,
                        hex(role.primary_color),
                        hex(role.secondary_color)
                    );
                }
            }
            if !orphans.is_empty() {
                println!("Roles left behind by failed commits ({}):", orphans.len());
                for role_id in orphans {
                    println!("  {role_id}");
                }
            }
            Ok(())
        }
        RolesCommands::Delete { server, role } => {
            config.validate_for_run()?;
            let services = Services::build(config).await?;
            if services.manager.delete_one(&server, &role).await? {
                println!("Deleted role {role}.");
            } else {
                println!("Role {role} is neither tracked nor orphaned on server {server}; nothing to do.");
            }
            Ok(())
        }
        RolesCommands::Clear { server } => {
            config.validate_for_run()?;
            let services = Services::build(config).await?;
            let report = services.manager.clear_unused(&server).await?;
            println!(
                "Deleted {} unused role(s), forgot {} missing role(s).",
                report.deleted.len(),
                report.reconciled.len()
            );
            for (role_id, error) in &report.failed {
                println!("  skipped {role_id}: {error}");
            }
            Ok(())
        }
    }
}

async fn import_legacy(config: &Config, path: &Path) -> Result<()> {
    anyhow::ensure!(path.exists(), "legacy document {} not found", path.display());
    let document = RegistryDocument::load(path)
        .await
        .with_context(|| format!("read legacy document {}", path.display()))?;
    let services = Services::build(config).await?;
    let summary = import_document(services.registry.as_ref(), &document).await?;
    println!(
        "Imported {} role(s) and {} orphan(s) into the {} registry, skipped {}.",
        summary.imported,
        summary.orphans,
        services.registry.name(),
        summary.skipped
    );
    Ok(())
}
