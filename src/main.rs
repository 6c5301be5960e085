//! Guvnahbot - Governance Information Bot
//!
//! Answers questions about project teams in chat:
//! - `?PTL` / `?CHANNEL` / `?MISSION` / `?TAGS` for a team or repository
//! - `?REPOS` lists a team's repositories
//! - `?WHOIS` names the team owning a repository
//!
//! Team data comes from the governance `projects.yaml`; release liaisons from
//! the cross-project liaisons wiki page, fetched on first use.

mod commands;
mod config;
mod console;
mod error;
mod governance;
mod irc;
mod source;
mod state;

use crate::commands::CommandDispatcher;
use crate::config::{LogFormat, Settings};
use crate::governance::LiaisonCache;
use crate::irc::{FloodControl, IrcBot};
use crate::source::HttpSource;
use crate::state::{spawn_refresh_task, GovernanceState};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Governance information bot
#[derive(Parser, Debug)]
#[command(name = "guvnahbot", version, about)]
struct Cli {
    /// Config file (JSON, TOML or YAML)
    config: Option<PathBuf>,

    /// Read commands from stdin instead of connecting to IRC
    #[arg(long)]
    console: bool,

    /// Channel name the console reports to the dispatcher
    #[arg(long, default_value = "#openstack-release")]
    channel: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    init_tracing(&settings);

    info!("Starting guvnahbot...");
    info!("Team data: {}", settings.sources.projects_url);

    let source = Arc::new(HttpSource::new(
        settings.sources.fetch_timeout(),
        settings.sources.liaison_section.clone(),
    )?);
    let liaisons = LiaisonCache::new(source.clone(), settings.sources.liaison_url.clone());
    let state = Arc::new(
        GovernanceState::load(source, settings.sources.projects_url.clone(), liaisons).await?,
    );
    info!("Loaded {} teams", state.snapshot().await.len());

    let refresh = settings
        .refresh_interval()
        .map(|interval| {
            info!("Refreshing team data every {}s", interval.as_secs());
            spawn_refresh_task(state.clone(), interval)
        });

    let dispatcher = CommandDispatcher::new(state);

    if cli.console {
        tokio::select! {
            result = console::run_stdio(&dispatcher, &cli.channel) => result?,
            _ = shutdown_signal() => {},
        }
    } else {
        if settings.irc.channels.is_empty() {
            warn!("No channels configured, the bot will not join any");
        }
        let bot = IrcBot::new(
            settings.irc.clone(),
            FloodControl::from(&settings.flood),
            dispatcher,
        );
        tokio::select! {
            _ = bot.run() => {},
            _ = shutdown_signal() => {},
        }
    }

    if let Some(handle) = refresh {
        handle.abort();
    }
    info!("Shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing(settings: &Settings) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    match settings.log_format {
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
