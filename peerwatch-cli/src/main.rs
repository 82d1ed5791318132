//! Peerwatch CLI - Command-line interface
//!
//! Browse PeerTube instances and watch videos while they download.

mod commands;
mod errors;
mod play;
mod prompt;

use std::path::PathBuf;

use clap::Parser;
use peerwatch_core::tracing_setup::{CliLogLevel, init_tracing};
use peerwatch_core::{PeerwatchConfig, Preferences};

use crate::commands::Context;
use crate::errors::CliError;

#[derive(Parser)]
#[command(name = "peerwatch")]
#[command(about = "Watch PeerTube videos over BitTorrent")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<commands::Commands>,

    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    /// Directory receiving the full log of the last run
    #[arg(long)]
    logs_dir: Option<PathBuf>,

    /// Preferences file
    #[arg(long)]
    preferences: Option<PathBuf>,

    /// Use demo data and the simulated engine
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_file = init_tracing(cli.log_level.into(), cli.logs_dir.as_deref())?;
    tracing::debug!("Writing full log to {}", log_file.display());

    let preferences_path = cli.preferences.or_else(Preferences::default_path);
    let preferences = match &preferences_path {
        Some(path) => Preferences::load(path).map_err(CliError::from)?,
        None => Preferences::default(),
    };

    let mut ctx = Context {
        config: PeerwatchConfig::from_env(),
        preferences,
        preferences_path,
        demo: cli.demo,
    };

    if let Err(e) = commands::handle_command(cli.command, &mut ctx).await {
        if e.is_warning() {
            eprintln!("Warning: {}", e.user_message());
            return Ok(());
        }
        tracing::error!("{}", e);
        eprintln!("Error: {}", e.user_message());
        return Err(e.into());
    }

    Ok(())
}
