//! CLI command implementations

use std::path::PathBuf;

use clap::Subcommand;
use peerwatch_catalog::listing::{self, Entry};
use peerwatch_catalog::{CatalogService, InstanceDirectory};
use peerwatch_core::{PeerwatchConfig, Preferences};

use crate::errors::CliError;
use crate::play;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List videos on the selected instance
    List {
        /// Index of the first video to show
        #[arg(long, default_value = "0")]
        start: u64,
    },
    /// Search videos on the selected instance
    Search {
        /// Keywords to search for
        #[arg(required = true)]
        keywords: Vec<String>,
        /// Index of the first result to show
        #[arg(long, default_value = "0")]
        start: u64,
    },
    /// Browse known PeerTube instances
    Instances {
        /// Index of the first instance to show
        #[arg(long, default_value = "0")]
        start: u64,
    },
    /// Make an instance the preferred one
    SelectSource {
        /// Host name or URL of the instance
        host: String,
    },
    /// Play a video while downloading it
    Play {
        /// Video id or UUID
        id: String,
        /// Instance hosting the video, instead of the preferred one
        #[arg(long)]
        source: Option<String>,
    },
}

/// Shared state for command handlers.
#[derive(Debug)]
pub struct Context {
    pub config: PeerwatchConfig,
    pub preferences: Preferences,
    pub preferences_path: Option<PathBuf>,
    /// Offline mode: demo catalog and simulated engine
    pub demo: bool,
}

impl Context {
    /// Catalog for `source`, or the preferred instance.
    ///
    /// # Errors
    /// - `CliError::Catalog` - HTTP client could not be built
    pub fn catalog(&self, source: Option<&str>) -> Result<CatalogService, CliError> {
        if self.demo {
            return Ok(CatalogService::demo(&self.preferences));
        }
        Ok(CatalogService::for_instance(
            &self.preferences,
            source,
            &self.config.catalog,
        )?)
    }
}

/// Handle the CLI command. No command shows the home menu.
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Option<Commands>, ctx: &mut Context) -> Result<(), CliError> {
    match command {
        None => {
            show_home(ctx);
            Ok(())
        }
        Some(Commands::List { start }) => list_videos(ctx, start).await,
        Some(Commands::Search { keywords, start }) => {
            search_videos(ctx, &keywords.join(" "), start).await
        }
        Some(Commands::Instances { start }) => browse_instances(ctx, start).await,
        Some(Commands::SelectSource { host }) => select_source(ctx, &host),
        Some(Commands::Play { id, source }) => play::play_video(ctx, &id, source.as_deref()).await,
    }
}

fn show_home(ctx: &Context) {
    println!("Peerwatch");
    println!("{:-<60}", "");
    println!("Selected instance: {}", ctx.preferences.preferred_instance);
    println!();
    for (entry, usage) in listing::home_entries().iter().zip([
        "peerwatch list",
        "peerwatch search <keywords>",
        "peerwatch instances",
    ]) {
        println!("  {:<45} {}", entry.label, usage);
    }
    println!();
    println!("Use 'peerwatch play <id>' to watch a video.");
}

/// List videos on the selected instance
///
/// # Errors
/// - `CliError::Catalog` - Catalog request failed
pub async fn list_videos(ctx: &Context, start: u64) -> Result<(), CliError> {
    let catalog = ctx.catalog(None)?;
    let page = catalog.list(start).await?;

    println!("Videos on {}", catalog.source());
    println!("{:-<60}", "");
    if page.items.is_empty() {
        println!("No videos on this page.");
        return Ok(());
    }
    print_entries(&listing::video_entries(&page, catalog.page_size()));
    Ok(())
}

/// Search videos on the selected instance
///
/// # Errors
/// - `CliError::Catalog` - Catalog request failed or nothing matched
pub async fn search_videos(ctx: &Context, keywords: &str, start: u64) -> Result<(), CliError> {
    let catalog = ctx.catalog(None)?;
    let page = catalog.search(keywords, start).await?;

    println!("Results for '{}' on {}", keywords, catalog.source());
    println!("{:-<60}", "");
    print_entries(&listing::video_entries(&page, catalog.page_size()));
    Ok(())
}

/// Browse known instances
///
/// # Errors
/// - `CliError::Catalog` - Directory request failed
pub async fn browse_instances(ctx: &Context, start: u64) -> Result<(), CliError> {
    let directory = InstanceDirectory::new(&ctx.config.catalog)?;
    let page_size = ctx.preferences.items_per_page;
    let page = directory.list_instances(start, page_size).await?;

    println!("PeerTube instances");
    println!("{:-<60}", "");
    print_entries(&listing::instance_entries(&page, page_size));
    println!("\nUse 'peerwatch select-source <host>' to browse an instance.");
    Ok(())
}

/// Persist `host` as the preferred instance
///
/// # Errors
/// - `CliError::NoPreferencesPath` - No place to store preferences
/// - `CliError::Core` - Preferences could not be written
pub fn select_source(ctx: &mut Context, host: &str) -> Result<(), CliError> {
    let path = ctx
        .preferences_path
        .clone()
        .ok_or(CliError::NoPreferencesPath)?;

    ctx.preferences.set_preferred_instance(host);
    ctx.preferences.save(&path)?;

    println!("{} is now the selected instance", ctx.preferences.preferred_instance);
    Ok(())
}

fn print_entries(entries: &[Entry]) {
    for entry in entries {
        println!("{entry}");
        if let Some(detail) = &entry.detail {
            for line in detail.lines().filter(|line| !line.trim().is_empty()).take(3) {
                println!("    {line}");
            }
        }
    }
}
