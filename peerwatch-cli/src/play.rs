//! `play` command: fetch a video over BitTorrent while watching it.

use std::sync::Arc;

use peerwatch_core::fetch::{
    FetchServiceHandle, ProcessFetchEngine, SimulatedFetchEngine, SimulatedOutcome,
    spawn_fetch_service,
};
use peerwatch_core::playback::{CommandPlayer, spawn_playback_bridge};
use peerwatch_core::{Locator, Orchestrator, PlaybackSource, SignalBus, WatchEnd};

use crate::commands::Context;
use crate::errors::CliError;
use crate::prompt::StdinPrompt;

/// Resolves, fetches and plays the video `id`.
///
/// # Errors
/// - `CliError::Catalog` - Video lookup failed
/// - `CliError::Core` - No rendition, engine or player unavailable, fetch failed
pub async fn play_video(ctx: &Context, id: &str, source: Option<&str>) -> Result<(), CliError> {
    let catalog = ctx.catalog(source)?;
    let renditions = catalog.renditions(id).await?;
    let preferred = ctx.preferences.preferred_tier;

    let bus = SignalBus::new();
    let player = CommandPlayer::new(bus.clone(), ctx.config.player.clone());
    let mut orchestrator = Orchestrator::new(bus.clone(), ctx.config.fetch.clone(), player);

    let locator = match renditions.resolve(preferred)? {
        PlaybackSource::Live(uri) => {
            println!("Streaming live video {id}");
            orchestrator.play_live(uri).await?;
            orchestrator.wait_for_stop(uri.as_str(), interrupted()).await;
            return Ok(());
        }
        PlaybackSource::Fetch(locator) => locator.clone(),
    };

    let service = spawn_engine(ctx, &bus)?;
    let bridge = spawn_playback_bridge(
        bus.clone(),
        Arc::new(StdinPrompt),
        ctx.preferences.pause_prompt,
    );

    let outcome = watch(&mut orchestrator, locator).await;

    bridge.shutdown();
    service.shutdown();
    outcome
}

async fn watch(
    orchestrator: &mut Orchestrator<CommandPlayer>,
    locator: Locator,
) -> Result<(), CliError> {
    println!("Downloading {locator}");
    println!("  Waiting for enough data to start playback (Ctrl-C to give up)...");

    let local_path = orchestrator
        .play_fetched(locator.clone(), interrupted())
        .await?;
    println!("Playing {}", local_path.display());

    match orchestrator.wait_for_release(&locator, interrupted()).await {
        WatchEnd::Released { paused: true } => {
            println!("Playback finished, download paused");
            Ok(())
        }
        WatchEnd::Released { paused: false } => {
            println!("Playback finished, download continues in the background");
            println!("  Press Ctrl-C to stop");
            report_completion(orchestrator.wait_for_completion(&locator, interrupted()).await);
            Ok(())
        }
        WatchEnd::Failed { reason } => {
            println!("Download failed: {reason}");
            Ok(())
        }
        WatchEnd::Interrupted => {
            println!("Interrupted");
            Ok(())
        }
        end @ (WatchEnd::Completed | WatchEnd::Stopped) => {
            tracing::debug!("Unexpected end while waiting for release: {:?}", end);
            Ok(())
        }
    }
}

fn report_completion(end: WatchEnd) {
    match end {
        WatchEnd::Completed => println!("Download complete"),
        WatchEnd::Failed { reason } => println!("Download failed: {reason}"),
        _ => println!("Stopped"),
    }
}

fn spawn_engine(ctx: &Context, bus: &SignalBus) -> Result<FetchServiceHandle, CliError> {
    if ctx.demo || ctx.config.engine.simulated {
        tracing::info!("Using the simulated torrent engine");
        let engine = SimulatedFetchEngine::new(
            bus.clone(),
            ctx.config.engine.simulated_ready_delay,
            SimulatedOutcome::Ready,
        );
        return Ok(spawn_fetch_service(bus.clone(), engine));
    }

    let engine = ProcessFetchEngine::new(bus.clone(), &ctx.config.engine, &ctx.config.fetch)?;
    Ok(spawn_fetch_service(bus.clone(), engine))
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}
