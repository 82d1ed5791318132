//! Playback sink integration and the lifecycle bridge.

pub mod bridge;
pub mod player;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_mocks;

use async_trait::async_trait;
pub use bridge::{
    BridgeHandle, PlaybackLifecycleBridge, PlaybackState, TrackedFetch, spawn_playback_bridge,
};
pub use player::CommandPlayer;
use serde::{Deserialize, Serialize};

/// Errors raised by playback sinks.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Playback sink unavailable: {reason}")]
    SinkUnavailable { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Host media player.
///
/// Sinks report their lifecycle on the bus they were built with:
/// `StreamStarted` once frames are rendered and `PlaybackStopped` when
/// playback ends for any reason.
#[async_trait]
pub trait PlaybackSink: Send {
    /// Begins rendering `media`, a local path or stream URI. Returns once
    /// playback has been handed off.
    ///
    /// # Errors
    /// - `PlaybackError::SinkUnavailable` - Player cannot be started
    async fn play(&mut self, media: &str) -> Result<(), PlaybackError>;
}

/// Yes/no question asked through the user interface.
#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    /// Returns `true` when the user confirms.
    async fn confirm(&self, title: &str, message: &str) -> bool;
}

/// What to do when playback stops before any frame was rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopBeforeStartPolicy {
    /// Ask the user whether to pause the fetch
    #[default]
    Ask,
    /// Pause without asking
    AlwaysPause,
    /// Keep fetching without asking
    NeverPause,
}
