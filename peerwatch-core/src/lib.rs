//! Peerwatch Core - Swarm-fetched video playback plumbing
//!
//! This crate provides the building blocks for watching videos that are
//! fetched over BitTorrent while they play: quality-tier selection, a
//! topic-keyed signal bus, fetch coordination with readiness timeouts, the
//! bridge that pauses fetches when playback ends, and the flow tying them
//! together.

pub mod bus;
pub mod config;
pub mod fetch;
pub mod locator;
pub mod orchestrator;
pub mod playback;
pub mod preferences;
pub mod rendition;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use bus::{BusError, Signal, SignalBus, Subscription, SubscriptionHandle, topics};
pub use config::PeerwatchConfig;
pub use fetch::{FetchControl, FetchCoordinator, FetchEngine, FetchError, FetchHandle, FetchState};
pub use locator::Locator;
pub use orchestrator::{Orchestrator, WatchEnd};
pub use playback::{
    ConfirmPrompt, PlaybackError, PlaybackLifecycleBridge, PlaybackSink, StopBeforeStartPolicy,
};
pub use preferences::{Preferences, PreferencesError, VideoFilter, instance_url};
pub use rendition::{ObjectRenditions, PlaybackSource, Rendition, SelectionError, Tier, select};

/// Core errors that can bubble up from any Peerwatch subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PeerwatchError {
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Signal bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Preferences error: {0}")]
    Preferences(#[from] PreferencesError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PeerwatchError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            PeerwatchError::Selection(SelectionError::NoRenditionAvailable) => {
                "This video has no playable file".to_string()
            }
            PeerwatchError::Fetch(e) => match e {
                FetchError::FetchTimeout { waited, .. } => format!(
                    "Download did not start within {} seconds",
                    waited.as_secs()
                ),
                FetchError::FetchFailed { reason, .. } => format!("Download failed: {reason}"),
                FetchError::EngineUnavailable { reason } => {
                    format!("No torrent client available: {reason}")
                }
                FetchError::Cancelled { .. } => "Download cancelled".to_string(),
                _ => "Download error occurred".to_string(),
            },
            PeerwatchError::Playback(PlaybackError::SinkUnavailable { reason }) => {
                format!("Cannot start the player: {reason}")
            }
            PeerwatchError::Playback(_) => "Playback error occurred".to_string(),
            PeerwatchError::Bus(_) => "Internal messaging stopped".to_string(),
            PeerwatchError::Preferences(PreferencesError::InvalidValue { key, value }) => {
                format!("Invalid setting {key}: '{value}'")
            }
            PeerwatchError::Preferences(_) => "Could not read preferences".to_string(),
            PeerwatchError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input or local setup.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PeerwatchError::Preferences(PreferencesError::InvalidValue { .. })
                | PeerwatchError::Preferences(PreferencesError::Parse { .. })
                | PeerwatchError::Fetch(FetchError::EngineUnavailable { .. })
                | PeerwatchError::Playback(PlaybackError::SinkUnavailable { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, PeerwatchError>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_timeout_message_mentions_seconds() {
        let error = PeerwatchError::from(FetchError::FetchTimeout {
            locator: Locator::new("loc"),
            waited: Duration::from_secs(10),
        });
        assert_eq!(error.user_message(), "Download did not start within 10 seconds");
        assert!(!error.is_user_error());
    }

    #[test]
    fn test_missing_engine_is_user_error() {
        let error = PeerwatchError::from(FetchError::EngineUnavailable {
            reason: "'aria2c' was not found in PATH".to_string(),
        });
        assert!(error.is_user_error());
        assert!(error.user_message().contains("aria2c"));
    }
}
