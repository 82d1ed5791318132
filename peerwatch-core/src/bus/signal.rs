//! Payloads carried over the signal bus.

use std::path::PathBuf;

use crate::fetch::FetchControl;
use crate::locator::Locator;

/// Well-known topic names.
///
/// Topics are free-form strings; these are the ones the built-in actors
/// publish and subscribe to.
pub mod topics {
    /// Orchestrator asks the fetch service to start retrieving a locator.
    pub const START_DOWNLOAD: &str = "start_download";
    /// Bridge asks the fetch service to pause a locator.
    pub const PAUSE_DOWNLOAD: &str = "pause_download";
    /// Request to resume a paused locator.
    pub const RESUME_DOWNLOAD: &str = "resume_download";
    /// Engine announces enough data for sequential playback.
    pub const CONTENT_READY: &str = "content_ready";
    /// Engine reports a hard failure before readiness.
    pub const FETCH_FAILED: &str = "fetch_failed";
    /// Engine finished retrieving the whole object.
    pub const FETCH_COMPLETED: &str = "fetch_completed";
    /// Orchestrator broadcasts the session it handed to the playback sink.
    pub const FETCH_SESSION: &str = "fetch_session";
    /// Playback sink started rendering frames.
    pub const STREAM_STARTED: &str = "stream_started";
    /// Playback sink stopped.
    pub const PLAYBACK_STOPPED: &str = "playback_stopped";
    /// Bridge stopped tracking a session.
    pub const PLAYBACK_RELEASED: &str = "playback_released";
}

/// Event published on the bus.
#[derive(Debug, Clone)]
pub enum Signal {
    StartDownload {
        locator: Locator,
        destination: PathBuf,
    },
    PauseDownload {
        locator: Locator,
    },
    ResumeDownload {
        locator: Locator,
    },
    ContentReady {
        locator: Locator,
        local_path: PathBuf,
    },
    FetchFailed {
        locator: Locator,
        reason: String,
    },
    FetchCompleted {
        locator: Locator,
    },
    FetchSessionBegan {
        locator: Locator,
        /// What the playback sink was handed for this session
        media: String,
        control: FetchControl,
    },
    StreamStarted {
        media: String,
    },
    PlaybackStopped {
        /// `None` when the sink cannot tell what it was playing
        media: Option<String>,
    },
    PlaybackReleased {
        locator: Locator,
        paused: bool,
    },
}

impl Signal {
    /// Topic this signal is conventionally published on.
    pub fn topic(&self) -> &'static str {
        match self {
            Signal::StartDownload { .. } => topics::START_DOWNLOAD,
            Signal::PauseDownload { .. } => topics::PAUSE_DOWNLOAD,
            Signal::ResumeDownload { .. } => topics::RESUME_DOWNLOAD,
            Signal::ContentReady { .. } => topics::CONTENT_READY,
            Signal::FetchFailed { .. } => topics::FETCH_FAILED,
            Signal::FetchCompleted { .. } => topics::FETCH_COMPLETED,
            Signal::FetchSessionBegan { .. } => topics::FETCH_SESSION,
            Signal::StreamStarted { .. } => topics::STREAM_STARTED,
            Signal::PlaybackStopped { .. } => topics::PLAYBACK_STOPPED,
            Signal::PlaybackReleased { .. } => topics::PLAYBACK_RELEASED,
        }
    }

    /// Locator the signal refers to, if any.
    pub fn locator(&self) -> Option<&Locator> {
        match self {
            Signal::StartDownload { locator, .. }
            | Signal::PauseDownload { locator }
            | Signal::ResumeDownload { locator }
            | Signal::ContentReady { locator, .. }
            | Signal::FetchFailed { locator, .. }
            | Signal::FetchCompleted { locator }
            | Signal::FetchSessionBegan { locator, .. }
            | Signal::PlaybackReleased { locator, .. } => Some(locator),
            Signal::StreamStarted { .. } | Signal::PlaybackStopped { .. } => None,
        }
    }
}
