//! Background fetching of swarm content.
//!
//! [`FetchCoordinator`] starts fetch sessions and waits for readiness,
//! [`spawn_fetch_service`] runs the actor that drives a [`FetchEngine`], and
//! [`FetchControl`] lets other actors pause or resume a fetch without knowing
//! where the engine lives. All three talk exclusively through the
//! [`SignalBus`](crate::bus::SignalBus).

pub mod coordinator;
pub mod process;
pub mod service;
pub mod simulated;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
pub use coordinator::{FetchCoordinator, FetchHandle, FetchSession, FetchState};
pub use process::ProcessFetchEngine;
pub use service::{FetchServiceHandle, spawn_fetch_service};
pub use simulated::{EngineCall, EngineJournal, SimulatedFetchEngine, SimulatedOutcome};

use crate::bus::{Signal, SignalBus};
use crate::locator::Locator;

/// Errors raised by fetch coordination and fetch engines.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Timed out after {waited:?} waiting for {locator}")]
    FetchTimeout { locator: Locator, waited: Duration },

    #[error("Fetch of {locator} failed: {reason}")]
    FetchFailed { locator: Locator, reason: String },

    #[error("Stopped waiting for {locator}")]
    Cancelled { locator: Locator },

    #[error("Session for {locator} is no longer awaiting readiness")]
    SessionClosed { locator: Locator },

    #[error("Torrent engine unavailable: {reason}")]
    EngineUnavailable { reason: String },

    #[error("No fetch running for {locator}")]
    UnknownLocator { locator: Locator },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Black-box torrent engine driven by the fetch service.
///
/// Engines report progress by publishing on the bus they were built with:
/// `ContentReady` once sequential playback is viable, `FetchFailed` on a hard
/// failure before that, and `FetchCompleted` when the object is complete.
#[async_trait]
pub trait FetchEngine: Send {
    /// Starts retrieving `locator` into `destination`. Returns once the
    /// retrieval runs in the background.
    ///
    /// # Errors
    /// - `FetchError::EngineUnavailable` - Engine cannot be started
    /// - `FetchError::Io` - Destination cannot be prepared
    async fn begin_fetch(&mut self, locator: &Locator, destination: &Path)
    -> Result<(), FetchError>;

    /// Suspends retrieval of `locator`.
    ///
    /// # Errors
    /// - `FetchError::UnknownLocator` - Nothing is fetching this locator
    async fn pause(&mut self, locator: &Locator) -> Result<(), FetchError>;

    /// Continues a paused retrieval.
    ///
    /// # Errors
    /// - `FetchError::UnknownLocator` - Nothing was fetching this locator
    async fn resume(&mut self, locator: &Locator) -> Result<(), FetchError>;
}

/// Bus-backed pause/resume handle for one fetch.
///
/// Carried inside the session broadcast so the playback bridge can control a
/// fetch it never started.
#[derive(Debug, Clone)]
pub struct FetchControl {
    bus: SignalBus,
    locator: Locator,
}

impl FetchControl {
    /// Creates a control handle for `locator`.
    pub fn new(bus: SignalBus, locator: Locator) -> Self {
        Self { bus, locator }
    }

    /// Locator this handle controls.
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Requests a pause. Returns `false` when no fetch service is listening.
    pub fn pause(&self) -> bool {
        self.bus.emit(Signal::PauseDownload {
            locator: self.locator.clone(),
        }) > 0
    }

    /// Requests a resume. Returns `false` when no fetch service is listening.
    pub fn resume(&self) -> bool {
        self.bus.emit(Signal::ResumeDownload {
            locator: self.locator.clone(),
        }) > 0
    }
}
