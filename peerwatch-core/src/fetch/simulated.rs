//! In-process torrent engine for development and tests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{FetchEngine, FetchError};
use crate::bus::{Signal, SignalBus};
use crate::locator::Locator;

// Enough bytes to look like the head of a media file
const PLACEHOLDER_LEN: usize = 64 * 1024;

/// How the simulated engine answers a fetch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedOutcome {
    /// Write a placeholder file and announce readiness
    Ready,
    /// Report a hard failure after the delay
    Fail(String),
    /// Reject the request outright
    RefuseToStart(String),
    /// Never announce anything
    Silent,
}

/// Engine operation recorded by [`SimulatedFetchEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Begin(Locator),
    Pause(Locator),
    Resume(Locator),
}

/// Shared record of engine calls, readable while the engine runs in its actor.
#[derive(Debug, Clone, Default)]
pub struct EngineJournal {
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl EngineJournal {
    /// Snapshot of all calls so far.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Number of pause requests received.
    pub fn pause_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, EngineCall::Pause(_)))
            .count()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }
}

/// Simulated engine that announces readiness after a fixed delay.
#[derive(Debug)]
pub struct SimulatedFetchEngine {
    bus: SignalBus,
    ready_delay: Duration,
    outcome: SimulatedOutcome,
    journal: EngineJournal,
    fetching: HashSet<Locator>,
}

impl SimulatedFetchEngine {
    /// Creates an engine publishing its announcements on `bus`.
    pub fn new(bus: SignalBus, ready_delay: Duration, outcome: SimulatedOutcome) -> Self {
        Self {
            bus,
            ready_delay,
            outcome,
            journal: EngineJournal::default(),
            fetching: HashSet::new(),
        }
    }

    /// Journal shared with this engine.
    pub fn journal(&self) -> EngineJournal {
        self.journal.clone()
    }
}

#[async_trait]
impl FetchEngine for SimulatedFetchEngine {
    async fn begin_fetch(
        &mut self,
        locator: &Locator,
        destination: &Path,
    ) -> Result<(), FetchError> {
        self.journal.record(EngineCall::Begin(locator.clone()));

        if let SimulatedOutcome::RefuseToStart(reason) = &self.outcome {
            return Err(FetchError::EngineUnavailable {
                reason: reason.clone(),
            });
        }

        self.fetching.insert(locator.clone());

        let bus = self.bus.clone();
        let locator = locator.clone();
        let destination = destination.to_path_buf();
        let delay = self.ready_delay;
        let outcome = self.outcome.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match outcome {
                SimulatedOutcome::Ready => match write_placeholder(&destination, &locator).await {
                    Ok(local_path) => {
                        tracing::debug!("Simulated content ready at {}", local_path.display());
                        bus.emit(Signal::ContentReady {
                            locator,
                            local_path,
                        });
                    }
                    Err(e) => {
                        bus.emit(Signal::FetchFailed {
                            locator,
                            reason: e.to_string(),
                        });
                    }
                },
                SimulatedOutcome::Fail(reason) => {
                    bus.emit(Signal::FetchFailed { locator, reason });
                }
                SimulatedOutcome::Silent | SimulatedOutcome::RefuseToStart(_) => {}
            }
        });

        Ok(())
    }

    async fn pause(&mut self, locator: &Locator) -> Result<(), FetchError> {
        self.journal.record(EngineCall::Pause(locator.clone()));
        if self.fetching.contains(locator) {
            Ok(())
        } else {
            Err(FetchError::UnknownLocator {
                locator: locator.clone(),
            })
        }
    }

    async fn resume(&mut self, locator: &Locator) -> Result<(), FetchError> {
        self.journal.record(EngineCall::Resume(locator.clone()));
        if self.fetching.contains(locator) {
            Ok(())
        } else {
            Err(FetchError::UnknownLocator {
                locator: locator.clone(),
            })
        }
    }
}

async fn write_placeholder(destination: &Path, locator: &Locator) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(destination).await?;
    let local_path = destination.join(format!("{}.mp4", locator.session_name()));
    tokio::fs::write(&local_path, vec![0u8; PLACEHOLDER_LEN]).await?;
    Ok(local_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::topics;

    #[tokio::test]
    async fn test_ready_outcome_writes_placeholder() {
        let bus = SignalBus::new();
        let dir = tempfile::tempdir().unwrap();
        let mut ready = bus.subscribe_channel(&[topics::CONTENT_READY]);
        let mut engine = SimulatedFetchEngine::new(
            bus.clone(),
            Duration::from_millis(10),
            SimulatedOutcome::Ready,
        );

        let locator = Locator::new("https://example.org/torrents/clip-360.torrent");
        engine.begin_fetch(&locator, dir.path()).await.unwrap();

        match ready.recv().await.unwrap() {
            Signal::ContentReady { local_path, .. } => {
                assert_eq!(local_path, dir.path().join("clip-360.mp4"));
                let metadata = tokio::fs::metadata(&local_path).await.unwrap();
                assert_eq!(metadata.len(), PLACEHOLDER_LEN as u64);
            }
            other => panic!("unexpected signal {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fail_outcome_reports_reason() {
        let bus = SignalBus::new();
        let mut failed = bus.subscribe_channel(&[topics::FETCH_FAILED]);
        let mut engine = SimulatedFetchEngine::new(
            bus.clone(),
            Duration::ZERO,
            SimulatedOutcome::Fail("tracker unreachable".to_string()),
        );

        engine
            .begin_fetch(&Locator::new("loc"), Path::new("/unused"))
            .await
            .unwrap();

        assert!(matches!(
            failed.recv().await.unwrap(),
            Signal::FetchFailed { reason, .. } if reason == "tracker unreachable"
        ));
    }

    #[tokio::test]
    async fn test_pause_unknown_locator_is_rejected_but_recorded() {
        let bus = SignalBus::new();
        let mut engine = SimulatedFetchEngine::new(bus, Duration::ZERO, SimulatedOutcome::Silent);
        let journal = engine.journal();

        let result = engine.pause(&Locator::new("never-started")).await;
        assert!(matches!(result, Err(FetchError::UnknownLocator { .. })));
        assert_eq!(journal.pause_count(), 1);
    }
}
