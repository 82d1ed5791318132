//! Actor that owns the torrent engine.
//!
//! The engine is only ever touched from this actor's task. Start, pause and
//! resume requests arrive as bus signals, so the orchestrator and the
//! playback bridge can come and go without coordinating with it.

use tokio::task::JoinHandle;

use super::FetchEngine;
use crate::bus::{Signal, SignalBus, Subscription, topics};

/// Handle to a running fetch service.
#[derive(Debug)]
pub struct FetchServiceHandle {
    task: JoinHandle<()>,
}

impl FetchServiceHandle {
    /// Checks whether the service task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the service. Fetches already handed to the engine are left to
    /// the engine's own lifecycle.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Spawns the fetch service actor and returns its handle.
///
/// Subscriptions are registered before this function returns, so requests
/// published right afterwards are not lost.
pub fn spawn_fetch_service<E>(bus: SignalBus, engine: E) -> FetchServiceHandle
where
    E: FetchEngine + 'static,
{
    let requests = bus.subscribe_channel(&[
        topics::START_DOWNLOAD,
        topics::PAUSE_DOWNLOAD,
        topics::RESUME_DOWNLOAD,
    ]);

    let task = tokio::spawn(async move {
        run_service_loop(bus, engine, requests).await;
    });

    FetchServiceHandle { task }
}

async fn run_service_loop<E: FetchEngine>(
    bus: SignalBus,
    mut engine: E,
    mut requests: Subscription,
) {
    tracing::debug!("Fetch service started, waiting for signals");

    while let Ok(signal) = requests.recv().await {
        handle_request(&bus, &mut engine, signal).await;
    }

    tracing::debug!("Fetch service stopped");
}

async fn handle_request<E: FetchEngine>(bus: &SignalBus, engine: &mut E, signal: Signal) {
    match signal {
        Signal::StartDownload {
            locator,
            destination,
        } => {
            tracing::info!("Starting fetch of {} into {}", locator, destination.display());
            if let Err(e) = engine.begin_fetch(&locator, &destination).await {
                tracing::error!("Could not start fetch of {}: {}", locator, e);
                bus.emit(Signal::FetchFailed {
                    locator,
                    reason: e.to_string(),
                });
            }
        }

        Signal::PauseDownload { locator } => {
            tracing::info!("Pausing fetch of {}", locator);
            if let Err(e) = engine.pause(&locator).await {
                tracing::warn!("Could not pause {}: {}", locator, e);
            }
        }

        Signal::ResumeDownload { locator } => {
            tracing::info!("Resuming fetch of {}", locator);
            if let Err(e) = engine.resume(&locator).await {
                tracing::warn!("Could not resume {}: {}", locator, e);
            }
        }

        other => {
            tracing::trace!("Fetch service ignoring {}", other.topic());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::fetch::{EngineCall, FetchControl, SimulatedFetchEngine, SimulatedOutcome};
    use crate::locator::Locator;

    #[tokio::test]
    async fn test_start_request_reaches_engine() {
        let bus = SignalBus::new();
        let dir = tempfile::tempdir().unwrap();
        let engine =
            SimulatedFetchEngine::new(bus.clone(), Duration::ZERO, SimulatedOutcome::Ready);
        let journal = engine.journal();
        let mut ready = bus.subscribe_channel(&[topics::CONTENT_READY]);

        let service = spawn_fetch_service(bus.clone(), engine);
        let locator = Locator::new("magnet:?xt=urn:btih:abc");
        bus.emit(Signal::StartDownload {
            locator: locator.clone(),
            destination: dir.path().join("abc"),
        });

        let signal = tokio::time::timeout(Duration::from_secs(2), ready.recv())
            .await
            .unwrap()
            .unwrap();
        match signal {
            Signal::ContentReady { locator: ready, local_path } => {
                assert_eq!(ready, locator);
                assert!(local_path.starts_with(dir.path()));
            }
            other => panic!("unexpected signal {other:?}"),
        }

        assert_eq!(journal.calls(), vec![EngineCall::Begin(locator)]);
        assert!(service.is_running());
        service.shutdown();
    }

    #[tokio::test]
    async fn test_engine_start_error_becomes_failure_signal() {
        let bus = SignalBus::new();
        let engine = SimulatedFetchEngine::new(
            bus.clone(),
            Duration::ZERO,
            SimulatedOutcome::RefuseToStart("no client installed".to_string()),
        );
        let mut failures = bus.subscribe_channel(&[topics::FETCH_FAILED]);
        let _service = spawn_fetch_service(bus.clone(), engine);

        bus.emit(Signal::StartDownload {
            locator: Locator::new("loc"),
            destination: PathBuf::from("/nonexistent"),
        });

        let signal = tokio::time::timeout(Duration::from_secs(2), failures.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            signal,
            Signal::FetchFailed { reason, .. } if reason.contains("no client installed")
        ));
    }

    #[tokio::test]
    async fn test_control_handle_pauses_and_resumes() {
        let bus = SignalBus::new();
        let engine =
            SimulatedFetchEngine::new(bus.clone(), Duration::ZERO, SimulatedOutcome::Silent);
        let journal = engine.journal();
        let _service = spawn_fetch_service(bus.clone(), engine);

        let control = FetchControl::new(bus.clone(), Locator::new("loc"));
        assert!(control.pause());
        assert!(control.resume());

        tokio::time::timeout(Duration::from_secs(2), async {
            while journal.calls().len() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(
            journal.calls(),
            vec![
                EngineCall::Pause(Locator::new("loc")),
                EngineCall::Resume(Locator::new("loc"))
            ]
        );
    }
}
