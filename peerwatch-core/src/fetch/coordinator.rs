//! Fetch session lifecycle: start, wait for readiness, hand out the path.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use super::{FetchControl, FetchError};
use crate::bus::{Signal, SignalBus, Subscription, topics};
use crate::config::FetchConfig;
use crate::locator::Locator;

/// Lifecycle of one fetch session.
///
/// `Ready`, `TimedOut` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Fetching,
    Ready,
    TimedOut,
    Failed,
}

/// One in-flight or finished background fetch.
#[derive(Debug, Clone)]
pub struct FetchSession {
    pub id: Uuid,
    pub locator: Locator,
    pub state: FetchState,
    pub ready_local_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
}

/// Handle returned by [`FetchCoordinator::start_fetch`].
///
/// Owns the session record and the readiness subscription. Dropping the
/// handle drops interest in the session's signals; the fetch itself keeps
/// running.
#[derive(Debug)]
pub struct FetchHandle {
    session: FetchSession,
    signals: Option<Subscription>,
}

impl FetchHandle {
    /// Current session record.
    pub fn session(&self) -> &FetchSession {
        &self.session
    }

    /// Locator being fetched.
    pub fn locator(&self) -> &Locator {
        &self.session.locator
    }

    /// Current session state.
    pub fn state(&self) -> FetchState {
        self.session.state
    }

    fn finish(&mut self, state: FetchState) {
        self.session.state = state;
        self.signals = None;
    }
}

enum WaitOutcome {
    Ready(PathBuf),
    Failed(String),
    TimedOut,
}

/// Owns the single active fetch session of an orchestrator.
///
/// Starting a new session supersedes the previous one without cancelling it:
/// waiters on the old handle keep waiting until their own timeout.
#[derive(Debug)]
pub struct FetchCoordinator {
    bus: SignalBus,
    config: FetchConfig,
    active: Option<Uuid>,
}

impl FetchCoordinator {
    /// Creates a coordinator publishing on `bus`.
    pub fn new(bus: SignalBus, config: FetchConfig) -> Self {
        Self {
            bus,
            config,
            active: None,
        }
    }

    /// Configured readiness bound.
    pub fn ready_timeout(&self) -> Duration {
        self.config.ready_timeout
    }

    /// Checks whether `handle` belongs to the active session.
    pub fn is_active(&self, handle: &FetchHandle) -> bool {
        self.active == Some(handle.session.id)
    }

    /// Starts a background fetch of `locator` and returns immediately.
    ///
    /// The readiness subscription is registered before the start request is
    /// published so an engine that answers instantly cannot be missed.
    pub fn start_fetch(&mut self, locator: Locator) -> FetchHandle {
        let mut session = FetchSession {
            id: Uuid::new_v4(),
            locator: locator.clone(),
            state: FetchState::Idle,
            ready_local_path: None,
            started_at: Utc::now(),
        };

        let signals = self
            .bus
            .subscribe_channel(&[topics::CONTENT_READY, topics::FETCH_FAILED]);

        if let Some(previous) = self.active.replace(session.id) {
            tracing::warn!(
                "Session {} superseded by {}; its waiters will time out",
                previous,
                session.id
            );
        }

        let destination = self.config.download_dir.join(locator.session_name());
        let listeners = self.bus.emit(Signal::StartDownload {
            locator: locator.clone(),
            destination,
        });
        if listeners == 0 {
            tracing::warn!("No fetch service listening for {}", locator);
        }

        session.state = FetchState::Fetching;
        tracing::info!("Fetch session {} started for {}", session.id, locator);

        FetchHandle {
            session,
            signals: Some(signals),
        }
    }

    /// Pause/resume handle for the fetch behind `handle`.
    pub fn control(&self, handle: &FetchHandle) -> FetchControl {
        FetchControl::new(self.bus.clone(), handle.session.locator.clone())
    }

    /// Waits until the fetch behind `handle` is playable.
    ///
    /// Returns the announced local path once a matching readiness signal has
    /// been seen and the grace delay has elapsed. Never waits on signals past
    /// `timeout`.
    ///
    /// # Errors
    /// - `FetchError::FetchTimeout` - No readiness signal within `timeout`
    /// - `FetchError::FetchFailed` - Engine reported a failure, or the bus closed
    /// - `FetchError::SessionClosed` - Handle already finished unsuccessfully
    pub async fn await_ready(
        &self,
        handle: &mut FetchHandle,
        timeout: Duration,
    ) -> Result<PathBuf, FetchError> {
        if handle.session.state == FetchState::Ready
            && let Some(path) = &handle.session.ready_local_path
        {
            return Ok(path.clone());
        }

        let locator = handle.session.locator.clone();
        let Some(signals) = handle.signals.as_mut() else {
            return Err(FetchError::SessionClosed { locator });
        };

        if !self.is_active_id(handle.session.id) {
            tracing::debug!("Waiting on superseded session {}", handle.session.id);
        }

        // Beyond the clock's range there is no deadline to honor
        let deadline = Instant::now().checked_add(timeout);
        let outcome = loop {
            let received = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, signals.recv()).await,
                None => Ok(signals.recv().await),
            };
            let signal = match received {
                Err(_) => break WaitOutcome::TimedOut,
                Ok(Err(_)) => break WaitOutcome::Failed("signal bus closed".to_string()),
                Ok(Ok(signal)) => signal,
            };

            match signal {
                Signal::ContentReady {
                    locator: ready,
                    local_path,
                } if ready == locator => break WaitOutcome::Ready(local_path),
                Signal::FetchFailed {
                    locator: failed,
                    reason,
                } if failed == locator => break WaitOutcome::Failed(reason),
                other => {
                    tracing::trace!("Ignoring {} while waiting for {}", other.topic(), locator);
                }
            }
        };

        match outcome {
            WaitOutcome::Ready(local_path) => {
                tracing::info!("Content ready for {} at {}", locator, local_path.display());
                handle.session.ready_local_path = Some(local_path.clone());
                handle.finish(FetchState::Ready);

                if !self.config.ready_grace.is_zero() {
                    tokio::time::sleep(self.config.ready_grace).await;
                }
                Ok(local_path)
            }
            WaitOutcome::TimedOut => {
                handle.finish(FetchState::TimedOut);
                tracing::warn!("Timed out after {:?} waiting for {}", timeout, locator);
                Err(FetchError::FetchTimeout {
                    locator,
                    waited: timeout,
                })
            }
            WaitOutcome::Failed(reason) => {
                handle.finish(FetchState::Failed);
                tracing::error!("Fetch of {} failed: {}", locator, reason);
                Err(FetchError::FetchFailed { locator, reason })
            }
        }
    }

    /// [`await_ready`](Self::await_ready) that gives up as soon as `cancel`
    /// completes.
    ///
    /// Cancelling drops interest in the session's signals; the background
    /// fetch is left running.
    ///
    /// # Errors
    /// - `FetchError::Cancelled` - `cancel` completed first
    /// - Any error from [`await_ready`](Self::await_ready)
    pub async fn await_ready_or_cancel<C>(
        &self,
        handle: &mut FetchHandle,
        timeout: Duration,
        cancel: C,
    ) -> Result<PathBuf, FetchError>
    where
        C: Future<Output = ()>,
    {
        let outcome = tokio::select! {
            result = self.await_ready(handle, timeout) => Some(result),
            () = cancel => None,
        };

        match outcome {
            Some(result) => result,
            None => {
                tracing::info!("Stopped waiting for {}", handle.session.locator);
                handle.signals = None;
                Err(FetchError::Cancelled {
                    locator: handle.session.locator.clone(),
                })
            }
        }
    }

    fn is_active_id(&self, id: Uuid) -> bool {
        self.active == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator(bus: &SignalBus) -> FetchCoordinator {
        let config = FetchConfig {
            ready_grace: Duration::ZERO,
            ..FetchConfig::default()
        };
        FetchCoordinator::new(bus.clone(), config)
    }

    fn assert_elapsed(started: Instant, expected: Duration) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(50),
            "elapsed {elapsed:?}, expected about {expected:?}"
        );
    }

    fn announce_ready_after(bus: &SignalBus, locator: &str, delay: Duration) {
        let bus = bus.clone();
        let locator = Locator::new(locator);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            bus.emit(Signal::ContentReady {
                locator,
                local_path: PathBuf::from("/tmp/peerwatch/video.mp4"),
            });
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_signal_before_timeout() {
        let bus = SignalBus::new();
        let mut coordinator = coordinator(&bus);
        let mut handle = coordinator.start_fetch(Locator::new("loc"));
        assert_eq!(handle.state(), FetchState::Fetching);

        announce_ready_after(&bus, "loc", Duration::from_secs(2));

        let started = Instant::now();
        let path = coordinator
            .await_ready(&mut handle, Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(path, PathBuf::from("/tmp/peerwatch/video.mp4"));
        assert_eq!(handle.state(), FetchState::Ready);
        assert_elapsed(started, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_wait_stays_pending_until_ready() {
        let bus = SignalBus::new();
        let mut coordinator = coordinator(&bus);
        let mut handle = coordinator.start_fetch(Locator::new("loc"));

        {
            let mut wait = tokio_test::task::spawn(
                coordinator.await_ready(&mut handle, Duration::from_secs(10)),
            );
            tokio_test::assert_pending!(wait.poll());

            bus.emit(Signal::ContentReady {
                locator: Locator::new("loc"),
                local_path: PathBuf::from("/tmp/peerwatch/video.mp4"),
            });
            assert!(wait.is_woken());
            let path = tokio_test::assert_ready_ok!(wait.poll());
            assert_eq!(path, PathBuf::from("/tmp/peerwatch/video.mp4"));
        }

        assert_eq!(handle.state(), FetchState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_signal() {
        let bus = SignalBus::new();
        let mut coordinator = coordinator(&bus);
        let mut handle = coordinator.start_fetch(Locator::new("loc"));

        let started = Instant::now();
        let result = coordinator
            .await_ready(&mut handle, Duration::from_secs(1))
            .await;

        assert!(matches!(result, Err(FetchError::FetchTimeout { .. })));
        assert_elapsed(started, Duration::from_secs(1));
        assert_eq!(handle.state(), FetchState::TimedOut);
    }

    #[tokio::test]
    async fn test_unbounded_timeout_still_sees_ready() {
        let bus = SignalBus::new();
        let mut coordinator = coordinator(&bus);
        let mut handle = coordinator.start_fetch(Locator::new("loc"));
        bus.emit(Signal::ContentReady {
            locator: Locator::new("loc"),
            local_path: PathBuf::from("/tmp/peerwatch/video.mp4"),
        });

        let path = coordinator
            .await_ready(&mut handle, Duration::MAX)
            .await
            .unwrap();

        assert_eq!(path, PathBuf::from("/tmp/peerwatch/video.mp4"));
        assert_eq!(handle.state(), FetchState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_for_other_locator_is_ignored() {
        let bus = SignalBus::new();
        let mut coordinator = coordinator(&bus);
        let mut handle = coordinator.start_fetch(Locator::new("mine"));

        announce_ready_after(&bus, "someone-else", Duration::from_millis(100));

        let result = coordinator
            .await_ready(&mut handle, Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(FetchError::FetchTimeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_failure_is_surfaced() {
        let bus = SignalBus::new();
        let mut coordinator = coordinator(&bus);
        let mut handle = coordinator.start_fetch(Locator::new("loc"));

        bus.emit(Signal::FetchFailed {
            locator: Locator::new("loc"),
            reason: "swarm unreachable".to_string(),
        });

        let result = coordinator
            .await_ready(&mut handle, Duration::from_secs(5))
            .await;
        match result {
            Err(FetchError::FetchFailed { reason, .. }) => assert_eq!(reason, "swarm unreachable"),
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(handle.state(), FetchState::Failed);

        let again = coordinator
            .await_ready(&mut handle, Duration::from_secs(5))
            .await;
        assert!(matches!(again, Err(FetchError::SessionClosed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_delay_applies_after_ready() {
        let bus = SignalBus::new();
        let config = FetchConfig {
            ready_grace: Duration::from_secs(3),
            ..FetchConfig::default()
        };
        let mut coordinator = FetchCoordinator::new(bus.clone(), config);
        let mut handle = coordinator.start_fetch(Locator::new("loc"));

        announce_ready_after(&bus, "loc", Duration::from_secs(1));

        let started = Instant::now();
        coordinator
            .await_ready(&mut handle, Duration::from_secs(10))
            .await
            .unwrap();
        assert_elapsed(started, Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_interest() {
        let bus = SignalBus::new();
        let mut coordinator = coordinator(&bus);
        let mut handle = coordinator.start_fetch(Locator::new("loc"));
        assert_eq!(bus.subscriber_count(topics::CONTENT_READY), 1);

        let result = coordinator
            .await_ready_or_cancel(
                &mut handle,
                Duration::from_secs(10),
                tokio::time::sleep(Duration::from_millis(500)),
            )
            .await;

        assert!(matches!(result, Err(FetchError::Cancelled { .. })));
        assert_eq!(bus.subscriber_count(topics::CONTENT_READY), 0);
        assert_eq!(handle.state(), FetchState::Fetching);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_session_supersedes_without_cancelling() {
        let bus = SignalBus::new();
        let mut coordinator = coordinator(&bus);
        let mut first = coordinator.start_fetch(Locator::new("first"));
        let second = coordinator.start_fetch(Locator::new("second"));

        assert!(!coordinator.is_active(&first));
        assert!(coordinator.is_active(&second));

        let result = coordinator
            .await_ready(&mut first, Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(FetchError::FetchTimeout { .. })));
    }

    #[tokio::test]
    async fn test_start_publishes_request_with_session_directory() {
        let bus = SignalBus::new();
        let mut requests = bus.subscribe_channel(&[topics::START_DOWNLOAD]);
        let mut coordinator = coordinator(&bus);

        let locator = Locator::new("https://peertube.example/torrents/abc-720.torrent");
        let _handle = coordinator.start_fetch(locator.clone());

        match requests.try_recv() {
            Some(Signal::StartDownload {
                locator: requested,
                destination,
            }) => {
                assert_eq!(requested, locator);
                assert!(destination.ends_with("abc-720"));
            }
            other => panic!("unexpected signal {other:?}"),
        }
    }
}
