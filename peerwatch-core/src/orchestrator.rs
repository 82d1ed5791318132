//! The orchestrating flow behind one "play this object" action.
//!
//! The orchestrator starts the fetch, waits for readiness, announces the
//! session so the playback bridge can track it, hands the media to the sink,
//! and then waits for the bridge to release the session. Everything it learns
//! about the other actors arrives over the bus.

use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;

use crate::PeerwatchError;
use crate::bus::{Signal, SignalBus, Subscription, topics};
use crate::config::FetchConfig;
use crate::fetch::FetchCoordinator;
use crate::locator::Locator;
use crate::playback::PlaybackSink;

/// How a watch ended from the orchestrator's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEnd {
    /// Bridge released the session; `paused` tells whether fetching stopped
    Released { paused: bool },
    /// Engine finished fetching the whole object
    Completed,
    /// Engine reported a failure
    Failed { reason: String },
    /// Sink stopped a stream that was never fetched
    Stopped,
    /// Caller gave up waiting
    Interrupted,
}

/// Drives fetch and playback for one user action at a time.
pub struct Orchestrator<S> {
    bus: SignalBus,
    coordinator: FetchCoordinator,
    sink: S,
    events: Subscription,
    completed: HashSet<Locator>,
}

impl<S: PlaybackSink> Orchestrator<S> {
    /// Creates an orchestrator. Its bus subscriptions exist from here on.
    pub fn new(bus: SignalBus, config: FetchConfig, sink: S) -> Self {
        let events = bus.subscribe_channel(&[
            topics::PLAYBACK_RELEASED,
            topics::PLAYBACK_STOPPED,
            topics::FETCH_COMPLETED,
            topics::FETCH_FAILED,
        ]);

        Self {
            coordinator: FetchCoordinator::new(bus.clone(), config),
            bus,
            sink,
            events,
            completed: HashSet::new(),
        }
    }

    /// Sink used for playback.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Hands a live stream straight to the sink, without fetching.
    ///
    /// # Errors
    /// - `PeerwatchError::Playback` - Sink refused the stream
    pub async fn play_live(&mut self, uri: &Locator) -> Result<(), PeerwatchError> {
        tracing::info!("Streaming {} directly", uri);
        self.sink.play(uri.as_str()).await?;
        Ok(())
    }

    /// Fetches `locator` until playable, then starts playback of it.
    ///
    /// Returns the local path handed to the sink. `cancel` abandons the wait
    /// for readiness; the background fetch keeps running.
    ///
    /// # Errors
    /// - `PeerwatchError::Fetch` - Timeout, engine failure or cancellation
    /// - `PeerwatchError::Playback` - Sink refused the media
    pub async fn play_fetched<C>(
        &mut self,
        locator: Locator,
        cancel: C,
    ) -> Result<PathBuf, PeerwatchError>
    where
        C: Future<Output = ()>,
    {
        let mut handle = self.coordinator.start_fetch(locator.clone());
        let timeout = self.coordinator.ready_timeout();
        let local_path = self
            .coordinator
            .await_ready_or_cancel(&mut handle, timeout, cancel)
            .await?;

        let media = local_path.to_string_lossy().into_owned();
        self.bus.emit(Signal::FetchSessionBegan {
            locator,
            media: media.clone(),
            control: self.coordinator.control(&handle),
        });

        self.sink.play(&media).await?;
        Ok(local_path)
    }

    /// Waits until the bridge releases the session for `locator`.
    pub async fn wait_for_release<C>(&mut self, locator: &Locator, cancel: C) -> WatchEnd
    where
        C: Future<Output = ()>,
    {
        self.wait_until(cancel, |signal| match signal {
            Signal::PlaybackReleased { locator: released, paused } if released == locator => {
                Some(WatchEnd::Released { paused: *paused })
            }
            Signal::FetchFailed { locator: failed, reason } if failed == locator => {
                Some(WatchEnd::Failed {
                    reason: reason.clone(),
                })
            }
            _ => None,
        })
        .await
    }

    /// Waits until the fetch of `locator` completes.
    pub async fn wait_for_completion<C>(&mut self, locator: &Locator, cancel: C) -> WatchEnd
    where
        C: Future<Output = ()>,
    {
        if self.completed.contains(locator) {
            return WatchEnd::Completed;
        }

        self.wait_until(cancel, |signal| match signal {
            Signal::FetchCompleted { locator: done } if done == locator => {
                Some(WatchEnd::Completed)
            }
            Signal::FetchFailed { locator: failed, reason } if failed == locator => {
                Some(WatchEnd::Failed {
                    reason: reason.clone(),
                })
            }
            _ => None,
        })
        .await
    }

    /// Waits until the sink stops playing `media`.
    pub async fn wait_for_stop<C>(&mut self, media: &str, cancel: C) -> WatchEnd
    where
        C: Future<Output = ()>,
    {
        self.wait_until(cancel, |signal| match signal {
            Signal::PlaybackStopped { media: stopped }
                if stopped.as_deref().is_none_or(|m| m == media) =>
            {
                Some(WatchEnd::Stopped)
            }
            _ => None,
        })
        .await
    }

    async fn wait_until<C, F>(&mut self, cancel: C, mut decide: F) -> WatchEnd
    where
        C: Future<Output = ()>,
        F: FnMut(&Signal) -> Option<WatchEnd>,
    {
        tokio::pin!(cancel);
        loop {
            let signal = tokio::select! {
                received = self.events.recv() => match received {
                    Ok(signal) => signal,
                    Err(_) => return WatchEnd::Interrupted,
                },
                () = &mut cancel => return WatchEnd::Interrupted,
            };

            if let Signal::FetchCompleted { locator } = &signal {
                self.completed.insert(locator.clone());
            }
            if let Some(end) = decide(&signal) {
                return end;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::fetch::{EngineCall, SimulatedFetchEngine, SimulatedOutcome, spawn_fetch_service};
    use crate::playback::test_mocks::{RecordingSink, ScriptedPrompt, SinkScript};
    use crate::playback::{StopBeforeStartPolicy, spawn_playback_bridge};

    fn fetch_config(dir: &std::path::Path) -> FetchConfig {
        FetchConfig {
            ready_timeout: Duration::from_secs(5),
            ready_grace: Duration::ZERO,
            download_dir: dir.to_path_buf(),
            ..FetchConfig::default()
        }
    }

    #[tokio::test]
    async fn test_watch_then_stop_pauses_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let bus = SignalBus::new();
        let engine = SimulatedFetchEngine::new(
            bus.clone(),
            Duration::from_millis(10),
            SimulatedOutcome::Ready,
        );
        let journal = engine.journal();
        let _service = spawn_fetch_service(bus.clone(), engine);
        let _bridge = spawn_playback_bridge(
            bus.clone(),
            Arc::new(ScriptedPrompt::answering(false)),
            StopBeforeStartPolicy::Ask,
        );

        let sink = RecordingSink::new(bus.clone(), SinkScript::PlayThrough);
        let mut orchestrator = Orchestrator::new(bus.clone(), fetch_config(dir.path()), sink);
        let locator = Locator::new("https://example.org/clip-480.torrent");

        let path = orchestrator
            .play_fetched(locator.clone(), std::future::pending())
            .await
            .unwrap();
        assert_eq!(orchestrator.sink().played(), vec![path.to_string_lossy().into_owned()]);

        let end = orchestrator
            .wait_for_release(&locator, std::future::pending())
            .await;
        assert_eq!(end, WatchEnd::Released { paused: true });

        tokio::time::timeout(Duration::from_secs(2), async {
            while journal.pause_count() == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(journal.calls().contains(&EngineCall::Pause(locator)));
    }

    #[tokio::test]
    async fn test_cancel_before_ready() {
        let dir = tempfile::tempdir().unwrap();
        let bus = SignalBus::new();
        let engine =
            SimulatedFetchEngine::new(bus.clone(), Duration::ZERO, SimulatedOutcome::Silent);
        let _service = spawn_fetch_service(bus.clone(), engine);

        let sink = RecordingSink::new(bus.clone(), SinkScript::PlayThrough);
        let mut orchestrator = Orchestrator::new(bus, fetch_config(dir.path()), sink);

        let result = orchestrator
            .play_fetched(Locator::new("loc"), async {})
            .await;
        assert!(matches!(
            result,
            Err(PeerwatchError::Fetch(crate::fetch::FetchError::Cancelled { .. }))
        ));
        assert!(orchestrator.sink().played().is_empty());
    }

    #[tokio::test]
    async fn test_completion_seen_before_release_is_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let bus = SignalBus::new();
        let sink = RecordingSink::new(bus.clone(), SinkScript::KeepPlaying);
        let mut orchestrator = Orchestrator::new(bus.clone(), fetch_config(dir.path()), sink);
        let locator = Locator::new("loc");

        bus.emit(Signal::FetchCompleted {
            locator: locator.clone(),
        });
        bus.emit(Signal::PlaybackReleased {
            locator: locator.clone(),
            paused: false,
        });

        assert_eq!(
            orchestrator.wait_for_release(&locator, std::future::pending()).await,
            WatchEnd::Released { paused: false }
        );
        assert_eq!(
            orchestrator.wait_for_completion(&locator, std::future::pending()).await,
            WatchEnd::Completed
        );
    }

    #[tokio::test]
    async fn test_live_stream_bypasses_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let bus = SignalBus::new();
        let mut starts = bus.subscribe_channel(&[topics::START_DOWNLOAD]);
        let sink = RecordingSink::new(bus.clone(), SinkScript::PlayThrough);
        let mut orchestrator = Orchestrator::new(bus, fetch_config(dir.path()), sink);
        let uri = Locator::new("https://example.org/live/master.m3u8");

        orchestrator.play_live(&uri).await.unwrap();
        assert_eq!(
            orchestrator.wait_for_stop(uri.as_str(), std::future::pending()).await,
            WatchEnd::Stopped
        );
        assert!(starts.try_recv().is_none());
    }
}
