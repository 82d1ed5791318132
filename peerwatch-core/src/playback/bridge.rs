//! Translates playback lifecycle events into fetch pause decisions.
//!
//! The bridge tracks at most one fetch session. A stop after rendering began
//! means the user is done watching, so the fetch is paused. A stop before any
//! frame was rendered is ambiguous (buffer not ready, or playback failed), so
//! the decision is delegated to the configured [`StopBeforeStartPolicy`].

use std::sync::Arc;

use tokio::task::JoinHandle;

use super::{ConfirmPrompt, StopBeforeStartPolicy};
use crate::bus::{Signal, SignalBus, Subscription, topics};
use crate::fetch::FetchControl;
use crate::locator::Locator;

const PAUSE_PROMPT_TITLE: &str = "Playback stopped";
const PAUSE_PROMPT_MESSAGE: &str =
    "Playback stopped before the video started. Pause the download in the background?";

/// Fetch session the bridge is watching.
#[derive(Debug, Clone)]
pub struct TrackedFetch {
    pub locator: Locator,
    /// What the playback sink was handed for this session
    pub media: String,
    pub control: FetchControl,
}

impl TrackedFetch {
    fn matches(&self, media: &str) -> bool {
        self.media == media || self.locator.as_str() == media
    }
}

/// Bridge state: `Untracked -> Tracking -> Started -> Untracked`.
#[derive(Debug, Clone, Default)]
pub enum PlaybackState {
    #[default]
    Untracked,
    Tracking(TrackedFetch),
    Started(TrackedFetch),
}

impl PlaybackState {
    /// Locator of the tracked session, if any.
    pub fn tracked_locator(&self) -> Option<&Locator> {
        match self {
            PlaybackState::Untracked => None,
            PlaybackState::Tracking(tracked) | PlaybackState::Started(tracked) => {
                Some(&tracked.locator)
            }
        }
    }

    /// Checks whether rendering began for the tracked session.
    pub fn has_stream_started(&self) -> bool {
        matches!(self, PlaybackState::Started(_))
    }
}

/// Playback lifecycle state machine.
pub struct PlaybackLifecycleBridge {
    bus: SignalBus,
    prompt: Arc<dyn ConfirmPrompt>,
    policy: StopBeforeStartPolicy,
    state: PlaybackState,
}

impl PlaybackLifecycleBridge {
    /// Creates an untracked bridge.
    pub fn new(
        bus: SignalBus,
        prompt: Arc<dyn ConfirmPrompt>,
        policy: StopBeforeStartPolicy,
    ) -> Self {
        Self {
            bus,
            prompt,
            policy,
            state: PlaybackState::Untracked,
        }
    }

    /// Current state.
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Applies one bus signal to the state machine.
    pub async fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::FetchSessionBegan {
                locator,
                media,
                control,
            } => self.on_session_began(locator, media, control),
            Signal::StreamStarted { media } => self.on_stream_started(&media),
            Signal::PlaybackStopped { media } => self.on_playback_stopped(media.as_deref()).await,
            other => tracing::trace!("Bridge ignoring {}", other.topic()),
        }
    }

    fn on_session_began(&mut self, locator: Locator, media: String, control: FetchControl) {
        if let Some(previous) = self.state.tracked_locator() {
            tracing::info!("Tracking {} instead of {}", locator, previous);
        } else {
            tracing::info!("Tracking {}", locator);
        }

        self.state = PlaybackState::Tracking(TrackedFetch {
            locator,
            media,
            control,
        });
    }

    fn on_stream_started(&mut self, media: &str) {
        let state = std::mem::take(&mut self.state);
        self.state = match state {
            PlaybackState::Tracking(tracked) if tracked.matches(media) => {
                tracing::info!("Playback of {} began", tracked.locator);
                PlaybackState::Started(tracked)
            }
            other => {
                tracing::debug!("Ignoring start of unrelated media {}", media);
                other
            }
        };
    }

    async fn on_playback_stopped(&mut self, media: Option<&str>) {
        let related = match &self.state {
            PlaybackState::Untracked => {
                tracing::debug!("Stray stop event, nothing tracked");
                return;
            }
            PlaybackState::Tracking(tracked) | PlaybackState::Started(tracked) => {
                media.is_none_or(|media| tracked.matches(media))
            }
        };
        if !related {
            tracing::debug!("Ignoring stop of unrelated media");
            return;
        }

        let (tracked, started) = match std::mem::take(&mut self.state) {
            PlaybackState::Tracking(tracked) => (tracked, false),
            PlaybackState::Started(tracked) => (tracked, true),
            PlaybackState::Untracked => return,
        };

        let pause = if started {
            true
        } else {
            self.decide_stop_before_start(&tracked).await
        };

        if pause {
            tracing::info!("Pausing fetch of {}", tracked.locator);
            if !tracked.control.pause() {
                tracing::warn!("No fetch service received the pause for {}", tracked.locator);
            }
        } else {
            tracing::info!("Leaving fetch of {} running", tracked.locator);
        }

        self.bus.emit(Signal::PlaybackReleased {
            locator: tracked.locator,
            paused: pause,
        });
    }

    async fn decide_stop_before_start(&self, tracked: &TrackedFetch) -> bool {
        tracing::warn!("Playback of {} stopped before it started", tracked.locator);
        match self.policy {
            StopBeforeStartPolicy::AlwaysPause => true,
            StopBeforeStartPolicy::NeverPause => false,
            StopBeforeStartPolicy::Ask => {
                self.prompt
                    .confirm(PAUSE_PROMPT_TITLE, PAUSE_PROMPT_MESSAGE)
                    .await
            }
        }
    }
}

/// Handle to a running bridge actor.
#[derive(Debug)]
pub struct BridgeHandle {
    task: JoinHandle<()>,
}

impl BridgeHandle {
    /// Stops the bridge.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Spawns the bridge as an actor listening on `bus`.
///
/// Subscriptions are registered before this function returns.
pub fn spawn_playback_bridge(
    bus: SignalBus,
    prompt: Arc<dyn ConfirmPrompt>,
    policy: StopBeforeStartPolicy,
) -> BridgeHandle {
    let events = bus.subscribe_channel(&[
        topics::FETCH_SESSION,
        topics::STREAM_STARTED,
        topics::PLAYBACK_STOPPED,
    ]);
    let bridge = PlaybackLifecycleBridge::new(bus, prompt, policy);

    let task = tokio::spawn(run_bridge_loop(bridge, events));
    BridgeHandle { task }
}

async fn run_bridge_loop(mut bridge: PlaybackLifecycleBridge, mut events: Subscription) {
    tracing::debug!("Playback bridge started");
    while let Ok(signal) = events.recv().await {
        bridge.handle_signal(signal).await;
    }
    tracing::debug!("Playback bridge stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::test_mocks::ScriptedPrompt;

    struct Fixture {
        bus: SignalBus,
        bridge: PlaybackLifecycleBridge,
        pauses: Subscription,
        released: Subscription,
    }

    fn fixture(prompt: Arc<ScriptedPrompt>, policy: StopBeforeStartPolicy) -> Fixture {
        let bus = SignalBus::new();
        let pauses = bus.subscribe_channel(&[topics::PAUSE_DOWNLOAD]);
        let released = bus.subscribe_channel(&[topics::PLAYBACK_RELEASED]);
        let bridge = PlaybackLifecycleBridge::new(bus.clone(), prompt, policy);
        Fixture {
            bus,
            bridge,
            pauses,
            released,
        }
    }

    fn session_began(bus: &SignalBus, locator: &str, media: &str) -> Signal {
        let locator = Locator::new(locator);
        Signal::FetchSessionBegan {
            control: FetchControl::new(bus.clone(), locator.clone()),
            locator,
            media: media.to_string(),
        }
    }

    fn drain(subscription: &mut Subscription) -> Vec<Signal> {
        std::iter::from_fn(|| subscription.try_recv()).collect()
    }

    #[tokio::test]
    async fn test_stop_after_start_pauses_once() {
        let prompt = Arc::new(ScriptedPrompt::answering(false));
        let mut f = fixture(prompt.clone(), StopBeforeStartPolicy::Ask);

        f.bridge
            .handle_signal(session_began(&f.bus, "L1", "/tmp/a.mp4"))
            .await;
        f.bridge
            .handle_signal(Signal::StreamStarted {
                media: "/tmp/a.mp4".to_string(),
            })
            .await;
        assert!(f.bridge.state().has_stream_started());

        f.bridge
            .handle_signal(Signal::PlaybackStopped {
                media: Some("/tmp/a.mp4".to_string()),
            })
            .await;

        let pauses = drain(&mut f.pauses);
        assert_eq!(pauses.len(), 1);
        assert_eq!(pauses[0].locator(), Some(&Locator::new("L1")));
        assert_eq!(prompt.times_asked(), 0);
        assert!(matches!(f.bridge.state(), PlaybackState::Untracked));
        assert!(matches!(
            drain(&mut f.released).as_slice(),
            [Signal::PlaybackReleased { paused: true, .. }]
        ));
    }

    #[tokio::test]
    async fn test_stop_before_start_declined_keeps_fetching() {
        let prompt = Arc::new(ScriptedPrompt::answering(false));
        let mut f = fixture(prompt.clone(), StopBeforeStartPolicy::Ask);

        f.bridge
            .handle_signal(session_began(&f.bus, "L1", "/tmp/a.mp4"))
            .await;
        f.bridge
            .handle_signal(Signal::PlaybackStopped { media: None })
            .await;

        assert_eq!(prompt.times_asked(), 1);
        assert!(drain(&mut f.pauses).is_empty());
        assert!(matches!(
            drain(&mut f.released).as_slice(),
            [Signal::PlaybackReleased { paused: false, .. }]
        ));
        assert!(f.bridge.state().tracked_locator().is_none());
    }

    #[tokio::test]
    async fn test_stop_before_start_confirmed_pauses() {
        let prompt = Arc::new(ScriptedPrompt::answering(true));
        let mut f = fixture(prompt.clone(), StopBeforeStartPolicy::Ask);

        f.bridge
            .handle_signal(session_began(&f.bus, "L1", "/tmp/a.mp4"))
            .await;
        f.bridge
            .handle_signal(Signal::PlaybackStopped { media: None })
            .await;

        assert_eq!(prompt.times_asked(), 1);
        assert_eq!(drain(&mut f.pauses).len(), 1);
    }

    #[tokio::test]
    async fn test_policy_skips_prompt() {
        let prompt = Arc::new(ScriptedPrompt::answering(true));
        let mut f = fixture(prompt.clone(), StopBeforeStartPolicy::NeverPause);

        f.bridge
            .handle_signal(session_began(&f.bus, "L1", "/tmp/a.mp4"))
            .await;
        f.bridge
            .handle_signal(Signal::PlaybackStopped { media: None })
            .await;

        assert_eq!(prompt.times_asked(), 0);
        assert!(drain(&mut f.pauses).is_empty());
    }

    #[tokio::test]
    async fn test_untracked_playback_never_pauses() {
        let prompt = Arc::new(ScriptedPrompt::answering(true));
        let mut f = fixture(prompt.clone(), StopBeforeStartPolicy::Ask);

        f.bridge
            .handle_signal(Signal::StreamStarted {
                media: "/home/user/holiday.mkv".to_string(),
            })
            .await;
        f.bridge
            .handle_signal(Signal::PlaybackStopped {
                media: Some("/home/user/holiday.mkv".to_string()),
            })
            .await;

        assert!(drain(&mut f.pauses).is_empty());
        assert!(drain(&mut f.released).is_empty());
        assert_eq!(prompt.times_asked(), 0);
    }

    #[tokio::test]
    async fn test_unrelated_stop_keeps_tracking() {
        let prompt = Arc::new(ScriptedPrompt::answering(true));
        let mut f = fixture(prompt.clone(), StopBeforeStartPolicy::Ask);

        f.bridge
            .handle_signal(session_began(&f.bus, "L1", "/tmp/a.mp4"))
            .await;
        f.bridge
            .handle_signal(Signal::StreamStarted {
                media: "/tmp/a.mp4".to_string(),
            })
            .await;
        f.bridge
            .handle_signal(Signal::PlaybackStopped {
                media: Some("/tmp/other.mp4".to_string()),
            })
            .await;

        assert!(drain(&mut f.pauses).is_empty());
        assert!(f.bridge.state().has_stream_started());
    }

    #[tokio::test]
    async fn test_new_session_replaces_tracked_one() {
        let prompt = Arc::new(ScriptedPrompt::answering(true));
        let mut f = fixture(prompt, StopBeforeStartPolicy::AlwaysPause);

        f.bridge
            .handle_signal(session_began(&f.bus, "L1", "/tmp/a.mp4"))
            .await;
        f.bridge
            .handle_signal(session_began(&f.bus, "L2", "/tmp/b.mp4"))
            .await;
        f.bridge
            .handle_signal(Signal::PlaybackStopped { media: None })
            .await;

        let pauses = drain(&mut f.pauses);
        assert_eq!(pauses.len(), 1);
        assert_eq!(pauses[0].locator(), Some(&Locator::new("L2")));
    }

    #[tokio::test]
    async fn test_spawned_bridge_reacts_to_bus() {
        let bus = SignalBus::new();
        let mut pauses = bus.subscribe_channel(&[topics::PAUSE_DOWNLOAD]);
        let mut released = bus.subscribe_channel(&[topics::PLAYBACK_RELEASED]);
        let prompt = Arc::new(ScriptedPrompt::answering(false));
        let handle = spawn_playback_bridge(bus.clone(), prompt, StopBeforeStartPolicy::Ask);

        bus.emit(session_began(&bus, "L1", "/tmp/a.mp4"));
        bus.emit(Signal::StreamStarted {
            media: "/tmp/a.mp4".to_string(),
        });
        bus.emit(Signal::PlaybackStopped { media: None });

        let signal = tokio::time::timeout(std::time::Duration::from_secs(2), released.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(signal, Signal::PlaybackReleased { paused: true, .. }));
        assert_eq!(drain(&mut pauses).len(), 1);
        handle.shutdown();
    }
}
