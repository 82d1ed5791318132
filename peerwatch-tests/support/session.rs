//! Fetch service, playback bridge and orchestrator wired onto one bus.

use std::sync::Arc;
use std::time::Duration;

use peerwatch_core::config::FetchConfig;
use peerwatch_core::fetch::{
    EngineJournal, FetchServiceHandle, SimulatedFetchEngine, SimulatedOutcome, spawn_fetch_service,
};
use peerwatch_core::playback::test_mocks::{RecordingSink, ScriptedPrompt, SinkScript};
use peerwatch_core::playback::{BridgeHandle, spawn_playback_bridge};
use peerwatch_core::{ConfirmPrompt, Locator, Orchestrator, SignalBus, StopBeforeStartPolicy};
use tempfile::TempDir;

pub const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// How a session is set up.
pub struct SessionSetup {
    pub outcome: SimulatedOutcome,
    pub script: SinkScript,
    pub policy: StopBeforeStartPolicy,
    pub answer: bool,
}

impl Default for SessionSetup {
    fn default() -> Self {
        Self {
            outcome: SimulatedOutcome::Ready,
            script: SinkScript::PlayThrough,
            policy: StopBeforeStartPolicy::Ask,
            answer: false,
        }
    }
}

pub struct Session {
    pub bus: SignalBus,
    pub journal: EngineJournal,
    pub prompt: Arc<ScriptedPrompt>,
    pub orchestrator: Orchestrator<RecordingSink>,
    pub service: FetchServiceHandle,
    pub bridge: BridgeHandle,
    pub downloads: TempDir,
}

impl Session {
    /// Spawns every actor. Must run inside a Tokio runtime.
    pub fn start(setup: SessionSetup) -> Self {
        let bus = SignalBus::new();
        let downloads = tempfile::tempdir().unwrap();

        let engine =
            SimulatedFetchEngine::new(bus.clone(), Duration::from_millis(20), setup.outcome);
        let journal = engine.journal();
        let service = spawn_fetch_service(bus.clone(), engine);

        let prompt = Arc::new(ScriptedPrompt::answering(setup.answer));
        let shared_prompt: Arc<dyn ConfirmPrompt> = prompt.clone();
        let bridge = spawn_playback_bridge(bus.clone(), shared_prompt, setup.policy);

        let config = FetchConfig {
            ready_timeout: READY_TIMEOUT,
            ready_grace: Duration::ZERO,
            download_dir: downloads.path().to_path_buf(),
            ..FetchConfig::default()
        };
        let sink = RecordingSink::new(bus.clone(), setup.script);
        let orchestrator = Orchestrator::new(bus.clone(), config, sink);

        Self {
            bus,
            journal,
            prompt,
            orchestrator,
            service,
            bridge,
            downloads,
        }
    }

    /// Waits until the engine has been asked to pause `locator`.
    pub async fn wait_for_pause(&self, locator: &Locator) {
        let pause = peerwatch_core::fetch::EngineCall::Pause(locator.clone());
        tokio::time::timeout(Duration::from_secs(2), async {
            while !self.journal.calls().contains(&pause) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}
