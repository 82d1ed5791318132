//! Fetch and playback actors cooperating over the bus

use peerwatch_core::fetch::{EngineCall, FetchError, SimulatedOutcome};
use peerwatch_core::playback::test_mocks::SinkScript;
use peerwatch_core::{
    Locator, PeerwatchError, PlaybackError, Signal, StopBeforeStartPolicy, WatchEnd,
};

use crate::session::{READY_TIMEOUT, Session, SessionSetup};

fn clip(name: &str) -> Locator {
    Locator::new(format!("https://media.example/torrents/{name}.torrent"))
}

#[tokio::test]
async fn test_stop_after_start_pauses_without_asking() {
    let mut session = Session::start(SessionSetup::default());
    let locator = clip("clip-480");

    let path = session
        .orchestrator
        .play_fetched(locator.clone(), std::future::pending())
        .await
        .unwrap();
    assert!(path.starts_with(session.downloads.path()));

    let end = session
        .orchestrator
        .wait_for_release(&locator, std::future::pending())
        .await;
    assert_eq!(end, WatchEnd::Released { paused: true });

    session.wait_for_pause(&locator).await;
    assert_eq!(session.prompt.times_asked(), 0);
}

#[tokio::test]
async fn test_stop_before_start_declined_keeps_fetching() {
    let mut session = Session::start(SessionSetup {
        script: SinkScript::FailBeforeStart,
        answer: false,
        ..SessionSetup::default()
    });
    let locator = clip("clip-720");

    session
        .orchestrator
        .play_fetched(locator.clone(), std::future::pending())
        .await
        .unwrap();
    let end = session
        .orchestrator
        .wait_for_release(&locator, std::future::pending())
        .await;

    assert_eq!(end, WatchEnd::Released { paused: false });
    assert_eq!(session.prompt.times_asked(), 1);
    assert_eq!(session.journal.pause_count(), 0);
}

#[tokio::test]
async fn test_stop_before_start_confirmed_pauses() {
    let mut session = Session::start(SessionSetup {
        script: SinkScript::FailBeforeStart,
        answer: true,
        ..SessionSetup::default()
    });
    let locator = clip("clip-240");

    session
        .orchestrator
        .play_fetched(locator.clone(), std::future::pending())
        .await
        .unwrap();
    let end = session
        .orchestrator
        .wait_for_release(&locator, std::future::pending())
        .await;

    assert_eq!(end, WatchEnd::Released { paused: true });
    assert_eq!(session.prompt.times_asked(), 1);
    session.wait_for_pause(&locator).await;
}

#[tokio::test]
async fn test_never_pause_policy_skips_prompt() {
    let mut session = Session::start(SessionSetup {
        script: SinkScript::FailBeforeStart,
        policy: StopBeforeStartPolicy::NeverPause,
        answer: true,
        ..SessionSetup::default()
    });
    let locator = clip("clip-1080");

    session
        .orchestrator
        .play_fetched(locator.clone(), std::future::pending())
        .await
        .unwrap();
    let end = session
        .orchestrator
        .wait_for_release(&locator, std::future::pending())
        .await;

    assert_eq!(end, WatchEnd::Released { paused: false });
    assert_eq!(session.prompt.times_asked(), 0);
}

#[tokio::test]
async fn test_engine_failure_reaches_caller() {
    let mut session = Session::start(SessionSetup {
        outcome: SimulatedOutcome::Fail("tracker unreachable".to_string()),
        ..SessionSetup::default()
    });

    let error = session
        .orchestrator
        .play_fetched(clip("broken"), std::future::pending())
        .await
        .unwrap_err();

    match &error {
        PeerwatchError::Fetch(FetchError::FetchFailed { reason, .. }) => {
            assert_eq!(reason, "tracker unreachable");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(error.user_message(), "Download failed: tracker unreachable");
    assert!(session.orchestrator.sink().played().is_empty());
}

#[tokio::test]
async fn test_engine_refusal_reaches_caller() {
    let mut session = Session::start(SessionSetup {
        outcome: SimulatedOutcome::RefuseToStart("disk full".to_string()),
        ..SessionSetup::default()
    });

    let result = session
        .orchestrator
        .play_fetched(clip("refused"), std::future::pending())
        .await;

    assert!(matches!(
        result,
        Err(PeerwatchError::Fetch(FetchError::FetchFailed { ref reason, .. }))
            if reason.contains("disk full")
    ));
}

#[tokio::test(start_paused = true)]
async fn test_silent_engine_times_out() {
    let mut session = Session::start(SessionSetup {
        outcome: SimulatedOutcome::Silent,
        ..SessionSetup::default()
    });

    let result = session
        .orchestrator
        .play_fetched(clip("silent"), std::future::pending())
        .await;

    match result {
        Err(PeerwatchError::Fetch(FetchError::FetchTimeout { waited, .. })) => {
            assert_eq!(waited, READY_TIMEOUT);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn test_unavailable_sink_is_user_error() {
    let mut session = Session::start(SessionSetup {
        script: SinkScript::Unavailable,
        ..SessionSetup::default()
    });

    let error = session
        .orchestrator
        .play_fetched(clip("no-player"), std::future::pending())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        PeerwatchError::Playback(PlaybackError::SinkUnavailable { .. })
    ));
    assert!(error.is_user_error());
}

#[tokio::test]
async fn test_new_session_replaces_tracked_one() {
    let mut session = Session::start(SessionSetup {
        script: SinkScript::KeepPlaying,
        ..SessionSetup::default()
    });
    let first = clip("first");
    let second = clip("second");

    let first_path = session
        .orchestrator
        .play_fetched(first.clone(), std::future::pending())
        .await
        .unwrap();
    let second_path = session
        .orchestrator
        .play_fetched(second.clone(), std::future::pending())
        .await
        .unwrap();

    session.bus.emit(Signal::PlaybackStopped {
        media: Some(first_path.to_string_lossy().into_owned()),
    });
    session.bus.emit(Signal::PlaybackStopped {
        media: Some(second_path.to_string_lossy().into_owned()),
    });

    let end = session
        .orchestrator
        .wait_for_release(&second, std::future::pending())
        .await;
    assert_eq!(end, WatchEnd::Released { paused: true });

    session.wait_for_pause(&second).await;
    assert!(!session.journal.calls().contains(&EngineCall::Pause(first)));
}
