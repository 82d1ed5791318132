//! Selection and readiness scenarios through the public API

use std::path::PathBuf;
use std::time::Duration;

use peerwatch_core::config::FetchConfig;
use peerwatch_core::{
    FetchCoordinator, FetchError, FetchState, Locator, Rendition, SelectionError, Signal,
    SignalBus, Tier, select,
};
use tokio::time::Instant;

fn renditions(pairs: &[(u32, &str)]) -> Vec<Rendition> {
    pairs
        .iter()
        .map(|(tier, locator)| Rendition::new(Tier(*tier), *locator))
        .collect()
}

fn coordinator(bus: &SignalBus) -> FetchCoordinator {
    let config = FetchConfig {
        ready_grace: Duration::ZERO,
        ..FetchConfig::default()
    };
    FetchCoordinator::new(bus.clone(), config)
}

#[test]
fn test_exact_tier_is_chosen() {
    let set = renditions(&[(144, "u1"), (240, "u2"), (480, "u3")]);
    assert_eq!(select(&set, Tier(240)).unwrap().as_str(), "u2");
}

#[test]
fn test_best_below_beats_closer_above() {
    let set = renditions(&[(144, "u1"), (1080, "u2")]);
    assert_eq!(select(&set, Tier(480)).unwrap().as_str(), "u1");
}

#[test]
fn test_lowest_above_when_nothing_below() {
    let set = renditions(&[(1080, "u1"), (2160, "u2")]);
    assert_eq!(select(&set, Tier(480)).unwrap().as_str(), "u1");
}

#[test]
fn test_empty_set_fails() {
    assert_eq!(select(&[], Tier(480)), Err(SelectionError::NoRenditionAvailable));
}

#[tokio::test(start_paused = true)]
async fn test_ready_two_seconds_into_ten_second_wait() {
    let bus = SignalBus::new();
    let mut coordinator = coordinator(&bus);
    let mut handle = coordinator.start_fetch(Locator::new("loc"));

    let announcer = bus.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        announcer.emit(Signal::ContentReady {
            locator: Locator::new("loc"),
            local_path: PathBuf::from("/downloads/loc/video.mp4"),
        });
    });

    let started = Instant::now();
    let path = coordinator
        .await_ready(&mut handle, Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(path, PathBuf::from("/downloads/loc/video.mp4"));
    assert_eq!(handle.state(), FetchState::Ready);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_millis(2050));
}

#[tokio::test(start_paused = true)]
async fn test_silence_times_out_after_one_second() {
    let bus = SignalBus::new();
    let mut coordinator = coordinator(&bus);
    let mut handle = coordinator.start_fetch(Locator::new("loc"));

    let started = Instant::now();
    let result = coordinator
        .await_ready(&mut handle, Duration::from_secs(1))
        .await;

    assert!(matches!(result, Err(FetchError::FetchTimeout { .. })));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_millis(1050));
    assert_eq!(handle.state(), FetchState::TimedOut);
}
