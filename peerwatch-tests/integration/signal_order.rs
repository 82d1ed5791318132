//! Ordering of lifecycle signals as seen by an outside observer

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use peerwatch_core::{Locator, Signal, topics};

use crate::session::{Session, SessionSetup};

const ALL_TOPICS: [&str; 10] = [
    topics::START_DOWNLOAD,
    topics::PAUSE_DOWNLOAD,
    topics::RESUME_DOWNLOAD,
    topics::CONTENT_READY,
    topics::FETCH_FAILED,
    topics::FETCH_COMPLETED,
    topics::FETCH_SESSION,
    topics::STREAM_STARTED,
    topics::PLAYBACK_STOPPED,
    topics::PLAYBACK_RELEASED,
];

#[tokio::test]
async fn test_watch_emits_lifecycle_in_order() {
    let mut session = Session::start(SessionSetup::default());
    let observed = session.bus.subscribe_channel(&ALL_TOPICS).into_stream();
    let locator = Locator::new("https://media.example/torrents/ordered.torrent");

    session
        .orchestrator
        .play_fetched(locator.clone(), std::future::pending())
        .await
        .unwrap();
    session
        .orchestrator
        .wait_for_release(&locator, std::future::pending())
        .await;

    let signals: Vec<Signal> =
        tokio::time::timeout(Duration::from_secs(2), observed.take(7).collect())
            .await
            .unwrap();
    let order: Vec<&str> = signals.iter().map(Signal::topic).collect();

    assert_eq!(
        order,
        vec![
            topics::START_DOWNLOAD,
            topics::CONTENT_READY,
            topics::FETCH_SESSION,
            topics::STREAM_STARTED,
            topics::PLAYBACK_STOPPED,
            topics::PAUSE_DOWNLOAD,
            topics::PLAYBACK_RELEASED,
        ]
    );
    assert!(
        signals
            .iter()
            .filter_map(Signal::locator)
            .all(|seen| *seen == locator)
    );
}

#[tokio::test]
async fn test_session_announcement_carries_played_media() {
    let mut session = Session::start(SessionSetup::default());
    let announced = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&announced);
    let _handle = session.bus.subscribe(topics::FETCH_SESSION, move |signal| {
        let sink = Arc::clone(&sink);
        async move {
            if let Signal::FetchSessionBegan { media, control, .. } = signal {
                sink.lock().push((media, control.locator().clone()));
            }
        }
    });
    let locator = Locator::new("https://media.example/torrents/announced.torrent");

    let path = session
        .orchestrator
        .play_fetched(locator.clone(), std::future::pending())
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while announced.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let announced = announced.lock().clone();
    assert_eq!(
        announced,
        vec![(path.to_string_lossy().into_owned(), locator)]
    );
    assert_eq!(session.orchestrator.sink().played(), vec![announced[0].0.clone()]);
}
