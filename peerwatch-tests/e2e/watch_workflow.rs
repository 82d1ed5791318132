//! Browse, select and watch workflow

use peerwatch_catalog::{CatalogService, EntryTarget, listing};
use peerwatch_core::config::CatalogConfig;
use peerwatch_core::fetch::EngineCall;
use peerwatch_core::playback::test_mocks::SinkScript;
use peerwatch_core::{Locator, PlaybackSource, Preferences, WatchEnd};

use crate::fake_instance::FakeInstance;
use crate::session::{Session, SessionSetup};

fn first_playable(entries: &[listing::Entry]) -> String {
    entries
        .iter()
        .find_map(|entry| match &entry.target {
            EntryTarget::Play { id } => Some(id.clone()),
            _ => None,
        })
        .unwrap()
}

#[tokio::test]
async fn test_browse_and_watch_recorded_video() {
    let instance = FakeInstance::start().await;
    let preferences = instance.preferences();
    let catalog =
        CatalogService::for_instance(&preferences, None, &CatalogConfig::default()).unwrap();

    let page = catalog.list(0).await.unwrap();
    let id = first_playable(&listing::video_entries(&page, catalog.page_size()));
    assert_eq!(id, "clip-1");

    let renditions = catalog.renditions(&id).await.unwrap();
    let locator = match renditions.resolve(preferences.preferred_tier).unwrap() {
        PlaybackSource::Fetch(locator) => locator.clone(),
        PlaybackSource::Live(uri) => panic!("recorded video resolved to live {uri}"),
    };
    assert_eq!(
        locator,
        Locator::new("https://media.example/torrents/clip-1-360.torrent")
    );

    let mut session = Session::start(SessionSetup::default());
    let path = session
        .orchestrator
        .play_fetched(locator.clone(), std::future::pending())
        .await
        .unwrap();
    assert!(path.ends_with("clip-1-360/clip-1-360.mp4"));
    assert!(tokio::fs::metadata(&path).await.unwrap().len() > 0);

    let end = session
        .orchestrator
        .wait_for_release(&locator, std::future::pending())
        .await;
    assert_eq!(end, WatchEnd::Released { paused: true });

    session.wait_for_pause(&locator).await;
    assert_eq!(
        session.journal.calls(),
        vec![EngineCall::Begin(locator.clone()), EngineCall::Pause(locator)]
    );

    session.bridge.shutdown();
    session.service.shutdown();
}

#[tokio::test]
async fn test_search_and_watch_live_video() {
    let instance = FakeInstance::start().await;
    let preferences = instance.preferences();
    let catalog =
        CatalogService::for_instance(&preferences, None, &CatalogConfig::default()).unwrap();

    let page = catalog.search("morning", 0).await.unwrap();
    assert!(page.items[0].is_live);
    let renditions = catalog.renditions(&page.items[0].id).await.unwrap();

    let mut session = Session::start(SessionSetup::default());
    let uri = match renditions.resolve(preferences.preferred_tier).unwrap() {
        PlaybackSource::Live(uri) => uri.clone(),
        PlaybackSource::Fetch(locator) => panic!("live video resolved to fetch {locator}"),
    };

    session.orchestrator.play_live(&uri).await.unwrap();
    let end = session
        .orchestrator
        .wait_for_stop(uri.as_str(), std::future::pending())
        .await;

    assert_eq!(end, WatchEnd::Stopped);
    assert_eq!(session.orchestrator.sink().played(), vec![uri.to_string()]);
    assert!(session.journal.calls().is_empty());
}

#[tokio::test]
async fn test_declined_pause_keeps_fetch_until_interrupted() {
    let instance = FakeInstance::start().await;
    let preferences = instance.preferences();
    let catalog =
        CatalogService::for_instance(&preferences, None, &CatalogConfig::default()).unwrap();
    let renditions = catalog.renditions("hls-only").await.unwrap();
    let locator = match renditions.resolve(preferences.preferred_tier).unwrap() {
        PlaybackSource::Fetch(locator) => locator.clone(),
        PlaybackSource::Live(uri) => panic!("recorded video resolved to live {uri}"),
    };

    let mut session = Session::start(SessionSetup {
        script: SinkScript::FailBeforeStart,
        answer: false,
        ..SessionSetup::default()
    });
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

    let end = session
        .orchestrator
        .wait_for_completion(&locator, tokio::time::sleep(std::time::Duration::from_millis(50)))
        .await;
    assert_eq!(end, WatchEnd::Interrupted);
    assert_eq!(session.journal.pause_count(), 0);
}

#[tokio::test]
async fn test_selected_source_survives_restart() {
    let instance = FakeInstance::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peerwatch").join("preferences.json");

    let mut preferences = Preferences::load(&path).unwrap();
    assert_eq!(preferences, Preferences::default());
    preferences.items_per_page = 1;
    preferences.set_preferred_instance(&format!("{}/", instance.url));
    preferences.save(&path).unwrap();

    let reloaded = Preferences::load(&path).unwrap();
    assert_eq!(reloaded.preferred_instance, instance.url);

    let catalog =
        CatalogService::for_instance(&reloaded, None, &CatalogConfig::default()).unwrap();
    let page = catalog.list(0).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(instance.last_request("videos").unwrap().params["count"], "1");
}
