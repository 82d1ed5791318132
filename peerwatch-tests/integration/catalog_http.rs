//! Catalog client against a fake PeerTube instance

use peerwatch_catalog::{
    CatalogError, CatalogService, EntryTarget, InstanceDirectory, listing,
};
use peerwatch_core::config::CatalogConfig;
use peerwatch_core::{Locator, PlaybackSource, Preferences, SelectionError, Tier, VideoFilter};

use crate::fake_instance::FakeInstance;

#[tokio::test]
async fn test_listing_sends_preference_parameters() {
    let instance = FakeInstance::start().await;
    let mut preferences = instance.preferences();
    preferences.items_per_page = 2;
    preferences.sort_method = "-publishedAt".to_string();
    preferences.video_filter = VideoFilter::AllLocal;

    let service =
        CatalogService::for_instance(&preferences, None, &CatalogConfig::default()).unwrap();
    let page = service.list(0).await.unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, "clip-1");
    assert_eq!(
        page.items[0].thumbnail_url.as_deref(),
        Some(format!("{}/static/thumbnails/clip-1.jpg", instance.url).as_str())
    );

    let request = instance.last_request("videos").unwrap();
    assert_eq!(request.params["sort"], "-publishedAt");
    assert_eq!(request.params["count"], "2");
    assert_eq!(request.params["filter"], "all-local");
    assert_eq!(request.params["start"], "0");
}

#[tokio::test]
async fn test_listing_offers_next_page_until_last() {
    let instance = FakeInstance::start().await;
    let mut preferences = instance.preferences();
    preferences.items_per_page = 2;
    let service =
        CatalogService::for_instance(&preferences, None, &CatalogConfig::default()).unwrap();

    let first = service.list(0).await.unwrap();
    let entries = listing::video_entries(&first, service.page_size());
    let next = entries.last().unwrap();
    assert_eq!(next.label, "Next page (2/2)");
    assert_eq!(next.target, EntryTarget::NextPage { start: 2 });

    let second = service.list(2).await.unwrap();
    assert_eq!(second.items.len(), 1);
    let entries = listing::video_entries(&second, service.page_size());
    assert!(
        entries
            .iter()
            .all(|entry| matches!(entry.target, EntryTarget::Play { .. }))
    );
}

#[tokio::test]
async fn test_source_override_wins_over_preference() {
    let instance = FakeInstance::start().await;
    let preferences = Preferences::default();

    let service = CatalogService::for_instance(
        &preferences,
        Some(&instance.url),
        &CatalogConfig::default(),
    )
    .unwrap();

    assert_eq!(service.source(), instance.url);
    let renditions = service.renditions("clip-1").await.unwrap();
    assert_eq!(renditions.renditions.len(), 2);
}

#[tokio::test]
async fn test_search_forwards_keywords() {
    let instance = FakeInstance::start().await;
    let service =
        CatalogService::for_instance(&instance.preferences(), None, &CatalogConfig::default())
            .unwrap();

    let page = service.search("  timelapse ", 0).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "Mountain Timelapse");
    assert_eq!(instance.last_request("search").unwrap().params["search"], "timelapse");
}

#[tokio::test]
async fn test_search_without_match_is_warning() {
    let instance = FakeInstance::start().await;
    let service =
        CatalogService::for_instance(&instance.preferences(), None, &CatalogConfig::default())
            .unwrap();

    let error = tokio_test::assert_err!(service.search("volcano", 0).await);
    assert!(matches!(error, CatalogError::NoResults { ref query } if query == "volcano"));
    assert!(error.is_warning());
}

#[tokio::test]
async fn test_renditions_follow_preferred_tier() {
    let instance = FakeInstance::start().await;
    let service =
        CatalogService::for_instance(&instance.preferences(), None, &CatalogConfig::default())
            .unwrap();

    let renditions = service.renditions("clip-1").await.unwrap();
    assert!(!renditions.is_live);

    let expected_low = Locator::new("https://media.example/torrents/clip-1-360.torrent");
    let expected_high = Locator::new("https://media.example/torrents/clip-1-720.torrent");
    assert_eq!(renditions.resolve(Tier(480)), Ok(PlaybackSource::Fetch(&expected_low)));
    assert_eq!(renditions.resolve(Tier(720)), Ok(PlaybackSource::Fetch(&expected_high)));
    assert_eq!(renditions.resolve(Tier(240)), Ok(PlaybackSource::Fetch(&expected_low)));
}

#[tokio::test]
async fn test_playlist_files_used_when_no_direct_files() {
    let instance = FakeInstance::start().await;
    let service =
        CatalogService::for_instance(&instance.preferences(), None, &CatalogConfig::default())
            .unwrap();

    let renditions = service.renditions("hls-only").await.unwrap();
    match renditions.resolve(Tier(480)).unwrap() {
        PlaybackSource::Fetch(locator) => {
            assert!(locator.is_magnet());
            assert!(locator.as_str().ends_with("dn=hls-only-1080"));
        }
        other => panic!("unexpected source {other:?}"),
    }
}

#[tokio::test]
async fn test_live_video_streams_playlist() {
    let instance = FakeInstance::start().await;
    let service =
        CatalogService::for_instance(&instance.preferences(), None, &CatalogConfig::default())
            .unwrap();

    let renditions = service.renditions("live-1").await.unwrap();
    let expected = Locator::new("https://media.example/live/live-1/master.m3u8");
    assert_eq!(renditions.resolve(Tier(1080)), Ok(PlaybackSource::Live(&expected)));
}

#[tokio::test]
async fn test_video_without_files_has_no_rendition() {
    let instance = FakeInstance::start().await;
    let service =
        CatalogService::for_instance(&instance.preferences(), None, &CatalogConfig::default())
            .unwrap();

    let renditions = service.renditions("empty").await.unwrap();
    assert_eq!(
        renditions.resolve(Tier(480)),
        Err(SelectionError::NoRenditionAvailable)
    );
}

#[tokio::test]
async fn test_unknown_video_carries_server_message() {
    let instance = FakeInstance::start().await;
    let service =
        CatalogService::for_instance(&instance.preferences(), None, &CatalogConfig::default())
            .unwrap();

    match service.renditions("missing").await {
        Err(error @ CatalogError::CatalogUnavailable { status: 404, .. }) => {
            assert_eq!(error.user_message(), "Video not found");
            assert!(!error.is_warning());
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_instance_is_network_error() {
    let preferences = Preferences::default();
    let service = CatalogService::for_instance(
        &preferences,
        Some("http://127.0.0.1:1"),
        &CatalogConfig::default(),
    )
    .unwrap();

    assert!(matches!(
        service.list(0).await,
        Err(CatalogError::NetworkError { .. })
    ));
}

#[tokio::test]
async fn test_directory_lists_instances() {
    let instance = FakeInstance::start().await;
    let directory = InstanceDirectory::new(&instance.catalog_config()).unwrap();

    let page = directory.list_instances(0, 1).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].host, "framatube.org");
    assert!(page.items[0].describe().contains("Number of local videos: 850"));

    let request = instance.last_request("instances").unwrap();
    assert_eq!(request.params["count"], "1");

    let entries = listing::instance_entries(&page, 1);
    assert_eq!(
        entries[0].target,
        EntryTarget::SelectSource {
            host: "framatube.org".to_string()
        }
    );
    assert_eq!(entries.last().unwrap().target, EntryTarget::NextPage { start: 1 });
}

#[tokio::test]
async fn test_directory_error_uses_first_message() {
    let instance = FakeInstance::start().await;
    let directory = InstanceDirectory::new(&instance.broken_directory_config()).unwrap();

    match directory.list_instances(0, 500).await {
        Err(CatalogError::CatalogUnavailable {
            status, message, ..
        }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Count must be below 100");
        }
        other => panic!("unexpected result {other:?}"),
    }
}
