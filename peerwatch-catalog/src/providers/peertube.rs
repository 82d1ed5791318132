//! PeerTube instance provider.

use async_trait::async_trait;
use peerwatch_core::config::CatalogConfig;
use peerwatch_core::{ObjectRenditions, Rendition, Tier, instance_url};
use serde::Deserialize;

use super::CatalogProvider;
use crate::errors::{CatalogError, instance_error_message};
use crate::http;
use crate::types::{CatalogPage, ListQuery, VideoSummary};

/// Provider talking to the REST API of one PeerTube instance.
#[derive(Debug, Clone)]
pub struct PeerTubeProvider {
    client: reqwest::Client,
    instance: String,
}

/// Paginated response of the listing and search endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct PeerTubePage<T> {
    total: u64,
    data: Vec<T>,
}

/// Video entry of a listing or search response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PeerTubeVideo {
    uuid: String,
    name: String,
    description: Option<String>,
    #[serde(default)]
    duration: u64,
    thumbnail_path: Option<String>,
    published_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    views: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    dislikes: u64,
    #[serde(default)]
    is_live: bool,
}

/// Detail response of `videos/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PeerTubeVideoDetails {
    #[serde(default)]
    files: Vec<PeerTubeFile>,
    #[serde(default)]
    streaming_playlists: Vec<PeerTubePlaylist>,
    #[serde(default)]
    is_live: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeerTubeFile {
    resolution: PeerTubeResolution,
    torrent_url: Option<String>,
    magnet_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PeerTubeResolution {
    id: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeerTubePlaylist {
    playlist_url: Option<String>,
    #[serde(default)]
    files: Vec<PeerTubeFile>,
}

impl PeerTubeProvider {
    /// Creates a provider for `instance`. Hosts without a scheme get `https://`.
    ///
    /// # Errors
    /// - `CatalogError::NetworkError` - HTTP client could not be built
    pub fn new(instance: &str, config: &CatalogConfig) -> Result<Self, CatalogError> {
        Ok(Self {
            client: http::build_client(config)?,
            instance: instance_url(instance),
        })
    }

    /// Base URL of the instance.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.instance, path)
    }

    async fn fetch_page(
        &self,
        path: &str,
        params: &[(&str, String)],
        start: u64,
    ) -> Result<CatalogPage<VideoSummary>, CatalogError> {
        let page: PeerTubePage<PeerTubeVideo> =
            http::get_json(&self.client, &self.api_url(path), params, instance_error_message)
                .await?;
        Ok(page.into_catalog_page(&self.instance, start))
    }
}

#[async_trait]
impl CatalogProvider for PeerTubeProvider {
    fn source(&self) -> &str {
        &self.instance
    }

    async fn list_objects(
        &self,
        query: &ListQuery,
        start: u64,
    ) -> Result<CatalogPage<VideoSummary>, CatalogError> {
        self.fetch_page("videos", &query.params(start), start).await
    }

    async fn search_objects(
        &self,
        keywords: &str,
        query: &ListQuery,
        start: u64,
    ) -> Result<CatalogPage<VideoSummary>, CatalogError> {
        let mut params = query.params(start);
        params.push(("search", keywords.to_string()));
        self.fetch_page("search/videos", &params, start).await
    }

    async fn object_renditions(&self, id: &str) -> Result<ObjectRenditions, CatalogError> {
        let details: PeerTubeVideoDetails = http::get_json(
            &self.client,
            &self.api_url(&format!("videos/{id}")),
            &[],
            instance_error_message,
        )
        .await?;

        let renditions = details.into_renditions();
        tracing::debug!(
            "Video {} has {} renditions (live: {})",
            id,
            renditions.renditions.len(),
            renditions.is_live
        );
        Ok(renditions)
    }
}

impl PeerTubePage<PeerTubeVideo> {
    pub(crate) fn into_catalog_page(self, instance: &str, start: u64) -> CatalogPage<VideoSummary> {
        CatalogPage {
            items: self
                .data
                .into_iter()
                .map(|video| video.into_summary(instance))
                .collect(),
            total: self.total,
            start,
        }
    }
}

impl PeerTubeVideo {
    fn into_summary(self, instance: &str) -> VideoSummary {
        VideoSummary {
            id: self.uuid,
            name: self.name,
            description: self.description,
            duration: self.duration,
            thumbnail_url: self
                .thumbnail_path
                .map(|path| format!("{}/{}", instance, path.trim_start_matches('/'))),
            published_at: self.published_at,
            views: self.views,
            likes: self.likes,
            dislikes: self.dislikes,
            is_live: self.is_live,
        }
    }
}

impl PeerTubeVideoDetails {
    /// Web-seeded `files` win; HLS playlist files are the fallback when
    /// `files` is empty. Live videos expose only their playlist URL.
    pub(crate) fn into_renditions(self) -> ObjectRenditions {
        if self.is_live {
            let renditions = self
                .streaming_playlists
                .into_iter()
                .find_map(|playlist| playlist.playlist_url)
                .map(Rendition::live)
                .into_iter()
                .collect();
            return ObjectRenditions {
                is_live: true,
                renditions,
            };
        }

        let files = if self.files.is_empty() {
            self.streaming_playlists
                .into_iter()
                .next()
                .map(|playlist| playlist.files)
                .unwrap_or_default()
        } else {
            self.files
        };

        let renditions = files
            .into_iter()
            .filter_map(|file| {
                let locator = file.torrent_url.or(file.magnet_uri)?;
                Some(Rendition::new(Tier(file.resolution.id), locator))
            })
            .collect();

        ObjectRenditions {
            is_live: false,
            renditions,
        }
    }
}
