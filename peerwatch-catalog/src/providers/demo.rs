//! Demo provider implementation for development and testing.

use async_trait::async_trait;
use peerwatch_core::{ObjectRenditions, Rendition, Tier};

use super::CatalogProvider;
use crate::errors::{CatalogError, NO_DETAILS_MESSAGE};
use crate::types::{CatalogPage, ListQuery, VideoSummary};

const DEMO_SOURCE: &str = "demo://catalog";

#[derive(Debug, Clone)]
struct DemoVideo {
    summary: VideoSummary,
    renditions: ObjectRenditions,
}

/// Demo provider for development and testing.
///
/// Serves a fixed in-memory catalog without external API calls. Videos carry
/// several renditions with magnet locators, plus one live video.
#[derive(Debug, Clone)]
pub struct DemoProvider {
    videos: Vec<DemoVideo>,
}

impl Default for DemoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoProvider {
    pub fn new() -> Self {
        let recorded = [
            ("demo-sintel", "Sintel", 888, &[240, 480, 720, 1080][..]),
            ("demo-big-buck-bunny", "Big Buck Bunny", 596, &[360, 720][..]),
            ("demo-tears-of-steel", "Tears of Steel", 734, &[480, 1080][..]),
            ("demo-cosmos-laundromat", "Cosmos Laundromat", 730, &[720][..]),
        ];

        let mut videos: Vec<DemoVideo> = recorded
            .iter()
            .enumerate()
            .map(|(index, (id, name, duration, tiers))| DemoVideo {
                summary: demo_summary(id, name, *duration, index as u64, false),
                renditions: ObjectRenditions {
                    is_live: false,
                    renditions: tiers
                        .iter()
                        .map(|tier| Rendition::new(Tier(*tier), demo_magnet(id, *tier)))
                        .collect(),
                },
            })
            .collect();

        videos.push(DemoVideo {
            summary: demo_summary("demo-live", "Demo live stream", 0, 0, true),
            renditions: ObjectRenditions {
                is_live: true,
                renditions: vec![Rendition::live("https://demo.invalid/live/master.m3u8")],
            },
        });

        Self { videos }
    }

    fn page(
        &self,
        matching: Vec<&DemoVideo>,
        query: &ListQuery,
        start: u64,
    ) -> CatalogPage<VideoSummary> {
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(start as usize)
            .take(query.count as usize)
            .map(|video| video.summary.clone())
            .collect();
        CatalogPage { items, total, start }
    }
}

#[async_trait]
impl CatalogProvider for DemoProvider {
    fn source(&self) -> &str {
        DEMO_SOURCE
    }

    async fn list_objects(
        &self,
        query: &ListQuery,
        start: u64,
    ) -> Result<CatalogPage<VideoSummary>, CatalogError> {
        Ok(self.page(self.videos.iter().collect(), query, start))
    }

    async fn search_objects(
        &self,
        keywords: &str,
        query: &ListQuery,
        start: u64,
    ) -> Result<CatalogPage<VideoSummary>, CatalogError> {
        let keywords = keywords.to_lowercase();
        let matching = self
            .videos
            .iter()
            .filter(|video| video.summary.name.to_lowercase().contains(&keywords))
            .collect();
        Ok(self.page(matching, query, start))
    }

    async fn object_renditions(&self, id: &str) -> Result<ObjectRenditions, CatalogError> {
        self.videos
            .iter()
            .find(|video| video.summary.id == id)
            .map(|video| video.renditions.clone())
            .ok_or_else(|| CatalogError::CatalogUnavailable {
                url: format!("{DEMO_SOURCE}/videos/{id}"),
                status: 404,
                message: NO_DETAILS_MESSAGE.to_string(),
            })
    }
}

fn demo_summary(id: &str, name: &str, duration: u64, index: u64, is_live: bool) -> VideoSummary {
    VideoSummary {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(format!("Demo video: {name}")),
        duration,
        thumbnail_url: None,
        published_at: None,
        views: 1000 - index * 100,
        likes: 50 - index * 5,
        dislikes: index,
        is_live,
    }
}

fn demo_magnet(id: &str, tier: u32) -> String {
    format!("magnet:?xt=urn:btih:{:0>40}&dn={id}-{tier}", format!("{tier:x}"))
}
