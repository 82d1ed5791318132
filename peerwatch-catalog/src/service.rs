//! Catalog browsing service.
//!
//! Wraps a [`CatalogProvider`] with the listing parameters taken from the user
//! preferences.

use peerwatch_core::config::CatalogConfig;
use peerwatch_core::{ObjectRenditions, Preferences};

use crate::errors::CatalogError;
use crate::providers::{CatalogProvider, DemoProvider, PeerTubeProvider};
use crate::types::{CatalogPage, ListQuery, VideoSummary};

/// Catalog service providing listing, search and rendition lookup.
#[derive(Debug)]
pub struct CatalogService {
    provider: Box<dyn CatalogProvider>,
    query: ListQuery,
}

impl CatalogService {
    /// Creates a service over an arbitrary provider.
    pub fn new(provider: Box<dyn CatalogProvider>, query: ListQuery) -> Self {
        Self { provider, query }
    }

    /// Creates a service for the preferred instance, or `instance` when given.
    ///
    /// # Errors
    /// - `CatalogError::NetworkError` - HTTP client could not be built
    pub fn for_instance(
        preferences: &Preferences,
        instance: Option<&str>,
        config: &CatalogConfig,
    ) -> Result<Self, CatalogError> {
        let instance = instance.unwrap_or(&preferences.preferred_instance);
        let provider = PeerTubeProvider::new(instance, config)?;
        tracing::debug!("Using catalog {}", provider.instance());
        Ok(Self::new(Box::new(provider), ListQuery::from(preferences)))
    }

    /// Creates a service backed by demo data.
    pub fn demo(preferences: &Preferences) -> Self {
        Self::new(Box::new(DemoProvider::new()), ListQuery::from(preferences))
    }

    /// Origin of the catalog.
    pub fn source(&self) -> &str {
        self.provider.source()
    }

    /// Page size used for listings.
    pub fn page_size(&self) -> u32 {
        self.query.count
    }

    /// Lists videos starting at `start`.
    ///
    /// # Errors
    /// - `CatalogError::CatalogUnavailable` - Catalog rejected the request
    /// - `CatalogError::NetworkError` - Network connectivity issues
    pub async fn list(&self, start: u64) -> Result<CatalogPage<VideoSummary>, CatalogError> {
        self.provider.list_objects(&self.query, start).await
    }

    /// Searches videos matching `keywords`.
    ///
    /// # Errors
    /// - `CatalogError::NoResults` - Nothing matched
    /// - `CatalogError::CatalogUnavailable` - Catalog rejected the request
    /// - `CatalogError::NetworkError` - Network connectivity issues
    pub async fn search(
        &self,
        keywords: &str,
        start: u64,
    ) -> Result<CatalogPage<VideoSummary>, CatalogError> {
        let keywords = keywords.trim();
        if keywords.is_empty() {
            return Err(CatalogError::NoResults {
                query: String::new(),
            });
        }

        let page = self.provider.search_objects(keywords, &self.query, start).await?;
        if page.items.is_empty() {
            tracing::warn!("No videos found matching '{}'", keywords);
            return Err(CatalogError::NoResults {
                query: keywords.to_string(),
            });
        }
        Ok(page)
    }

    /// Every rendition of the video `id`.
    ///
    /// # Errors
    /// - `CatalogError::CatalogUnavailable` - Unknown video or catalog error
    /// - `CatalogError::ParseError` - Unexpected response shape
    pub async fn renditions(&self, id: &str) -> Result<ObjectRenditions, CatalogError> {
        self.provider.object_renditions(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_without_match_is_no_results() {
        let service = CatalogService::demo(&Preferences::default());
        let result = service.search("no such video", 0).await;

        match result {
            Err(error @ CatalogError::NoResults { .. }) => {
                assert!(error.is_warning());
                assert!(error.to_string().contains("no such video"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_search_is_no_results() {
        let service = CatalogService::demo(&Preferences::default());
        assert!(matches!(
            service.search("   ", 0).await,
            Err(CatalogError::NoResults { .. })
        ));
    }

    #[tokio::test]
    async fn test_listing_uses_preferred_page_size() {
        let preferences = Preferences {
            items_per_page: 3,
            ..Preferences::default()
        };
        let service = CatalogService::demo(&preferences);

        let page = service.list(0).await.unwrap();
        assert_eq!(service.page_size(), 3);
        assert_eq!(page.items.len(), 3);
        assert!(page.has_more(service.page_size()));
    }

    #[test]
    fn test_instance_override_wins() {
        let service = CatalogService::for_instance(
            &Preferences::default(),
            Some("peertube.example.org"),
            &CatalogConfig::default(),
        )
        .unwrap();
        assert_eq!(service.source(), "https://peertube.example.org");
    }
}
