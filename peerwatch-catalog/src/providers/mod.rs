//! Catalog provider implementations.

use async_trait::async_trait;
use peerwatch_core::ObjectRenditions;

use crate::errors::CatalogError;
use crate::types::{CatalogPage, ListQuery, VideoSummary};

pub mod demo;
pub mod peertube;

pub use demo::DemoProvider;
pub use peertube::PeerTubeProvider;

/// Trait for video catalogs.
///
/// Implementations provide listing, search and rendition lookup through
/// different backends (a PeerTube instance, in-memory demo data).
#[async_trait]
pub trait CatalogProvider: Send + Sync + std::fmt::Debug {
    /// Human-readable origin of the catalog, e.g. the instance URL.
    fn source(&self) -> &str;

    /// Lists one page of videos.
    ///
    /// # Errors
    /// - `CatalogError::CatalogUnavailable` - Catalog rejected the request
    /// - `CatalogError::NetworkError` - Network connectivity issues
    async fn list_objects(
        &self,
        query: &ListQuery,
        start: u64,
    ) -> Result<CatalogPage<VideoSummary>, CatalogError>;

    /// Searches videos matching `keywords`.
    ///
    /// # Errors
    /// - `CatalogError::CatalogUnavailable` - Catalog rejected the request
    /// - `CatalogError::NetworkError` - Network connectivity issues
    async fn search_objects(
        &self,
        keywords: &str,
        query: &ListQuery,
        start: u64,
    ) -> Result<CatalogPage<VideoSummary>, CatalogError>;

    /// Every rendition published for the video `id`.
    ///
    /// # Errors
    /// - `CatalogError::CatalogUnavailable` - Unknown video or catalog error
    /// - `CatalogError::ParseError` - Unexpected response shape
    async fn object_renditions(&self, id: &str) -> Result<ObjectRenditions, CatalogError>;
}
