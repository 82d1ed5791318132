//! Client for the public directory of catalog instances.

use peerwatch_core::config::CatalogConfig;
use serde::Deserialize;

use crate::errors::{CatalogError, directory_error_message};
use crate::http;
use crate::types::{CatalogPage, InstanceSummary};

/// Lists known PeerTube instances.
#[derive(Debug, Clone)]
pub struct InstanceDirectory {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct DirectoryPage {
    total: u64,
    data: Vec<DirectoryInstance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryInstance {
    name: String,
    host: String,
    short_description: Option<String>,
    #[serde(default)]
    total_local_videos: u64,
    #[serde(default)]
    total_users: u64,
}

impl From<DirectoryInstance> for InstanceSummary {
    fn from(instance: DirectoryInstance) -> Self {
        Self {
            name: instance.name,
            host: instance.host,
            short_description: instance.short_description,
            total_local_videos: instance.total_local_videos,
            total_users: instance.total_users,
        }
    }
}

impl InstanceDirectory {
    /// Creates a client for the configured directory endpoint.
    ///
    /// # Errors
    /// - `CatalogError::NetworkError` - HTTP client could not be built
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        Ok(Self {
            client: http::build_client(config)?,
            url: config.instance_directory_url.clone(),
        })
    }

    /// Directory endpoint in use.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Lists `count` instances starting at `start`.
    ///
    /// # Errors
    /// - `CatalogError::CatalogUnavailable` - Directory rejected the request
    /// - `CatalogError::NetworkError` - Network connectivity issues
    /// - `CatalogError::ParseError` - Unexpected response shape
    pub async fn list_instances(
        &self,
        start: u64,
        count: u32,
    ) -> Result<CatalogPage<InstanceSummary>, CatalogError> {
        let params = [("count", count.to_string()), ("start", start.to_string())];
        let page: DirectoryPage =
            http::get_json(&self.client, &self.url, &params, directory_error_message).await?;

        tracing::debug!("Directory returned {} of {} instances", page.data.len(), page.total);
        Ok(CatalogPage {
            items: page.data.into_iter().map(InstanceSummary::from).collect(),
            total: page.total,
            start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_page_parses() {
        let page: DirectoryPage = serde_json::from_str(
            r#"{
                "total": 1200,
                "data": [{
                    "id": 1,
                    "name": "Framatube",
                    "host": "framatube.org",
                    "shortDescription": "Framasoft's instance",
                    "totalLocalVideos": 850,
                    "totalUsers": 12
                }]
            }"#,
        )
        .unwrap();

        let instance = InstanceSummary::from(page.data.into_iter().next().unwrap());
        assert_eq!(instance.host, "framatube.org");
        assert!(instance.describe().contains("Number of local videos: 850"));
        assert!(instance.describe().starts_with("Framasoft's instance"));
    }

    #[test]
    fn test_missing_statistics_default_to_zero() {
        let instance: DirectoryInstance =
            serde_json::from_str(r#"{"name": "n", "host": "h.example", "shortDescription": null}"#)
                .unwrap();
        let summary = InstanceSummary::from(instance);
        assert_eq!(summary.total_users, 0);
        assert!(summary.describe().starts_with("\n\n----------"));
    }
}
