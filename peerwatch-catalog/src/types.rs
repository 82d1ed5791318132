//! Data types for catalog listings.

use peerwatch_core::{Preferences, VideoFilter};
use serde::{Deserialize, Serialize};

/// One page of a paginated catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage<T> {
    pub items: Vec<T>,
    /// Number of items across all pages
    pub total: u64,
    /// Index of the first item of this page
    pub start: u64,
}

impl<T> CatalogPage<T> {
    /// Checks whether items remain after this page.
    pub fn has_more(&self, page_size: u32) -> bool {
        self.total > self.start + u64::from(page_size)
    }
}

/// Video as shown in a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    /// Identifier accepted by rendition lookup
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Length in seconds
    pub duration: u64,
    /// Absolute thumbnail URL
    pub thumbnail_url: Option<String>,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
    pub views: u64,
    pub likes: u64,
    pub dislikes: u64,
    pub is_live: bool,
}

impl VideoSummary {
    /// Share of likes among all votes, if anyone voted.
    pub fn rating(&self) -> Option<f64> {
        let votes = self.likes + self.dislikes;
        (votes > 0).then(|| self.likes as f64 / votes as f64)
    }

    /// Duration formatted as `h:mm:ss` or `m:ss`.
    pub fn format_duration(&self) -> String {
        let hours = self.duration / 3600;
        let minutes = (self.duration % 3600) / 60;
        let seconds = self.duration % 60;
        if hours > 0 {
            format!("{hours}:{minutes:02}:{seconds:02}")
        } else {
            format!("{minutes}:{seconds:02}")
        }
    }
}

/// Catalog instance listed by the instance directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub name: String,
    /// Host name without scheme
    pub host: String,
    pub short_description: Option<String>,
    pub total_local_videos: u64,
    pub total_users: u64,
}

impl InstanceSummary {
    /// Description followed by the instance statistics.
    pub fn describe(&self) -> String {
        format!(
            "{}\n\n----------\nNumber of local videos: {}\nNumber of users: {}",
            self.short_description.as_deref().unwrap_or_default(),
            self.total_local_videos,
            self.total_users
        )
    }
}

/// Common listing parameters taken from the user preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub sort: String,
    pub count: u32,
    pub filter: VideoFilter,
}

impl ListQuery {
    /// Query parameters for a page starting at `start`.
    pub fn params(&self, start: u64) -> Vec<(&'static str, String)> {
        vec![
            ("sort", self.sort.clone()),
            ("count", self.count.to_string()),
            ("filter", self.filter.as_query_value().to_string()),
            ("start", start.to_string()),
        ]
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::from(&Preferences::default())
    }
}

impl From<&Preferences> for ListQuery {
    fn from(preferences: &Preferences) -> Self {
        Self {
            sort: preferences.sort_method.clone(),
            count: preferences.items_per_page,
            filter: preferences.video_filter,
        }
    }
}
