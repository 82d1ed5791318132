//! Peerwatch Catalog - Video discovery on PeerTube instances
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Lists and searches videos on a catalog instance, browses the public
//! instance directory, and looks up the renditions of a video for playback.

pub mod directory;
pub mod errors;
mod http;
pub mod listing;
pub mod providers;
pub mod service;
pub mod types;

// Re-export main types
pub use directory::InstanceDirectory;
pub use errors::CatalogError;
pub use listing::{Entry, EntryTarget, HomeAction};
pub use providers::{CatalogProvider, DemoProvider, PeerTubeProvider};
pub use service::CatalogService;
pub use types::{CatalogPage, InstanceSummary, ListQuery, VideoSummary};

/// Convenience type alias for Results with CatalogError.
pub type Result<T> = std::result::Result<T, CatalogError>;
