//! User preferences persisted between runs.
//!
//! Preferences are read-only for everything except instance selection.
//! A missing file yields the defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::playback::StopBeforeStartPolicy;
use crate::rendition::Tier;

/// File name inside the configuration directory.
pub const PREFERENCES_FILE: &str = "preferences.json";

const DEFAULT_INSTANCE: &str = "https://framatube.org";

/// Errors raised while loading or saving preferences.
#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("Could not access preferences at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed preferences file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid value '{value}' for preference '{key}'")]
    InvalidValue { key: String, value: String },
}

/// Which objects a listing covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VideoFilter {
    /// Objects hosted by the instance itself
    #[default]
    Local,
    /// Local objects including private and unlisted ones
    AllLocal,
}

impl VideoFilter {
    /// Interprets a stored setting. Anything mentioning `all-local` selects
    /// [`VideoFilter::AllLocal`], everything else [`VideoFilter::Local`].
    pub fn from_setting(value: &str) -> Self {
        if value.contains("all-local") {
            VideoFilter::AllLocal
        } else {
            VideoFilter::Local
        }
    }

    /// Value sent to the catalog API.
    pub fn as_query_value(self) -> &'static str {
        match self {
            VideoFilter::Local => "local",
            VideoFilter::AllLocal => "all-local",
        }
    }
}

impl From<String> for VideoFilter {
    fn from(value: String) -> Self {
        VideoFilter::from_setting(&value)
    }
}

impl From<VideoFilter> for String {
    fn from(filter: VideoFilter) -> Self {
        filter.as_query_value().to_string()
    }
}

/// Persisted user choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Base URL of the catalog instance to browse
    pub preferred_instance: String,
    /// Quality tier to aim for when picking a rendition
    pub preferred_tier: Tier,
    /// Listing page size
    pub items_per_page: u32,
    /// Catalog sort key, e.g. `-likes`
    pub sort_method: String,
    pub video_filter: VideoFilter,
    /// Decision when playback stops before rendering began
    pub pause_prompt: StopBeforeStartPolicy,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            preferred_instance: DEFAULT_INSTANCE.to_string(),
            preferred_tier: Tier(480),
            items_per_page: 20,
            sort_method: "-likes".to_string(),
            video_filter: VideoFilter::Local,
            pause_prompt: StopBeforeStartPolicy::Ask,
        }
    }
}

impl Preferences {
    /// Default location: `$XDG_CONFIG_HOME/peerwatch/preferences.json`,
    /// falling back to `$HOME/.config/peerwatch/preferences.json`.
    pub fn default_path() -> Option<PathBuf> {
        let config_dir = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(config_dir.join("peerwatch").join(PREFERENCES_FILE))
    }

    /// Loads preferences from `path`, returning defaults when it does not exist.
    ///
    /// # Errors
    /// - `PreferencesError::Io` - File exists but cannot be read
    /// - `PreferencesError::Parse` - File is not valid preferences JSON
    /// - `PreferencesError::InvalidValue` - A value is out of range
    pub fn load(path: &Path) -> Result<Self, PreferencesError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No preferences at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(PreferencesError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let preferences: Self =
            serde_json::from_str(&contents).map_err(|e| PreferencesError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        preferences.validate()?;
        Ok(preferences)
    }

    /// Writes preferences to `path`, creating parent directories.
    ///
    /// # Errors
    /// - `PreferencesError::Io` - File cannot be written
    pub fn save(&self, path: &Path) -> Result<(), PreferencesError> {
        let io_error = |source| PreferencesError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| PreferencesError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(io_error)?;

        tracing::info!("Saved preferences to {}", path.display());
        Ok(())
    }

    /// Sets the preferred instance, adding an `https://` scheme to bare hosts.
    pub fn set_preferred_instance(&mut self, instance: &str) {
        self.preferred_instance = instance_url(instance);
    }

    fn validate(&self) -> Result<(), PreferencesError> {
        if self.items_per_page == 0 {
            return Err(PreferencesError::InvalidValue {
                key: "items_per_page".to_string(),
                value: self.items_per_page.to_string(),
            });
        }
        if self.preferred_tier.level() == 0 {
            return Err(PreferencesError::InvalidValue {
                key: "preferred_tier".to_string(),
                value: self.preferred_tier.to_string(),
            });
        }
        if self.preferred_instance.trim().is_empty() {
            return Err(PreferencesError::InvalidValue {
                key: "preferred_instance".to_string(),
                value: String::new(),
            });
        }
        Ok(())
    }
}

/// Base URL of an instance given as a bare host or a URL.
///
/// Bare hosts get `https://`; trailing slashes are dropped.
pub fn instance_url(instance: &str) -> String {
    let instance = instance.trim().trim_end_matches('/');
    if instance.starts_with("https://") || instance.starts_with("http://") {
        instance.to_string()
    } else {
        format!("https://{instance}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let preferences = Preferences::load(&dir.path().join("absent.json")).unwrap();

        assert_eq!(preferences, Preferences::default());
        assert_eq!(preferences.preferred_tier, Tier(480));
        assert_eq!(preferences.items_per_page, 20);
        assert_eq!(preferences.sort_method, "-likes");
    }

    #[test]
    fn test_save_then_load_keeps_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(PREFERENCES_FILE);

        let mut preferences = Preferences::default();
        preferences.set_preferred_instance("peertube.example.org");
        preferences.pause_prompt = StopBeforeStartPolicy::NeverPause;
        preferences.save(&path).unwrap();

        let loaded = Preferences::load(&path).unwrap();
        assert_eq!(loaded.preferred_instance, "https://peertube.example.org");
        assert_eq!(loaded.pause_prompt, StopBeforeStartPolicy::NeverPause);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PREFERENCES_FILE);
        std::fs::write(&path, r#"{ "preferred_tier": 720, "video_filter": "all-local" }"#).unwrap();

        let loaded = Preferences::load(&path).unwrap();
        assert_eq!(loaded.preferred_tier, Tier(720));
        assert_eq!(loaded.video_filter, VideoFilter::AllLocal);
        assert_eq!(loaded.items_per_page, 20);
    }

    #[test]
    fn test_filter_setting_conversion() {
        assert_eq!(VideoFilter::from_setting("all-local"), VideoFilter::AllLocal);
        assert_eq!(VideoFilter::from_setting("only all-local videos"), VideoFilter::AllLocal);
        assert_eq!(VideoFilter::from_setting("local"), VideoFilter::Local);
        assert_eq!(VideoFilter::from_setting("whatever"), VideoFilter::Local);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PREFERENCES_FILE);
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Preferences::load(&path),
            Err(PreferencesError::Parse { .. })
        ));
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PREFERENCES_FILE);
        std::fs::write(&path, r#"{ "items_per_page": 0 }"#).unwrap();

        assert!(matches!(
            Preferences::load(&path),
            Err(PreferencesError::InvalidValue { key, .. }) if key == "items_per_page"
        ));
    }

    #[test]
    fn test_instance_keeps_existing_scheme() {
        let mut preferences = Preferences::default();
        preferences.set_preferred_instance("http://localhost:9000/");
        assert_eq!(preferences.preferred_instance, "http://localhost:9000");
    }

    #[test]
    fn test_instance_url_forms() {
        assert_eq!(instance_url("framatube.org"), "https://framatube.org");
        assert_eq!(instance_url(" https://framatube.org/ "), "https://framatube.org");
        assert_eq!(instance_url("http://localhost:9000/"), "http://localhost:9000");
    }
}
