//! Centralized configuration for Peerwatch.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;
use std::time::Duration;

/// Central configuration for all Peerwatch components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct PeerwatchConfig {
    pub fetch: FetchConfig,
    pub engine: EngineConfig,
    pub player: PlayerConfig,
    pub catalog: CatalogConfig,
}

/// Background fetch coordination configuration.
///
/// Controls how long the orchestrating flow waits for content to become
/// playable and where fetched content is written.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Upper bound on the wait for a readiness signal
    pub ready_timeout: Duration,
    /// Delay applied after readiness before the path is handed out
    pub ready_grace: Duration,
    /// Root directory for per-session download directories
    pub download_dir: PathBuf,
    /// Bytes that must be on disk before sequential playback is viable
    pub ready_threshold_bytes: u64,
    /// How often the process engine inspects the download directory
    pub poll_interval: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(10),
            ready_grace: Duration::from_secs(3),
            download_dir: std::env::temp_dir().join("peerwatch"),
            ready_threshold_bytes: 2 * 1024 * 1024, // 2 MiB
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Torrent engine configuration.
///
/// The process engine drives an external BitTorrent client; the simulated
/// engine runs in-process for development.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// External torrent client executable
    pub program: String,
    /// Arguments passed to the client. `{destination}` and `{locator}` are
    /// substituted per fetch.
    pub args: Vec<String>,
    /// Use the in-process simulated engine instead of an external client
    pub simulated: bool,
    /// Delay before the simulated engine announces readiness
    pub simulated_ready_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "aria2c".to_string(),
            args: [
                "--seed-time=0",
                "--file-allocation=none",
                "--follow-torrent=mem",
                "--stream-piece-selector=inorder",
                "--bt-prioritize-piece=head",
                "--summary-interval=0",
                "--dir",
                "{destination}",
                "{locator}",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            simulated: false,
            simulated_ready_delay: Duration::from_secs(2),
        }
    }
}

/// Media player configuration for the command-backed playback sink.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Player executable
    pub program: String,
    /// Arguments placed before the media path
    pub args: Vec<String>,
    /// Line printed by the player once rendering begins. When `None`,
    /// rendering is assumed to start as soon as the process is running.
    pub started_marker: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            program: "mpv".to_string(),
            args: vec![
                "--really-quiet".to_string(),
                "--term-playing-msg=peerwatch:playing".to_string(),
            ],
            started_marker: Some("peerwatch:playing".to_string()),
        }
    }
}

/// Catalog HTTP client configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Timeout applied to every catalog request
    pub request_timeout: Duration,
    /// Endpoint listing known instances
    pub instance_directory_url: String,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            instance_directory_url: "https://instances.joinpeertube.org/api/v1/instances"
                .to_string(),
            user_agent: "peerwatch/0.1.0",
        }
    }
}

impl PeerwatchConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(seconds) = env_u64("PEERWATCH_READY_TIMEOUT") {
            config.fetch.ready_timeout = Duration::from_secs(seconds);
        }

        if let Some(millis) = env_u64("PEERWATCH_READY_GRACE_MS") {
            config.fetch.ready_grace = Duration::from_millis(millis);
        }

        if let Ok(dir) = std::env::var("PEERWATCH_DOWNLOAD_DIR") {
            config.fetch.download_dir = PathBuf::from(dir);
        }

        if let Ok(program) = std::env::var("PEERWATCH_ENGINE") {
            config.engine.program = program;
        }

        if let Ok(enabled) = std::env::var("PEERWATCH_SIMULATED_ENGINE") {
            config.engine.simulated = enabled.parse().unwrap_or(false);
        }

        if let Ok(program) = std::env::var("PEERWATCH_PLAYER") {
            config.player.program = program;
        }

        if let Some(seconds) = env_u64("PEERWATCH_CATALOG_TIMEOUT") {
            config.catalog.request_timeout = Duration::from_secs(seconds);
        }

        config
    }

    /// Creates a configuration for deterministic testing.
    ///
    /// Uses the simulated engine, no grace delay and a short readiness delay.
    pub fn for_testing() -> Self {
        let mut config = Self::default();
        config.fetch.ready_grace = Duration::ZERO;
        config.engine.simulated = true;
        config.engine.simulated_ready_delay = Duration::from_millis(100);
        config.player.started_marker = None;
        config
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fetch_bounds() {
        let config = PeerwatchConfig::default();
        assert_eq!(config.fetch.ready_timeout, Duration::from_secs(10));
        assert_eq!(config.fetch.ready_grace, Duration::from_secs(3));
        assert_eq!(config.catalog.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_engine_args_carry_placeholders() {
        let config = EngineConfig::default();
        assert!(config.args.iter().any(|arg| arg == "{destination}"));
        assert!(config.args.iter().any(|arg| arg == "{locator}"));
    }

    #[test]
    fn test_testing_profile_is_simulated() {
        let config = PeerwatchConfig::for_testing();
        assert!(config.engine.simulated);
        assert_eq!(config.fetch.ready_grace, Duration::ZERO);
    }
}
