//! Opaque content addresses handed to the torrent engine.

use std::fmt;

use serde::{Deserialize, Serialize};

const MAX_SESSION_NAME_LEN: usize = 96;

/// Address of fetchable content, typically a `.torrent` URL or magnet URI.
///
/// The value is never interpreted for routing; equality of the raw string is
/// the identity used to match readiness and playback events to a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    /// Creates a locator from its raw string form.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks whether this locator is a magnet URI.
    pub fn is_magnet(&self) -> bool {
        self.0.starts_with("magnet:")
    }

    /// Filesystem-safe name used for the per-session download directory.
    ///
    /// Magnet URIs use their display name (or info hash), URLs use the last
    /// path segment without its `.torrent` extension.
    pub fn session_name(&self) -> String {
        let candidate = if self.is_magnet() {
            magnet_display_name(&self.0).or_else(|| magnet_info_hash(&self.0))
        } else {
            url::Url::parse(&self.0).ok().and_then(|url| {
                url.path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
                    .filter(|segment| !segment.is_empty())
                    .map(|segment| {
                        segment
                            .strip_suffix(".torrent")
                            .map(str::to_string)
                            .unwrap_or(segment)
                    })
            })
        };

        sanitize(candidate.as_deref().unwrap_or(&self.0))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Locator {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

fn magnet_display_name(raw: &str) -> Option<String> {
    let magnet = magnet_url::Magnet::new(raw).ok()?;
    let name = magnet.display_name()?.to_string();
    let decoded = urlencoding::decode(&name)
        .map(|cow| cow.into_owned())
        .unwrap_or(name);
    Some(decoded.replace('+', " "))
}

fn magnet_info_hash(raw: &str) -> Option<String> {
    raw.split(['?', '&'])
        .find_map(|param| param.strip_prefix("xt=urn:btih:"))
        .map(str::to_string)
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_SESSION_NAME_LEN)
        .collect();

    let trimmed = cleaned.trim_matches(['.', '_']);
    if trimmed.is_empty() {
        "fetch".to_string()
    } else {
        trimmed.to_string()
    }
}
