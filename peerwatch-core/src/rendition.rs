//! Rendition model and quality-tier selection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::locator::Locator;

/// Ordered numeric quality level, typically the vertical resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tier(pub u32);

impl Tier {
    /// Returns the numeric level.
    pub fn level(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.0)
    }
}

/// One fetchable variant of an object.
///
/// `tier` is `None` only for the single rendition of a live object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    pub tier: Option<Tier>,
    pub locator: Locator,
}

impl Rendition {
    /// Creates a tiered rendition.
    pub fn new(tier: Tier, locator: impl Into<Locator>) -> Self {
        Self {
            tier: Some(tier),
            locator: locator.into(),
        }
    }

    /// Creates the untiered rendition of a live object.
    pub fn live(locator: impl Into<Locator>) -> Self {
        Self {
            tier: None,
            locator: locator.into(),
        }
    }
}

/// Every rendition published for one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRenditions {
    pub is_live: bool,
    pub renditions: Vec<Rendition>,
}

/// What the caller should do with a resolved object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSource<'a> {
    /// Live stream handed straight to the playback sink
    Live(&'a Locator),
    /// Recorded object that must be fetched before playback
    Fetch(&'a Locator),
}

impl ObjectRenditions {
    /// Resolves the locator to play for the given preference.
    ///
    /// Live objects bypass selection and yield their single rendition.
    ///
    /// # Errors
    /// - `SelectionError::NoRenditionAvailable` - Nothing to play
    pub fn resolve(&self, preferred: Tier) -> Result<PlaybackSource<'_>, SelectionError> {
        if self.is_live {
            return self
                .renditions
                .first()
                .map(|rendition| PlaybackSource::Live(&rendition.locator))
                .ok_or(SelectionError::NoRenditionAvailable);
        }

        select(&self.renditions, preferred).map(PlaybackSource::Fetch)
    }
}

/// Errors raised while picking a rendition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("No rendition available for this object")]
    NoRenditionAvailable,
}

/// Picks the rendition closest to `preferred`.
///
/// An exact tier wins. Otherwise the highest tier below the preference is
/// taken, and only when nothing lies below does the lowest tier above it
/// qualify. Untiered renditions are not candidates.
///
/// # Errors
/// - `SelectionError::NoRenditionAvailable` - No tiered rendition given
pub fn select(renditions: &[Rendition], preferred: Tier) -> Result<&Locator, SelectionError> {
    let mut best_below: Option<(Tier, &Locator)> = None;
    let mut best_above: Option<(Tier, &Locator)> = None;

    for rendition in renditions {
        let Some(tier) = rendition.tier else {
            tracing::debug!("Ignoring untiered rendition {}", rendition.locator);
            continue;
        };

        if tier == preferred {
            tracing::debug!("Found rendition with preferred tier ({})", preferred);
            return Ok(&rendition.locator);
        }

        if tier < preferred {
            if best_below.is_none_or(|(best, _)| tier > best) {
                tracing::debug!("Found rendition with good lower tier ({})", tier);
                best_below = Some((tier, &rendition.locator));
            }
        } else if best_above.is_none_or(|(best, _)| tier < best) {
            tracing::debug!("Keeping higher tier ({}) as a possible alternative", tier);
            best_above = Some((tier, &rendition.locator));
        }
    }

    if best_below.is_none()
        && let Some((tier, _)) = best_above
    {
        tracing::debug!("Using rendition with higher tier as alternative ({})", tier);
    }

    best_below
        .or(best_above)
        .map(|(_, locator)| locator)
        .ok_or(SelectionError::NoRenditionAvailable)
}
