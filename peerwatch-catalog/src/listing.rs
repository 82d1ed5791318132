//! Turns catalog pages into user-facing menu entries.

use std::fmt;

use crate::types::{CatalogPage, InstanceSummary, VideoSummary};

/// Top-level menu actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeAction {
    BrowseVideos,
    SearchVideos,
    BrowseInstances,
}

/// What selecting an entry does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryTarget {
    /// Play the video with this id
    Play { id: String },
    /// Make this host the preferred instance
    SelectSource { host: String },
    /// Show the page starting at `start`
    NextPage { start: u64 },
    Home(HomeAction),
}

/// One line of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub label: String,
    pub detail: Option<String>,
    pub target: EntryTarget,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            EntryTarget::Play { id } => write!(f, "{}  [{}]", self.label, id),
            EntryTarget::SelectSource { host } => write!(f, "{}  [{}]", self.label, host),
            EntryTarget::NextPage { start } => write!(f, "{}  [--start {}]", self.label, start),
            EntryTarget::Home(_) => write!(f, "{}", self.label),
        }
    }
}

/// Entries of the home menu.
pub fn home_entries() -> Vec<Entry> {
    [
        ("Browse videos on the selected instance", HomeAction::BrowseVideos),
        ("Search videos on the selected instance", HomeAction::SearchVideos),
        ("Browse instances", HomeAction::BrowseInstances),
    ]
    .into_iter()
    .map(|(label, action)| Entry {
        label: label.to_string(),
        detail: None,
        target: EntryTarget::Home(action),
    })
    .collect()
}

/// Video entries of `page`, followed by a next-page entry when more remain.
pub fn video_entries(page: &CatalogPage<VideoSummary>, page_size: u32) -> Vec<Entry> {
    let mut entries: Vec<Entry> = page
        .items
        .iter()
        .map(|video| {
            let mut notes = vec![if video.is_live {
                "live".to_string()
            } else {
                video.format_duration()
            }];
            if let Some(rating) = video.rating() {
                notes.push(format!("{:.0}% liked", rating * 100.0));
            }
            let label = format!("{} ({})", video.name, notes.join(", "));
            Entry {
                label,
                detail: video.description.clone(),
                target: EntryTarget::Play {
                    id: video.id.clone(),
                },
            }
        })
        .collect();

    entries.extend(next_page_entry(page, page_size));
    entries
}

/// Instance entries of `page`, followed by a next-page entry when more remain.
pub fn instance_entries(page: &CatalogPage<InstanceSummary>, page_size: u32) -> Vec<Entry> {
    let mut entries: Vec<Entry> = page
        .items
        .iter()
        .map(|instance| Entry {
            label: instance.name.clone(),
            detail: Some(instance.describe()),
            target: EntryTarget::SelectSource {
                host: instance.host.clone(),
            },
        })
        .collect();

    entries.extend(next_page_entry(page, page_size));
    entries
}

/// "Next page (n/m)" entry, present only when items remain after `page`.
pub fn next_page_entry<T>(page: &CatalogPage<T>, page_size: u32) -> Option<Entry> {
    if page_size == 0 || !page.has_more(page_size) {
        return None;
    }

    let page_size = u64::from(page_size);
    let next_start = page.start + page_size;
    let next_page = next_start / page_size + 1;
    let total_pages = page.total.div_ceil(page_size);

    Some(Entry {
        label: format!("Next page ({next_page}/{total_pages})"),
        detail: None,
        target: EntryTarget::NextPage { start: next_start },
    })
}
