//! Labeled timestamp markers within a track
//!
//! Bookmarks are kept sorted by time. Any two of them can serve as loop
//! boundaries; the first two in time order are used when loop mode is
//! switched on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bookmark identifier (creation time in epoch milliseconds)
pub type BookmarkId = u64;

/// A user-labeled timestamp in the track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: BookmarkId,
    /// Position in seconds
    pub time: f64,
    pub label: String,
    /// CSS color string
    pub color: String,
    /// Times the user jumped to this bookmark
    #[serde(default)]
    pub play_count: u32,
}

/// Time-ordered bookmark collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookmarkList {
    items: Vec<Bookmark>,
}

impl BookmarkList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Bookmark] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bookmark> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Bookmark> {
        self.items
    }

    pub fn get(&self, id: BookmarkId) -> Option<&Bookmark> {
        self.items.iter().find(|b| b.id == id)
    }

    /// Add a bookmark at `time`, labeled by its ordinal at creation
    pub fn add(&mut self, time: f64, created_at: DateTime<Utc>, color: &str) -> BookmarkId {
        let mut id = created_at.timestamp_millis().max(0) as BookmarkId;
        if let Some(max) = self.items.iter().map(|b| b.id).max() {
            if id <= max {
                id = max + 1;
            }
        }

        self.items.push(Bookmark {
            id,
            time,
            label: format!("Bookmark {}", self.items.len() + 1),
            color: color.to_string(),
            play_count: 0,
        });
        self.sort();
        id
    }

    /// Jump target lookup; counts the visit
    pub fn visit(&mut self, id: BookmarkId) -> Option<f64> {
        let bookmark = self.items.iter_mut().find(|b| b.id == id)?;
        bookmark.play_count += 1;
        Some(bookmark.time)
    }

    /// Last bookmark more than `tolerance` seconds before `position`; counts the visit
    pub fn visit_previous(&mut self, position: f64, tolerance: f64) -> Option<f64> {
        let bookmark = self
            .items
            .iter_mut()
            .rev()
            .find(|b| b.time < position - tolerance)?;
        bookmark.play_count += 1;
        Some(bookmark.time)
    }

    /// First bookmark more than `tolerance` seconds after `position`; counts the visit
    pub fn visit_next(&mut self, position: f64, tolerance: f64) -> Option<f64> {
        let bookmark = self
            .items
            .iter_mut()
            .find(|b| b.time > position + tolerance)?;
        bookmark.play_count += 1;
        Some(bookmark.time)
    }

    /// Rename a bookmark. An empty label keeps the current one.
    pub fn rename(&mut self, id: BookmarkId, label: &str) -> bool {
        match self.items.iter_mut().find(|b| b.id == id) {
            Some(bookmark) => {
                let label = label.trim();
                if !label.is_empty() {
                    bookmark.label = label.to_string();
                }
                true
            }
            None => false,
        }
    }

    pub fn recolor(&mut self, id: BookmarkId, color: &str) -> bool {
        match self.items.iter_mut().find(|b| b.id == id) {
            Some(bookmark) => {
                bookmark.color = color.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: BookmarkId) -> Option<Bookmark> {
        let index = self.items.iter().position(|b| b.id == id)?;
        Some(self.items.remove(index))
    }

    fn sort(&mut self) {
        self.items.sort_by(|a, b| a.time.total_cmp(&b.time));
    }
}

impl From<Vec<Bookmark>> for BookmarkList {
    fn from(items: Vec<Bookmark>) -> Self {
        let mut list = Self { items };
        list.sort();
        list
    }
}
