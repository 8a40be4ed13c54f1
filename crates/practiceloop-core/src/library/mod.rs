//! Song-scoped persistence
//!
//! This module contains:
//! - Key-value storage backends ([`store`])
//! - Stored record schemas and key naming ([`records`])
//! - [`SongLibrary`], the typed layer the session reads and writes through

pub mod records;
pub mod store;

pub use records::{song_id, song_key, GlobalData, LastSession, RecentSong, SongRecord};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};

use chrono::{DateTime, Utc};
use records::{GLOBAL_KEY, RECENT_KEY};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Typed access to song records, global data and the recent songs list
#[derive(Debug)]
pub struct SongLibrary<S> {
    store: S,
    recent_limit: usize,
}

impl<S: KeyValueStore> SongLibrary<S> {
    pub fn new(store: S, recent_limit: usize) -> Self {
        Self {
            store,
            recent_limit: recent_limit.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Stored state for `song_id`, if any
    pub fn load_song(&self, song_id: &str) -> Result<Option<SongRecord>, StoreError> {
        self.read(&song_key(song_id))
    }

    pub fn save_song(&mut self, song_id: &str, record: &SongRecord) -> Result<(), StoreError> {
        self.write(&song_key(song_id), record)
    }

    /// Number of bookmarks stored for a song (0 when unknown)
    pub fn bookmark_count(&self, song_id: &str) -> usize {
        match self.load_song(song_id) {
            Ok(Some(record)) => record.bookmarks.len(),
            _ => 0,
        }
    }

    pub fn load_global(&self) -> Result<GlobalData, StoreError> {
        Ok(self.read(GLOBAL_KEY)?.unwrap_or_default())
    }

    pub fn save_global(&mut self, global: &GlobalData) -> Result<(), StoreError> {
        self.write(GLOBAL_KEY, global)
    }

    /// Recent songs, most recent first
    pub fn recent_songs(&self) -> Result<Vec<RecentSong>, StoreError> {
        Ok(self.read(RECENT_KEY)?.unwrap_or_default())
    }

    /// Move `song_id` to the front of the recent list
    pub fn touch_recent(
        &mut self,
        song_id: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut recent = match self.recent_songs() {
            Ok(recent) => recent,
            Err(e) => {
                tracing::warn!(error = %e, "Recent songs list unreadable, starting over");
                Vec::new()
            }
        };
        recent.retain(|s| s.id != song_id);
        recent.insert(
            0,
            RecentSong {
                id: song_id.to_string(),
                name: name.to_string(),
                last_practiced: now,
            },
        );
        recent.truncate(self.recent_limit);
        self.write(RECENT_KEY, &recent)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, json)
    }
}
