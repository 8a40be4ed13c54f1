//! Stored record schemas
//!
//! Field names are camelCase and timestamps are epoch milliseconds so the
//! records stay readable by the browser build of the tool.

use crate::bookmarks::Bookmark;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key holding aggregate practice time and the last session pointer
pub const GLOBAL_KEY: &str = "pianoPracticeGlobal";

/// Key holding the recent songs list
pub const RECENT_KEY: &str = "recentSongs";

/// Identifier for a song: `<file_name>_<floor(duration)>`
pub fn song_id(file_name: &str, duration: f64) -> String {
    let seconds = if duration.is_finite() {
        duration.max(0.0).floor() as u64
    } else {
        0
    };
    format!("{}_{}", file_name, seconds)
}

/// Storage key for a song id
pub fn song_key(song_id: &str) -> String {
    format!("song_{}", song_id)
}

fn default_speed() -> f64 {
    1.0
}

fn default_volume() -> u8 {
    100
}

fn default_countdown_enabled() -> bool {
    true
}

/// Per-song practice state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongRecord {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pub loop_mode: bool,
    #[serde(default)]
    pub loop_start: Option<f64>,
    #[serde(default)]
    pub loop_end: Option<f64>,
    /// Playback rate
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Volume 0-100
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default = "default_countdown_enabled")]
    pub countdown_enabled: bool,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_practiced: Option<DateTime<Utc>>,
    /// Milliseconds
    #[serde(default)]
    pub total_practice_time: u64,
}

impl Default for SongRecord {
    fn default() -> Self {
        Self {
            file_name: None,
            bookmarks: Vec::new(),
            loop_mode: false,
            loop_start: None,
            loop_end: None,
            speed: default_speed(),
            volume: default_volume(),
            countdown_enabled: default_countdown_enabled(),
            last_practiced: None,
            total_practice_time: 0,
        }
    }
}

/// Pointer to the most recent session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastSession {
    pub file_name: Option<String>,
    pub song_id: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Aggregate data across all songs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalData {
    /// Milliseconds
    #[serde(default)]
    pub total_practice_time: u64,
    #[serde(default)]
    pub last_session: Option<LastSession>,
}

/// Entry of the recent songs list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSong {
    pub id: String,
    pub name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_practiced: DateTime<Utc>,
}

/// Human "time since" label for a timestamp
pub fn time_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h ago", seconds / 3600)
    } else {
        format!("{}d ago", seconds / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_song_id_floors_duration() {
        assert_eq!(song_id("etude.mp3", 183.92), "etude.mp3_183");
        assert_eq!(song_key("etude.mp3_183"), "song_etude.mp3_183");
        assert_eq!(song_id("x.wav", f64::NAN), "x.wav_0");
    }

    #[test]
    fn test_record_reads_browser_format() {
        let json = r##"{
            "fileName": "etude.mp3",
            "bookmarks": [{"id": 1700000000000, "time": 0, "label": "Intro", "color": "#ef4444", "playCount": 2}],
            "loopMode": true,
            "loopStart": 0,
            "loopEnd": 12.5,
            "speed": 0.75,
            "volume": 80,
            "countdownEnabled": false,
            "lastPracticed": 1700000000000,
            "totalPracticeTime": 90000
        }"##;
        let record: SongRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.bookmarks[0].play_count, 2);
        // A zero bound is a real bound
        assert_eq!(record.loop_start, Some(0.0));
        assert_eq!(record.loop_end, Some(12.5));
        assert_eq!(record.volume, 80);
        assert!(!record.countdown_enabled);
        assert_eq!(
            record.last_practiced,
            Some(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
        );
    }

    #[test]
    fn test_sparse_record_uses_defaults() {
        let record: SongRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record, SongRecord::default());
        assert_eq!(record.speed, 1.0);
        assert!(record.countdown_enabled);
    }

    #[test]
    fn test_time_since() {
        let now = Utc.timestamp_opt(1_000_000, 0).unwrap();
        assert_eq!(time_since(now - Duration::seconds(30), now), "just now");
        assert_eq!(time_since(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(time_since(now - Duration::hours(3), now), "3h ago");
        assert_eq!(time_since(now - Duration::days(2), now), "2d ago");
    }
}
