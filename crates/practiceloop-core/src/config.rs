//! Tunable engine configuration
//!
//! Window geometry, countdown timing and library limits, stored as JSON at
//! `<data_dir>/practiceloop/config.json` (or equivalent). Every field has a
//! default so partial or missing files still load.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_wide_window() -> WindowConfig {
    WindowConfig {
        size: crate::WIDE_WINDOW_SECS,
        center_threshold: 0.5,
    }
}

fn default_narrow_window() -> WindowConfig {
    WindowConfig {
        size: crate::NARROW_WINDOW_SECS,
        center_threshold: 0.2,
    }
}

fn default_catchup_speed() -> f64 {
    2.0
}

fn default_countdown_ticks() -> u32 {
    crate::COUNTDOWN_TICKS
}

fn default_countdown_interval_ms() -> u64 {
    1000
}

fn default_position_update_interval_ms() -> u64 {
    250
}

fn default_bookmark_nav_tolerance() -> f64 {
    0.5
}

fn default_recent_songs_limit() -> usize {
    10
}

fn default_volume() -> u8 {
    100
}

fn default_countdown_enabled() -> bool {
    true
}

fn default_bookmark_color() -> String {
    "#ef4444".to_string()
}

/// Geometry of one zoom window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Full width of the window in seconds
    pub size: f64,
    /// Distance from center (seconds) within which the window drifts at playback speed
    pub center_threshold: f64,
}

impl WindowConfig {
    /// Half of the window width
    pub fn half(&self) -> f64 {
        self.size / 2.0
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeConfig {
    /// The ±15s view
    #[serde(default = "default_wide_window")]
    pub wide_window: WindowConfig,
    /// The ±5s view
    #[serde(default = "default_narrow_window")]
    pub narrow_window: WindowConfig,
    /// Multiplier applied to playback rate while a window catches up
    #[serde(default = "default_catchup_speed")]
    pub catchup_speed: f64,
    /// Countdown length in ticks
    #[serde(default = "default_countdown_ticks")]
    pub countdown_ticks: u32,
    /// Interval between countdown ticks
    #[serde(default = "default_countdown_interval_ms")]
    pub countdown_interval_ms: u64,
    /// Position-update cadence used by the async driver
    #[serde(default = "default_position_update_interval_ms")]
    pub position_update_interval_ms: u64,
    /// Minimum distance (seconds) for previous/next bookmark navigation
    #[serde(default = "default_bookmark_nav_tolerance")]
    pub bookmark_nav_tolerance: f64,
    /// Maximum entries kept in the recent songs list
    #[serde(default = "default_recent_songs_limit")]
    pub recent_songs_limit: usize,
    /// Volume (0-100) for songs without a stored record
    #[serde(default = "default_volume")]
    pub default_volume: u8,
    /// Countdown flag for songs without a stored record
    #[serde(default = "default_countdown_enabled")]
    pub default_countdown_enabled: bool,
    /// Color assigned to new bookmarks
    #[serde(default = "default_bookmark_color")]
    pub default_bookmark_color: String,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            wide_window: default_wide_window(),
            narrow_window: default_narrow_window(),
            catchup_speed: default_catchup_speed(),
            countdown_ticks: default_countdown_ticks(),
            countdown_interval_ms: default_countdown_interval_ms(),
            position_update_interval_ms: default_position_update_interval_ms(),
            bookmark_nav_tolerance: default_bookmark_nav_tolerance(),
            recent_songs_limit: default_recent_songs_limit(),
            default_volume: default_volume(),
            default_countdown_enabled: default_countdown_enabled(),
            default_bookmark_color: default_bookmark_color(),
        }
    }
}

impl PracticeConfig {
    /// Config file path: `<data_dir>/practiceloop/config.json`
    pub fn path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("practiceloop")
            .join("config.json")
    }

    /// Load config from the default path
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from disk, falling back to defaults on any error
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded config from disk");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save config to disk, creating parent directories if needed
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Config saved to disk");
        Ok(())
    }

    pub fn countdown_interval(&self) -> Duration {
        Duration::from_millis(self.countdown_interval_ms.max(1))
    }

    pub fn position_update_interval(&self) -> Duration {
        Duration::from_millis(self.position_update_interval_ms.max(1))
    }
}
