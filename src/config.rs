use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::sequencer::{BeatState, Pattern, DEFAULT_BPM, DEFAULT_PRESET};

/// Timing of the look-ahead loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How often the scheduler polls the audio clock
    pub lookahead_interval_ms: u64,
    /// How far past "now" each poll schedules clicks
    pub schedule_ahead_secs: f64,
    /// Delay between start() and the first slot
    pub start_offset_secs: f64,
}

impl SchedulerConfig {
    pub fn lookahead_interval(&self) -> Duration {
        Duration::from_millis(self.lookahead_interval_ms)
    }

    /// Replace nonsensical values with defaults. The window must exceed the poll interval.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let interval_ms = if self.lookahead_interval_ms == 0 {
            defaults.lookahead_interval_ms
        } else {
            self.lookahead_interval_ms
        };
        let min_window = interval_ms as f64 / 1000.0;
        Self {
            lookahead_interval_ms: interval_ms,
            schedule_ahead_secs: if self.schedule_ahead_secs > min_window {
                self.schedule_ahead_secs
            } else {
                defaults.schedule_ahead_secs.max(min_window * 2.0)
            },
            start_offset_secs: self.start_offset_secs.max(0.0),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead_interval_ms: 25,
            schedule_ahead_secs: 0.1,
            start_offset_secs: 0.1,
        }
    }
}

/// User settings, read from a JSON file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bpm: u32,
    pub preset: String,
    pub theme: String,
    pub count_in: bool,
    pub recordings_dir: PathBuf,
    /// Custom 16-step pattern; takes the place of the preset when present
    pub pattern: Option<Vec<BeatState>>,
    pub scheduler: SchedulerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            preset: DEFAULT_PRESET.to_string(),
            theme: "default".to_string(),
            count_in: true,
            recordings_dir: PathBuf::from("recordings"),
            pattern: None,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        Ok(settings)
    }

    /// The custom pattern, if one is configured. Anything but 16 steps is rejected.
    pub fn custom_pattern(&self) -> Result<Option<Pattern>, TransportError> {
        self.pattern.clone().map(Pattern::try_from).transpose()
    }

    /// Load from an explicit path, or from the default location if it exists
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default_path = settings_path();
        if default_path.is_file() {
            Self::load(&default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Per-user data directory (~/.metronoxide/)
pub fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".metronoxide")
}

pub fn settings_path() -> PathBuf {
    data_dir().join("config.json")
}
