//! Completion thresholds and progression tuning.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value outside its allowed range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Thresholds that decide when a lesson counts as completed.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```json
/// { "max_quiz_attempts": 3 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Share of a video (percent) that must be watched
    pub min_video_watch_percentage: f64,

    /// Quiz submissions allowed before the lesson unlocks regardless
    pub max_quiz_attempts: u32,

    /// Passing quiz score (percent)
    pub min_quiz_pass_score: f64,

    /// Seconds a text lesson must stay in view
    pub min_content_read_time_seconds: f64,

    /// Seconds a file lesson must stay in view
    pub min_file_view_time_seconds: f64,

    /// How long the auto-advance flag stays raised after moving on
    pub auto_advance_delay_ms: u64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            min_video_watch_percentage: 95.0,
            max_quiz_attempts: 2,
            min_quiz_pass_score: 70.0,
            min_content_read_time_seconds: 30.0,
            min_file_view_time_seconds: 10.0,
            auto_advance_delay_ms: 1500,
        }
    }
}

impl ProgressionConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, pct) in [
            ("min_video_watch_percentage", self.min_video_watch_percentage),
            ("min_quiz_pass_score", self.min_quiz_pass_score),
        ] {
            if !(0.0..=100.0).contains(&pct) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within 0..=100, got {}",
                    name, pct
                )));
            }
        }
        for (name, secs) in [
            ("min_content_read_time_seconds", self.min_content_read_time_seconds),
            ("min_file_view_time_seconds", self.min_file_view_time_seconds),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a non-negative number, got {}",
                    name, secs
                )));
            }
        }
        if self.max_quiz_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_quiz_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Video completion threshold as a fraction of the duration.
    pub fn video_threshold_ratio(&self) -> f64 {
        self.min_video_watch_percentage / 100.0
    }

    /// Auto-advance flag lifetime.
    pub fn auto_advance_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.auto_advance_delay_ms)
    }
}
