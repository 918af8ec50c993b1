//! Completion criteria per content type.
//!
//! Evaluators are pure: they map the engagement observed during one lesson
//! visit to a verdict and never fail. Malformed content, a state of the wrong
//! kind, or an unknown video duration all evaluate to "not completed, 0%".

use lessonflow_core::{ContentGate, ProgressionConfig};
use serde::Serialize;

/// Engagement observed during one lesson visit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentCompletionState {
    /// Video playback
    Video {
        /// Forward-progress seconds
        watch_time_seconds: f64,
        /// Duration reported by the player (0 until metadata loads)
        duration_seconds: f64,
        /// The player reported the video as finished
        watched: bool,
    },
    /// Quiz submissions
    Quiz {
        /// Submissions so far
        attempts: u32,
        /// Percentage of the last submission
        last_score: f64,
        /// Last submission passed
        passed: bool,
        /// Lesson may be considered done
        completed: bool,
    },
    /// Reading
    Text {
        /// Seconds the text was in view
        read_time_seconds: f64,
        /// Reading minimum reached
        read: bool,
    },
    /// File viewing
    File {
        /// Seconds the file was in view
        view_time_seconds: f64,
        /// Viewing minimum reached
        viewed: bool,
    },
}

/// Result of evaluating a lesson visit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletionVerdict {
    /// Whether the lesson counts as completed
    pub completed: bool,

    /// Progress estimate, 0-100
    pub progress_percent: f64,
}

impl CompletionVerdict {
    /// Nothing achieved yet.
    pub const NOT_COMPLETED: Self = Self {
        completed: false,
        progress_percent: 0.0,
    };

    fn new(completed: bool, progress_percent: f64) -> Self {
        Self {
            completed,
            progress_percent: progress_percent.clamp(0.0, 100.0),
        }
    }
}

/// Evaluate the gating payload of a lesson against the observed state.
pub fn evaluate(
    gate: Option<ContentGate<'_>>,
    state: &ContentCompletionState,
    config: &ProgressionConfig,
) -> CompletionVerdict {
    let Some(gate) = gate else {
        return CompletionVerdict::NOT_COMPLETED;
    };
    if !gate.is_usable() {
        return CompletionVerdict::NOT_COMPLETED;
    }

    match (gate, *state) {
        (
            ContentGate::Video(_),
            ContentCompletionState::Video {
                watch_time_seconds,
                duration_seconds,
                ..
            },
        ) => evaluate_video(watch_time_seconds, duration_seconds, config.min_video_watch_percentage),
        (
            ContentGate::Quiz(_),
            ContentCompletionState::Quiz {
                last_score,
                completed,
                ..
            },
        ) => evaluate_quiz(last_score, completed),
        (ContentGate::Text(_), ContentCompletionState::Text { read_time_seconds, .. }) => {
            evaluate_elapsed(read_time_seconds, config.min_content_read_time_seconds)
        }
        (ContentGate::File(_), ContentCompletionState::File { view_time_seconds, .. }) => {
            evaluate_elapsed(view_time_seconds, config.min_file_view_time_seconds)
        }
        _ => CompletionVerdict::NOT_COMPLETED,
    }
}

/// Video: completed once the watched share reaches `min_percentage`.
pub fn evaluate_video(
    watch_time_seconds: f64,
    duration_seconds: f64,
    min_percentage: f64,
) -> CompletionVerdict {
    if !(duration_seconds.is_finite() && duration_seconds > 0.0) || !watch_time_seconds.is_finite() {
        return CompletionVerdict::NOT_COMPLETED;
    }
    let percent = watch_time_seconds * 100.0 / duration_seconds;
    CompletionVerdict::new(percent >= min_percentage, percent)
}

/// Quiz: completion is decided by the attempt tracker.
pub fn evaluate_quiz(last_score: f64, completed: bool) -> CompletionVerdict {
    if completed {
        CompletionVerdict::new(true, 100.0)
    } else if last_score.is_finite() {
        CompletionVerdict::new(false, last_score)
    } else {
        CompletionVerdict::NOT_COMPLETED
    }
}

/// Text and file: completed once enough time was spent with the content in view.
pub fn evaluate_elapsed(elapsed_seconds: f64, min_seconds: f64) -> CompletionVerdict {
    if !elapsed_seconds.is_finite() {
        return CompletionVerdict::NOT_COMPLETED;
    }
    let progress = if min_seconds > 0.0 {
        elapsed_seconds / min_seconds * 100.0
    } else {
        100.0
    };
    CompletionVerdict::new(elapsed_seconds >= min_seconds, progress)
}
