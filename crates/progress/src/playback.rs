//! Monotonic playback guard for restricted video lessons.
//!
//! The guard keeps a high-water mark of the furthest playhead position the
//! student reached by playing. Seeking is only allowed up to that mark, and
//! watch time only grows when playback moves past it, so rewinding,
//! re-watching or changing the playback rate cannot inflate it.

use serde::Serialize;

use crate::evaluator::ContentCompletionState;

/// Emitted the first time a video counts as watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackEvent {
    /// The watch threshold was crossed or the player reported the end
    Completed,
}

/// Result of a seek request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SeekOutcome {
    /// The playhead moved to the requested position
    Allowed {
        /// New playhead position
        position: f64,
    },
    /// Cannot skip ahead: the playhead was left at the high-water mark
    Rejected {
        /// Furthest position the student may seek to
        max_position: f64,
    },
}

impl SeekOutcome {
    /// Whether the seek was honored.
    pub fn is_allowed(&self) -> bool {
        matches!(self, SeekOutcome::Allowed { .. })
    }
}

/// Playback state of one video visit.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackGuard {
    current_time: f64,
    last_watched_time: f64,
    watch_time: f64,
    duration: f64,
    is_completed: bool,
    threshold_ratio: f64,
}

impl PlaybackGuard {
    /// Create a guard completing at `threshold_ratio` (0.95 = 95%) of the duration.
    pub fn new(threshold_ratio: f64) -> Self {
        Self {
            current_time: 0.0,
            last_watched_time: 0.0,
            watch_time: 0.0,
            duration: 0.0,
            is_completed: false,
            threshold_ratio,
        }
    }

    /// Current playhead position.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Furthest position reached by playing.
    pub fn last_watched_time(&self) -> f64 {
        self.last_watched_time
    }

    /// Accumulated forward-progress seconds.
    pub fn watch_time(&self) -> f64 {
        self.watch_time
    }

    /// Last known duration, 0 until metadata loads.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Whether the video counts as watched.
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Seed the duration from authored metadata before the player reports one.
    pub fn set_duration(&mut self, duration: f64) {
        if duration.is_finite() && duration > 0.0 {
            self.duration = duration;
        }
    }

    /// Handle a playback-time update from the player.
    pub fn on_time_update(&mut self, current: f64, total: f64) -> Option<PlaybackEvent> {
        if !current.is_finite() {
            return None;
        }
        let current = current.max(0.0);
        self.set_duration(total);
        self.current_time = current;

        if current >= self.last_watched_time {
            self.watch_time += current - self.last_watched_time;
            self.last_watched_time = current;
        }

        if self.duration > 0.0
            && current >= self.duration * self.threshold_ratio
            && !self.is_completed
        {
            self.is_completed = true;
            return Some(PlaybackEvent::Completed);
        }
        None
    }

    /// The player reached the end of the media.
    ///
    /// Completes regardless of the threshold: trailing credits or silence may
    /// end playback before it is reached.
    pub fn on_ended(&mut self) -> Option<PlaybackEvent> {
        if self.is_completed {
            return None;
        }
        self.is_completed = true;
        Some(PlaybackEvent::Completed)
    }

    /// Request to move the playhead.
    pub fn seek(&mut self, new_time: f64) -> SeekOutcome {
        if new_time.is_finite() && new_time <= self.last_watched_time {
            self.current_time = new_time.max(0.0);
            SeekOutcome::Allowed {
                position: self.current_time,
            }
        } else {
            self.current_time = self.current_time.min(self.last_watched_time);
            SeekOutcome::Rejected {
                max_position: self.last_watched_time,
            }
        }
    }

    /// State consumed by the video evaluator.
    pub fn completion_state(&self) -> ContentCompletionState {
        ContentCompletionState::Video {
            watch_time_seconds: self.watch_time,
            duration_seconds: self.duration,
            watched: self.is_completed,
        }
    }
}

impl Default for PlaybackGuard {
    fn default() -> Self {
        Self::new(0.95)
    }
}
