//! Bounded-retry quiz attempts.
//!
//! ```text
//! NotStarted → InProgress → Passed
//!                        ↘ FailedRetryable → (reset) → InProgress
//!                        ↘ FailedExhausted
//! ```
//!
//! Running out of attempts completes the lesson even though the quiz was
//! failed, so a single quiz can never block the rest of the course.

use lessonflow_core::ProgressionConfig;
use serde::Serialize;
use tracing::debug;

use crate::evaluator::ContentCompletionState;

/// Quiz attempt state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizState {
    /// Not opened yet
    NotStarted,
    /// Opened, awaiting a submission
    InProgress,
    /// Reached the pass score
    Passed,
    /// Failed with attempts left
    FailedRetryable,
    /// Failed with no attempts left
    FailedExhausted,
}

impl QuizState {
    /// Whether further submissions are ignored.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QuizState::Passed | QuizState::FailedExhausted)
    }
}

/// Outcome of a quiz submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuizVerdict {
    /// State after the submission
    pub state: QuizState,

    /// Submissions so far
    pub attempts: u32,

    /// Score of the last submission (percent)
    pub percentage: f64,

    /// Last submission reached the pass score
    pub passed: bool,

    /// The lesson may be considered done
    pub completed: bool,

    /// Submissions left before the quiz is exhausted
    pub attempts_remaining: u32,
}

/// Tracks submissions of one quiz during one lesson visit.
#[derive(Debug, Clone)]
pub struct QuizAttemptTracker {
    state: QuizState,
    attempts: u32,
    last_score: Option<f64>,
    passed: bool,
    completed: bool,
    max_attempts: u32,
    min_pass_score: f64,
}

impl QuizAttemptTracker {
    /// Create a tracker with the configured attempt limit and pass score.
    pub fn new(config: &ProgressionConfig) -> Self {
        Self::with_limits(config.max_quiz_attempts, config.min_quiz_pass_score)
    }

    /// Create a tracker with explicit limits.
    pub fn with_limits(max_attempts: u32, min_pass_score: f64) -> Self {
        Self {
            state: QuizState::NotStarted,
            attempts: 0,
            last_score: None,
            passed: false,
            completed: false,
            max_attempts: max_attempts.max(1),
            min_pass_score,
        }
    }

    /// Current state.
    pub fn state(&self) -> QuizState {
        self.state
    }

    /// Submissions so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the lesson may be considered done.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Whether the last submission passed.
    pub fn is_passed(&self) -> bool {
        self.passed
    }

    /// The student opened the quiz.
    pub fn start(&mut self) {
        if self.state == QuizState::NotStarted {
            self.state = QuizState::InProgress;
        }
    }

    /// Submit `score` correct answers out of `total_questions`.
    ///
    /// Returns `None` for a malformed submission (no questions, or more
    /// correct answers than questions); no attempt is consumed. Submissions
    /// after a terminal state return the current verdict unchanged.
    pub fn submit(&mut self, score: u32, total_questions: u32) -> Option<QuizVerdict> {
        if total_questions == 0 || score > total_questions {
            debug!("Rejected quiz submission {}/{}", score, total_questions);
            return None;
        }
        if self.state.is_terminal() {
            return Some(self.verdict());
        }

        let percentage = f64::from(score) * 100.0 / f64::from(total_questions);
        self.attempts += 1;
        self.last_score = Some(percentage);
        self.passed = percentage >= self.min_pass_score;

        self.state = if self.passed {
            QuizState::Passed
        } else if self.attempts < self.max_attempts {
            QuizState::FailedRetryable
        } else {
            QuizState::FailedExhausted
        };
        self.completed = self.state.is_terminal();

        debug!(
            "Quiz attempt {}/{} scored {:.1}% -> {:?}",
            self.attempts, self.max_attempts, percentage, self.state
        );
        Some(self.verdict())
    }

    /// Clear the last result for another try. Attempts are kept.
    ///
    /// Returns `false` if there is nothing to reset.
    pub fn reset(&mut self) -> bool {
        if self.state == QuizState::NotStarted {
            return false;
        }
        self.passed = false;
        self.completed = false;
        self.last_score = None;
        self.state = QuizState::InProgress;
        true
    }

    /// Verdict for the current state.
    pub fn verdict(&self) -> QuizVerdict {
        QuizVerdict {
            state: self.state,
            attempts: self.attempts,
            percentage: self.last_score.unwrap_or(0.0),
            passed: self.passed,
            completed: self.completed,
            attempts_remaining: self.max_attempts.saturating_sub(self.attempts),
        }
    }

    /// State consumed by the quiz evaluator.
    pub fn completion_state(&self) -> ContentCompletionState {
        ContentCompletionState::Quiz {
            attempts: self.attempts,
            last_score: self.last_score.unwrap_or(0.0),
            passed: self.passed,
            completed: self.completed,
        }
    }
}
