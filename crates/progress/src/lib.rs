//! Progression Engine (Layer 3)
//!
//! Content completion rules, lesson unlocking, and per-session coordination.

#![warn(missing_docs)]

pub mod coordinator;
pub mod evaluator;
pub mod playback;
pub mod quiz;
pub mod resolver;
pub mod tracker;
pub mod visit;

pub use coordinator::{ProgressionCoordinator, ProgressionError, QuizSubmission, VisitOutcome};
pub use evaluator::{evaluate, CompletionVerdict, ContentCompletionState};
pub use playback::{PlaybackEvent, PlaybackGuard, SeekOutcome};
pub use quiz::{QuizAttemptTracker, QuizState, QuizVerdict};
pub use resolver::{LessonGraph, LessonNode, ProgressionState};
pub use tracker::{completion_percentage, ModuleProgress, ProgressSnapshot};
pub use visit::LessonVisit;
