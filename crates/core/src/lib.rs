//! Lessonflow core data models.
//!
//! This crate defines the course tree, the durable progress records and the
//! completion thresholds shared by the storage backends and the engine.

#![warn(missing_docs)]

// Core identities
mod id;

// Course structure
mod course;

// Progress records
mod progress;

// Thresholds
mod config;

// Re-exports
pub use id::*;

pub use course::{
    Course, Module, Lesson, LessonRef, Position, ContentKind, LessonContent, ContentGate,
    VideoContent, QuizContent, QuizQuestion, TextContent, FileContent, MixedContent,
};
pub use progress::{
    ProgressEntry, ProgressEntryType, ProgressStatus, LessonCompletion, CourseProgress,
};
pub use config::{ProgressionConfig, ConfigError};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
