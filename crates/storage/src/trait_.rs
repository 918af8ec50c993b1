//! Storage trait abstraction.

use async_trait::async_trait;
use lessonflow_core::{
    Course, CourseId, CourseProgress, LessonCompletion, ModuleId, ProgressEntry,
    ProgressEntryType, StudentId,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database error
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend temporarily unreachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Read-only source of course definitions.
///
/// `save_course` and `list_courses` exist for import tooling; the
/// progression engine only reads.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// Load a course by ID.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>>;

    /// Save a course (create or replace).
    async fn save_course(&self, course: &Course) -> Result<()>;

    /// List all courses.
    async fn list_courses(&self) -> Result<Vec<Course>>;
}

/// Durable owner of student progress.
///
/// Writes are upserts keyed by (student, course, subject, entry type), so
/// re-recording the same completion never creates a second record.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// All progress a student has in a course.
    async fn get_course_progress(
        &self,
        student: &StudentId,
        course_id: CourseId,
    ) -> Result<CourseProgress>;

    /// Insert the entry, or merge it into the existing one with the same key.
    /// Returns the stored entry.
    async fn upsert_entry(&self, entry: ProgressEntry) -> Result<ProgressEntry>;

    /// Record that a lesson was completed.
    async fn record_lesson_completion(
        &self,
        student: &StudentId,
        completion: LessonCompletion,
    ) -> Result<ProgressEntry> {
        self.upsert_entry(completion.into_entry(student.clone())).await
    }

    /// Record that every lesson of a module was completed.
    async fn record_module_completion(
        &self,
        student: &StudentId,
        course_id: CourseId,
        module_id: ModuleId,
    ) -> Result<ProgressEntry> {
        let mut entry = ProgressEntry::completed(
            student.clone(),
            course_id,
            ProgressEntryType::ModuleCompleted,
        );
        entry.module_id = Some(module_id);
        self.upsert_entry(entry).await
    }

    /// Record that the whole course was completed.
    async fn record_course_completion(
        &self,
        student: &StudentId,
        course_id: CourseId,
    ) -> Result<ProgressEntry> {
        let entry = ProgressEntry::completed(
            student.clone(),
            course_id,
            ProgressEntryType::CourseCompleted,
        );
        self.upsert_entry(entry).await
    }
}
