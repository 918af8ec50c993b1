//! Durable progress records exchanged with the progress store.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use crate::id::{CourseId, LessonId, ModuleId, ProgressEntryId, StudentId};
use crate::Time;

/// Kind of progress entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEntryType {
    /// A single lesson was completed
    LessonCompleted,
    /// Every lesson of a module was completed
    ModuleCompleted,
    /// Every lesson of the course was completed
    CourseCompleted,
}

impl ProgressEntryType {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressEntryType::LessonCompleted => "lesson_completed",
            ProgressEntryType::ModuleCompleted => "module_completed",
            ProgressEntryType::CourseCompleted => "course_completed",
        }
    }
}

/// Status of a progress entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Started but not finished
    InProgress,
    /// Finished
    Completed,
}

/// One durable progress record.
///
/// Entries are unique per (student, course, subject, type) where the subject
/// is the lesson, the module, or the course itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// Unique identifier
    pub id: ProgressEntryId,

    /// Owning student
    pub student_id: StudentId,

    /// Course the entry belongs to
    pub course_id: CourseId,

    /// Module, for lesson and module entries
    pub module_id: Option<ModuleId>,

    /// Lesson, for lesson entries
    pub lesson_id: Option<LessonId>,

    /// What this entry records
    pub entry_type: ProgressEntryType,

    /// Entry status
    pub status: ProgressStatus,

    /// Seconds the student spent on the subject
    pub time_spent_seconds: u64,

    /// Free-form metadata (lesson title, etc.)
    pub metadata: serde_json::Value,

    /// When the subject was first completed
    pub completed_at: Option<Time>,

    /// Last write
    pub updated_at: Time,
}

impl ProgressEntry {
    /// Create a completed entry.
    pub fn completed(
        student_id: StudentId,
        course_id: CourseId,
        entry_type: ProgressEntryType,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: ProgressEntryId::new(),
            student_id,
            course_id,
            module_id: None,
            lesson_id: None,
            entry_type,
            status: ProgressStatus::Completed,
            time_spent_seconds: 0,
            metadata: serde_json::Value::Null,
            completed_at: Some(now),
            updated_at: now,
        }
    }

    /// Stable upsert key: subject identifier plus entry type.
    pub fn subject_key(&self) -> String {
        let subject = match self.entry_type {
            ProgressEntryType::LessonCompleted => self.lesson_id.map(|id| id.to_string()),
            ProgressEntryType::ModuleCompleted => self.module_id.map(|id| id.to_string()),
            ProgressEntryType::CourseCompleted => Some(self.course_id.to_string()),
        };
        format!(
            "{}:{}",
            self.entry_type.as_str(),
            subject.unwrap_or_default()
        )
    }

    /// Whether two entries describe the same (student, course, subject, type).
    pub fn same_subject(&self, other: &ProgressEntry) -> bool {
        self.student_id == other.student_id
            && self.course_id == other.course_id
            && self.subject_key() == other.subject_key()
    }

    /// Merge a re-submitted entry into this one, keeping identity and the
    /// original completion time.
    pub fn absorb(&mut self, newer: ProgressEntry) {
        self.status = newer.status;
        self.time_spent_seconds = self.time_spent_seconds.max(newer.time_spent_seconds);
        if !newer.metadata.is_null() {
            self.metadata = newer.metadata;
        }
        if self.completed_at.is_none() {
            self.completed_at = newer.completed_at;
        }
        self.updated_at = newer.updated_at;
    }
}

/// Request to record a lesson completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonCompletion {
    /// Course of the lesson
    pub course_id: CourseId,

    /// Module of the lesson
    pub module_id: ModuleId,

    /// Completed lesson
    pub lesson_id: LessonId,

    /// Lesson title, kept in the entry metadata
    pub lesson_title: String,

    /// Engagement seconds reported with the completion
    pub time_spent_seconds: u64,
}

impl LessonCompletion {
    /// Build the progress entry this request stores.
    pub fn into_entry(self, student_id: StudentId) -> ProgressEntry {
        let mut entry = ProgressEntry::completed(
            student_id,
            self.course_id,
            ProgressEntryType::LessonCompleted,
        );
        entry.module_id = Some(self.module_id);
        entry.lesson_id = Some(self.lesson_id);
        entry.time_spent_seconds = self.time_spent_seconds;
        entry.metadata = serde_json::json!({ "lesson_title": self.lesson_title });
        entry
    }
}

/// Everything the store knows about one student's progress in a course.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseProgress {
    /// All entries for the course
    pub detailed_progress: Vec<ProgressEntry>,

    /// Course completion entry, if the course is done
    pub course_completion: Option<ProgressEntry>,

    /// Module completion entries
    pub module_completions: Vec<ProgressEntry>,
}

impl CourseProgress {
    /// Group a flat list of entries.
    pub fn from_entries(entries: Vec<ProgressEntry>) -> Self {
        let course_completion = entries
            .iter()
            .find(|e| e.entry_type == ProgressEntryType::CourseCompleted)
            .cloned();
        let module_completions = entries
            .iter()
            .filter(|e| e.entry_type == ProgressEntryType::ModuleCompleted)
            .cloned()
            .collect();
        Self {
            detailed_progress: entries,
            course_completion,
            module_completions,
        }
    }

    /// Lessons with a completed `lesson_completed` entry.
    pub fn completed_lesson_ids(&self) -> HashSet<LessonId> {
        self.detailed_progress
            .iter()
            .filter(|e| {
                e.entry_type == ProgressEntryType::LessonCompleted
                    && e.status == ProgressStatus::Completed
            })
            .filter_map(|e| e.lesson_id)
            .collect()
    }
}
