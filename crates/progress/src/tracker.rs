//! Aggregate progress reporting.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use lessonflow_core::{Course, CourseId, LessonId, ModuleId};
use serde::Serialize;

/// Percentage of `completed` out of `total`, rounded to the nearest integer.
pub fn completion_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (completed.min(total) as f64 / total as f64 * 100.0).round();
    pct as u8
}

/// Progress of one module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleProgress {
    /// Module ID
    pub module_id: ModuleId,

    /// Module title
    pub title: String,

    /// Completed lessons
    pub completed_lessons: usize,

    /// Lessons in the module
    pub total_lessons: usize,

    /// Rounded percentage (0-100)
    pub percentage: u8,
}

impl ModuleProgress {
    /// Whether every lesson is completed. Empty modules never are.
    pub fn is_complete(&self) -> bool {
        self.total_lessons > 0 && self.completed_lessons == self.total_lessons
    }
}

/// A snapshot of course progress at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    /// When snapshot was taken
    pub timestamp: DateTime<Utc>,

    /// Course ID
    pub course_id: CourseId,

    /// Completed lessons
    pub completed_lessons: usize,

    /// Lessons in the course
    pub total_lessons: usize,

    /// Rounded percentage (0-100)
    pub percentage: u8,

    /// Per-module progress, in course order
    pub modules: Vec<ModuleProgress>,
}

impl ProgressSnapshot {
    /// Summarize a course given the completed set.
    pub fn capture(course: &Course, completed: &HashSet<LessonId>) -> Self {
        let modules: Vec<ModuleProgress> = course
            .modules
            .iter()
            .map(|module| {
                let total = module.lessons.len();
                let done = module
                    .lessons
                    .iter()
                    .filter(|l| completed.contains(&l.id))
                    .count();
                ModuleProgress {
                    module_id: module.id,
                    title: module.title.clone(),
                    completed_lessons: done,
                    total_lessons: total,
                    percentage: completion_percentage(done, total),
                }
            })
            .collect();

        let completed_lessons = modules.iter().map(|m| m.completed_lessons).sum();
        let total_lessons = course.total_lessons();

        ProgressSnapshot {
            timestamp: Utc::now(),
            course_id: course.id,
            completed_lessons,
            total_lessons,
            percentage: completion_percentage(completed_lessons, total_lessons),
            modules,
        }
    }

    /// Whether every lesson in the course is completed.
    pub fn is_complete(&self) -> bool {
        self.total_lessons > 0 && self.completed_lessons == self.total_lessons
    }
}
