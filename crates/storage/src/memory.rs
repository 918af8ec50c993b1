//! In-process storage, used by tests and short-lived sessions.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use lessonflow_core::{
    Course, CourseId, CourseProgress, ProgressEntry, ProgressEntryType, StudentId,
};
use tokio::sync::Mutex;

use super::{CourseCatalog, ProgressStore, Result, StorageError};

/// Memory-backed catalog and progress store.
///
/// Reads and writes can be made to fail on demand, which lets callers
/// exercise their store-failure paths.
#[derive(Default)]
pub struct MemoryStorage {
    courses: Mutex<HashMap<CourseId, Course>>,
    entries: Mutex<Vec<ProgressEntry>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    failing_types: Mutex<HashSet<ProgressEntryType>>,
    writes: AtomicUsize,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent progress write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make writes of one entry type fail (or succeed again), leaving the
    /// other types untouched.
    pub async fn set_fail_writes_for(&self, entry_type: ProgressEntryType, fail: bool) {
        let mut failing = self.failing_types.lock().await;
        if fail {
            failing.insert(entry_type);
        } else {
            failing.remove(&entry_type);
        }
    }

    /// Make every subsequent progress read fail (or succeed again).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of accepted progress writes, duplicates included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of distinct stored entries across all students and courses.
    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait::async_trait]
impl CourseCatalog for MemoryStorage {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>> {
        Ok(self.courses.lock().await.get(&id).cloned())
    }

    async fn save_course(&self, course: &Course) -> Result<()> {
        self.courses.lock().await.insert(course.id, course.clone());
        Ok(())
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        Ok(self.courses.lock().await.values().cloned().collect())
    }
}

#[async_trait::async_trait]
impl ProgressStore for MemoryStorage {
    async fn get_course_progress(
        &self,
        student: &StudentId,
        course_id: CourseId,
    ) -> Result<CourseProgress> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("progress read failed".to_string()));
        }
        let entries = self
            .entries
            .lock()
            .await
            .iter()
            .filter(|e| &e.student_id == student && e.course_id == course_id)
            .cloned()
            .collect();
        Ok(CourseProgress::from_entries(entries))
    }

    async fn upsert_entry(&self, entry: ProgressEntry) -> Result<ProgressEntry> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("progress write failed".to_string()));
        }
        if self.failing_types.lock().await.contains(&entry.entry_type) {
            return Err(StorageError::Unavailable(format!(
                "{} write failed",
                entry.entry_type.as_str()
            )));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut entries = self.entries.lock().await;
        match entries.iter_mut().find(|e| e.same_subject(&entry)) {
            Some(existing) => {
                existing.absorb(entry);
                Ok(existing.clone())
            }
            None => {
                entries.push(entry.clone());
                Ok(entry)
            }
        }
    }
}
