//! SQLite storage backend for Lessonflow.
//!
//! Courses are stored as JSON documents. Progress entries get their own table
//! with a unique key on (student, course, subject, entry type), so the store
//! itself enforces one record per completion.

use async_trait::async_trait;
use lessonflow_core::{Course, CourseId, CourseProgress, ProgressEntry, StudentId};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;
use std::path::Path;
use tracing::warn;

use super::trait_::{CourseCatalog, ProgressStore, Result, StorageError};

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStorage {
    /// Database connection pool
    pool: sqlx::SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a database at the given URL, e.g. `sqlite://progress.db?mode=rwc`.
    pub async fn new(db_url: &str) -> Result<Self> {
        let pool = sqlx::SqlitePool::connect(db_url).await?;

        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Open (or create) a database file.
    pub async fn new_from_path(path: &Path) -> Result<Self> {
        let path = path
            .to_str()
            .ok_or_else(|| StorageError::Other(format!("non UTF-8 path: {:?}", path)))?;
        Self::new(&format!("sqlite://{}?mode=rwc", path)).await
    }

    /// Create an in-memory database for testing.
    pub async fn in_memory() -> Result<Self> {
        // Every connection to :memory: is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS courses (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS progress_entries (
                id TEXT PRIMARY KEY,
                student_id TEXT NOT NULL,
                course_id TEXT NOT NULL,
                subject TEXT NOT NULL,
                entry_type TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (student_id, course_id, subject, entry_type)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_progress_student_course
             ON progress_entries(student_id, course_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Decode JSON documents, skipping rows that no longer parse.
    fn decode_rows<T: serde::de::DeserializeOwned>(rows: Vec<sqlx::sqlite::SqliteRow>) -> Vec<T> {
        rows.into_iter()
            .filter_map(|row| {
                let data: String = row.try_get("data").ok()?;
                match serde_json::from_str(&data) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!("Skipping undecodable row: {}", e);
                        None
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl CourseCatalog for SqliteStorage {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>> {
        let row = sqlx::query("SELECT data FROM courses WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let data: String = row.try_get("data")?;
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn save_course(&self, course: &Course) -> Result<()> {
        let data = serde_json::to_string(course)?;

        sqlx::query(
            "INSERT INTO courses (id, title, data, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                data = excluded.data,
                updated_at = excluded.updated_at",
        )
        .bind(course.id.to_string())
        .bind(&course.title)
        .bind(data)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let rows = sqlx::query("SELECT data FROM courses ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        Ok(Self::decode_rows(rows))
    }
}

#[async_trait]
impl ProgressStore for SqliteStorage {
    async fn get_course_progress(
        &self,
        student: &StudentId,
        course_id: CourseId,
    ) -> Result<CourseProgress> {
        let rows = sqlx::query(
            "SELECT data FROM progress_entries
             WHERE student_id = ? AND course_id = ?
             ORDER BY updated_at",
        )
        .bind(student.as_str())
        .bind(course_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(CourseProgress::from_entries(Self::decode_rows(rows)))
    }

    async fn upsert_entry(&self, entry: ProgressEntry) -> Result<ProgressEntry> {
        let subject = entry.subject_key();
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(
            "SELECT data FROM progress_entries
             WHERE student_id = ? AND course_id = ? AND subject = ? AND entry_type = ?",
        )
        .bind(entry.student_id.as_str())
        .bind(entry.course_id.to_string())
        .bind(&subject)
        .bind(entry.entry_type.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let stored = match existing {
            Some(row) => {
                let data: String = row.try_get("data")?;
                let mut current: ProgressEntry = serde_json::from_str(&data)?;
                current.absorb(entry);
                current
            }
            None => entry,
        };

        sqlx::query(
            "INSERT INTO progress_entries
                (id, student_id, course_id, subject, entry_type, data, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(student_id, course_id, subject, entry_type) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
        )
        .bind(stored.id.to_string())
        .bind(stored.student_id.as_str())
        .bind(stored.course_id.to_string())
        .bind(&subject)
        .bind(stored.entry_type.as_str())
        .bind(serde_json::to_string(&stored)?)
        .bind(stored.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lessonflow_core::{
        LessonCompletion, LessonId, Module, ModuleId, Lesson, LessonContent, FileContent,
    };

    #[tokio::test]
    async fn test_course_operations() {
        let storage = SqliteStorage::in_memory().await.unwrap();

        let mut course = Course::new("Databases").with_module(
            Module::new("Basics").with_lesson(Lesson::new(
                "Handout",
                LessonContent::File(FileContent {
                    url: "https://files.example.com/a.pdf".to_string(),
                    file_name: "a.pdf".to_string(),
                }),
            )),
        );
        storage.save_course(&course).await.unwrap();

        course.title = "Databases 101".to_string();
        storage.save_course(&course).await.unwrap();

        let loaded = storage.get_course(course.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Databases 101");
        assert_eq!(storage.list_courses().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_single_row() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let student = StudentId::new("s1");
        let completion = LessonCompletion {
            course_id: CourseId::new(),
            module_id: ModuleId::new(),
            lesson_id: LessonId::new(),
            lesson_title: "Intro".to_string(),
            time_spent_seconds: 12,
        };

        let first = storage
            .record_lesson_completion(&student, completion.clone())
            .await
            .unwrap();
        let second = storage
            .record_lesson_completion(&student, completion.clone())
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let progress = storage
            .get_course_progress(&student, completion.course_id)
            .await
            .unwrap();
        assert_eq!(progress.detailed_progress.len(), 1);
        assert!(progress.completed_lesson_ids().contains(&completion.lesson_id));
    }
}
