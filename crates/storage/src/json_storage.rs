//! JSON file storage implementation.
//!
//! Stores courses as `courses/<id>.json` and each student's progress in a
//! course as `progress/<student>/<course>.json`. A progress file carries a
//! version counter that is bumped on every write.

use std::path::{Path, PathBuf};

use lessonflow_core::{Course, CourseId, CourseProgress, ProgressEntry, StudentId, Time};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{CourseCatalog, ProgressStore, Result};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
    write_lock: Mutex<()>,
}

/// On-disk layout of one progress file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ProgressFile {
    version: u64,
    updated_at: Option<Time>,
    entries: Vec<ProgressEntry>,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the data directories.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("courses")).await?;
        fs::create_dir_all(root.join("progress")).await?;

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn course_path(&self, id: CourseId) -> PathBuf {
        self.root.join("courses").join(format!("{}.json", id))
    }

    fn progress_path(&self, student: &StudentId, course_id: CourseId) -> PathBuf {
        self.root
            .join("progress")
            .join(file_safe(student.as_str()))
            .join(format!("{}.json", course_id))
    }

    async fn read_progress_file(&self, path: &Path) -> Result<ProgressFile> {
        Ok(read_json(path).await?.unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl CourseCatalog for JsonStorage {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>> {
        read_json(&self.course_path(id)).await
    }

    async fn save_course(&self, course: &Course) -> Result<()> {
        let json = serde_json::to_string_pretty(course)?;
        let _guard = self.write_lock.lock().await;
        write_atomic(&self.course_path(course.id), json.as_bytes()).await
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let mut courses: Vec<Course> = list_dir(&self.root.join("courses")).await?;
        courses.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(courses)
    }
}

#[async_trait::async_trait]
impl ProgressStore for JsonStorage {
    async fn get_course_progress(
        &self,
        student: &StudentId,
        course_id: CourseId,
    ) -> Result<CourseProgress> {
        let file = self
            .read_progress_file(&self.progress_path(student, course_id))
            .await?;
        let entries = file
            .entries
            .into_iter()
            .filter(|e| &e.student_id == student && e.course_id == course_id)
            .collect();
        Ok(CourseProgress::from_entries(entries))
    }

    async fn upsert_entry(&self, entry: ProgressEntry) -> Result<ProgressEntry> {
        let path = self.progress_path(&entry.student_id, entry.course_id);

        // Read-modify-write must not interleave with another writer.
        let _guard = self.write_lock.lock().await;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = self.read_progress_file(&path).await?;

        let stored = match file.entries.iter_mut().find(|e| e.same_subject(&entry)) {
            Some(existing) => {
                debug!("Merging progress entry {}", existing.subject_key());
                existing.absorb(entry);
                existing.clone()
            }
            None => {
                file.entries.push(entry.clone());
                entry
            }
        };

        file.version += 1;
        file.updated_at = Some(chrono::Utc::now());
        write_atomic(&path, serde_json::to_string_pretty(&file)?.as_bytes()).await?;

        Ok(stored)
    }
}

/// Map an arbitrary identifier onto a safe file name.
///
/// ASCII alphanumerics and `-` pass through; every other byte becomes `_XX`
/// (uppercase hex). `_` only ever starts an escape, so distinct identifiers
/// never share a name.
fn file_safe(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("_{:02X}", byte));
        }
    }
    out
}

/// Replace `path` with `contents` via a sibling temp file and a rename, so a
/// crash mid-write never leaves a truncated document behind.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Ok(Some(item)) = read_json(&entry.path()).await {
            items.push(item);
        }
    }
    Ok(items)
}
