//! Storage abstraction and implementations for Lessonflow.
//!
//! This crate provides the `CourseCatalog` and `ProgressStore` interfaces the
//! progression engine talks to, with JSON-file, in-memory and (behind the
//! `sqlite` feature) SQLite implementations.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite_storage;

pub use trait_::{CourseCatalog, ProgressStore, StorageError, Result};
pub use json_storage::JsonStorage;
pub use memory::MemoryStorage;

#[cfg(feature = "sqlite")]
pub use sqlite_storage::SqliteStorage;
