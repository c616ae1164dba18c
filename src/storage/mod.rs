//! Storage module for runs and announcements
//!
//! SQLite-backed persistence behind a narrow CRUD trait: run lifecycle rows,
//! announcement rows keyed by the active dedupe strategy, and the read-side
//! helpers used by the CLI stats mode. The uniqueness constraint matching the
//! dedupe strategy lives in the schema, not in application-level locking, so
//! concurrent runs sharing a database race safely on inserts.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{StorageError, StorageResult, Store};

use serde::{Deserialize, Serialize};

/// A freshly created run row
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: String,
}

/// A full run row as stored
#[derive(Debug, Clone)]
pub struct RunSnapshot {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<i64>,
    pub total_processed: i64,
    pub total_new: i64,
    pub total_duplicate: i64,
    pub status: RunStatus,
    pub error: Option<String>,
}

/// A full announcement row as stored
#[derive(Debug, Clone)]
pub struct AnnouncementRecord {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub date: String,
    pub content: Option<String>,
    pub ai_summary: Option<String>,
    pub status: AnnouncementStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Status of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(Self::Running),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Lifecycle status of an announcement row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementStatus {
    /// Stub row inserted, detail not yet processed
    New,
    /// Detail fetched, content and summary persisted
    Processed,
    /// Detail processing failed; empty content, sentinel summary
    Failed,
}

impl AnnouncementStatus {
    pub fn to_db_string(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processed => "PROCESSED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(Self::New),
            "PROCESSED" => Some(Self::Processed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Active uniqueness key for announcements
///
/// Exactly one strategy is active per deployment; it drives both the unique
/// index and the duplicate-check query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupeStrategy {
    Title,
    Url,
    TitleDate,
}
