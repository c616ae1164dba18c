//! Storage trait and error types

use super::{AnnouncementRecord, AnnouncementStatus, RunRecord, RunSnapshot, RunStatus};
use thiserror::Error;

/// Errors from the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not create database directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Persistence operations needed by the workflow
///
/// The workflow only ever talks to this trait, which keeps the run
/// orchestration testable against an in-memory database.
pub trait Store {
    /// Creates a RUNNING run row and returns its id and start timestamp
    ///
    /// When `run_id_override` is given it is used verbatim; otherwise a
    /// fresh UUID is generated.
    fn start_run(&mut self, run_id_override: Option<&str>) -> StorageResult<RunRecord>;

    /// Finalizes a run row with its terminal status and counters
    #[allow(clippy::too_many_arguments)]
    fn finish_run(
        &mut self,
        run_id: &str,
        status: RunStatus,
        finished_at: &str,
        duration_seconds: i64,
        total_processed: u32,
        total_new: u32,
        total_duplicate: u32,
        error: Option<&str>,
    ) -> StorageResult<()>;

    /// Checks whether an announcement already exists under the active
    /// dedupe strategy
    fn is_duplicate(&self, title: &str, url: &str, date: &str) -> StorageResult<bool>;

    /// Inserts a NEW stub row; returns false when the unique index
    /// rejected it as a duplicate
    fn insert_stub(&mut self, title: &str, url: &str, date: &str) -> StorageResult<bool>;

    /// Fills in content and summary for an existing row and moves it to
    /// its terminal status
    fn update_detail(
        &mut self,
        title: &str,
        content: &str,
        ai_summary: &str,
        status: AnnouncementStatus,
    ) -> StorageResult<()>;

    /// Reads back a single run row
    fn get_run(&self, run_id: &str) -> StorageResult<Option<RunSnapshot>>;

    /// Lists the most recent runs, newest first
    fn list_runs(&self, limit: u32) -> StorageResult<Vec<RunSnapshot>>;

    /// Total announcement rows stored
    fn count_announcements(&self) -> StorageResult<u64>;

    /// Reads back an announcement row by title
    fn get_announcement(&self, title: &str) -> StorageResult<Option<AnnouncementRecord>>;
}
