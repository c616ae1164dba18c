//! SQLite implementation of the [`Store`] trait

use super::schema;
use super::{
    AnnouncementRecord, AnnouncementStatus, DedupeStrategy, RunRecord, RunSnapshot, RunStatus,
    StorageResult, Store,
};
use crate::dates::now_iso;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use uuid::Uuid;

const RUN_COLUMNS: &str = "run_id, started_at, finished_at, duration_seconds, \
     total_processed, total_new, total_duplicate, status, error";

/// SQLite-backed store
pub struct SqliteStore {
    conn: Connection,
    strategy: DedupeStrategy,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and prepares the
    /// schema for the given dedupe strategy
    pub fn open(path: &Path, strategy: DedupeStrategy) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::prepare(conn, strategy)
    }

    #[cfg(test)]
    pub fn open_in_memory(strategy: DedupeStrategy) -> StorageResult<Self> {
        Self::prepare(Connection::open_in_memory()?, strategy)
    }

    fn prepare(conn: Connection, strategy: DedupeStrategy) -> StorageResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5_000)?;
        schema::initialize(&conn, strategy)?;
        Ok(Self { conn, strategy })
    }
}

fn parse_status<T>(
    idx: usize,
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown status value: {raw}").into(),
        )
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunSnapshot> {
    let status_raw: String = row.get(7)?;
    Ok(RunSnapshot {
        run_id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        duration_seconds: row.get(3)?,
        total_processed: row.get(4)?,
        total_new: row.get(5)?,
        total_duplicate: row.get(6)?,
        status: parse_status(7, &status_raw, RunStatus::from_db_string)?,
        error: row.get(8)?,
    })
}

fn announcement_from_row(row: &Row<'_>) -> rusqlite::Result<AnnouncementRecord> {
    let status_raw: String = row.get(6)?;
    Ok(AnnouncementRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        date: row.get(3)?,
        content: row.get(4)?,
        ai_summary: row.get(5)?,
        status: parse_status(6, &status_raw, AnnouncementStatus::from_db_string)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

impl Store for SqliteStore {
    fn start_run(&mut self, run_id_override: Option<&str>) -> StorageResult<RunRecord> {
        let run_id = match run_id_override {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        let started_at = now_iso();
        self.conn.execute(
            "INSERT INTO runs (run_id, started_at, status) VALUES (?1, ?2, 'RUNNING')",
            params![run_id, started_at],
        )?;
        Ok(RunRecord { run_id, started_at })
    }

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
    ) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE runs SET finished_at = ?2, duration_seconds = ?3,
                total_processed = ?4, total_new = ?5, total_duplicate = ?6,
                status = ?7, error = ?8
             WHERE run_id = ?1",
            params![
                run_id,
                finished_at,
                duration_seconds,
                total_processed,
                total_new,
                total_duplicate,
                status.to_db_string(),
                error,
            ],
        )?;
        Ok(())
    }

    fn is_duplicate(&self, title: &str, url: &str, date: &str) -> StorageResult<bool> {
        let count: i64 = match self.strategy {
            DedupeStrategy::Title => self.conn.query_row(
                "SELECT COUNT(*) FROM announcements WHERE title = ?1",
                [title],
                |r| r.get(0),
            )?,
            DedupeStrategy::Url => self.conn.query_row(
                "SELECT COUNT(*) FROM announcements WHERE url = ?1",
                [url],
                |r| r.get(0),
            )?,
            DedupeStrategy::TitleDate => self.conn.query_row(
                "SELECT COUNT(*) FROM announcements WHERE title = ?1 AND date = ?2",
                [title, date],
                |r| r.get(0),
            )?,
        };
        Ok(count > 0)
    }

    fn insert_stub(&mut self, title: &str, url: &str, date: &str) -> StorageResult<bool> {
        let now = now_iso();
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO announcements
                (title, url, date, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'NEW', ?4, ?4)",
            params![title, url, date, now],
        )?;
        Ok(changed > 0)
    }

    fn update_detail(
        &mut self,
        title: &str,
        content: &str,
        ai_summary: &str,
        status: AnnouncementStatus,
    ) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE announcements
             SET content = ?2, ai_summary = ?3, status = ?4, updated_at = ?5
             WHERE title = ?1",
            params![title, content, ai_summary, status.to_db_string(), now_iso()],
        )?;
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> StorageResult<Option<RunSnapshot>> {
        let snapshot = self
            .conn
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE run_id = ?1"),
                [run_id],
                run_from_row,
            )
            .optional()?;
        Ok(snapshot)
    }

    fn list_runs(&self, limit: u32) -> StorageResult<Vec<RunSnapshot>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM runs ORDER BY started_at DESC LIMIT ?1"
        ))?;
        let runs = stmt
            .query_map([limit], run_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    fn count_announcements(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM announcements", [], |r| r.get(0))?;
        Ok(count as u64)
    }

    fn get_announcement(&self, title: &str) -> StorageResult<Option<AnnouncementRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, title, url, date, content, ai_summary, status,
                        created_at, updated_at
                 FROM announcements WHERE title = ?1",
                [title],
                announcement_from_row,
            )
            .optional()?;
        Ok(record)
    }
}
