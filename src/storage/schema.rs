//! Schema creation and migration
//!
//! Two tables: `runs` (one row per workflow execution) and `announcements`
//! (one row per unique announcement under the active dedupe strategy).
//! Earlier deployments carried a table-level `UNIQUE(title)` constraint on
//! `announcements`; when the configured strategy is not title-based that
//! constraint would reject legitimate rows, so the table is rebuilt without
//! it on first open.

use super::DedupeStrategy;
use rusqlite::Connection;

/// Creates tables, runs any pending migration, and builds indexes
pub fn initialize(conn: &Connection, strategy: DedupeStrategy) -> rusqlite::Result<()> {
    ensure_runs_table(conn)?;
    ensure_announcements_table(conn, strategy)?;
    Ok(())
}

fn ensure_runs_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS runs (
            run_id TEXT PRIMARY KEY,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            duration_seconds INTEGER,
            total_processed INTEGER NOT NULL DEFAULT 0,
            total_new INTEGER NOT NULL DEFAULT 0,
            total_duplicate INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'RUNNING',
            error TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_runs_started_at ON runs(started_at);",
    )
}

fn ensure_announcements_table(conn: &Connection, strategy: DedupeStrategy) -> rusqlite::Result<()> {
    if !table_exists(conn, "announcements")? {
        create_announcements_table(conn)?;
    } else if strategy != DedupeStrategy::Title && has_unique_title_constraint(conn)? {
        migrate_away_from_title_constraint(conn)?;
    }

    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_announcements_status ON announcements(status);
        CREATE INDEX IF NOT EXISTS idx_announcements_date ON announcements(date);",
    )?;

    // Existing rows must satisfy the strategy key before the unique index
    // can be created.
    dedupe_existing_rows(conn, strategy)?;
    create_strategy_index(conn, strategy)?;
    Ok(())
}

fn create_announcements_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS announcements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            date TEXT NOT NULL,
            content TEXT,
            ai_summary TEXT,
            status TEXT NOT NULL DEFAULT 'NEW',
            source TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
}

fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Detects the legacy table-level `UNIQUE(title)` constraint
///
/// Table constraints surface as `sqlite_autoindex_announcements_N` entries
/// in `PRAGMA index_list`; one whose only column is `title` is the legacy
/// constraint.
fn has_unique_title_constraint(conn: &Connection) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare("PRAGMA index_list('announcements')")?;
    let indexes: Vec<(String, i64)> = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(2)?)))?
        .collect::<rusqlite::Result<_>>()?;

    for (name, unique) in indexes {
        if unique == 0 || !name.starts_with("sqlite_autoindex_announcements") {
            continue;
        }
        let mut info = conn.prepare(&format!("PRAGMA index_info('{name}')"))?;
        let columns: Vec<String> = info
            .query_map([], |row| row.get::<_, String>(2))?
            .collect::<rusqlite::Result<_>>()?;
        if columns == ["title"] {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Rebuilds `announcements` without the table-level unique constraint
fn migrate_away_from_title_constraint(conn: &Connection) -> rusqlite::Result<()> {
    tracing::info!("migrating announcements table away from UNIQUE(title) constraint");
    conn.execute_batch("ALTER TABLE announcements RENAME TO announcements_legacy;")?;
    create_announcements_table(conn)?;
    conn.execute_batch(
        "INSERT INTO announcements
            (id, title, url, date, content, ai_summary, status, source, created_at, updated_at)
         SELECT id, title, url, date, content, ai_summary, status, source, created_at, updated_at
         FROM announcements_legacy;
         DROP TABLE announcements_legacy;",
    )
}

/// Deletes all but the first-inserted row per strategy key
fn dedupe_existing_rows(conn: &Connection, strategy: DedupeStrategy) -> rusqlite::Result<()> {
    let group_by = match strategy {
        DedupeStrategy::Title => "title",
        DedupeStrategy::Url => "url",
        DedupeStrategy::TitleDate => "title, date",
    };
    let removed = conn.execute(
        &format!(
            "DELETE FROM announcements WHERE id NOT IN
             (SELECT MIN(id) FROM announcements GROUP BY {group_by})"
        ),
        [],
    )?;
    if removed > 0 {
        tracing::warn!(removed, "removed rows violating the dedupe key");
    }
    Ok(())
}

fn create_strategy_index(conn: &Connection, strategy: DedupeStrategy) -> rusqlite::Result<()> {
    let sql = match strategy {
        DedupeStrategy::Title => {
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_announcements_title
             ON announcements(title)"
        }
        DedupeStrategy::Url => {
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_announcements_url
             ON announcements(url)"
        }
        DedupeStrategy::TitleDate => {
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_announcements_title_date
             ON announcements(title, date)"
        }
    };
    conn.execute(sql, [])?;
    Ok(())
}
