//! SQLite schema DDL and migration framework.

use rusqlite::Connection;

use crate::errors::CodeIntelResult;

/// Current schema version. Migrations run from whatever the DB currently
/// reports up to this value.
pub const SCHEMA_VERSION: i32 = 3;

/// Core DDL statements: 6 CREATE TABLE + 5 CREATE INDEX.
///
/// Executed with `CREATE … IF NOT EXISTS` so they are safe to replay on an
/// already-initialised database.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // ── tables (6) ──────────────────────────────────────────────────────
    "CREATE TABLE IF NOT EXISTS repo_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS migration_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_version INTEGER NOT NULL,
        to_version INTEGER NOT NULL,
        status TEXT NOT NULL,
        error_message TEXT,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS repo (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    );",
    // AUTOINCREMENT: ids are never reused, which keeps id-ordered cursors
    // from resurfacing rows after a delete followed by an insert.
    "CREATE TABLE IF NOT EXISTS lsif_uploads (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        repository_id INTEGER NOT NULL,
        commit_hash TEXT NOT NULL,
        root TEXT NOT NULL DEFAULT '',
        indexer TEXT NOT NULL,
        state TEXT NOT NULL DEFAULT 'queued',
        is_latest_for_repo INTEGER NOT NULL DEFAULT 0,
        failure_summary TEXT,
        uploaded_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS lsif_commits (
        repository_id INTEGER NOT NULL,
        commit_hash TEXT NOT NULL,
        parent_hash TEXT NOT NULL,
        PRIMARY KEY(repository_id, commit_hash, parent_hash)
    );",
    "CREATE TABLE IF NOT EXISTS event_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        url TEXT NOT NULL,
        timestamp TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    // ── indexes (5) ─────────────────────────────────────────────────────
    "CREATE INDEX IF NOT EXISTS idx_lsif_uploads_state ON lsif_uploads(state);",
    "CREATE INDEX IF NOT EXISTS idx_lsif_uploads_repo_commit ON lsif_uploads(repository_id, commit_hash);",
    "CREATE INDEX IF NOT EXISTS idx_lsif_uploads_repo_latest ON lsif_uploads(repository_id, is_latest_for_repo);",
    "CREATE INDEX IF NOT EXISTS idx_lsif_commits_repo_commit ON lsif_commits(repository_id, commit_hash);",
    "CREATE INDEX IF NOT EXISTS idx_event_logs_timestamp ON event_logs(timestamp);",
];

// ─── Migration framework ────────────────────────────────────────────────────

/// Run all pending migrations from the current stored version up to
/// [`SCHEMA_VERSION`].  Each step is wrapped in a SAVEPOINT so a failure
/// rolls back only that single step.
pub fn migrate_schema(conn: &Connection) -> CodeIntelResult<()> {
    let mut current_version = get_schema_version(conn);

    while current_version < SCHEMA_VERSION {
        let next_version = current_version + 1;
        conn.execute_batch("SAVEPOINT codeintel_migrate_step;")?;

        let step_result = (|| -> CodeIntelResult<()> {
            match next_version {
                1 => migrate_to_v1(conn)?,
                2 => migrate_to_v2(conn)?,
                3 => migrate_to_v3(conn)?,
                _ => {}
            }
            set_schema_version(conn, next_version)?;
            record_migration_step(conn, current_version, next_version, "success", None)?;
            conn.execute_batch("RELEASE SAVEPOINT codeintel_migrate_step;")?;
            Ok(())
        })();

        match step_result {
            Ok(()) => {
                tracing::debug!(from = current_version, to = next_version, "schema migrated");
                current_version = next_version;
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK TO SAVEPOINT codeintel_migrate_step;");
                let _ = conn.execute_batch("RELEASE SAVEPOINT codeintel_migrate_step;");
                let _ = record_migration_step(
                    conn,
                    current_version,
                    next_version,
                    "failed",
                    Some(&e.to_string()),
                );
                tracing::warn!(from = current_version, to = next_version, error = %e, "schema migration failed");
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Read the current schema version from `repo_meta`.
/// Returns 0 when the key is absent or unparseable.
pub(crate) fn get_schema_version(conn: &Connection) -> i32 {
    let result: Result<String, _> = conn.query_row(
        "SELECT value FROM repo_meta WHERE key = 'schema_version';",
        [],
        |row| row.get(0),
    );
    match result {
        Ok(v) => v.parse::<i32>().unwrap_or(0),
        Err(_) => 0,
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> CodeIntelResult<()> {
    conn.execute(
        "INSERT INTO repo_meta(key, value) \
         VALUES('schema_version', ?1) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        rusqlite::params![version.to_string()],
    )?;
    Ok(())
}

fn record_migration_step(
    conn: &Connection,
    from_v: i32,
    to_v: i32,
    status: &str,
    error_msg: Option<&str>,
) -> CodeIntelResult<()> {
    conn.execute(
        "INSERT INTO migration_history(from_version, to_version, status, error_message) \
         VALUES (?1, ?2, ?3, ?4);",
        rusqlite::params![from_v, to_v, status, error_msg],
    )?;
    Ok(())
}

// ─── Individual migration steps ─────────────────────────────────────────────

/// v0 -> v1: baseline, no-op.
fn migrate_to_v1(_conn: &Connection) -> CodeIntelResult<()> {
    Ok(())
}

/// v1 -> v2: normalise legacy `/` roots to the empty root.
fn migrate_to_v2(conn: &Connection) -> CodeIntelResult<()> {
    conn.execute_batch("UPDATE lsif_uploads SET root = '' WHERE root = '/';")?;
    Ok(())
}

/// v2 -> v3: index event log names for the usage aggregation.
fn migrate_to_v3(conn: &Connection) -> CodeIntelResult<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_event_logs_name_timestamp \
         ON event_logs(name, timestamp);",
    )?;
    Ok(())
}
