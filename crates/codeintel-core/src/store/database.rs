//! SQLite storage layer.
//!
//! Each public method opens its own connection so callers never manage
//! connection lifetime and concurrent requests share nothing in-process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use crate::config::Config;
use crate::errors::{CodeIntelError, CodeIntelResult};
use crate::models::{Dump, EventRecord, NewUpload, RepositoryIdentity, UploadState};
use crate::store::schema;

// ---------------------------------------------------------------------------
// Helper: tilde expansion
// ---------------------------------------------------------------------------

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            let mut expanded = PathBuf::from(home);
            if path.len() > 2 {
                expanded.push(&path[2..]);
            }
            return expanded;
        }
    }
    PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// Helper: row mapping
// ---------------------------------------------------------------------------

/// Column list matching [`upload_from_row`].
pub(crate) const UPLOAD_COLUMNS: &str = "id, repository_id, commit_hash, root, indexer, \
     is_latest_for_repo, uploaded_at, state, failure_summary";

/// Build a [`Dump`] from a row selected with [`UPLOAD_COLUMNS`].
pub(crate) fn upload_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Dump> {
    let state_text: String = row.get(7)?;
    let state = state_text.parse::<UploadState>().map_err(|msg| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg)),
        )
    })?;
    Ok(Dump {
        id: row.get(0)?,
        repository_id: row.get(1)?,
        commit: row.get(2)?,
        root: row.get(3)?,
        indexer: row.get(4)?,
        is_latest_for_repo: row.get::<_, i64>(5)? != 0,
        uploaded_at: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        state,
        failure_summary: row.get(8)?,
    })
}

/// Canonical form of a dump root: no leading slash, trailing slash unless
/// empty. `""` and `"/"` both mean the repository root.
pub fn normalize_root(root: &str) -> String {
    let trimmed = root.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// SQLite store holding the repository registry, uploads, the commit graph,
/// and the event log.
#[derive(Clone, Debug)]
pub struct Database {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    /// Create a new `Database`.  The path is expanded and parent directories
    /// are created if they do not already exist.
    pub fn new(db_path: impl AsRef<Path>) -> CodeIntelResult<Self> {
        let db_str = db_path.as_ref().to_string_lossy();
        let expanded = expand_tilde(&db_str);
        let resolved = if expanded.is_absolute() {
            expanded
        } else {
            std::env::current_dir()?.join(&expanded)
        };
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            db_path: resolved,
            busy_timeout: Duration::from_millis(5000),
        })
    }

    /// Open the database named by `config` and make sure its schema is current.
    pub fn open(config: &Config) -> CodeIntelResult<Self> {
        let mut db = Self::new(&config.db_path)?;
        db.busy_timeout = config.busy_timeout;
        db.init_schema()?;
        Ok(db)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a new SQLite connection with foreign keys and the busy timeout set.
    pub(crate) fn connect(&self) -> CodeIntelResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    // -----------------------------------------------------------------------
    // Schema
    // -----------------------------------------------------------------------

    /// Initialise the database schema: set WAL mode, create all tables and
    /// indexes, then run pending migrations.
    pub fn init_schema(&self) -> CodeIntelResult<()> {
        let conn = self.connect()?;
        // journal_mode returns a row, so it cannot go through execute_batch
        // on every SQLite build.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
        for stmt in schema::SCHEMA_STATEMENTS {
            conn.execute_batch(stmt)?;
        }
        schema::migrate_schema(&conn)?;
        Ok(())
    }

    pub fn schema_version(&self) -> CodeIntelResult<i32> {
        let conn = self.connect()?;
        Ok(schema::get_schema_version(&conn))
    }

    // -----------------------------------------------------------------------
    // Writes owned by the ingestion side (registry sync, upload pipeline,
    // event logging). The query layer only reads these tables, apart from
    // upload deletion and latest-flag bookkeeping.
    // -----------------------------------------------------------------------

    pub fn insert_repo(&self, repo: &RepositoryIdentity) -> CodeIntelResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO repo (id, name) VALUES (?1, ?2);",
            params![repo.id, repo.name],
        )?;
        Ok(())
    }

    /// Record a new upload and return its id.
    pub fn insert_upload(&self, upload: &NewUpload) -> CodeIntelResult<i64> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO lsif_uploads \
                 (repository_id, commit_hash, root, indexer, state, is_latest_for_repo, failure_summary) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                upload.repository_id,
                upload.commit,
                normalize_root(&upload.root),
                upload.indexer,
                upload.state.as_str(),
                upload.is_latest_for_repo as i64,
                upload.failure_summary,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Move an upload to a new state. Returns false if the id is unknown.
    pub fn set_upload_state(
        &self,
        id: i64,
        state: UploadState,
        failure_summary: Option<&str>,
    ) -> CodeIntelResult<bool> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE lsif_uploads SET state = ?1, failure_summary = ?2 WHERE id = ?3;",
            params![state.as_str(), failure_summary, id],
        )?;
        Ok(changed > 0)
    }

    /// Record the parents of `commit`. Existing edges are left untouched.
    pub fn insert_commit_parents(
        &self,
        repository_id: i64,
        commit: &str,
        parents: &[&str],
    ) -> CodeIntelResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO lsif_commits (repository_id, commit_hash, parent_hash) \
                 VALUES (?1, ?2, ?3);",
            )?;
            for parent in parents {
                stmt.execute(params![repository_id, commit, parent])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Append an event. `days_ago` backdates the timestamp; `None` means now.
    pub fn insert_event(&self, name: &str, url: &str, days_ago: Option<u32>) -> CodeIntelResult<()> {
        let conn = self.connect()?;
        let modifier = format!("-{} days", days_ago.unwrap_or(0));
        conn.execute(
            "INSERT INTO event_logs (name, url, timestamp) VALUES (?1, ?2, datetime('now', ?3));",
            params![name, url, modifier],
        )?;
        Ok(())
    }

    /// Append an event carrying its own `YYYY-MM-DD HH:MM:SS` UTC timestamp.
    pub fn record_event(&self, event: &EventRecord) -> CodeIntelResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO event_logs (name, url, timestamp) VALUES (?1, ?2, ?3);",
            params![event.name, event.url, event.timestamp],
        )?;
        Ok(())
    }

    /// Fetch one upload row by id.
    pub(crate) fn select_upload(conn: &Connection, id: i64) -> CodeIntelResult<Option<Dump>> {
        let sql = format!("SELECT {UPLOAD_COLUMNS} FROM lsif_uploads WHERE id = ?1;");
        conn.query_row(&sql, params![id], upload_from_row)
            .optional()
            .map_err(CodeIntelError::from)
    }
}
