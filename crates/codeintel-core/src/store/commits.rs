//! Commit ancestry backed by the `lsif_commits` table.

use std::collections::HashMap;

use rusqlite::{params, Connection};

use crate::errors::{CodeIntelResult, UpstreamContext};
use crate::store::database::Database;

/// Source of parent edges for a repository's history graph.
pub trait CommitGraph {
    /// Parents of `commit`, or an empty list for root or unknown commits.
    fn parents(&self, repository_id: i64, commit: &str) -> CodeIntelResult<Vec<String>>;
}

/// Parent lookups over `lsif_commits` through a single connection, so a
/// history walk does not reconnect for every commit it visits.
pub struct SqliteCommitGraph {
    conn: Connection,
}

impl Database {
    /// A commit graph bound to one fresh connection. Build one per walk.
    pub fn commit_graph(&self) -> CodeIntelResult<SqliteCommitGraph> {
        let conn = self.connect().upstream("lsif_commits.connect")?;
        Ok(SqliteCommitGraph { conn })
    }
}

impl CommitGraph for SqliteCommitGraph {
    fn parents(&self, repository_id: i64, commit: &str) -> CodeIntelResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT parent_hash FROM lsif_commits \
                 WHERE repository_id = ?1 AND commit_hash = ?2 \
                 ORDER BY parent_hash;",
            )
            .upstream("lsif_commits.parents")?;
        let rows = stmt
            .query_map(params![repository_id, commit], |row| row.get::<_, String>(0))
            .upstream("lsif_commits.parents")?;
        let parents = rows
            .collect::<Result<Vec<_>, _>>()
            .upstream("lsif_commits.parents")?;
        Ok(parents)
    }
}

/// An in-memory graph, keyed by (repository, commit).
impl CommitGraph for HashMap<(i64, String), Vec<String>> {
    fn parents(&self, repository_id: i64, commit: &str) -> CodeIntelResult<Vec<String>> {
        Ok(self
            .get(&(repository_id, commit.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
