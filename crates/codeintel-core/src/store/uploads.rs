//! Upload (dump) record queries: lookup, deletion, filtered listing, and the
//! latest-for-repo bookkeeping.

use rusqlite::{params, params_from_iter, types::ToSql, Connection};

use crate::errors::{CodeIntelResult, UpstreamContext};
use crate::models::{Dump, UploadFilter, UploadState};
use crate::query::guards::truncate_query;
use crate::store::database::{upload_from_row, Database, UPLOAD_COLUMNS};

/// Commits bound per `IN (...)` query.
const COMMIT_BATCH_SIZE: usize = 400;

/// Escape `%`, `_` and the escape character itself for a `LIKE … ESCAPE '\'`.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// A WHERE clause with its positional bind values.
struct FilterClause {
    sql: String,
    params: Vec<Box<dyn ToSql>>,
}

impl FilterClause {
    fn push(&mut self, condition: &str, value: Box<dyn ToSql>) {
        self.params.push(value);
        let idx = self.params.len();
        self.sql
            .push_str(&format!(" AND {}", condition.replace("?N", &format!("?{idx}"))));
    }

    fn param_refs(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

/// Translate an [`UploadFilter`] into SQL. Deleted uploads are hidden unless
/// the filter asks for them by state.
fn filter_clause(filter: &UploadFilter) -> FilterClause {
    let mut clause = FilterClause {
        sql: String::from("WHERE 1 = 1"),
        params: Vec::new(),
    };

    if let Some(repository_id) = filter.repository_id {
        clause.push("repository_id = ?N", Box::new(repository_id));
    }
    match filter.state {
        Some(state) => clause.push("state = ?N", Box::new(state.as_str())),
        None => clause.push("state != ?N", Box::new(UploadState::Deleted.as_str())),
    }
    if let Some(latest) = filter.is_latest_for_repo {
        clause.push("is_latest_for_repo = ?N", Box::new(latest as i64));
    }
    if let Some(query) = filter.query.as_deref().and_then(truncate_query) {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        clause.push(
            "(LOWER(commit_hash) LIKE ?N ESCAPE '\\' \
              OR LOWER(root) LIKE ?N ESCAPE '\\' \
              OR LOWER(indexer) LIKE ?N ESCAPE '\\' \
              OR LOWER(COALESCE(failure_summary, '')) LIKE ?N ESCAPE '\\')",
            Box::new(pattern),
        );
    }
    clause
}

impl Database {
    /// Fetch an upload by id. `None` when no such upload exists.
    pub fn get_upload_by_id(&self, id: i64) -> CodeIntelResult<Option<Dump>> {
        let conn = self.connect().upstream("lsif_uploads.get")?;
        Database::select_upload(&conn, id).upstream("lsif_uploads.get")
    }

    /// Delete an upload in its own transaction and return the deleted row, or
    /// `None` if the id did not exist.
    pub fn delete_upload_by_id(&self, id: i64) -> CodeIntelResult<Option<Dump>> {
        let mut conn = self.connect().upstream("lsif_uploads.delete")?;
        let tx = conn.transaction().upstream("lsif_uploads.delete")?;
        let Some(dump) = Database::select_upload(&tx, id).upstream("lsif_uploads.delete")? else {
            return Ok(None);
        };
        tx.execute("DELETE FROM lsif_uploads WHERE id = ?1;", params![id])
            .upstream("lsif_uploads.delete")?;
        tx.commit().upstream("lsif_uploads.delete")?;
        Ok(Some(dump))
    }

    /// Number of uploads matching `filter`, independent of any page position.
    pub fn count_uploads(&self, filter: &UploadFilter) -> CodeIntelResult<i64> {
        let conn = self.connect().upstream("lsif_uploads.count")?;
        let clause = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM lsif_uploads {};", clause.sql);
        let params = clause.param_refs();
        let count = conn
            .query_row(&sql, params.as_slice(), |row| row.get(0))
            .upstream("lsif_uploads.count")?;
        Ok(count)
    }

    /// Up to `limit` uploads matching `filter` with id below `before_id`,
    /// newest first.
    pub fn select_upload_page(
        &self,
        filter: &UploadFilter,
        before_id: Option<i64>,
        limit: i64,
    ) -> CodeIntelResult<Vec<Dump>> {
        let conn = self.connect().upstream("lsif_uploads.list")?;
        let mut clause = filter_clause(filter);
        if let Some(before_id) = before_id {
            clause.push("id < ?N", Box::new(before_id));
        }
        clause.params.push(Box::new(limit));
        let sql = format!(
            "SELECT {UPLOAD_COLUMNS} FROM lsif_uploads {} ORDER BY id DESC LIMIT ?{};",
            clause.sql,
            clause.params.len()
        );
        let params = clause.param_refs();
        let mut stmt = conn.prepare(&sql).upstream("lsif_uploads.list")?;
        let rows = stmt
            .query_map(params.as_slice(), upload_from_row)
            .upstream("lsif_uploads.list")?;
        let uploads = rows
            .collect::<Result<Vec<_>, _>>()
            .upstream("lsif_uploads.list")?;
        Ok(uploads)
    }

    /// Completed uploads of `repository_id` recorded at any of `commits`.
    pub fn completed_uploads_at_commits(
        &self,
        repository_id: i64,
        commits: &[String],
    ) -> CodeIntelResult<Vec<Dump>> {
        if commits.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connect().upstream("lsif_uploads.at_commits")?;
        let mut uploads = Vec::new();
        for chunk in commits.chunks(COMMIT_BATCH_SIZE) {
            uploads.extend(
                select_completed_at_commits(&conn, repository_id, chunk)
                    .upstream("lsif_uploads.at_commits")?,
            );
        }
        Ok(uploads)
    }

    /// Mark exactly `latest_ids` as latest for the repository, clearing the
    /// flag on every other upload of it.
    pub fn set_latest_for_repo(&self, repository_id: i64, latest_ids: &[i64]) -> CodeIntelResult<()> {
        let mut conn = self.connect().upstream("lsif_uploads.set_latest")?;
        let tx = conn.transaction().upstream("lsif_uploads.set_latest")?;
        tx.execute(
            "UPDATE lsif_uploads SET is_latest_for_repo = 0 WHERE repository_id = ?1;",
            params![repository_id],
        )
        .upstream("lsif_uploads.set_latest")?;
        {
            let mut stmt = tx
                .prepare(
                    "UPDATE lsif_uploads SET is_latest_for_repo = 1 \
                     WHERE repository_id = ?1 AND id = ?2;",
                )
                .upstream("lsif_uploads.set_latest")?;
            for id in latest_ids {
                stmt.execute(params![repository_id, id])
                    .upstream("lsif_uploads.set_latest")?;
            }
        }
        tx.commit().upstream("lsif_uploads.set_latest")?;
        Ok(())
    }
}

fn select_completed_at_commits(
    conn: &Connection,
    repository_id: i64,
    commits: &[String],
) -> CodeIntelResult<Vec<Dump>> {
    let placeholders = (0..commits.len())
        .map(|i| format!("?{}", i + 3))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {UPLOAD_COLUMNS} FROM lsif_uploads \
         WHERE repository_id = ?1 AND state = ?2 AND commit_hash IN ({placeholders}) \
         ORDER BY id DESC;"
    );
    let mut values: Vec<Box<dyn ToSql>> = vec![
        Box::new(repository_id),
        Box::new(UploadState::Completed.as_str()),
    ];
    values.extend(commits.iter().map(|c| Box::new(c.clone()) as Box<dyn ToSql>));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), upload_from_row)?;
    let uploads = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(uploads)
}
