//! Read-only aggregate queries over the event log.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use rusqlite::params;

use crate::errors::{CodeIntelResult, UpstreamContext};
use crate::models::EventCounts;
use crate::store::database::Database;

/// Repository name embedded in a page URL: `https://host/<name>/-/blob/...`.
/// Greedy, so a URL with several `/-/` segments yields everything up to the
/// last one.
static REPO_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//[^/]+/(.+)/-/").unwrap());

/// Extract the repository name from an event URL, if the URL points into one.
pub fn repo_name_from_url(url: &str) -> Option<&str> {
    REPO_URL_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Event name prefixes counted by [`Database::event_counts_by_repo_name`].
/// Matching is case-sensitive.
#[derive(Clone, Copy, Debug)]
pub struct EventClasses<'a> {
    pub search_prefix: &'a str,
    pub precise_prefix: &'a str,
}

/// Per-URL tallies, grouped in SQL. `substr(..) = ?` keeps the prefix test
/// case-sensitive, which `LIKE` is not in SQLite.
const COUNTS_BY_URL_SQL: &str = "\
    SELECT url, \
           SUM(CASE WHEN substr(name, 1, length(?2)) = ?2 THEN 1 ELSE 0 END), \
           SUM(CASE WHEN substr(name, 1, length(?3)) = ?3 THEN 1 ELSE 0 END) \
    FROM event_logs \
    WHERE timestamp >= datetime('now', ?1) \
      AND (substr(name, 1, length(?2)) = ?2 OR substr(name, 1, length(?3)) = ?3) \
    GROUP BY url \
    ORDER BY MIN(id);";

impl Database {
    /// Count search and precise events per repository name within the last
    /// `window_days` days. Names come back in the order they were first seen
    /// in the log; events whose URL names no repository are skipped. Every
    /// returned name has at least one counted event.
    pub fn event_counts_by_repo_name(
        &self,
        window_days: u32,
        classes: EventClasses<'_>,
    ) -> CodeIntelResult<IndexMap<String, EventCounts>> {
        let conn = self.connect().upstream("event_logs.counts")?;
        let mut stmt = conn.prepare(COUNTS_BY_URL_SQL).upstream("event_logs.counts")?;
        let rows = stmt
            .query_map(
                params![
                    format!("-{window_days} days"),
                    classes.search_prefix,
                    classes.precise_prefix
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .upstream("event_logs.counts")?;

        let mut counts: IndexMap<String, EventCounts> = IndexMap::new();
        for row in rows {
            let (url, search_count, precise_count) = row.upstream("event_logs.counts")?;
            if search_count == 0 && precise_count == 0 {
                continue;
            }
            let Some(repo_name) = repo_name_from_url(&url) else {
                continue;
            };
            let entry = counts.entry(repo_name.to_string()).or_default();
            entry.search_count += search_count;
            entry.precise_count += precise_count;
        }
        Ok(counts)
    }
}
