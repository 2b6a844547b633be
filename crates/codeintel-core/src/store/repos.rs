//! Repository name ↔ identifier lookups against the registry table.

use std::collections::HashMap;

use rusqlite::{params, params_from_iter, OptionalExtension};

use crate::errors::{CodeIntelError, CodeIntelResult, UpstreamContext};
use crate::store::database::Database;

/// SQLite caps bound parameters per statement; stay well below the default.
const NAME_BATCH_SIZE: usize = 500;

impl Database {
    /// Return the name of the repository with the given identifier.
    pub fn repo_name(&self, repository_id: i64) -> CodeIntelResult<String> {
        let conn = self.connect().upstream("repo.name")?;
        let name: Option<String> = conn
            .query_row(
                "SELECT name FROM repo WHERE id = ?1;",
                params![repository_id],
                |row| row.get(0),
            )
            .optional()
            .upstream("repo.name")?;
        name.ok_or(CodeIntelError::UnknownRepository(repository_id))
    }

    /// Return identifiers for the names that exist. Unknown names are absent
    /// from the result; callers decide what an unmatched name means.
    pub fn repo_ids<S: AsRef<str>>(&self, names: &[S]) -> CodeIntelResult<HashMap<String, i64>> {
        let mut ids = HashMap::new();
        if names.is_empty() {
            return Ok(ids);
        }

        let conn = self.connect().upstream("repo.ids")?;
        for chunk in names.chunks(NAME_BATCH_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("SELECT name, id FROM repo WHERE name IN ({placeholders});");
            let mut stmt = conn.prepare(&sql).upstream("repo.ids")?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter().map(|n| n.as_ref())), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })
                .upstream("repo.ids")?;
            for row in rows {
                let (name, id) = row.upstream("repo.ids")?;
                ids.insert(name, id);
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::RepositoryIdentity;
    use crate::store::database::test_support::temp_database;

    use super::*;

    fn seed(db: &Database, repos: &[(i64, &str)]) {
        for (id, name) in repos {
            db.insert_repo(&RepositoryIdentity {
                id: *id,
                name: name.to_string(),
            })
            .unwrap();
        }
    }

    #[test]
    fn repo_name_found() {
        let (_dir, db) = temp_database();
        seed(&db, &[(50, "github.com/foo/bar")]);
        assert_eq!(db.repo_name(50).unwrap(), "github.com/foo/bar");
    }

    #[test]
    fn repo_name_unknown() {
        let (_dir, db) = temp_database();
        let err = db.repo_name(404).unwrap_err();
        assert!(matches!(err, CodeIntelError::UnknownRepository(404)));
    }

    #[test]
    fn repo_ids_drops_unknown_names() {
        let (_dir, db) = temp_database();
        seed(&db, &[(1, "foo"), (2, "baz"), (3, "bonk")]);

        let ids = db.repo_ids(&["foo", "bar", "baz"]).unwrap();
        let expected: HashMap<String, i64> =
            [("foo".to_string(), 1), ("baz".to_string(), 2)].into_iter().collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn repo_ids_keys_are_subset_of_input() {
        let (_dir, db) = temp_database();
        seed(&db, &[(1, "a"), (2, "b"), (3, "c"), (4, "d")]);

        let names = ["b", "d", "zzz", "b"];
        let ids = db.repo_ids(&names).unwrap();
        assert!(ids.keys().all(|k| names.contains(&k.as_str())));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn repo_ids_empty_input() {
        let (_dir, db) = temp_database();
        let none: [&str; 0] = [];
        assert!(db.repo_ids(&none).unwrap().is_empty());
    }

    #[test]
    fn repo_ids_spans_batches() {
        let (_dir, db) = temp_database();
        let names: Vec<String> = (0..(NAME_BATCH_SIZE as i64 + 20))
            .map(|i| format!("repo-{i}"))
            .collect();
        for (i, name) in names.iter().enumerate() {
            seed(&db, &[(i as i64 + 1, name.as_str())]);
        }
        let ids = db.repo_ids(&names).unwrap();
        assert_eq!(ids.len(), names.len());
        assert_eq!(ids["repo-0"], 1);
    }
}
