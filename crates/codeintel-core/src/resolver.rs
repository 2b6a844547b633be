//! Entry point for the transport layer: one method per exposed operation.

use std::collections::HashMap;

use tracing::debug;

use crate::config::Config;
use crate::errors::CodeIntelResult;
use crate::models::{ApiLocation, Dump, RepoUsageStatistics, UploadFilter, UploadPage};
use crate::query::closest::find_closest_dumps;
use crate::query::cursor::unmarshal_upload_id;
use crate::query::lifecycle::{delete_upload, get_upload, DeleteOutcome};
use crate::query::locations::{path_within_root, resolve_against_dump, translate_all, BundleReader};
use crate::query::uploads::list_uploads;
use crate::query::usage::compute_usage_ranking;
use crate::store::database::Database;
use crate::vcs::VersionControl;

/// Request-scoped facade over the store. Holds no mutable state; clones are
/// cheap and independent.
#[derive(Clone, Debug)]
pub struct CodeIntelResolver<V> {
    db: Database,
    config: Config,
    vcs: V,
}

impl<V: VersionControl> CodeIntelResolver<V> {
    pub fn new(db: Database, config: Config, vcs: V) -> Self {
        Self { db, config, vcs }
    }

    /// Open the configured database and build a resolver over it.
    pub fn open(config: Config, vcs: V) -> CodeIntelResult<Self> {
        let db = Database::open(&config)?;
        Ok(Self::new(db, config, vcs))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Look up an upload by its opaque id.
    pub fn upload_by_id(&self, opaque_id: &str) -> CodeIntelResult<Option<Dump>> {
        let id = unmarshal_upload_id(opaque_id)?;
        get_upload(&self.db, id)
    }

    /// Delete an upload by its opaque id. Authorisation is the caller's job.
    pub fn delete_upload(&self, opaque_id: &str) -> CodeIntelResult<DeleteOutcome> {
        let id = unmarshal_upload_id(opaque_id)?;
        let graph = self.db.commit_graph()?;
        delete_upload(&self.db, &graph, &self.config, &self.vcs, id)
    }

    pub fn uploads(
        &self,
        filter: &UploadFilter,
        first: Option<i64>,
        after: Option<&str>,
    ) -> CodeIntelResult<UploadPage> {
        list_uploads(&self.db, &self.config, filter, first, after)
    }

    /// Dumps usable for a query at `commit`, or `None` when there are none.
    pub fn lsif(&self, repository_id: i64, commit: &str, path: &str) -> CodeIntelResult<Option<Vec<Dump>>> {
        let graph = self.db.commit_graph()?;
        let dumps = find_closest_dumps(&self.db, &graph, &self.config, repository_id, commit, path)?;
        Ok(if dumps.is_empty() { None } else { Some(dumps) })
    }

    /// Resolve the closest dumps, ask `reader` for raw locations in each, and
    /// translate them into caller-facing locations. Dumps are consulted in
    /// resolution order and their results concatenated.
    pub fn locations(
        &self,
        repository_id: i64,
        commit: &str,
        path: &str,
        reader: &dyn BundleReader,
    ) -> CodeIntelResult<Vec<ApiLocation>> {
        let graph = self.db.commit_graph()?;
        let dumps = find_closest_dumps(&self.db, &graph, &self.config, repository_id, commit, path)?;
        let mut resolved = Vec::new();
        for dump in &dumps {
            let raw = reader.locations(dump, path_within_root(dump, path))?;
            debug!(dump_id = dump.id, locations = raw.len(), "read bundle locations");
            resolved.extend(raw.into_iter().map(|loc| resolve_against_dump(dump, loc)));
        }
        Ok(translate_all(&resolved))
    }

    pub fn usage_ranking(&self) -> CodeIntelResult<Vec<RepoUsageStatistics>> {
        compute_usage_ranking(&self.db, &self.config)
    }

    pub fn repo_name(&self, repository_id: i64) -> CodeIntelResult<String> {
        self.db.repo_name(repository_id)
    }

    pub fn repo_ids(&self, names: &[&str]) -> CodeIntelResult<HashMap<String, i64>> {
        self.db.repo_ids(names)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use crate::errors::CodeIntelError;
    use crate::models::{Location, NewUpload, Range, RepositoryIdentity};
    use crate::query::cursor::marshal_upload_id;
    use crate::query::lifecycle::TipRefresh;
    use crate::store::database::test_support::temp_database;

    use super::*;

    fn head_is(commit: &'static str) -> impl Fn(i64) -> CodeIntelResult<String> {
        move |_| Ok(commit.to_string())
    }

    #[test]
    fn open_initialises_configured_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            db_path: dir.path().join("ci.db"),
            ..Config::default()
        };
        let resolver = CodeIntelResolver::open(config, head_is("tip")).unwrap();
        assert!(resolver.database().schema_version().unwrap() > 0);
        assert!(resolver.usage_ranking().unwrap().is_empty());
    }

    #[test]
    fn upload_by_opaque_id() {
        let (_dir, db) = temp_database();
        let id = db.insert_upload(&NewUpload::completed(1, "abc", "")).unwrap();
        let resolver = CodeIntelResolver::new(db, Config::default(), head_is("abc"));

        let found = resolver.upload_by_id(&marshal_upload_id(id)).unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(resolver.upload_by_id(&marshal_upload_id(id + 1)).unwrap().is_none());
        assert!(matches!(
            resolver.upload_by_id("bogus"),
            Err(CodeIntelError::InvalidUploadId(_))
        ));
    }

    #[test]
    fn delete_through_resolver_invokes_tip_once() {
        let (_dir, db) = temp_database();
        let id = db.insert_upload(&NewUpload::completed(1, "abc", "")).unwrap();
        let calls = Cell::new(0);
        let vcs = |_repo: i64| -> CodeIntelResult<String> {
            calls.set(calls.get() + 1);
            Ok("abc".to_string())
        };
        let resolver = CodeIntelResolver::new(db, Config::default(), &vcs);

        let outcome = resolver.delete_upload(&marshal_upload_id(id)).unwrap();
        assert!(outcome.found);
        assert!(matches!(outcome.tip, TipRefresh::Refreshed { .. }));
        let again = resolver.delete_upload(&marshal_upload_id(id)).unwrap();
        assert!(!again.found);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn lsif_is_none_without_dumps() {
        let (_dir, db) = temp_database();
        let resolver = CodeIntelResolver::new(db, Config::default(), head_is("x"));
        assert!(resolver.lsif(1, "abc", "main.go").unwrap().is_none());
    }

    #[test]
    fn locations_are_attributed_to_the_ancestor_dump() {
        let (_dir, db) = temp_database();
        db.insert_repo(&RepositoryIdentity { id: 50, name: "github.com/foo/bar".into() })
            .unwrap();
        db.insert_commit_parents(50, "child", &["parent"]).unwrap();
        db.insert_upload(&NewUpload::completed(50, "parent", "web")).unwrap();
        let resolver = CodeIntelResolver::new(db, Config::default(), head_is("child"));

        let reader = |dump: &Dump, path: &str| -> CodeIntelResult<Vec<Location>> {
            assert_eq!(dump.root, "web/");
            assert_eq!(path, "src/app.ts");
            Ok(vec![Location {
                path: "src/util.ts".into(),
                range: Range::new(10, 2, 10, 9),
            }])
        };
        let locations = resolver.locations(50, "child", "web/src/app.ts", &reader).unwrap();
        assert_eq!(
            locations,
            vec![ApiLocation {
                repository_id: 50,
                commit: "parent".into(),
                path: "web/src/util.ts".into(),
                range: Range::new(10, 2, 10, 9),
            }]
        );
        assert_eq!(resolver.repo_name(50).unwrap(), "github.com/foo/bar");
        assert_eq!(resolver.repo_ids(&["github.com/foo/bar", "nope"]).unwrap().len(), 1);
    }

    #[test]
    fn bundle_failure_propagates() {
        let (_dir, db) = temp_database();
        db.insert_upload(&NewUpload::completed(1, "abc", "")).unwrap();
        let resolver = CodeIntelResolver::new(db, Config::default(), head_is("abc"));
        let reader = |_: &Dump, _: &str| -> CodeIntelResult<Vec<Location>> {
            Err(CodeIntelError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "bundle missing",
            )))
        };
        assert!(resolver.locations(1, "abc", "a.go", &reader).is_err());
    }
}
