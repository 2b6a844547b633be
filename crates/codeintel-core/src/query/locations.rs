//! Translation of dump-relative locations into caller-facing ones.

use crate::errors::CodeIntelResult;
use crate::models::{ApiLocation, Dump, Location, ResolvedLocation};

/// Reads raw locations out of a dump's bundle. Paths going in and coming out
/// are relative to the dump root.
pub trait BundleReader {
    fn locations(&self, dump: &Dump, path: &str) -> CodeIntelResult<Vec<Location>>;
}

impl<F> BundleReader for F
where
    F: Fn(&Dump, &str) -> CodeIntelResult<Vec<Location>>,
{
    fn locations(&self, dump: &Dump, path: &str) -> CodeIntelResult<Vec<Location>> {
        self(dump, path)
    }
}

/// Strip the dump root from a repository-relative path.
pub fn path_within_root<'a>(dump: &Dump, path: &'a str) -> &'a str {
    let path = path.trim_start_matches('/');
    path.strip_prefix(dump.root.as_str()).unwrap_or(path)
}

/// Attach `dump` to a bundle location and make its path repository-relative.
pub fn resolve_against_dump(dump: &Dump, location: Location) -> ResolvedLocation {
    let relative = location.path.trim_start_matches('/');
    ResolvedLocation {
        dump: dump.clone(),
        path: format!("{}{relative}", dump.root),
        range: location.range,
    }
}

/// Repository and commit come from the dump, which may be an ancestor of the
/// commit that was queried.
pub fn translate(resolved: &ResolvedLocation) -> ApiLocation {
    ApiLocation {
        repository_id: resolved.dump.repository_id,
        commit: resolved.dump.commit.clone(),
        path: resolved.path.clone(),
        range: resolved.range,
    }
}

pub fn translate_all(resolved: &[ResolvedLocation]) -> Vec<ApiLocation> {
    resolved.iter().map(translate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Range, UploadState};

    fn dump(root: &str, commit: &str) -> Dump {
        Dump {
            id: 9,
            repository_id: 50,
            commit: commit.to_string(),
            root: root.to_string(),
            indexer: "lsif-tsc".to_string(),
            is_latest_for_repo: false,
            uploaded_at: String::new(),
            state: UploadState::Completed,
            failure_summary: None,
        }
    }

    #[test]
    fn translate_uses_dump_commit_not_query_commit() {
        let resolved = ResolvedLocation {
            dump: dump("", "ancestor"),
            path: "src/lib.ts".into(),
            range: Range::new(3, 4, 3, 10),
        };
        let api = translate(&resolved);
        assert_eq!(api.repository_id, 50);
        assert_eq!(api.commit, "ancestor");
        assert_eq!(api.path, "src/lib.ts");
        assert_eq!(api.range, Range::new(3, 4, 3, 10));
    }

    #[test]
    fn paths_are_rebased_on_the_dump_root() {
        let d = dump("web/", "c1");
        assert_eq!(path_within_root(&d, "web/src/app.ts"), "src/app.ts");
        assert_eq!(path_within_root(&d, "/web/src/app.ts"), "src/app.ts");

        let resolved = resolve_against_dump(
            &d,
            Location {
                path: "src/app.ts".into(),
                range: Range::default(),
            },
        );
        assert_eq!(resolved.path, "web/src/app.ts");
    }

    #[test]
    fn translate_all_preserves_order() {
        let d = dump("", "c1");
        let resolved: Vec<ResolvedLocation> = ["a.go", "b.go", "c.go"]
            .iter()
            .map(|p| resolve_against_dump(&d, Location { path: p.to_string(), range: Range::default() }))
            .collect();
        let paths: Vec<String> = translate_all(&resolved).into_iter().map(|l| l.path).collect();
        assert_eq!(paths, vec!["a.go", "b.go", "c.go"]);
    }
}
