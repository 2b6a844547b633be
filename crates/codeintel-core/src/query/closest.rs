//! Nearest-dump resolution over the commit graph.

use std::cmp::Reverse;
use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use tracing::debug;

use crate::config::Config;
use crate::errors::CodeIntelResult;
use crate::models::Dump;
use crate::store::commits::CommitGraph;
use crate::store::database::Database;

/// Breadth-first distances from `commit` to each ancestor reachable within
/// `max_distance` parent hops. `commit` itself is at distance 0. Entries come
/// back in visit order, so distances never decrease.
pub fn ancestor_distances(
    graph: &dyn CommitGraph,
    repository_id: i64,
    commit: &str,
    max_distance: u32,
) -> CodeIntelResult<IndexMap<String, u32>> {
    let mut distances = IndexMap::new();
    let mut queue = VecDeque::new();
    distances.insert(commit.to_string(), 0u32);
    queue.push_back((commit.to_string(), 0u32));

    while let Some((current, distance)) = queue.pop_front() {
        if distance >= max_distance {
            continue;
        }
        for parent in graph.parents(repository_id, &current)? {
            if distances.contains_key(&parent) {
                continue;
            }
            distances.insert(parent.clone(), distance + 1);
            queue.push_back((parent, distance + 1));
        }
    }
    Ok(distances)
}

/// Whether a dump rooted at `root` covers the repository-relative `path`.
pub fn root_covers_path(root: &str, path: &str) -> bool {
    let path = path.trim_start_matches('/');
    root.is_empty() || path.starts_with(root) || format!("{path}/") == root
}

/// Order candidates by ancestor distance, then latest-for-repo first, then
/// newest upload. With `dedupe_by_root`, only the first dump of each
/// (root, indexer) pair survives.
pub fn rank_candidates(
    candidates: Vec<Dump>,
    distances: &IndexMap<String, u32>,
    dedupe_by_root: bool,
) -> Vec<Dump> {
    let mut ranked: Vec<(u32, Dump)> = candidates
        .into_iter()
        .filter_map(|dump| distances.get(&dump.commit).map(|d| (*d, dump)))
        .collect();
    ranked.sort_by_key(|(distance, dump)| (*distance, !dump.is_latest_for_repo, Reverse(dump.id)));

    let mut seen_roots: HashSet<(String, String)> = HashSet::new();
    ranked
        .into_iter()
        .map(|(_, dump)| dump)
        .filter(|dump| !dedupe_by_root || seen_roots.insert((dump.root.clone(), dump.indexer.clone())))
        .collect()
}

/// Completed dumps able to answer a query about `path` at `commit`, most
/// specific first. An empty result means no precise code intelligence is
/// available; it is not an error.
pub fn find_closest_dumps(
    db: &Database,
    graph: &dyn CommitGraph,
    config: &Config,
    repository_id: i64,
    commit: &str,
    path: &str,
) -> CodeIntelResult<Vec<Dump>> {
    let distances = ancestor_distances(graph, repository_id, commit, config.max_traversal_distance)?;
    let commits: Vec<String> = distances.keys().cloned().collect();
    let candidates: Vec<Dump> = db
        .completed_uploads_at_commits(repository_id, &commits)?
        .into_iter()
        .filter(|dump| root_covers_path(&dump.root, path))
        .collect();

    let dumps = rank_candidates(candidates, &distances, config.dedupe_by_root);
    debug!(
        repository_id,
        commit,
        path,
        visited = distances.len(),
        found = dumps.len(),
        "resolved closest dumps"
    );
    Ok(dumps)
}
