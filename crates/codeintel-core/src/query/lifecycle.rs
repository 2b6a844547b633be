//! Single-upload lookup and deletion with post-delete tip bookkeeping.

use tracing::{info, warn};

use crate::config::Config;
use crate::errors::{CodeIntelError, CodeIntelResult, UpstreamContext};
use crate::models::Dump;
use crate::query::closest::{ancestor_distances, rank_candidates};
use crate::store::commits::CommitGraph;
use crate::store::database::Database;
use crate::vcs::VersionControl;

/// What happened to the latest-for-repo bookkeeping after a delete.
#[derive(Debug)]
pub enum TipRefresh {
    /// Nothing was deleted, so the tip was never looked up.
    Skipped,
    /// The tip was resolved and `latest` are now the repository's latest dumps.
    Refreshed { commit: String, latest: Vec<i64> },
    /// The deletion stands, but the tip lookup or flag update failed.
    Failed(CodeIntelError),
}

#[derive(Debug)]
pub struct DeleteOutcome {
    pub found: bool,
    pub tip: TipRefresh,
}

pub fn get_upload(db: &Database, id: i64) -> CodeIntelResult<Option<Dump>> {
    db.get_upload_by_id(id)
}

/// Delete an upload, then look up the repository tip and recompute which
/// dumps are latest for it.
///
/// The delete commits on its own. The tip lookup runs only after that and only
/// if a row was actually removed; a failure there is reported in
/// [`DeleteOutcome::tip`] and does not undo the delete.
pub fn delete_upload(
    db: &Database,
    graph: &dyn CommitGraph,
    config: &Config,
    vcs: &dyn VersionControl,
    id: i64,
) -> CodeIntelResult<DeleteOutcome> {
    let Some(deleted) = db.delete_upload_by_id(id)? else {
        return Ok(DeleteOutcome {
            found: false,
            tip: TipRefresh::Skipped,
        });
    };
    info!(upload_id = id, repository_id = deleted.repository_id, "deleted upload");

    let tip = match refresh_latest_from_tip(db, graph, config, vcs, deleted.repository_id) {
        Ok((commit, latest)) => TipRefresh::Refreshed { commit, latest },
        Err(err) => {
            warn!(
                upload_id = id,
                repository_id = deleted.repository_id,
                error = %err,
                "upload deleted but latest-dump refresh failed"
            );
            TipRefresh::Failed(err)
        }
    };
    Ok(DeleteOutcome { found: true, tip })
}

/// Mark the dumps closest to the repository tip (one per root and indexer) as
/// latest, clearing the flag everywhere else.
fn refresh_latest_from_tip(
    db: &Database,
    graph: &dyn CommitGraph,
    config: &Config,
    vcs: &dyn VersionControl,
    repository_id: i64,
) -> CodeIntelResult<(String, Vec<i64>)> {
    let tip = vcs.head(repository_id).upstream("vcs.head")?;
    let distances = ancestor_distances(graph, repository_id, &tip, config.max_traversal_distance)?;
    let commits: Vec<String> = distances.keys().cloned().collect();
    let candidates = db.completed_uploads_at_commits(repository_id, &commits)?;
    let latest: Vec<i64> = rank_candidates(candidates, &distances, true)
        .iter()
        .map(|dump| dump.id)
        .collect();
    db.set_latest_for_repo(repository_id, &latest)?;
    Ok((tip, latest))
}
