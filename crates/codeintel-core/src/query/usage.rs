//! Repository usage ranking from code intelligence events.

use std::cmp::Ordering;

use indexmap::IndexMap;
use tracing::debug;

use crate::config::Config;
use crate::errors::CodeIntelResult;
use crate::models::{EventCounts, RepoUsageStatistics};
use crate::store::database::Database;
use crate::store::events::EventClasses;

/// Search count descending, then precise count descending.
pub fn compare_usage(a: &RepoUsageStatistics, b: &RepoUsageStatistics) -> Ordering {
    b.search_count
        .cmp(&a.search_count)
        .then_with(|| b.precise_count.cmp(&a.precise_count))
}

/// Sort in place with [`compare_usage`]. The sort is stable, so fully tied
/// entries keep their incoming order.
pub fn rank_usage(stats: &mut [RepoUsageStatistics]) {
    stats.sort_by(compare_usage);
}

/// Pair counts with repository ids, dropping names that no longer resolve
/// (the repository was deleted or renamed after the events were logged).
pub fn attach_repository_ids(
    counts: &IndexMap<String, EventCounts>,
    ids: &std::collections::HashMap<String, i64>,
) -> Vec<RepoUsageStatistics> {
    counts
        .iter()
        .filter_map(|(name, count)| {
            let Some(&repository_id) = ids.get(name) else {
                debug!(repo_name = %name, "dropping usage for unresolved repository");
                return None;
            };
            Some(RepoUsageStatistics {
                repository_id,
                search_count: count.search_count,
                precise_count: count.precise_count,
            })
        })
        .collect()
}

/// Count search-based and precise code intelligence events per repository over
/// the configured trailing window, ordered by search then precise activity.
/// Any store failure aborts the whole computation.
pub fn compute_usage_ranking(db: &Database, config: &Config) -> CodeIntelResult<Vec<RepoUsageStatistics>> {
    let counts = db.event_counts_by_repo_name(
        config.usage_window_days,
        EventClasses {
            search_prefix: &config.search_event_prefix,
            precise_prefix: &config.precise_event_prefix,
        },
    )?;
    let names: Vec<&str> = counts.keys().map(String::as_str).collect();
    let ids = db.repo_ids(&names)?;

    let mut stats = attach_repository_ids(&counts, &ids);
    rank_usage(&mut stats);
    debug!(
        repositories = stats.len(),
        window_days = config.usage_window_days,
        "computed usage ranking"
    );
    Ok(stats)
}
