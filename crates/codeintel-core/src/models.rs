//! Shared typed models used across the store, query, and resolver layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// 1. RepositoryIdentity
// ---------------------------------------------------------------------------

/// A repository as known to the repository registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    pub id: i64,
    pub name: String,
}

// ---------------------------------------------------------------------------
// 2. UploadState
// ---------------------------------------------------------------------------

/// Processing state of an uploaded LSIF dump.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Queued,
    Processing,
    Completed,
    Errored,
    Deleted,
}

impl UploadState {
    pub const ALL: [UploadState; 5] = [
        UploadState::Queued,
        UploadState::Processing,
        UploadState::Completed,
        UploadState::Errored,
        UploadState::Deleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UploadState::Queued => "queued",
            UploadState::Processing => "processing",
            UploadState::Completed => "completed",
            UploadState::Errored => "errored",
            UploadState::Deleted => "deleted",
        }
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadState {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        UploadState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown upload state {value:?}"))
    }
}

// ---------------------------------------------------------------------------
// 3. Dump
// ---------------------------------------------------------------------------

/// A precomputed code intelligence artifact for one repository and commit.
///
/// `root` is the directory (relative to the repository root) the indexer ran
/// in; an empty root covers the whole repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dump {
    pub id: i64,
    pub repository_id: i64,
    pub commit: String,
    pub root: String,
    pub indexer: String,
    pub is_latest_for_repo: bool,
    pub uploaded_at: String,
    pub state: UploadState,
    pub failure_summary: Option<String>,
}

/// Fields needed to record a new upload; the store assigns id and timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUpload {
    pub repository_id: i64,
    pub commit: String,
    pub root: String,
    pub indexer: String,
    pub state: UploadState,
    pub is_latest_for_repo: bool,
    pub failure_summary: Option<String>,
}

impl NewUpload {
    /// A completed, non-latest upload of `commit` rooted at `root`.
    pub fn completed(repository_id: i64, commit: &str, root: &str) -> Self {
        Self {
            repository_id,
            commit: commit.to_string(),
            root: root.to_string(),
            indexer: "lsif-go".to_string(),
            state: UploadState::Completed,
            is_latest_for_repo: false,
            failure_summary: None,
        }
    }
}

// ---------------------------------------------------------------------------
// 4. Positions, ranges, locations
// ---------------------------------------------------------------------------

/// Zero-based line/character offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// Half-open range; `end` is exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start_line: u32, start_character: u32, end_line: u32, end_character: u32) -> Self {
        Self {
            start: Position {
                line: start_line,
                character: start_character,
            },
            end: Position {
                line: end_line,
                character: end_character,
            },
        }
    }
}

/// A location inside a dump, relative to the dump root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub range: Range,
}

/// A location paired with the dump that produced it; `path` is relative to
/// the repository root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub dump: Dump,
    pub path: String,
    pub range: Range,
}

/// Caller-facing location. Repository and commit are those of the dump, which
/// may differ from the commit the caller asked about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLocation {
    pub repository_id: i64,
    pub commit: String,
    pub path: String,
    pub range: Range,
}

// ---------------------------------------------------------------------------
// 5. Usage statistics
// ---------------------------------------------------------------------------

/// Search-based and precise code intelligence activity for one repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoUsageStatistics {
    pub repository_id: i64,
    pub search_count: i64,
    pub precise_count: i64,
}

/// Raw per-name event counts before repository resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub search_count: i64,
    pub precise_count: i64,
}

/// A single event log row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub name: String,
    pub url: String,
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// 6. Listing
// ---------------------------------------------------------------------------

/// Filter applied when listing uploads. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<UploadState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_latest_for_repo: Option<bool>,
}

/// One page of an upload listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadPage {
    pub uploads: Vec<Dump>,
    pub next_cursor: Option<String>,
    pub total_count: i64,
}
