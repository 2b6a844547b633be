//! Process configuration, read once from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{CodeIntelError, CodeIntelResult};
use crate::query::guards::{
    clamp_limit, DEFAULT_UPLOAD_PAGE_SIZE, MAX_TRAVERSAL_DISTANCE, MAX_UPLOAD_PAGE_SIZE,
};

/// Runtime settings for the code intelligence core.
///
/// Built once at startup via [`Config::from_env`] (or [`Config::default`] in
/// tests) and passed explicitly to everything that needs it.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    /// Trailing window for usage statistics, in days.
    pub usage_window_days: u32,
    pub search_event_prefix: String,
    pub precise_event_prefix: String,
    pub default_page_size: i64,
    pub max_page_size: i64,
    /// Maximum number of parent hops walked when looking for a usable dump.
    pub max_traversal_distance: u32,
    /// Keep only the closest dump per (root, indexer) when resolving.
    pub dedupe_by_root: bool,
    pub busy_timeout: Duration,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("codeintel.db"),
            usage_window_days: 7,
            search_event_prefix: "codeintel.search".to_string(),
            precise_event_prefix: "codeintel.lsif".to_string(),
            default_page_size: DEFAULT_UPLOAD_PAGE_SIZE,
            max_page_size: MAX_UPLOAD_PAGE_SIZE,
            max_traversal_distance: 50,
            dedupe_by_root: true,
            busy_timeout: Duration::from_millis(5000),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Read `CODEINTEL_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> CodeIntelResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> CodeIntelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_page_size = match get("CODEINTEL_MAX_PAGE_SIZE") {
            Some(v) => clamp_limit(
                parse_number::<i64>("CODEINTEL_MAX_PAGE_SIZE", &v)?,
                MAX_UPLOAD_PAGE_SIZE,
            ),
            None => defaults.max_page_size,
        };
        let default_page_size = match get("CODEINTEL_DEFAULT_PAGE_SIZE") {
            Some(v) => parse_number::<i64>("CODEINTEL_DEFAULT_PAGE_SIZE", &v)?,
            None => defaults.default_page_size,
        };
        let max_traversal_distance = match get("CODEINTEL_MAX_TRAVERSAL_DISTANCE") {
            Some(v) => parse_number::<u32>("CODEINTEL_MAX_TRAVERSAL_DISTANCE", &v)?
                .min(MAX_TRAVERSAL_DISTANCE),
            None => defaults.max_traversal_distance,
        };

        Ok(Self {
            db_path: get("CODEINTEL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            usage_window_days: match get("CODEINTEL_USAGE_WINDOW_DAYS") {
                Some(v) => parse_number::<u32>("CODEINTEL_USAGE_WINDOW_DAYS", &v)?.max(1),
                None => defaults.usage_window_days,
            },
            search_event_prefix: get("CODEINTEL_SEARCH_EVENT_PREFIX")
                .unwrap_or(defaults.search_event_prefix),
            precise_event_prefix: get("CODEINTEL_PRECISE_EVENT_PREFIX")
                .unwrap_or(defaults.precise_event_prefix),
            default_page_size: clamp_limit(default_page_size, max_page_size),
            max_page_size,
            max_traversal_distance,
            dedupe_by_root: get("CODEINTEL_DEDUPE_BY_ROOT")
                .map(|v| env_flag(&v, defaults.dedupe_by_root))
                .unwrap_or(defaults.dedupe_by_root),
            busy_timeout: match get("CODEINTEL_BUSY_TIMEOUT_MS") {
                Some(v) => Duration::from_millis(parse_number::<u64>("CODEINTEL_BUSY_TIMEOUT_MS", &v)?),
                None => defaults.busy_timeout,
            },
            log_filter: get("CODEINTEL_LOG").unwrap_or(defaults.log_filter),
        })
    }
}

/// Interpret a boolean toggle. Unrecognised values keep `default`.
fn env_flag(value: &str, default: bool) -> bool {
    let v = value.trim().to_lowercase();
    match v.as_str() {
        "0" | "false" | "no" | "off" => false,
        "1" | "true" | "yes" | "on" => true,
        _ => default,
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> CodeIntelResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| CodeIntelError::Config(format!("{key} must be a number, got {value:?}")))
}
