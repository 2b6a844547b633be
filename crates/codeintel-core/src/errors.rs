//! Error types for the code intelligence core.

/// Top-level error enum for the code intelligence core.
///
/// Absence (an unknown upload id, a repository without dumps) is modelled as
/// `Option`, `bool`, or an empty result by the operations themselves and never
/// shows up here.
#[derive(Debug, thiserror::Error)]
pub enum CodeIntelError {
    #[error("unknown repository: {0}")]
    UnknownRepository(i64),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("invalid upload id: {0}")]
    InvalidUploadId(String),

    #[error("{operation}: {source}")]
    Upstream {
        operation: &'static str,
        #[source]
        source: Box<CodeIntelError>,
    },

    #[error("version control error: {0}")]
    Vcs(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CodeIntelResult<T> = Result<T, CodeIntelError>;

/// Wrap a failed collaborator call with the name of the operation that made it.
pub trait UpstreamContext<T> {
    fn upstream(self, operation: &'static str) -> CodeIntelResult<T>;
}

impl<T, E> UpstreamContext<T> for Result<T, E>
where
    E: Into<CodeIntelError>,
{
    fn upstream(self, operation: &'static str) -> CodeIntelResult<T> {
        self.map_err(|err| CodeIntelError::Upstream {
            operation,
            source: Box::new(err.into()),
        })
    }
}

impl CodeIntelError {
    /// Strip any `Upstream` wrapping and return the underlying failure.
    pub fn root_cause(&self) -> &CodeIntelError {
        match self {
            CodeIntelError::Upstream { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
