//! Version-control collaborator seam.

use crate::errors::CodeIntelResult;

/// Looks up the current tip commit of a repository.
pub trait VersionControl {
    fn head(&self, repository_id: i64) -> CodeIntelResult<String>;
}

impl<F> VersionControl for F
where
    F: Fn(i64) -> CodeIntelResult<String>,
{
    fn head(&self, repository_id: i64) -> CodeIntelResult<String> {
        self(repository_id)
    }
}
