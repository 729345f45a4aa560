//! Remote repositories and their temporary working copies.
//!
//! - [`git`] - `git2`-backed checkouts
//! - [`deduce`] - mapping import paths to repository URLs

pub mod deduce;
pub mod git;

pub use deduce::RemoteResolver;
pub use git::{GitRemote, GitWorkingCopy};

use crate::error::Result;
use std::path::Path;

/// Which point in a repository's history to check out.
///
/// At most one of `branch` and `tag` may be set; `revision` may refine
/// either. An empty selector means the upstream default head.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub revision: Option<String>,
}

impl Selector {
    pub fn is_default(&self) -> bool {
        self.branch.is_none() && self.tag.is_none() && self.revision.is_none()
    }

    pub fn revision(rev: impl Into<String>) -> Self {
        Self {
            revision: Some(rev.into()),
            ..Self::default()
        }
    }
}

pub trait RemoteRepository {
    fn url(&self) -> &str;

    fn checkout(&self, selector: &Selector) -> Result<Box<dyn WorkingCopy>>;
}

/// A disposable checkout. Must be consumed by [`WorkingCopy::destroy`].
pub trait WorkingCopy {
    /// Commit id of the checked-out state.
    fn revision(&self) -> Result<String>;

    /// Branch name for future updates, empty when none applies.
    fn branch(&self) -> Result<String>;

    fn dir(&self) -> &Path;

    fn destroy(self: Box<Self>) -> Result<()>;
}

pub trait RepositoryResolver {
    /// Returns the repository holding `import_path` and the location of the
    /// package inside it (`""` or `/sub/dir`).
    fn deduce(
        &self,
        import_path: &str,
        allow_insecure: bool,
    ) -> Result<(Box<dyn RemoteRepository>, String)>;

    /// Opens a repository by URL, as recorded in the manifest.
    fn open(&self, url: &str) -> Result<Box<dyn RemoteRepository>>;
}
