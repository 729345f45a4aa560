//! Git checkouts backed by `git2`.
//!
//! Each checkout is a fresh clone into a private temporary directory which
//! is removed when the working copy is destroyed (or dropped).

use super::{RemoteRepository, Selector, WorkingCopy};
use crate::error::{Error, Result};
use colored::*;
use git2::Repository;
use git2::build::{CheckoutBuilder, RepoBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GitRemote {
    url: String,
}

impl GitRemote {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl RemoteRepository for GitRemote {
    fn url(&self) -> &str {
        &self.url
    }

    fn checkout(&self, selector: &Selector) -> Result<Box<dyn WorkingCopy>> {
        if selector.branch.is_some() && selector.tag.is_some() {
            return Err(Error::checkout(
                &self.url,
                "only one of branch or tag may be supplied",
            ));
        }

        let dir = tempfile::Builder::new()
            .prefix("gvend-")
            .tempdir()
            .map_err(|e| Error::checkout(&self.url, e))?;
        debug!(url = %self.url, dir = %dir.path().display(), "cloning");

        let repo = clone_repo(&self.url, selector.branch.as_deref(), dir.path())?;

        if let Some(target) = selector.revision.as_deref().or(selector.tag.as_deref()) {
            detach_at(&repo, target)
                .map_err(|e| Error::checkout(&self.url, format!("{}: {}", target, e.message())))?;
        }

        Ok(Box::new(GitWorkingCopy {
            url: self.url.clone(),
            repo,
            dir,
            requested_branch: selector.branch.clone(),
        }))
    }
}

fn clone_repo(url: &str, branch: Option<&str>, into: &Path) -> Result<Repository> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷"),
    );
    pb.set_message(format!("Cloning {}...", url));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let mut builder = RepoBuilder::new();
    if let Some(b) = branch {
        builder.branch(b);
    }

    match builder.clone(url, into) {
        Ok(repo) => {
            pb.finish_and_clear();
            Ok(repo)
        }
        Err(err) => {
            pb.finish_with_message(format!("{} Failed {}", "x".red(), url));
            Err(Error::checkout(url, err.message()))
        }
    }
}

/// Detaches HEAD at `target`, which may be a tag name or a commit id.
fn detach_at(repo: &Repository, target: &str) -> std::result::Result<(), git2::Error> {
    let object = match repo.revparse_single(&format!("refs/tags/{}", target)) {
        Ok(obj) => obj,
        Err(_) => repo.revparse_single(target)?,
    };
    let commit = object.peel_to_commit()?;

    let mut opts = CheckoutBuilder::new();
    opts.force();
    repo.checkout_tree(commit.as_object(), Some(&mut opts))?;
    repo.set_head_detached(commit.id())?;
    Ok(())
}

pub struct GitWorkingCopy {
    url: String,
    repo: Repository,
    dir: TempDir,
    requested_branch: Option<String>,
}

impl WorkingCopy for GitWorkingCopy {
    fn revision(&self) -> Result<String> {
        let commit = self
            .repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| Error::checkout(&self.url, e.message()))?;
        Ok(commit.id().to_string())
    }

    fn branch(&self) -> Result<String> {
        let detached = self
            .repo
            .head_detached()
            .map_err(|e| Error::checkout(&self.url, e.message()))?;

        if !detached
            && let Ok(head) = self.repo.head()
            && head.is_branch()
            && let Some(name) = head.shorthand()
        {
            return Ok(name.to_string());
        }

        // Detached at a revision picked from a named branch.
        Ok(self.requested_branch.clone().unwrap_or_default())
    }

    fn dir(&self) -> &Path {
        self.dir.path()
    }

    fn destroy(self: Box<Self>) -> Result<()> {
        let GitWorkingCopy { repo, dir, .. } = *self;
        drop(repo);
        let path = dir.path().to_path_buf();
        debug!(dir = %path.display(), "removing working copy");
        dir.close().map_err(|source| Error::Cleanup { dir: path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Creates a repository with two commits on its default branch and a
    /// tag `v1` on the first one.
    fn upstream() -> (TempDir, String, String) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let sig = git2::Signature::now("gvend", "gvend@example.com").unwrap();

        let commit_file = |content: &str, parent: Option<git2::Oid>| {
            fs::write(dir.path().join("lib.go"), content).unwrap();
            let mut index = repo.index().unwrap();
            index.add_path(Path::new("lib.go")).unwrap();
            index.write().unwrap();
            let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
            let parents: Vec<git2::Commit> = parent
                .map(|p| vec![repo.find_commit(p).unwrap()])
                .unwrap_or_default();
            let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
            repo.commit(Some("HEAD"), &sig, &sig, content, &tree, &parent_refs)
                .unwrap()
        };

        let first = commit_file("package lib // one\n", None);
        let second = commit_file("package lib // two\n", Some(first));
        let first_commit = repo.find_commit(first).unwrap();
        repo.tag_lightweight("v1", first_commit.as_object(), false)
            .unwrap();
        (dir, first.to_string(), second.to_string())
    }

    #[test]
    fn test_checkout_default_head() {
        let (up, _first, second) = upstream();
        let remote = GitRemote::new(up.path().to_str().unwrap());
        let wc = remote.checkout(&Selector::default()).unwrap();
        assert_eq!(wc.revision().unwrap(), second);
        assert!(!wc.branch().unwrap().is_empty());
        assert!(wc.dir().join("lib.go").exists());
        let dir = wc.dir().to_path_buf();
        wc.destroy().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_checkout_tag_is_detached_without_branch() {
        let (up, first, _second) = upstream();
        let remote = GitRemote::new(up.path().to_str().unwrap());
        let selector = Selector {
            tag: Some("v1".to_string()),
            ..Selector::default()
        };
        let wc = remote.checkout(&selector).unwrap();
        assert_eq!(wc.revision().unwrap(), first);
        assert_eq!(wc.branch().unwrap(), "");
        let content = fs::read_to_string(wc.dir().join("lib.go")).unwrap();
        assert!(content.contains("one"));
        wc.destroy().unwrap();
    }

    #[test]
    fn test_checkout_revision() {
        let (up, first, _second) = upstream();
        let remote = GitRemote::new(up.path().to_str().unwrap());
        let wc = remote.checkout(&Selector::revision(first.clone())).unwrap();
        assert_eq!(wc.revision().unwrap(), first);
        wc.destroy().unwrap();
    }

    #[test]
    fn test_checkout_rejects_branch_and_tag() {
        let remote = GitRemote::new("/nonexistent");
        let selector = Selector {
            branch: Some("main".to_string()),
            tag: Some("v1".to_string()),
            revision: None,
        };
        assert!(matches!(
            remote.checkout(&selector),
            Err(Error::Checkout { .. })
        ));
    }

    #[test]
    fn test_checkout_unknown_repository_fails() {
        let missing = tempfile::tempdir().unwrap();
        let remote = GitRemote::new(missing.path().join("nope").to_str().unwrap());
        assert!(matches!(
            remote.checkout(&Selector::default()),
            Err(Error::Checkout { .. })
        ));
    }
}
