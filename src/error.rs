//! Error taxonomy for the vendoring engine.
//!
//! "Already vendored" is deliberately absent: it is a normal outcome of a
//! fetch and is modelled by [`crate::deps::FetchOutcome`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not access manifest {path}: {source}")]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode manifest {path}: {source}")]
    ManifestFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} is already present in the manifest")]
    DuplicateImport(String),

    #[error("{0} is not vendored")]
    NotVendored(String),

    #[error("invalid import path {path:?}: {reason}")]
    InvalidImportPath { path: String, reason: String },

    #[error("unable to determine repository for {path}: {reason}")]
    UnresolvableImport { path: String, reason: String },

    #[error("{url} uses an insecure protocol; pass --precaire to allow it")]
    InsecureProtocol { url: String },

    #[error("checkout of {url} failed: {reason}")]
    Checkout { url: String, reason: String },

    #[error("copying {src} to {dst} failed: {source}")]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not remove working copy {dir}: {source}")]
    Cleanup {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not remove vendored files in {dir}: {source}")]
    Remove {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("import loop detected at {import_path}, visiting: {}", .stack.join(" -> "))]
    ImportCycle {
        import_path: String,
        stack: Vec<String>,
    },

    #[error("unable to locate packages for {0} in the vendor tree")]
    TargetNotFound(String),

    #[error("could not load package at {dir}: {source}")]
    PackageLoad {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn checkout(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::Checkout {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unresolvable(path: &str, reason: impl std::fmt::Display) -> Self {
        Self::UnresolvableImport {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
