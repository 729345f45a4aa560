//! Import graph analysis.
//!
//! Given every package root currently known (the standard library plus one
//! root per vendored dependency) this module works out which transitively
//! imported packages cannot be found in any of them.
//!
//! - [`constraint`] - deciding which files build for the target platform
//! - [`loader`] - discovering and loading packages below a root
//! - [`scan`] - reading import declarations out of Go sources

pub mod constraint;
pub mod loader;
pub mod scan;

pub use constraint::BuildContext;
pub use loader::{GoSourceLoader, PackageLoader};

use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use tracing::debug;

/// Import path of the cgo pseudo-package. It has no source and is always
/// considered present.
pub const NATIVE_INTEROP: &str = "C";

/// A directory and the import path prefix the packages below it live under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRoot {
    pub dir: PathBuf,
    pub prefix: String,
}

impl PackageRoot {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLocation {
    pub import_path: String,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Package {
    pub import_path: String,
    /// Sorted and free of duplicates.
    pub imports: Vec<String>,
}

/// Every importable package across a set of roots.
///
/// Package contents are loaded on demand during traversal; the table only
/// records where each import path lives.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    /// `None` marks a package without source (the cgo pseudo-package).
    entries: HashMap<String, Option<PathBuf>>,
}

impl ImportTable {
    pub fn build(roots: &[PackageRoot], loader: &dyn PackageLoader) -> Result<Self> {
        let mut table = Self::default();
        table.entries.insert(NATIVE_INTEROP.to_string(), None);
        for root in roots {
            for location in loader.discover(root)? {
                table.insert(location);
            }
        }
        debug!(roots = roots.len(), packages = table.len(), "built import table");
        Ok(table)
    }

    /// Records `location` unless its import path is already known; earlier
    /// roots take precedence.
    pub fn insert(&mut self, location: PackageLocation) {
        self.entries
            .entry(location.import_path)
            .or_insert(Some(location.dir));
    }

    pub fn contains(&self, import_path: &str) -> bool {
        self.entries.contains_key(import_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    /// Every import below this package is present.
    Checked,
}

struct Walk<'a> {
    table: &'a ImportTable,
    loader: &'a dyn PackageLoader,
    state: HashMap<String, VisitState>,
    stack: Vec<String>,
    missing: BTreeSet<String>,
}

impl Walk<'_> {
    fn visit(&mut self, import_path: &str) -> Result<()> {
        let table = self.table;
        let Some(entry) = table.entries.get(import_path) else {
            self.missing.insert(import_path.to_string());
            return Ok(());
        };

        match self.state.get(import_path) {
            Some(VisitState::Checked) => return Ok(()),
            Some(VisitState::InProgress) => {
                return Err(Error::ImportCycle {
                    import_path: import_path.to_string(),
                    stack: self.stack.clone(),
                });
            }
            None => {}
        }

        let Some(dir) = entry else {
            self.state
                .insert(import_path.to_string(), VisitState::Checked);
            return Ok(());
        };

        let package = self.loader.load(&PackageLocation {
            import_path: import_path.to_string(),
            dir: dir.clone(),
        })?;

        let before = self.missing.len();
        self.state
            .insert(import_path.to_string(), VisitState::InProgress);
        self.stack.push(import_path.to_string());

        for import in &package.imports {
            if import == import_path {
                continue;
            }
            self.visit(import)?;
        }

        self.stack.pop();
        if self.missing.len() == before {
            self.state
                .insert(import_path.to_string(), VisitState::Checked);
        } else {
            // Incomplete subtree: a later traversal must look again.
            self.state.remove(import_path);
        }
        Ok(())
    }
}

/// Returns every import path reachable from `targets` that is not present
/// in `table`.
///
/// An import loop aborts the analysis with [`Error::ImportCycle`].
pub fn find_missing(
    targets: &[String],
    table: &ImportTable,
    loader: &dyn PackageLoader,
) -> Result<BTreeSet<String>> {
    let mut walk = Walk {
        table,
        loader,
        state: HashMap::new(),
        stack: Vec::new(),
        missing: BTreeSet::new(),
    };
    for target in targets {
        walk.visit(target)?;
    }
    debug!(targets = targets.len(), missing = walk.missing.len(), "import analysis done");
    Ok(walk.missing)
}
