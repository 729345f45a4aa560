//! Package discovery and loading for Go source trees.

use super::constraint::BuildContext;
use super::scan;
use super::{Package, PackageLocation, PackageRoot};
use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

pub trait PackageLoader {
    /// Lists every package below `root`.
    fn discover(&self, root: &PackageRoot) -> Result<Vec<PackageLocation>>;

    /// Reads the import list of one package.
    fn load(&self, location: &PackageLocation) -> Result<Package>;
}

/// Loads packages straight from `.go` files on disk, keeping only the
/// files that build for its [`BuildContext`].
#[derive(Debug, Clone, Copy)]
pub struct GoSourceLoader {
    context: BuildContext,
}

impl GoSourceLoader {
    pub const HOST: GoSourceLoader = GoSourceLoader::new(BuildContext::HOST);

    pub const fn new(context: BuildContext) -> Self {
        Self { context }
    }

    /// Contents of the files in `dir` that take part in a build.
    fn buildable_sources(&self, dir: &Path) -> std::io::Result<Vec<String>> {
        let mut sources = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file() || !is_source_file(&path) {
                continue;
            }
            let name = entry.file_name();
            if !self.context.matches_file_name(&name.to_string_lossy()) {
                continue;
            }
            let src = String::from_utf8_lossy(&fs::read(&path)?).into_owned();
            if self.context.matches_source(&src) {
                sources.push(src);
            } else {
                debug!(file = %path.display(), "excluded by build constraints");
            }
        }
        Ok(sources)
    }
}

impl Default for GoSourceLoader {
    fn default() -> Self {
        Self::HOST
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || name == "testdata"
}

fn is_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".go")
        && !name.ends_with("_test.go")
        && !name.starts_with('.')
        && !name.starts_with('_')
}

/// Import path of the package in `rel` below a root with `prefix`.
///
/// Anything under a `vendor` directory is importable by the path that
/// follows the last `vendor` element.
pub fn import_path_for(prefix: &str, rel: &Path) -> String {
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(p) => Some(p.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(idx) = parts.iter().rposition(|p| p == "vendor") {
        return parts[idx + 1..].join("/");
    }

    let mut path = prefix.trim_end_matches('/').to_string();
    for part in parts {
        if !path.is_empty() {
            path.push('/');
        }
        path.push_str(&part);
    }
    path
}

impl PackageLoader for GoSourceLoader {
    fn discover(&self, root: &PackageRoot) -> Result<Vec<PackageLocation>> {
        if !root.dir.is_dir() {
            debug!(root = %root.dir.display(), "package root does not exist");
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let walker = WalkDir::new(&root.dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e));

        for entry in walker {
            let entry = entry.map_err(|e| Error::PackageLoad {
                dir: e.path().unwrap_or(&root.dir).to_path_buf(),
                source: e.into(),
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let buildable = self.buildable_sources(entry.path()).map_err(|source| {
                Error::PackageLoad {
                    dir: entry.path().to_path_buf(),
                    source,
                }
            })?;
            if buildable.is_empty() {
                continue;
            }
            let rel = entry.path().strip_prefix(&root.dir).unwrap_or(Path::new(""));
            let import_path = import_path_for(&root.prefix, rel);
            if import_path.is_empty() {
                continue;
            }
            found.push(PackageLocation {
                import_path,
                dir: entry.path().to_path_buf(),
            });
        }
        debug!(root = %root.dir.display(), packages = found.len(), "discovered packages");
        Ok(found)
    }

    fn load(&self, location: &PackageLocation) -> Result<Package> {
        let sources = self
            .buildable_sources(&location.dir)
            .map_err(|source| Error::PackageLoad {
                dir: location.dir.clone(),
                source,
            })?;

        let imports: BTreeSet<String> = sources
            .iter()
            .flat_map(|src| scan::parse_imports(src))
            .collect();

        Ok(Package {
            import_path: location.import_path.clone(),
            imports: imports.into_iter().collect(),
        })
    }
}
