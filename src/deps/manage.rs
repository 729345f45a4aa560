//! Inspecting and maintaining an existing vendor tree.
//!
//! - `gvend list` - show what the manifest pins
//! - `gvend delete <importpath>` - drop a dependency and its files
//! - `gvend restore` - rebuild the vendor tree from the manifest

use super::copy::DirectoryCopier;
use super::fetch::release;
use crate::config::Layout;
use crate::error::{Error, Result};
use crate::manifest::{Dependency, Manifest};
use crate::repo::{RepositoryResolver, Selector};
use crate::resolve;
use crate::ui::Table;
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub fn dependency_table(manifest: &Manifest) -> Table {
    let mut table = Table::new(&["Import path", "Revision", "Branch", "Repository"]);
    for dep in &manifest.dependencies {
        table.add_row(vec![
            format!("{}{}", dep.importpath, dep.path),
            dep.revision.clone(),
            if dep.branch.is_empty() {
                "-".to_string()
            } else {
                dep.branch.clone()
            },
            dep.repository.clone(),
        ]);
    }
    table
}

pub fn list_dependencies(layout: &Layout) -> Result<Manifest> {
    let manifest = Manifest::load_or_default(&layout.manifest_path())?;
    if manifest.dependencies.is_empty() {
        println!("{} No vendored dependencies.", "!".yellow());
    } else {
        dependency_table(&manifest).print();
    }
    Ok(manifest)
}

/// Removes `import_path` from the manifest and deletes its files, leaving
/// any dependency vendored below it in place.
pub fn delete_dependency(layout: &Layout, import_path: &str, global: bool) -> Result<Dependency> {
    let path = resolve::strip_scheme(import_path)?;
    let manifest_path = layout.manifest_path();
    let mut manifest = Manifest::load(&manifest_path)?;
    let dep = manifest.remove_dependency(&path)?;

    // Write the manifest first so it never names files that are gone.
    manifest.save(&manifest_path)?;

    let vendor = layout.vendor_dir(global);
    let dir = vendor.join(&dep.importpath);
    remove_vendored(&dir, &nested_roots(&manifest, &vendor, &dep.importpath))?;
    prune_empty_parents(&dir, &vendor);

    println!("{} Deleted {}", "🗑️".red(), dep.importpath.bold());
    Ok(dep)
}

/// Checks out every manifest entry at its pinned revision and copies it
/// into the vendor tree. Returns the number of restored dependencies.
pub fn restore_dependencies(
    layout: &Layout,
    resolver: &dyn RepositoryResolver,
    copier: &dyn DirectoryCopier,
    allow_insecure: bool,
    global: bool,
) -> Result<usize> {
    let manifest = Manifest::load_or_default(&layout.manifest_path())?;
    let vendor = layout.vendor_dir(global);

    // Sorted order restores a parent before anything vendored inside it.
    for dep in &manifest.dependencies {
        if !allow_insecure && resolve::is_insecure_url(&dep.repository) {
            return Err(Error::InsecureProtocol {
                url: dep.repository.clone(),
            });
        }
        println!("{} Restoring {}", "📦".blue(), dep.importpath.bold());

        let repo = resolver.open(&dep.repository)?;
        let wc = repo.checkout(&Selector::revision(&dep.revision))?;

        let dst = vendor.join(&dep.importpath);
        let src = wc.dir().join(dep.path.trim_start_matches('/'));
        let copied = remove_vendored(&dst, &nested_roots(&manifest, &vendor, &dep.importpath))
            .and_then(|()| copier.copy(&dst, &src));
        release(wc, copied)?;

        println!("   {} {}", "✓".green(), dep.revision.dimmed());
    }
    Ok(manifest.dependencies.len())
}

/// Vendor directories of manifest entries strictly below `import_path`.
fn nested_roots(manifest: &Manifest, vendor: &Path, import_path: &str) -> Vec<PathBuf> {
    let prefix = format!("{}/", import_path);
    manifest
        .dependencies
        .iter()
        .filter(|d| d.importpath.starts_with(&prefix))
        .map(|d| vendor.join(&d.importpath))
        .collect()
}

/// Deletes everything below `dir` except the subtrees rooted at `keep`.
fn remove_vendored(dir: &Path, keep: &[PathBuf]) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    let fail = |source: std::io::Error| Error::Remove {
        dir: dir.to_path_buf(),
        source,
    };
    if keep.is_empty() {
        return fs::remove_dir_all(dir).map_err(fail);
    }

    let walker = WalkDir::new(dir)
        .contents_first(true)
        .into_iter()
        .filter_entry(|e| !keep.iter().any(|k| k == e.path()));
    for entry in walker {
        let entry = entry.map_err(|e| fail(e.into()))?;
        if entry.file_type().is_dir() {
            // Directories leading to a kept subtree stay non-empty.
            if let Err(e) = fs::remove_dir(entry.path()) {
                debug!(dir = %entry.path().display(), error = %e, "kept directory");
            }
        } else {
            fs::remove_file(entry.path()).map_err(fail)?;
        }
    }
    Ok(())
}

/// Removes now-empty directories between `dir` and `stop`.
fn prune_empty_parents(dir: &Path, stop: &Path) {
    let mut current = dir.parent();
    while let Some(parent) = current {
        if parent == stop || !parent.starts_with(stop) || fs::remove_dir(parent).is_err() {
            break;
        }
        current = parent.parent();
    }
}
