//! Fetching packages into the vendor tree.
//!
//! A fetch vendors one import path: checkout, pin, copy, record, clean up.
//! Recursive fetches then repeatedly re-analyse the whole vendor tree and
//! vendor the smallest missing import path until nothing is missing.

use super::copy::DirectoryCopier;
use crate::config::Layout;
use crate::error::{Error, Result};
use crate::graph::{self, ImportTable, PackageLoader, PackageRoot};
use crate::manifest::{Dependency, Manifest};
use crate::repo::{RepositoryResolver, Selector, WorkingCopy};
use crate::resolve;
use crate::ui;
use colored::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// What the user asked for on the command line.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub import_path: String,
    pub selector: Selector,
    pub recursive: bool,
    pub global: bool,
    pub allow_insecure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Vendored(Dependency),
    /// The import path was in the manifest before the fetch started.
    AlreadyVendored(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    /// Dependencies vendored by recursive discovery, in fetch order.
    pub transitive: Vec<Dependency>,
}

pub struct Fetcher<'a> {
    layout: &'a Layout,
    resolver: &'a dyn RepositoryResolver,
    copier: &'a dyn DirectoryCopier,
    loader: &'a dyn PackageLoader,
}

impl<'a> Fetcher<'a> {
    pub fn new(
        layout: &'a Layout,
        resolver: &'a dyn RepositoryResolver,
        copier: &'a dyn DirectoryCopier,
        loader: &'a dyn PackageLoader,
    ) -> Self {
        Self {
            layout,
            resolver,
            copier,
            loader,
        }
    }

    /// Runs a fetch command, recursing into missing imports if requested.
    pub fn run(&self, request: &FetchRequest) -> Result<FetchReport> {
        let outcome = self.fetch_one(
            &request.import_path,
            &request.selector,
            request.allow_insecure,
            request.global,
        )?;

        let mut report = FetchReport {
            outcome,
            transitive: Vec::new(),
        };
        let path = match &report.outcome {
            FetchOutcome::Vendored(root) if request.recursive => root.importpath.clone(),
            _ => return Ok(report),
        };

        // Transitive dependencies always come from the upstream default head.
        let head = Selector::default();

        loop {
            let missing = self.missing_imports(&path, request.global)?;
            let Some(next) = missing.first() else {
                debug!(import = %path, "no missing imports left");
                break;
            };

            info!(import = %next, remaining = missing.len(), "fetching recursive dependency");
            println!("{} Fetching recursive dependency {}", "→".cyan(), next.bold());
            match self.fetch_one(next, &head, request.allow_insecure, request.global)? {
                FetchOutcome::Vendored(dep) => report.transitive.push(dep),
                FetchOutcome::AlreadyVendored(p) => {
                    debug!(import = %p, "already vendored, stopping recursion");
                    break;
                }
            }
        }
        Ok(report)
    }

    /// Vendors a single import path without looking at its imports.
    pub fn fetch_one(
        &self,
        raw_path: &str,
        selector: &Selector,
        allow_insecure: bool,
        global: bool,
    ) -> Result<FetchOutcome> {
        let path = resolve::strip_scheme(raw_path)?;
        let manifest_path = self.layout.manifest_path();
        let mut manifest = Manifest::load_or_default(&manifest_path)?;

        if manifest.has_import_path(&path) {
            ui::warn(format_args!("{} is already vendored", path));
            return Ok(FetchOutcome::AlreadyVendored(path));
        }

        let (repo, sub_path) = resolve::deduce(self.resolver, raw_path, allow_insecure)?;
        println!("{} Fetching {}", "📦".blue(), path.bold());
        let wc = repo.checkout(selector)?;

        let committed = self.commit(
            &mut manifest,
            PendingDependency {
                importpath: &path,
                repository: repo.url(),
                sub_path: &sub_path,
            },
            wc.as_ref(),
            global,
        );
        let dep = release(wc, committed)?;

        println!(
            "   {} Vendored {} at {}",
            "✓".green(),
            dep.importpath,
            short_rev(&dep.revision).dimmed()
        );
        Ok(FetchOutcome::Vendored(dep))
    }

    /// Pins, copies and records a checked-out package. The manifest is
    /// written only once the copy has succeeded.
    fn commit(
        &self,
        manifest: &mut Manifest,
        pending: PendingDependency<'_>,
        wc: &dyn WorkingCopy,
        global: bool,
    ) -> Result<Dependency> {
        let dep = Dependency {
            importpath: pending.importpath.to_string(),
            repository: pending.repository.to_string(),
            revision: wc.revision()?,
            branch: wc.branch()?,
            path: pending.sub_path.to_string(),
        };
        manifest.add_dependency(dep.clone())?;

        let dst = self.layout.vendor_dir(global).join(&dep.importpath);
        let src = wc.dir().join(dep.path.trim_start_matches('/'));
        let existed = dst.exists();
        debug!(src = %src.display(), dst = %dst.display(), "copying package");

        if let Err(e) = self.copier.copy(&dst, &src) {
            if !existed {
                remove_partial(&dst);
            }
            return Err(e);
        }

        // A crash between the copy and this write leaves untracked files in
        // the vendor tree; the manifest never names files that are absent.
        manifest.save(&self.layout.manifest_path())?;
        Ok(dep)
    }

    /// The standard library followed by one root per vendored dependency.
    pub fn package_roots(&self, manifest: &Manifest, global: bool) -> Vec<PackageRoot> {
        let vendor = self.layout.vendor_dir(global);
        std::iter::once(PackageRoot::new(self.layout.stdlib_root(), ""))
            .chain(
                manifest
                    .dependencies
                    .iter()
                    .map(|d| PackageRoot::new(vendor.join(&d.importpath), d.importpath.as_str())),
            )
            .collect()
    }

    /// Imports reachable from the packages vendored under `path` that no
    /// known root provides. Always works from a freshly loaded manifest.
    pub fn missing_imports(&self, path: &str, global: bool) -> Result<BTreeSet<String>> {
        let manifest = Manifest::load(&self.layout.manifest_path())?;
        let roots = self.package_roots(&manifest, global);
        let table = ImportTable::build(&roots, self.loader)?;

        let target = roots
            .iter()
            .find(|r| r.prefix == path)
            .ok_or_else(|| Error::TargetNotFound(path.to_string()))?;
        let targets: Vec<String> = self
            .loader
            .discover(target)?
            .into_iter()
            .map(|l| l.import_path)
            .collect();

        graph::find_missing(&targets, &table, self.loader)
    }
}

struct PendingDependency<'p> {
    importpath: &'p str,
    repository: &'p str,
    sub_path: &'p str,
}

/// Destroys `wc` and merges the outcome with `result`. An earlier error
/// wins over a failure to clean up.
pub(crate) fn release<T>(wc: Box<dyn WorkingCopy>, result: Result<T>) -> Result<T> {
    match (result, wc.destroy()) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(cleanup)) => Err(cleanup),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup)) => {
            warn!(error = %cleanup, "working copy left behind");
            Err(e)
        }
    }
}

fn remove_partial(dst: &Path) {
    if let Err(e) = fs::remove_dir_all(dst) {
        debug!(dst = %dst.display(), error = %e, "could not remove partial copy");
    }
}

fn short_rev(rev: &str) -> &str {
    rev.get(..12).unwrap_or(rev)
}
