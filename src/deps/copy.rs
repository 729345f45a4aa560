//! Materialising a checked-out package into the vendor tree.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

pub trait DirectoryCopier {
    /// Copies the tree at `src` into `dst`, creating `dst` as needed.
    fn copy(&self, dst: &Path, src: &Path) -> Result<()>;
}

/// Plain filesystem copy that leaves out dot-files and dot-directories
/// (`.git`, `.hg`, editor droppings). Symbolic links are not copied.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsCopier;

impl DirectoryCopier for FsCopier {
    fn copy(&self, dst: &Path, src: &Path) -> Result<()> {
        let wrap = |source: std::io::Error| Error::Copy {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            source,
        };

        if !src.is_dir() {
            return Err(wrap(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "source is not a directory",
            )));
        }

        let walker = WalkDir::new(src).follow_links(false).into_iter().filter_entry(|e| {
            e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
        });

        for entry in walker {
            let entry = entry.map_err(|e| wrap(e.into()))?;
            let rel = entry.path().strip_prefix(src).unwrap_or(Path::new(""));
            let target = dst.join(rel);
            let ty = entry.file_type();

            if ty.is_dir() {
                fs::create_dir_all(&target).map_err(wrap)?;
            } else if ty.is_symlink() {
                debug!(link = %entry.path().display(), "skipping symlink");
            } else {
                fs::copy(entry.path(), &target).map_err(wrap)?;
            }
        }
        Ok(())
    }
}
