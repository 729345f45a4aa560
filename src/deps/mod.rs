//! Fetching and managing vendored dependencies.
//!
//! - **Fetching**: check out a repository, copy one package into the vendor
//!   tree and pin it in `vendor/manifest`, optionally chasing every import
//!   the vendored code still lacks
//! - **Management**: list, delete and restore pinned dependencies
//!
//! ## Commands
//!
//! - `gvend fetch <importpath>` - vendor a package and its dependencies
//! - `gvend delete <importpath>` - drop a vendored package
//! - `gvend list` - show the manifest
//! - `gvend restore` - rebuild `vendor/` from the manifest

mod copy;
mod fetch;
mod manage;

pub use copy::{DirectoryCopier, FsCopier};
pub use fetch::{FetchOutcome, FetchReport, FetchRequest, Fetcher};
pub use manage::{delete_dependency, dependency_table, list_dependencies, restore_dependencies};
