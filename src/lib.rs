//! # gvend - vendoring for Go import paths
//!
//! gvend copies the source of remote Go packages into a project's
//! `vendor/` directory and pins each one to an exact revision in
//! `vendor/manifest`. Fetches are recursive by default: after vendoring a
//! package, gvend looks for imports that neither the standard library nor
//! the vendor tree provides and fetches those too, one at a time.
//!
//! ## Quick Start
//!
//! ```bash
//! gvend fetch github.com/pkg/errors
//! gvend fetch --tag v1.2.0 gopkg.in/yaml.v2
//! gvend list
//! ```
//!
//! ## Module Organization
//!
//! - [`deps`] - fetch orchestration and manifest maintenance commands
//! - [`graph`] - finding imports that no known package root provides
//! - [`manifest`] - the `vendor/manifest` file
//! - [`repo`] - remote repositories and temporary checkouts
//! - [`resolve`] - import path canonicalisation
//! - [`config`] - `GOROOT`/`GOPATH` discovery and `gvend.toml`

/// `GOROOT`/`GOPATH` discovery and `gvend.toml`.
pub mod config;

/// Vendoring commands.
pub mod deps;

pub mod error;

/// Import graph analysis over Go source trees.
pub mod graph;

/// Persistent record of vendored dependencies.
pub mod manifest;

/// Remote repositories and working copies.
pub mod repo;

pub mod resolve;

/// Terminal tables and status lines.
pub mod ui;

pub use error::{Error, Result};
