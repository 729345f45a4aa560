//! Project settings and on-disk layout.
//!
//! Settings come from the environment (`GOROOT`, `GOPATH`), an optional
//! `gvend.toml` in the project directory, and finally `go env`.
//!
//! ```toml
//! [go]
//! root = "/usr/local/go"
//! path = "/home/me/go"
//!
//! [fetch]
//! precaire = false
//! ```

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

pub const CONFIG_FILE: &str = "gvend.toml";
pub const VENDOR_DIR: &str = "vendor";
pub const MANIFEST_FILE: &str = "manifest";

#[derive(Deserialize, Debug, Default)]
pub struct GvendConfig {
    #[serde(default)]
    pub go: GoConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Deserialize, Debug, Default)]
pub struct GoConfig {
    pub root: Option<PathBuf>,
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
pub struct FetchConfig {
    /// Allow insecure transports by default.
    #[serde(default)]
    pub precaire: bool,
}

pub fn load_config(project_dir: &Path) -> Result<GvendConfig> {
    let path = project_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(GvendConfig::default());
    }
    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Where things live on disk for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub project_dir: PathBuf,
    pub goroot: PathBuf,
    pub gopath: PathBuf,
}

impl Layout {
    pub fn manifest_path(&self) -> PathBuf {
        self.project_dir.join(VENDOR_DIR).join(MANIFEST_FILE)
    }

    /// Destination root for vendored packages: the project's `vendor/`
    /// or, for global installs, `$GOPATH/src`.
    pub fn vendor_dir(&self, global: bool) -> PathBuf {
        if global {
            self.gopath.join("src")
        } else {
            self.project_dir.join(VENDOR_DIR)
        }
    }

    pub fn stdlib_root(&self) -> PathBuf {
        self.goroot.join("src")
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub layout: Layout,
    pub allow_insecure: bool,
}

impl Settings {
    pub fn discover(project_dir: &Path) -> Result<Self> {
        let config = load_config(project_dir)?;

        let goroot = pick_goroot(
            std::env::var_os("GOROOT"),
            config.go.root.as_deref(),
            project_dir,
        )
        .or_else(go_env_goroot)
        .context("Could not determine GOROOT; set $GOROOT or [go] root in gvend.toml")?;
        if !goroot.join("src").is_dir() {
            bail!("GOROOT {} has no src directory", goroot.display());
        }

        let gopath = pick_gopath(
            std::env::var_os("GOPATH"),
            config.go.path.as_deref(),
            project_dir,
        )
        .or_else(|| dirs::home_dir().map(|h| h.join("go")))
        .context("Could not determine GOPATH")?;

        debug!(goroot = %goroot.display(), gopath = %gopath.display(), "resolved settings");
        Ok(Self {
            layout: Layout {
                project_dir: project_dir.to_path_buf(),
                goroot,
                gopath,
            },
            allow_insecure: config.fetch.precaire,
        })
    }
}

fn non_empty(value: Option<OsString>) -> Option<OsString> {
    value.filter(|v| !v.is_empty())
}

fn relative_to(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn pick_goroot(env: Option<OsString>, configured: Option<&Path>, base: &Path) -> Option<PathBuf> {
    non_empty(env)
        .map(PathBuf::from)
        .or_else(|| configured.map(|p| relative_to(base, p)))
}

/// Only the first `GOPATH` entry receives global installs.
fn pick_gopath(env: Option<OsString>, configured: Option<&Path>, base: &Path) -> Option<PathBuf> {
    non_empty(env)
        .and_then(|v| std::env::split_paths(&v).find(|p| !p.as_os_str().is_empty()))
        .or_else(|| configured.map(|p| relative_to(base, p)))
}

fn go_env_goroot() -> Option<PathBuf> {
    let output = Command::new("go").args(["env", "GOROOT"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!root.is_empty()).then(|| PathBuf::from(root))
}
