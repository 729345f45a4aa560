//! Vendor manifest (`vendor/manifest`).
//!
//! The manifest is the single source of truth for what has been vendored.
//! It is always read fresh from disk before it is mutated and rewritten
//! as a whole afterwards.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// One vendored package pinned to a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub importpath: String,
    pub repository: String,
    pub revision: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
    /// Location of the package inside `repository`, empty for the root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Manifest {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ManifestIo {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest: Manifest =
            serde_json::from_str(&content).map_err(|source| Error::ManifestFormat {
                path: path.to_path_buf(),
                source,
            })?;

        let mut seen = HashSet::new();
        for dep in &manifest.dependencies {
            if !seen.insert(dep.importpath.as_str()) {
                return Err(Error::DuplicateImport(dep.importpath.clone()));
            }
        }
        // Hand-edited files may be out of order.
        manifest
            .dependencies
            .sort_by(|a, b| a.importpath.cmp(&b.importpath));
        Ok(manifest)
    }

    /// Loads the manifest, treating a file that does not exist yet as empty.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(Error::ManifestIo { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Replaces the file at `path` with this manifest.
    ///
    /// The new content is written to a sibling temporary file which is then
    /// renamed over the old one, so readers never observe a torn write.
    pub fn save(&self, path: &Path) -> Result<()> {
        let io_err = |source| Error::ManifestIo {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)
            .map_err(|source| Error::ManifestFormat {
                path: path.to_path_buf(),
                source,
            })?;
        buf.push(b'\n');

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&buf).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    pub fn has_import_path(&self, importpath: &str) -> bool {
        self.get(importpath).is_some()
    }

    pub fn get(&self, importpath: &str) -> Option<&Dependency> {
        self.dependencies
            .iter()
            .find(|d| d.importpath == importpath)
    }

    /// Adds `dep`, keeping dependencies ordered by import path.
    pub fn add_dependency(&mut self, dep: Dependency) -> Result<()> {
        match self
            .dependencies
            .binary_search_by(|d| d.importpath.cmp(&dep.importpath))
        {
            Ok(_) => Err(Error::DuplicateImport(dep.importpath)),
            Err(idx) => {
                self.dependencies.insert(idx, dep);
                Ok(())
            }
        }
    }

    pub fn remove_dependency(&mut self, importpath: &str) -> Result<Dependency> {
        let idx = self
            .dependencies
            .iter()
            .position(|d| d.importpath == importpath)
            .ok_or_else(|| Error::NotVendored(importpath.to_string()))?;
        Ok(self.dependencies.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(importpath: &str) -> Dependency {
        Dependency {
            importpath: importpath.to_string(),
            repository: format!("https://{}", importpath),
            revision: "0123456789abcdef0123456789abcdef01234567".to_string(),
            branch: "master".to_string(),
            path: String::new(),
        }
    }

    #[test]
    fn test_add_rejects_duplicate_import_path() {
        let mut m = Manifest::default();
        m.add_dependency(dep("github.com/pkg/errors")).unwrap();
        let err = m.add_dependency(dep("github.com/pkg/errors")).unwrap_err();
        assert!(matches!(err, Error::DuplicateImport(p) if p == "github.com/pkg/errors"));
        assert_eq!(m.dependencies.len(), 1);
    }

    #[test]
    fn test_add_keeps_sorted_order() {
        let mut m = Manifest::default();
        m.add_dependency(dep("golang.org/x/net")).unwrap();
        m.add_dependency(dep("github.com/pkg/errors")).unwrap();
        m.add_dependency(dep("gopkg.in/yaml.v2")).unwrap();
        let paths: Vec<_> = m.dependencies.iter().map(|d| d.importpath.as_str()).collect();
        assert_eq!(
            paths,
            vec!["github.com/pkg/errors", "golang.org/x/net", "gopkg.in/yaml.v2"]
        );
        assert!(m.has_import_path("golang.org/x/net"));
        assert!(!m.has_import_path("golang.org/x"));
    }

    #[test]
    fn test_remove_dependency() {
        let mut m = Manifest::default();
        m.add_dependency(dep("github.com/pkg/errors")).unwrap();
        let removed = m.remove_dependency("github.com/pkg/errors").unwrap();
        assert_eq!(removed.importpath, "github.com/pkg/errors");
        assert!(matches!(
            m.remove_dependency("github.com/pkg/errors"),
            Err(Error::NotVendored(_))
        ));
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendor").join("manifest");

        let mut m = Manifest::default();
        m.add_dependency(dep("github.com/pkg/errors")).unwrap();
        let mut sub = dep("github.com/golang/protobuf/proto");
        sub.repository = "https://github.com/golang/protobuf".to_string();
        sub.path = "/proto".to_string();
        sub.branch.clear();
        m.add_dependency(sub).unwrap();

        m.save(&path).unwrap();
        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded, m);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\t\"dependencies\""));
        assert!(raw.contains("\"importpath\": \"github.com/pkg/errors\""));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest");
        assert!(matches!(
            Manifest::load(&path),
            Err(Error::ManifestIo { .. })
        ));
        assert_eq!(Manifest::load_or_default(&path).unwrap(), Manifest::default());
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Manifest::load_or_default(&path),
            Err(Error::ManifestFormat { .. })
        ));
    }

    #[test]
    fn test_load_rejects_duplicates_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest");
        let json = r#"{
	"version": 0,
	"dependencies": [
		{ "importpath": "github.com/a/b", "repository": "https://github.com/a/b", "revision": "1" },
		{ "importpath": "github.com/a/b", "repository": "https://github.com/a/b", "revision": "2" }
	]
}"#;
        fs::write(&path, json).unwrap();
        assert!(matches!(
            Manifest::load(&path),
            Err(Error::DuplicateImport(p)) if p == "github.com/a/b"
        ));
    }

    #[test]
    fn test_parse_gb_style_manifest() {
        let json = r#"{
	"version": 0,
	"dependencies": [
		{
			"importpath": "github.com/golang/protobuf/proto",
			"repository": "https://github.com/golang/protobuf",
			"revision": "abc123",
			"branch": "master",
			"path": "/proto"
		}
	]
}"#;
        let m: Manifest = serde_json::from_str(json).unwrap();
        let d = m.get("github.com/golang/protobuf/proto").unwrap();
        assert_eq!(d.path, "/proto");
        assert_eq!(d.branch, "master");
    }
}
