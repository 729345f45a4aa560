//! Repository deduction for import paths.
//!
//! Well-known hosting sites are mapped directly. Anything else is probed
//! with a `?go-get=1` request and the `go-import` meta tag in the response
//! names the repository root.

use super::{GitRemote, RemoteRepository, RepositoryResolver};
use crate::error::{Error, Result};
use crate::resolve::{is_insecure_url, strip_scheme};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

const PROBE_TIMEOUT_SECS: u64 = 30;

static HOSTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<root>(?:github\.com|bitbucket\.org|gitlab\.com)/[A-Za-z0-9_.\-]+/[A-Za-z0-9_.\-]+)(?P<sub>(?:/[A-Za-z0-9_.\-]+)*)$",
    )
    .expect("valid hosted regex")
});

static GOLANG_X: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^golang\.org/x/(?P<repo>[A-Za-z0-9_.\-]+)(?P<sub>(?:/[A-Za-z0-9_.\-]+)*)$")
        .expect("valid golang.org/x regex")
});

static GOPKG_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<root>gopkg\.in/(?:[A-Za-z0-9_\-]+/)?[A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)*\.v[0-9]+)(?P<sub>(?:/[A-Za-z0-9_.\-]+)*)$",
    )
    .expect("valid gopkg.in regex")
});

static DOT_GIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<root>(?:[^/]+/)*?[^/]+\.git)(?P<sub>/.*)?$").expect("valid .git regex")
});

static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("valid meta regex"));

static META_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(name|content)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid attr regex")
});

/// One `<meta name="go-import" content="prefix vcs repo">` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoImport {
    pub prefix: String,
    pub vcs: String,
    pub repo: String,
}

/// Maps import paths of well-known hosts to their git repository.
///
/// Returns the repository URL and the sub-path (`""` or `/dir/...`).
pub fn known_repository(path: &str, scheme: &str) -> Option<(String, String)> {
    if let Some(caps) = HOSTED.captures(path) {
        return Some((format!("{}://{}", scheme, &caps["root"]), caps["sub"].to_string()));
    }
    if let Some(caps) = GOLANG_X.captures(path) {
        return Some((
            format!("{}://go.googlesource.com/{}", scheme, &caps["repo"]),
            caps["sub"].to_string(),
        ));
    }
    if let Some(caps) = GOPKG_IN.captures(path) {
        return Some((format!("{}://{}", scheme, &caps["root"]), caps["sub"].to_string()));
    }
    if let Some(caps) = DOT_GIT.captures(path) {
        let sub = caps.name("sub").map(|m| m.as_str()).unwrap_or_default();
        return Some((format!("{}://{}", scheme, &caps["root"]), sub.to_string()));
    }
    None
}

/// Extracts the `go-import` entry matching `import_path` from an HTML page.
pub fn parse_go_import(html: &str, import_path: &str) -> Option<GoImport> {
    for tag in META_TAG.find_iter(html) {
        let mut name = None;
        let mut content = None;
        for attr in META_ATTR.captures_iter(tag.as_str()) {
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .map(|m| m.as_str().to_string());
            match attr[1].to_ascii_lowercase().as_str() {
                "name" => name = value,
                "content" => content = value,
                _ => {}
            }
        }

        if name.as_deref() != Some("go-import") {
            continue;
        }
        let Some(content) = content else {
            continue;
        };
        let fields: Vec<&str> = content.split_whitespace().collect();
        let [prefix, vcs, repo] = fields.as_slice() else {
            continue;
        };
        let matches = import_path == *prefix
            || import_path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'));
        if matches {
            return Some(GoImport {
                prefix: prefix.to_string(),
                vcs: vcs.to_string(),
                repo: repo.to_string(),
            });
        }
    }
    None
}

pub struct RemoteResolver {
    agent: ureq::Agent,
}

impl Default for RemoteResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteResolver {
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(PROBE_TIMEOUT_SECS)))
            .build();
        Self {
            agent: config.into(),
        }
    }

    fn probe(&self, path: &str, allow_insecure: bool) -> Result<(String, String)> {
        let schemes: &[&str] = if allow_insecure {
            &["https", "http"]
        } else {
            &["https"]
        };

        let mut last_err = String::from("no go-import meta tag found");
        for scheme in schemes {
            let url = format!("{}://{}?go-get=1", scheme, path);
            debug!(%url, "probing for go-import meta tag");
            let body = match self.agent.get(&url).call() {
                Ok(mut resp) => match resp.body_mut().read_to_string() {
                    Ok(body) => body,
                    Err(e) => {
                        last_err = e.to_string();
                        continue;
                    }
                },
                Err(e) => {
                    last_err = e.to_string();
                    continue;
                }
            };

            let Some(meta) = parse_go_import(&body, path) else {
                continue;
            };
            if meta.vcs != "git" {
                return Err(Error::unresolvable(
                    path,
                    format!("unsupported version control system {:?}", meta.vcs),
                ));
            }
            let sub = path[meta.prefix.len()..].to_string();
            return Ok((meta.repo, sub));
        }
        Err(Error::unresolvable(path, last_err))
    }
}

impl RepositoryResolver for RemoteResolver {
    fn deduce(
        &self,
        import_path: &str,
        allow_insecure: bool,
    ) -> Result<(Box<dyn RemoteRepository>, String)> {
        let scheme = import_path
            .split_once("://")
            .map(|(s, _)| s.to_ascii_lowercase());
        if scheme.is_some() && !allow_insecure && is_insecure_url(import_path) {
            return Err(Error::InsecureProtocol {
                url: import_path.to_string(),
            });
        }
        let path = strip_scheme(import_path)?;

        if let Some((url, sub)) = known_repository(&path, scheme.as_deref().unwrap_or("https")) {
            return Ok((Box::new(GitRemote::new(url)), sub));
        }

        match scheme {
            // An explicit scheme names a repository that may not be probeable.
            Some(scheme) => match self.probe(&path, allow_insecure) {
                Ok((url, sub)) => Ok((Box::new(GitRemote::new(url)), sub)),
                Err(e) => {
                    debug!(error = %e, "probe failed, using the path as repository");
                    Ok((
                        Box::new(GitRemote::new(format!("{}://{}", scheme, path))),
                        String::new(),
                    ))
                }
            },
            None => {
                let (url, sub) = self.probe(&path, allow_insecure)?;
                Ok((Box::new(GitRemote::new(url)), sub))
            }
        }
    }

    fn open(&self, url: &str) -> Result<Box<dyn RemoteRepository>> {
        Ok(Box::new(GitRemote::new(url)))
    }
}
