//! Import path canonicalisation and repository deduction.

use crate::error::{Error, Result};
use crate::repo::{RemoteRepository, RepositoryResolver};
use tracing::debug;
use url::Url;

/// Schemes that carry no transport authentication.
const INSECURE_SCHEMES: &[&str] = &["http", "git"];

/// Removes any scheme component from a URL-like import path.
///
/// `https://example.com/org/repo` becomes `example.com/org/repo`. Query
/// strings, fragments and user info are dropped as well.
pub fn strip_scheme(raw: &str) -> Result<String> {
    let invalid = |reason: &str| Error::InvalidImportPath {
        path: raw.to_string(),
        reason: reason.to_string(),
    };

    if raw.is_empty() {
        return Err(invalid("empty import path"));
    }
    if raw.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(invalid("contains whitespace or control characters"));
    }

    let stripped = if raw.contains("://") {
        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        let mut host = url.host_str().unwrap_or_default().to_string();
        if let Some(port) = url.port() {
            host.push_str(&format!(":{}", port));
        }
        format!("{}{}", host, url.path())
    } else {
        let end = raw.find(['?', '#']).unwrap_or(raw.len());
        let path = &raw[..end];
        let first = path.split('/').next().unwrap_or_default();
        if first.contains(':') {
            return Err(invalid("first path segment cannot contain a colon"));
        }
        path.to_string()
    };

    let canonical = stripped.trim_end_matches('/').to_string();
    if canonical.is_empty() {
        return Err(invalid("no host or path component"));
    }
    Ok(canonical)
}

pub fn is_insecure_url(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, _)) => INSECURE_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Deduces the remote repository and sub-path for `raw`.
///
/// Whatever the resolver returns, a repository reachable only over an
/// unauthenticated transport is refused unless `allow_insecure` is set.
pub fn deduce(
    resolver: &dyn RepositoryResolver,
    raw: &str,
    allow_insecure: bool,
) -> Result<(Box<dyn RemoteRepository>, String)> {
    let (repo, sub_path) = resolver.deduce(raw, allow_insecure)?;
    if !allow_insecure && is_insecure_url(repo.url()) {
        return Err(Error::InsecureProtocol {
            url: repo.url().to_string(),
        });
    }
    debug!(import = raw, repository = repo.url(), sub_path = %sub_path, "deduced repository");
    Ok((repo, sub_path))
}
