//! Platform rewriting: browse URLs to direct-content URLs.
//!
//! Forges render files inside an HTML page at their "blob" URLs; only the
//! raw/resolve shape returns the file bytes. Rules are keyed by exact host
//! and are idempotent: a URL that is already in direct-content form, or that
//! names a repository root for `git clone`, passes through unchanged.

use std::collections::HashMap;

use {
    tracing::{debug, warn},
    url::Url,
};

pub const GITHUB_HOST: &str = "github.com";
pub const GITHUB_RAW_HOST: &str = "raw.githubusercontent.com";
pub const GITLAB_HOST: &str = "gitlab.com";
pub const HUGGINGFACE_HOST: &str = "huggingface.co";

/// How one platform maps its browse URLs to direct-content URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformRule {
    /// `/owner/repo/blob/ref/path` on the main host becomes
    /// `/owner/repo/ref/path` on a separate raw-content host.
    BlobToRawHost { raw_host: String },
    /// `/group/project/-/blob/ref/path` becomes `/group/project/-/raw/ref/path`.
    DashBlobToRaw,
    /// Model hub: `/blob/` becomes `/resolve/`, and bare file paths get a
    /// `resolve` segment inserted after the namespace.
    HubResolve,
}

impl PlatformRule {
    /// Rewrite `url` in place. Returns `true` if anything changed.
    pub fn apply(&self, url: &mut Url) -> bool {
        match self {
            Self::BlobToRawHost { raw_host } => {
                let Some(path) = replace_once(url.path(), "/blob/", "/") else {
                    return false;
                };
                if let Err(e) = url.set_host(Some(raw_host)) {
                    warn!(raw_host = %raw_host, error = %e, "invalid raw-content host");
                    return false;
                }
                url.set_path(&path);
                true
            },
            Self::DashBlobToRaw => match replace_once(url.path(), "/-/blob/", "/-/raw/") {
                Some(path) => {
                    url.set_path(&path);
                    true
                },
                None => false,
            },
            Self::HubResolve => match hub_resolve_path(url.path()) {
                Some(path) => {
                    url.set_path(&path);
                    true
                },
                None => false,
            },
        }
    }
}

fn replace_once(path: &str, from: &str, to: &str) -> Option<String> {
    path.contains(from).then(|| path.replacen(from, to, 1))
}

/// New path for a model-hub URL, or `None` when it is already direct-content
/// or too short to be a file path.
///
/// The namespace width is a heuristic: two segments for `datasets/<name>`
/// paths with at least four segments, one segment otherwise.
fn hub_resolve_path(path: &str) -> Option<String> {
    let replaced = replace_once(path, "/blob/", "/resolve/");
    let current = replaced.as_deref().unwrap_or(path);
    if current.contains("/resolve/") || current.contains("/raw/") {
        return replaced;
    }

    let parts: Vec<&str> = current.trim_matches('/').split('/').collect();
    if parts.len() < 3 {
        return None;
    }
    let namespace = if parts[0] == "datasets" && parts.len() >= 4 {
        2
    } else {
        1
    };
    let mut rebuilt = Vec::with_capacity(parts.len() + 1);
    rebuilt.extend_from_slice(&parts[..namespace]);
    rebuilt.push("resolve");
    rebuilt.extend_from_slice(&parts[namespace..]);
    Some(format!("/{}", rebuilt.join("/")))
}

/// Host-keyed strategy map of [`PlatformRule`]s.
#[derive(Debug, Clone, Default)]
pub struct PlatformRules {
    rules: HashMap<String, PlatformRule>,
}

impl PlatformRules {
    /// No rules: every URL passes through unchanged.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// GitHub, GitLab and Hugging Face.
    #[must_use]
    pub fn builtin() -> Self {
        Self::empty()
            .with_rule(GITHUB_HOST, PlatformRule::BlobToRawHost {
                raw_host: GITHUB_RAW_HOST.into(),
            })
            .with_rule(GITLAB_HOST, PlatformRule::DashBlobToRaw)
            .with_rule(HUGGINGFACE_HOST, PlatformRule::HubResolve)
    }

    #[must_use]
    pub fn with_rule(mut self, host: impl Into<String>, rule: PlatformRule) -> Self {
        self.rules.insert(host.into(), rule);
        self
    }

    #[must_use]
    pub fn rule_for(&self, host: &str) -> Option<&PlatformRule> {
        self.rules.get(host)
    }

    /// Apply the rule registered for the URL's host, if any.
    #[must_use]
    pub fn rewrite(&self, mut url: Url) -> Url {
        let Some(rule) = url.host_str().and_then(|host| self.rules.get(host)) else {
            return url;
        };
        let before = url.to_string();
        if rule.apply(&mut url) && url.as_str() != before {
            debug!(from = %before, to = %url, "rewrote browse URL");
        }
        url
    }
}
