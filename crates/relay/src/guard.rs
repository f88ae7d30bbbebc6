//! Destination allow-list.
//!
//! Membership is exact: no wildcard, suffix or parent-domain matching. A CDN
//! or raw-content host is contactable only because it is listed itself.

use std::collections::BTreeSet;

use {tracing::warn, url::Url};

use crate::{Error, Result};

/// Hosts contactable out of the box: each platform's browse host, its
/// raw-content host, API/CDN hosts and its Pages host.
pub const BUILTIN_ALLOWED_HOSTS: &[&str] = &[
    // GitHub
    "github.com",
    "raw.githubusercontent.com",
    "gist.githubusercontent.com",
    "codeload.github.com",
    "api.github.com",
    // GitLab
    "gitlab.com",
    "gitlab.io",
    // Hugging Face
    "huggingface.co",
    "hf.co",
    "cdn-lfs.huggingface.co",
    "cas-bridge.xethub.hf.co",
    "cdn-lfs.hf.co",
];

/// Immutable set of hosts the forwarder may contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainGuard {
    hosts: BTreeSet<String>,
}

impl DomainGuard {
    /// A guard allowing exactly `hosts`.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }

    /// The built-in platform hosts.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(BUILTIN_ALLOWED_HOSTS.iter().copied())
    }

    /// The built-in hosts plus `extra`, each an exact entry.
    #[must_use]
    pub fn with_extra_hosts(extra: &[String]) -> Self {
        let mut guard = Self::builtin();
        guard.hosts.extend(extra.iter().cloned());
        guard
    }

    /// Exact, byte-for-byte membership test.
    #[must_use]
    pub fn allows(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }

    /// Check the authority of `url` (host, plus `:port` when the URL names a
    /// non-default port).
    pub fn check_url(&self, url: &Url) -> Result<()> {
        let Some(authority) = authority(url) else {
            return Err(Error::DisallowedHost(url.to_string()));
        };
        if self.allows(&authority) {
            Ok(())
        } else {
            warn!(host = %authority, "destination host not in allow-list");
            Err(Error::DisallowedHost(authority))
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl Default for DomainGuard {
    fn default() -> Self {
        Self::builtin()
    }
}

/// `host` or `host:port`; the port only appears when it is not the scheme's
/// default, matching what a client would put in a `Host` header.
#[must_use]
pub fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
