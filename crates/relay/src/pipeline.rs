//! The full request pipeline: extract, rewrite, guard, forward.

use std::sync::Arc;

use {
    sluice_config::SluiceConfig,
    tracing::debug,
    url::Url,
};

#[cfg(feature = "metrics")]
use metrics::counter;

use crate::{
    Result,
    extract::{extract_target, parse_target},
    forward::{ForwardRequest, Forwarder, UpstreamResponse},
    guard::DomainGuard,
    links::{GeneratedLinks, generate_links},
    rewrite::PlatformRules,
};

/// Shared, immutable relay state. One per server; clone the `Arc` around it.
pub struct Relay {
    rules: PlatformRules,
    guard: Arc<DomainGuard>,
    forwarder: Forwarder,
}

impl Relay {
    pub fn new(rules: PlatformRules, guard: DomainGuard, size_limit: u64) -> Result<Self> {
        let guard = Arc::new(guard);
        let forwarder = Forwarder::new(Arc::clone(&guard), size_limit)?;
        Ok(Self {
            rules,
            guard,
            forwarder,
        })
    }

    /// Built-in platform rules, the built-in allow-list plus configured extra
    /// hosts, and the configured size ceiling.
    pub fn from_config(config: &SluiceConfig) -> Result<Self> {
        Self::new(
            PlatformRules::builtin(),
            DomainGuard::with_extra_hosts(&config.guard.extra_hosts),
            config.server.size_limit_bytes(),
        )
    }

    /// Resolve a raw request target to the upstream URL that would be
    /// fetched. Offline: no network access.
    pub fn resolve(&self, raw_target: &str) -> Result<Url> {
        let target = extract_target(raw_target)?;
        let url = self.rules.rewrite(parse_target(&target)?);
        self.guard.check_url(&url)?;
        debug!(target = %target, upstream = %url, "resolved upstream URL");
        Ok(url)
    }

    /// Forward an already-resolved request.
    pub async fn forward(&self, request: ForwardRequest) -> Result<UpstreamResponse> {
        let result = self.forwarder.forward(request).await;
        match &result {
            Ok(_) => record("ok"),
            Err(e) => {
                debug!(kind = e.kind(), error = %e, "forward failed");
                record(e.kind());
            },
        }
        result
    }

    pub fn generate_links(&self, base_url: &str, original_url: &str) -> Result<GeneratedLinks> {
        generate_links(base_url, original_url, &self.rules, &self.guard)
    }

    #[must_use]
    pub fn rules(&self) -> &PlatformRules {
        &self.rules
    }

    #[must_use]
    pub fn guard(&self) -> &DomainGuard {
        &self.guard
    }

    #[must_use]
    pub fn size_limit(&self) -> u64 {
        self.forwarder.size_limit()
    }
}

#[cfg(feature = "metrics")]
fn record(result: &'static str) {
    counter!("relay_requests_total", "result" => result).increment(1);
}

#[cfg(not(feature = "metrics"))]
fn record(_result: &'static str) {}
