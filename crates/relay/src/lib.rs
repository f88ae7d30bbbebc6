//! Relay core for sluice: turns a request path carrying an embedded platform
//! URL into a guarded, streamed upstream fetch.
//!
//! Feature flags:
//! - `metrics`: request, redirect and byte counters via the `metrics` facade

pub mod error;
pub mod extract;
pub mod forward;
pub mod guard;
pub mod headers;
pub mod links;
pub mod pipeline;
pub mod rewrite;

pub use {
    error::{Error, Result},
    extract::{extract_target, parse_target},
    forward::{BodyStream, ForwardRequest, Forwarder, MAX_REDIRECTS, UpstreamResponse},
    guard::{BUILTIN_ALLOWED_HOSTS, DomainGuard},
    headers::{downstream_response_headers, upstream_request_headers},
    links::{GenerateLinksRequest, GenerateLinksResponse, GeneratedLinks, generate_links},
    pipeline::Relay,
    rewrite::{PlatformRule, PlatformRules},
};
