//! Header policy for both legs of a forward.

use http::{
    HeaderMap, HeaderName, HeaderValue,
    header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING},
};

/// Desktop browser identity sent upstream. Several platforms serve degraded
/// responses to clients that do not look like a browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Always set on the upstream request, replacing any inbound value.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("user-agent", BROWSER_USER_AGENT),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.5"),
    ("accept-encoding", "gzip, deflate, br"),
    ("dnt", "1"),
    ("connection", "keep-alive"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
];

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");

/// Client headers that are never passed upstream: host identity and
/// proxy-chain headers, plus body framing which the client connection
/// re-derives.
fn is_dropped_inbound(name: &HeaderName) -> bool {
    *name == HOST || *name == X_FORWARDED_FOR || *name == X_REAL_IP || *name == TRANSFER_ENCODING
}

/// Upstream headers scoped to the upstream connection rather than the
/// message; the server writing the downstream response sets its own.
fn is_connection_scoped(name: &HeaderName) -> bool {
    *name == CONNECTION || *name == KEEP_ALIVE || *name == TRANSFER_ENCODING
}

/// Build the upstream request headers from the inbound ones.
#[must_use]
pub fn upstream_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len() + BROWSER_HEADERS.len());
    for (name, value) in inbound {
        if !is_dropped_inbound(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    for &(name, value) in BROWSER_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}

/// Copy upstream response headers for the downstream response.
#[must_use]
pub fn downstream_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if !is_connection_scoped(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

/// The declared `Content-Length`, if present and numeric.
#[must_use]
pub fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
