//! Forwarding engine: one upstream fetch per inbound request.
//!
//! Redirects are followed by the HTTP client, but every hop is put through
//! the [`DomainGuard`] first; one disallowed hop aborts the whole request.
//! Bodies are streamed in both directions and never buffered.

use std::{
    error::Error as StdError,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use {
    bytes::Bytes,
    futures::{Stream, StreamExt, TryStream, stream::BoxStream},
    http::{HeaderMap, Method, StatusCode},
    reqwest::redirect::{Action, Attempt, Policy},
    tracing::{debug, instrument, warn},
    url::Url,
};

#[cfg(feature = "metrics")]
use metrics::counter;

use crate::{
    Error, Result,
    guard::{DomainGuard, authority},
    headers::{declared_length, upstream_request_headers},
};

/// Redirect hops followed before a request is abandoned.
pub const MAX_REDIRECTS: usize = 10;

/// Everything the engine needs from the inbound request.
pub struct ForwardRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<reqwest::Body>,
}

impl ForwardRequest {
    pub fn new(method: Method, url: Url, headers: HeaderMap) -> Self {
        Self {
            method,
            url,
            headers,
            body: None,
        }
    }

    /// Stream `body` to the upstream as it arrives.
    #[must_use]
    pub fn with_body_stream<S>(mut self, body: S) -> Self
    where
        S: TryStream + Send + 'static,
        S::Error: Into<Box<dyn StdError + Send + Sync>>,
        Bytes: From<S::Ok>,
    {
        self.body = Some(reqwest::Body::wrap_stream(body));
        self
    }
}

/// Upstream response whose headers passed the size check.
#[derive(Debug)]
pub struct UpstreamResponse {
    response: reqwest::Response,
}

impl UpstreamResponse {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// URL of the last hop, after redirects.
    #[must_use]
    pub fn final_url(&self) -> &Url {
        self.response.url()
    }

    /// The body as a byte stream, to be handed to the downstream connection.
    pub fn into_body_stream(self) -> BodyStream {
        let upstream = self.response.url().to_string();
        let declared = declared_length(self.response.headers());
        BodyStream::new(self.response.bytes_stream(), upstream, declared)
    }
}

/// Upstream body on its way downstream.
///
/// The status line has already gone out by the time any of these failures can
/// happen, so they are only logged: an upstream read error when it surfaces,
/// and a downstream disconnect when the stream is dropped before the upstream
/// signalled end-of-body.
pub struct BodyStream {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
    upstream: String,
    bytes_sent: u64,
    finished: bool,
}

impl BodyStream {
    fn new<S>(inner: S, upstream: String, declared: Option<u64>) -> Self
    where
        S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: inner.boxed(),
            upstream,
            bytes_sent: 0,
            // Nothing to relay, so an unpolled drop is not a disconnect.
            finished: declared == Some(0),
        }
    }

    #[must_use]
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }
}

impl Stream for BodyStream {
    type Item = reqwest::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = this.inner.poll_next_unpin(cx);
        match &polled {
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes_sent += chunk.len() as u64;
                #[cfg(feature = "metrics")]
                counter!("relay_bytes_streamed_total").increment(chunk.len() as u64);
            },
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                warn!(
                    upstream = %this.upstream,
                    bytes_sent = this.bytes_sent,
                    error = %e,
                    "upstream body stream failed"
                );
            },
            Poll::Ready(None) => this.finished = true,
            Poll::Pending => {},
        }
        polled
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl Drop for BodyStream {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                upstream = %self.upstream,
                bytes_sent = self.bytes_sent,
                "downstream closed before body completed"
            );
        }
    }
}

/// Executes upstream fetches under the redirect and size policies.
pub struct Forwarder {
    client: reqwest::Client,
    guard: Arc<DomainGuard>,
    size_limit: u64,
}

impl Forwarder {
    /// `size_limit` is the largest declared `Content-Length`, in bytes, that
    /// will be relayed.
    pub fn new(guard: Arc<DomainGuard>, size_limit: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(redirect_policy(Arc::clone(&guard), MAX_REDIRECTS))
            .build()?;
        Ok(Self {
            client,
            guard,
            size_limit,
        })
    }

    #[must_use]
    pub fn size_limit(&self) -> u64 {
        self.size_limit
    }

    /// Send the request upstream and return the response once its headers
    /// have cleared the size check.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn forward(&self, request: ForwardRequest) -> Result<UpstreamResponse> {
        self.guard.check_url(&request.url)?;

        let headers = upstream_request_headers(&request.headers);
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify_send_error)?;

        if let Some(size) = declared_length(response.headers())
            && size > self.size_limit
        {
            warn!(size, limit = self.size_limit, "upstream body exceeds size limit");
            return Err(Error::TooLarge {
                size,
                limit: self.size_limit,
            });
        }

        debug!(
            status = %response.status(),
            final_url = %response.url(),
            "upstream responded"
        );
        Ok(UpstreamResponse { response })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("redirect to unsupported domain: {0}")]
struct RedirectDenied(String);

#[derive(Debug, thiserror::Error)]
#[error("too many redirects (max {0})")]
struct RedirectLimit(usize);

fn redirect_policy(guard: Arc<DomainGuard>, max: usize) -> Policy {
    Policy::custom(move |attempt| check_redirect(&guard, max, attempt))
}

fn check_redirect(guard: &DomainGuard, max: usize, attempt: Attempt<'_>) -> Action {
    // `previous` holds every URL already requested, the original included.
    if attempt.previous().len() > max {
        return attempt.error(RedirectLimit(max));
    }

    let next = authority(attempt.url()).unwrap_or_default();
    if !guard.allows(&next) {
        warn!(host = %next, to = %attempt.url(), "redirect to host outside allow-list");
        return attempt.error(RedirectDenied(next));
    }

    debug!(
        from = attempt.previous().last().map(Url::as_str).unwrap_or_default(),
        to = %attempt.url(),
        "following redirect"
    );
    #[cfg(feature = "metrics")]
    counter!("relay_redirects_total").increment(1);
    attempt.follow()
}

/// Recover the redirect-policy verdict from a client error, if there is one.
fn classify_send_error(err: reqwest::Error) -> Error {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(denied) = cause.downcast_ref::<RedirectDenied>() {
            return Error::RedirectBlocked(denied.0.clone());
        }
        if let Some(limit) = cause.downcast_ref::<RedirectLimit>() {
            return Error::TooManyRedirects(limit.0);
        }
        source = cause.source();
    }
    Error::Upstream(err)
}
