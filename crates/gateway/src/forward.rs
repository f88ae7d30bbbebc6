//! Fallback handler: every path not claimed by another route is a target.

use std::net::SocketAddr;

use {
    axum::{
        body::Body,
        extract::{ConnectInfo, OriginalUri, State},
        http::{
            HeaderMap, Method, StatusCode,
            header::{CONTENT_LENGTH, TRANSFER_ENCODING},
        },
        response::{IntoResponse, Response},
    },
    tracing::{info, warn},
};

use sluice_relay::{Error, ForwardRequest, downstream_response_headers};

use crate::{error::ApiError, server::AppState};

pub(crate) async fn forward_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    OriginalUri(uri): OriginalUri,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    // The untouched request target; a normalised path would have lost the
    // second slash of an embedded `https://`.
    let raw = uri.path_and_query().map_or("/", |pq| pq.as_str());

    let url = match state.relay.resolve(raw) {
        Ok(url) => url,
        Err(Error::NoTarget) => return crate::server::index_handler().await.into_response(),
        Err(e) => return reject(peer, raw, e),
    };

    let is_head = method == Method::HEAD;
    let mut request = ForwardRequest::new(method, url, headers);
    if declares_body(&request.headers) {
        request = request.with_body_stream(body.into_data_stream());
    }

    let upstream = match state.relay.forward(request).await {
        Ok(upstream) => upstream,
        Err(e) => return reject(peer, raw, e),
    };

    let status = upstream.status();
    let headers = downstream_response_headers(upstream.headers());
    info!(
        peer = %peer,
        path = %raw,
        upstream = %upstream.final_url(),
        status = status.as_u16(),
        "forwarded"
    );

    // hyper never polls a body for these, so streaming one would read as a
    // downstream disconnect.
    let body = if is_head || !carries_body(status) {
        Body::empty()
    } else {
        Body::from_stream(upstream.into_body_stream())
    };
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn reject(peer: SocketAddr, raw: &str, err: Error) -> Response {
    warn!(
        peer = %peer,
        path = %raw,
        status = err.status().as_u16(),
        kind = err.kind(),
        error = %err,
        "rejected"
    );
    ApiError(err).into_response()
}

/// Whether the inbound request carries a body worth streaming upstream.
fn declares_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

fn carries_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}
