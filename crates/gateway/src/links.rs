//! `/api/generate`: accelerated links for the landing page form.

use {
    axum::{
        extract::{State, rejection::JsonRejection},
        http::{HeaderMap, StatusCode, header::HOST},
        response::Json,
    },
    tracing::{debug, warn},
};

use sluice_relay::{GenerateLinksRequest, GenerateLinksResponse};

use crate::server::AppState;

type LinksReply = (StatusCode, Json<GenerateLinksResponse>);

pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GenerateLinksRequest>, JsonRejection>,
) -> LinksReply {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection, "malformed link request");
            return failure(StatusCode::BAD_REQUEST, "malformed request body");
        },
    };

    let base_url = format!("http://{}", request_host(&headers));
    match state.relay.generate_links(&base_url, &request.original_url) {
        Ok(links) => {
            debug!(original = %request.original_url, browser_link = %links.browser_link, "generated links");
            (StatusCode::OK, Json(links.into()))
        },
        Err(e) => {
            warn!(original = %request.original_url, error = %e, "link generation rejected");
            failure(e.status(), e.to_string())
        },
    }
}

pub(crate) async fn method_not_allowed() -> LinksReply {
    failure(StatusCode::METHOD_NOT_ALLOWED, "only POST is supported")
}

fn failure(status: StatusCode, error: impl Into<String>) -> LinksReply {
    (status, Json(GenerateLinksResponse::failure(error)))
}

fn request_host(headers: &HeaderMap) -> &str {
    headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
}
