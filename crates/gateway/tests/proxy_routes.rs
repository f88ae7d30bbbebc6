//! Integration tests for the gateway routes against a local upstream.

#![allow(clippy::unwrap_used)]

use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        body::Bytes,
        http::{StatusCode, Uri, header::CONTENT_TYPE},
        routing::{get, post},
    },
    serde_json::Value,
    tokio::net::TcpListener,
};

use {
    sluice_gateway::build_app,
    sluice_relay::{DomainGuard, PlatformRules, Relay},
};

async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

async fn start_upstream() -> SocketAddr {
    let app = Router::new()
        .route(
            "/file",
            get(|| async { ([(CONTENT_TYPE, "application/octet-stream")], "hello world") }),
        )
        .route("/query", get(|uri: Uri| async move { uri.query().unwrap_or_default().to_string() }))
        .route("/upload", post(|body: Bytes| async move { body }))
        .route("/gone", get(|| async { (StatusCode::GONE, "gone") }));
    spawn(app).await
}

/// Gateway whose allow-list is the built-in hosts plus the local upstream.
async fn start_gateway(upstream: SocketAddr, size_limit: u64) -> SocketAddr {
    let guard = DomainGuard::with_extra_hosts(&[upstream.to_string()]);
    let relay = Relay::new(PlatformRules::builtin(), guard, size_limit).unwrap();
    spawn(build_app(Arc::new(relay))).await
}

async fn setup() -> (SocketAddr, SocketAddr) {
    let upstream = start_upstream().await;
    let gateway = start_gateway(upstream, 1 << 20).await;
    (gateway, upstream)
}

#[tokio::test]
async fn health_reports_ok() {
    let (gateway, _) = setup().await;
    let body: Value = reqwest::get(format!("http://{gateway}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn root_serves_landing_page() {
    let (gateway, _) = setup().await;
    let resp = reqwest::get(format!("http://{gateway}/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("/api/generate"));
}

#[tokio::test]
async fn forwards_embedded_url() {
    let (gateway, upstream) = setup().await;
    let resp = reqwest::get(format!("http://{gateway}/http://{upstream}/file"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/octet-stream"
    );
    assert_eq!(resp.text().await.unwrap(), "hello world");
}

#[tokio::test]
async fn repairs_collapsed_scheme_separator() {
    let (gateway, upstream) = setup().await;
    let resp = reqwest::get(format!("http://{gateway}/http:/{upstream}/file"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "hello world");
}

#[tokio::test]
async fn query_string_reaches_upstream() {
    let (gateway, upstream) = setup().await;
    let resp = reqwest::get(format!(
        "http://{gateway}/http://{upstream}/query?service=git-upload-pack"
    ))
    .await
    .unwrap();
    assert_eq!(resp.text().await.unwrap(), "service=git-upload-pack");
}

#[tokio::test]
async fn request_body_is_forwarded() {
    let (gateway, upstream) = setup().await;
    let resp = reqwest::Client::new()
        .post(format!("http://{gateway}/http://{upstream}/upload"))
        .body("0032want 0123456789abcdef\n")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "0032want 0123456789abcdef\n");
}

#[tokio::test]
async fn upstream_status_is_relayed() {
    let (gateway, upstream) = setup().await;
    let resp = reqwest::get(format!("http://{gateway}/http://{upstream}/gone"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::GONE);
    assert_eq!(resp.text().await.unwrap(), "gone");
}

#[tokio::test]
async fn disallowed_host_is_forbidden() {
    let (gateway, _) = setup().await;
    let resp = reqwest::get(format!("http://{gateway}/https://example.com/file"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(resp.text().await.unwrap().contains("example.com"));
}

#[tokio::test]
async fn malformed_target_is_bad_request() {
    let (gateway, _) = setup().await;
    let resp = reqwest::get(format!("http://{gateway}/favicon.ico"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_upstream_is_rejected() {
    let upstream = start_upstream().await;
    let gateway = start_gateway(upstream, 4).await;
    let resp = reqwest::get(format!("http://{gateway}/http://{upstream}/file"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(resp.text().await.unwrap().contains("exceeds limit"));
}

#[tokio::test]
async fn generate_links_for_github_blob() {
    let (gateway, _) = setup().await;
    let resp = reqwest::Client::new()
        .post(format!("http://{gateway}/api/generate"))
        .json(&serde_json::json!({
            "original_url": "https://github.com/user/repo/blob/main/file.txt"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(
        body["browser_link"],
        format!("http://{gateway}/https://github.com/user/repo/blob/main/file.txt")
    );
    assert_eq!(
        body["git_command"],
        format!("git clone http://{gateway}/https://github.com/user/repo.git")
    );
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn generate_links_answers_under_prefix() {
    let (gateway, _) = setup().await;
    for path in ["/api/generate/", "/api/generate/v1"] {
        let resp = reqwest::Client::new()
            .post(format!("http://{gateway}{path}"))
            .json(&serde_json::json!({
                "original_url": "https://gitlab.com/group/project/-/raw/main/a.txt"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "{path}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true, "{path}");
    }

    let resp = reqwest::get(format!("http://{gateway}/api/generate/"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn head_request_relays_headers_only() {
    let (gateway, upstream) = setup().await;
    let resp = reqwest::Client::new()
        .head(format!("http://{gateway}/http://{upstream}/file"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/octet-stream"
    );
    assert!(resp.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn generate_links_rejects_unsupported_domain() {
    let (gateway, _) = setup().await;
    let resp = reqwest::Client::new()
        .post(format!("http://{gateway}/api/generate"))
        .json(&serde_json::json!({ "original_url": "https://example.com/a.bin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("example.com"));
}

#[tokio::test]
async fn generate_links_rejects_malformed_json() {
    let (gateway, _) = setup().await;
    let resp = reqwest::Client::new()
        .post(format!("http://{gateway}/api/generate"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn generate_links_only_accepts_post() {
    let (gateway, _) = setup().await;
    let resp = reqwest::get(format!("http://{gateway}/api/generate"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn generate_links_preflight() {
    let (gateway, _) = setup().await;
    let resp = reqwest::Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("http://{gateway}/api/generate"),
        )
        .header("origin", "http://example.org")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
