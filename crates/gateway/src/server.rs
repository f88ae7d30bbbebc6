use std::{net::SocketAddr, sync::Arc};

use {
    anyhow::Context,
    axum::{
        Router,
        http::{Method, header::CONTENT_TYPE},
        response::{Html, IntoResponse, Json},
        routing::{MethodRouter, get, post},
    },
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::info,
};

use {sluice_config::SluiceConfig, sluice_relay::Relay};

use crate::{
    forward::forward_handler,
    links::{generate_handler, method_not_allowed},
};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the router (shared between production startup and tests).
pub fn build_app(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        // Everything under the prefix is the link generator, never a target.
        .route("/api/generate", generate_route())
        .route("/api/generate/", generate_route())
        .route("/api/generate/{*rest}", generate_route())
        .fallback(forward_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { relay })
}

fn generate_route() -> MethodRouter<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    post(generate_handler)
        .fallback(method_not_allowed)
        .layer(cors)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: &SluiceConfig) -> anyhow::Result<()> {
    let relay = Arc::new(Relay::from_config(config).context("failed to build relay")?);
    let app = build_app(Arc::clone(&relay));

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr.as_str())
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let lines = [
        format!("sluice v{}", env!("CARGO_PKG_VERSION")),
        format!("listening on {}", listener.local_addr()?),
        format!("size limit: {} MB", config.server.size_limit_mb),
        format!("allowed hosts: {}", relay.guard().len()),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    // ConnectInfo carries the peer address into the forwarding log line.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install Ctrl-C handler: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, draining connections");
}

// ── Handlers ─────────────────────────────────────────────────────────────────

pub(crate) async fn index_handler() -> Html<&'static str> {
    Html(include_str!("assets/index.html"))
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
