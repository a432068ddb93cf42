//! HTTP API gateway for nearbot.
//!
//! Exposes the chat endpoint and a health check:
//!
//! - `POST /api/chat` — chat-completion request with optional context flags
//! - `GET  /health`   — liveness probe
//!
//! Built on Axum. The chat endpoint always answers 200 with a well-formed
//! completion body: internal failures set the body's `error` field and a
//! degraded choice instead of an HTTP 5xx, so callers key off `error`, not
//! the status code.

use axum::extract::connect_info::ConnectInfo;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::HeaderMap;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use nearbot_config::AppConfig;
use nearbot_context::{BraveSearch, FavoritesStore, IpLocator, MemoryStore};
use nearbot_core::chat::{ChatMessage, ChatResponse};
use nearbot_orchestrator::{AskRequest, Orchestrator};
use nearbot_provider::OllamaClient;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Orchestrator,
}

pub type SharedState = Arc<GatewayState>;

/// Wire up the full component stack from configuration.
pub fn build_state(config: &AppConfig) -> SharedState {
    let orchestrator = Orchestrator::new(
        config,
        Arc::new(IpLocator::new(&config.location)),
        Arc::new(BraveSearch::new(&config.search)),
        Arc::new(OllamaClient::new(&config.model)),
        Arc::new(FavoritesStore::new(&config.storage.favorites_path)),
        Arc::new(MemoryStore::new(
            &config.storage.memory_path,
            config.storage.memory_retention,
        )),
    );
    Arc::new(GatewayState { orchestrator })
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(CorsLayer::permissive()) // no auth on this service; see non-goals
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = build_state(&config);
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Vec<ChatMessage>,

    #[serde(default)]
    mcp: Option<McpOptions>,
}

/// Context-source flags carried alongside the message list.
#[derive(Debug, Default, Deserialize)]
struct McpOptions {
    #[serde(default)]
    include_sources: bool,

    #[serde(default)]
    max_sources: Option<usize>,
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn chat_handler(
    State(state): State<SharedState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let mcp = payload.mcp.unwrap_or_default();
    let request = AskRequest {
        messages: payload.messages,
        include_sources: mcp.include_sources,
        max_sources: mcp.max_sources,
        client_addr: client_addr(&headers, peer),
    };

    info!(
        messages = request.messages.len(),
        include_sources = request.include_sources,
        client = %request.client_addr,
        "Chat request received"
    );

    Json(state.orchestrator.handle(request).await)
}

/// The client address to geolocate: the first `X-Forwarded-For` hop when a
/// proxy added one, otherwise the socket peer.
fn client_addr(headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_else(|| peer.ip())
}
