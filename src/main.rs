use axum::{extract::State, routing::get, Json, Router};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sketchlink_rs::{websocket, AppState};

const DEFAULT_PORT: u16 = 3001;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchlink=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::new();

    let app = Router::new()
        // WebSocket endpoint
        .route("/ws", get(websocket::handler::ws_handler))
        // Operator surface
        .route("/", get(banner))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("🎨 SketchLink server running on http://localhost:{port}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn banner() -> &'static str {
    "SketchLink server is running! 🎨"
}

/// Liveness probe with the live room count.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let rooms = state.registry.room_count().await;
    Json(serde_json::json!({ "status": "ok", "rooms": rooms }))
}
