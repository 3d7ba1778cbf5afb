//! boardsync WebSocket relay server
//!
//! Forwards sync envelopes between whiteboard replicas in the same room and
//! keeps a replica of each room so late joiners start from current content.
//!
//! ## Protocol
//!
//! Client frames are JSON text:
//! ```json
//! { "type": "join", "room": "room-id" }
//! { "type": "leave" }
//! { "type": "add", "page": 1, "element": { ... }, "origin": "..." }
//! ```
//! Server frames are `joined`, `peer-joined`, `peer-left`, `error`, or sync
//! envelopes forwarded from other peers.

mod config;
mod rooms;
mod ws;

use axum::{routing::get, Router};
use config::ServerConfig;
use rooms::Rooms;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boardsync_server=info,boardsync_core=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let rooms = Arc::new(Rooms::new(config.channel_capacity));

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(rooms);

    info!("boardsync relay listening on {}", config.addr);
    info!("WebSocket endpoint: ws://{}/ws", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> &'static str {
    "boardsync relay server - connect via WebSocket at /ws"
}

async fn health() -> &'static str {
    "ok"
}
