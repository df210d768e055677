//! IoT Monitor Ingest Server
//!
//! Receives sensor readings posted by nodes, validates them and keeps them
//! in memory. Exposes:
//! - `POST /data` for readings
//! - `GET /sensors` for newest-first queries
//! - `GET /health` for node discovery probes

pub mod handlers;
pub mod store;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

pub use store::{ReadingStore, StoredReading};

/// Shared state handed to every handler
#[derive(Clone, Default)]
pub struct AppState {
    pub store: ReadingStore,
}

/// Build the ingest router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/data", post(handlers::receive_data))
        .route("/sensors", get(handlers::list_sensors))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Serve the ingest API on an already bound listener
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}
