// Module: http
// HTTP/JSON surface: room reservation and lookup, health probe, and the
// WebSocket signaling upgrade

pub mod error;
pub mod health;
pub mod room;
pub mod websocket;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tandem_core::SessionService;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SessionService>,
}

/// Create the HTTP router with all routes
pub fn create_router(service: Arc<SessionService>) -> Router {
    let state = AppState { service };

    // Browser clients connect from arbitrary origins; signaling carries no
    // cookies, so a permissive CORS policy is fine here.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/rooms", post(room::create_room))
        .route("/api/rooms/{code}", get(room::get_room))
        .route("/ws", get(websocket::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
