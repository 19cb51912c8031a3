//! HTTP dashboard and JSON API

pub mod charts;
pub mod render;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::{AppState, SharedState};

/// Build the application router with its middleware
pub fn app(state: SharedState, max_upload_bytes: Option<usize>) -> Router {
    let body_limit = match max_upload_bytes {
        Some(bytes) => DefaultBodyLimit::max(bytes),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .merge(routes::router())
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
