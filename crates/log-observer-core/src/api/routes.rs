//! API routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, AppState};
use crate::client::{CONFIGURE_PATH, STATUS_PATH};
use crate::viewer::{LOGS, QUERIES};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))

        // Record streams
        .route(LOGS.endpoint, post(handlers::get_logs))
        .route(QUERIES.endpoint, post(handlers::get_queries))

        // Connection management
        .route(STATUS_PATH, get(handlers::connection_status))
        .route(CONFIGURE_PATH, post(handlers::configure_connection))

        .with_state(state)
}
