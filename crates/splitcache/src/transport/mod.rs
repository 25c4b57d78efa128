// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport.

pub mod http;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the axum `Router` with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/api/v1/health", get(http::health))
        // Login
        .route("/", get(http::index))
        .route("/expenses", get(http::callback))
        // Cached data
        .route("/getStoredJson", get(http::stored_json))
        .route("/getStoredJsonFile", get(http::stored_json_file))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
