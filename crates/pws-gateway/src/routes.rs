// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Route definitions.

use crate::handlers;
use crate::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

/// API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/info", get(handlers::info))
}

/// Station upload route
pub fn ingest_routes(path: &str) -> Router<Arc<AppState>> {
    Router::new().route(path, get(handlers::ingest))
}
