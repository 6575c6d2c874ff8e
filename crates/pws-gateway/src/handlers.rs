// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HTTP request handlers.

use crate::AppState;
use axum::{
    extract::{OriginalUri, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use pws_core::HttpContext;
use std::sync::Arc;

/// GET {ingest_path} - station upload
///
/// Sink failures are logged by the pipeline; the station always gets the
/// plain acknowledgment.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);
    let request_uri = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let ctx = HttpContext::new(host, request_uri);
    let report = state.pipeline.ingest(params, &ctx).await;

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        report.acknowledgment(),
    )
        .into_response()
}

/// GET /api/v1/health
pub async fn health() -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response()
}

/// GET /api/v1/info - Gateway info
pub async fn info(State(state): State<Arc<AppState>>) -> Response {
    let settings = state.pipeline.settings();
    let info = serde_json::json!({
        "name": "pws-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "ingest_path": state.ingest_path,
        "device": settings.device,
        "stages": settings.enabled_stages(),
        "endpoints": [
            state.ingest_path,
            "/api/v1/health",
            "/api/v1/info"
        ]
    });

    (StatusCode::OK, Json(info)).into_response()
}
