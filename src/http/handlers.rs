use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::health::HealthProbe;

/// `GET /api/health`
pub async fn health(State(probe): State<Arc<HealthProbe>>) -> Response {
    let report = probe.check().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        [(header::CACHE_CONTROL, "no-store")],
        Json(report.body),
    )
        .into_response()
}
