use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json};
use campaign_desk::workflows::campaigns::{
    campaign_router, CampaignCoachService, CoachDirectory, ExportStorage, LeadListRepository,
    SessionRegistry,
};
use serde_json::json;
use std::sync::Arc;

/// Campaign actions plus the operational endpoints. Expects an `Extension<AppState>` layer.
pub(crate) fn with_campaign_routes<D, L, S>(
    service: Arc<CampaignCoachService<D, L, S>>,
    sessions: Arc<SessionRegistry>,
) -> axum::Router
where
    D: CoachDirectory + 'static,
    L: LeadListRepository + 'static,
    S: ExportStorage + 'static,
{
    campaign_router(service, sessions)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if state.readiness.load(std::sync::atomic::Ordering::Relaxed) {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        )
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
