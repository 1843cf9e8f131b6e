use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::composer::CoachPageRequest;
use super::directory::CoachDirectory;
use super::domain::{CampaignId, Pagination};
use super::export::lead_lists::LeadListRepository;
use super::export::storage::ExportStorage;
use super::export::ExportError;
use super::filters::FacetSelection;
use super::service::{ActionError, CampaignCoachService, ExportRequest};
use super::session::{Session, SessionRegistry};

/// `{success, data?, pagination?, error?}` envelope shared by every campaign action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ActionResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            pagination: None,
            error: None,
        }
    }

    pub fn page(data: T, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(data)
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            pagination: None,
            error: Some(message.into()),
        }
    }
}

pub struct CampaignState<D, L, S> {
    pub service: Arc<CampaignCoachService<D, L, S>>,
    pub sessions: Arc<SessionRegistry>,
}

impl<D, L, S> Clone for CampaignState<D, L, S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

/// HTTP endpoints for the campaign coach table, filter dropdowns, exports and lead lists.
pub fn campaign_router<D, L, S>(
    service: Arc<CampaignCoachService<D, L, S>>,
    sessions: Arc<SessionRegistry>,
) -> Router
where
    D: CoachDirectory + 'static,
    L: LeadListRepository + 'static,
    S: ExportStorage + 'static,
{
    Router::new()
        .route(
            "/api/v1/campaigns/coach-filter-options",
            post(filter_options_handler::<D, L, S>),
        )
        .route(
            "/api/v1/campaigns/:campaign_id/coaches",
            post(coaches_handler::<D, L, S>),
        )
        .route(
            "/api/v1/campaigns/:campaign_id/exports",
            post(export_handler::<D, L, S>),
        )
        .route(
            "/api/v1/campaigns/:campaign_id/lead-lists",
            get(lead_lists_handler::<D, L, S>),
        )
        .with_state(CampaignState { service, sessions })
}

pub(crate) fn action_status(error: &ActionError) -> StatusCode {
    match error {
        ActionError::Unauthenticated => StatusCode::UNAUTHORIZED,
        ActionError::Validation(_) | ActionError::Filter(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ActionError::Export(ExportError::Upload(_) | ExportError::Sign(_)) => {
            StatusCode::BAD_GATEWAY
        }
        ActionError::Directory(_) | ActionError::Export(_) | ActionError::LeadList(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn failure_response(error: ActionError) -> Response {
    let status = action_status(&error);
    let payload = ActionResponse::<()>::failure(error.to_string());
    (status, Json(payload)).into_response()
}

// Checked before the body: anonymous callers get 401 whatever they send.
fn authorized(sessions: &SessionRegistry, headers: &HeaderMap) -> Result<Session, Response> {
    sessions
        .authenticate(headers)
        .ok_or_else(|| failure_response(ActionError::Unauthenticated))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|Json(value)| value)
        .map_err(|rejection| failure_response(ActionError::Validation(rejection.body_text())))
}

/// An empty body is an export with no filters and no coach allow-list.
fn export_body(body: &Bytes) -> Result<ExportRequest, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExportRequest::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        failure_response(ActionError::Validation(format!(
            "Failed to parse the request body: {err}"
        )))
    })
}

pub(crate) async fn coaches_handler<D, L, S>(
    State(state): State<CampaignState<D, L, S>>,
    Path(campaign_id): Path<CampaignId>,
    headers: HeaderMap,
    body: Result<Json<CoachPageRequest>, JsonRejection>,
) -> Response
where
    D: CoachDirectory + 'static,
    L: LeadListRepository + 'static,
    S: ExportStorage + 'static,
{
    let session = match authorized(&state.sessions, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let request = match json_body(body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match state
        .service
        .campaign_coaches(Some(&session), campaign_id, &request)
        .await
    {
        Ok(page) => {
            let payload = ActionResponse::page(page.data, page.pagination);
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => failure_response(error),
    }
}

pub(crate) async fn filter_options_handler<D, L, S>(
    State(state): State<CampaignState<D, L, S>>,
    headers: HeaderMap,
    body: Result<Json<FacetSelection>, JsonRejection>,
) -> Response
where
    D: CoachDirectory + 'static,
    L: LeadListRepository + 'static,
    S: ExportStorage + 'static,
{
    let session = match authorized(&state.sessions, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let selection = match json_body(body) {
        Ok(selection) => selection,
        Err(response) => return response,
    };
    match state
        .service
        .filter_options(Some(&session), &selection)
        .await
    {
        Ok(options) => (StatusCode::OK, Json(ActionResponse::ok(options))).into_response(),
        Err(error) => failure_response(error),
    }
}

pub(crate) async fn export_handler<D, L, S>(
    State(state): State<CampaignState<D, L, S>>,
    Path(campaign_id): Path<CampaignId>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    D: CoachDirectory + 'static,
    L: LeadListRepository + 'static,
    S: ExportStorage + 'static,
{
    let session = match authorized(&state.sessions, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let request = match export_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match state
        .service
        .export_coach_list(Some(&session), campaign_id, &request)
        .await
    {
        Ok(export) => (StatusCode::CREATED, Json(ActionResponse::ok(export))).into_response(),
        Err(error) => failure_response(error),
    }
}

pub(crate) async fn lead_lists_handler<D, L, S>(
    State(state): State<CampaignState<D, L, S>>,
    Path(campaign_id): Path<CampaignId>,
    headers: HeaderMap,
) -> Response
where
    D: CoachDirectory + 'static,
    L: LeadListRepository + 'static,
    S: ExportStorage + 'static,
{
    let session = state.sessions.authenticate(&headers);
    match state
        .service
        .lead_lists(session.as_ref(), campaign_id)
        .await
    {
        Ok(records) => (StatusCode::OK, Json(ActionResponse::ok(records))).into_response(),
        Err(error) => failure_response(error),
    }
}
