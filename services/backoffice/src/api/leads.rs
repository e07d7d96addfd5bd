//! Lead pipeline API handlers.
//!
//! # Purpose
//! Back-office lead endpoints. Every handler resolves the caller from the
//! gateway headers and scopes the pipeline call to that broker.
use crate::api::error::{ApiError, api_validation_error};
use crate::api::types::{
    LeadCreateRequest, LeadListResponse, LeadStatusRequest, LeadUpdateRequest,
};
use crate::app::AppState;
use crate::auth::require_caller;
use crate::model::{Lead, LeadSort, LeadStatus};
use crate::pipeline::{FunnelSnapshot, LeadBoard, LeadFilter};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use std::collections::HashMap;
use uuid::Uuid;

fn parse_status(value: &str) -> Result<LeadStatus, ApiError> {
    value
        .parse()
        .map_err(|err: crate::model::UnknownLeadStatus| api_validation_error(&err.to_string()))
}

fn lead_filter(params: &HashMap<String, String>) -> Result<LeadFilter, ApiError> {
    let status = match params.get("status").map(|value| value.trim()) {
        None | Some("") => None,
        Some(value) => Some(parse_status(value)?),
    };
    let sort = match params.get("sort") {
        Some(value) => value
            .parse()
            .map_err(|err: crate::model::UnknownLeadSort| api_validation_error(&err.to_string()))?,
        None => LeadSort::default(),
    };
    Ok(LeadFilter {
        search: params.get("q").cloned(),
        status,
        sort,
    })
}

#[utoipa::path(
    get,
    path = "/v1/leads",
    tag = "leads",
    params(
        ("q" = Option<String>, Query, description = "Substring over name, email, phone, source"),
        ("status" = Option<String>, Query, description = "Exact stage"),
        ("sort" = Option<String>, Query, description = "newest | oldest | name | contacted")
    ),
    responses(
        (status = 200, description = "Caller's leads", body = LeadListResponse),
        (status = 400, description = "Malformed filter", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Missing identity", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_leads(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<LeadListResponse>, ApiError> {
    let caller = require_caller(&headers)?;
    let filter = lead_filter(&params)?;
    let items = state.pipeline.list_leads(&caller.user_id, filter).await?;
    Ok(Json(LeadListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/leads",
    tag = "leads",
    request_body = LeadCreateRequest,
    responses(
        (status = 201, description = "Lead created in stage New", body = Lead),
        (status = 400, description = "Name missing", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_lead(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<LeadCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = require_caller(&headers)?;
    let lead = state
        .pipeline
        .create_lead(&caller.user_id, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

#[utoipa::path(
    get,
    path = "/v1/leads/board",
    tag = "leads",
    params(
        ("q" = Option<String>, Query, description = "Substring filter"),
        ("sort" = Option<String>, Query, description = "Order inside each column")
    ),
    responses(
        (status = 200, description = "Kanban columns in stage order", body = LeadBoard)
    )
)]
pub(crate) async fn lead_board(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<LeadBoard>, ApiError> {
    let caller = require_caller(&headers)?;
    let filter = lead_filter(&params)?;
    Ok(Json(state.pipeline.board(&caller.user_id, filter).await?))
}

#[utoipa::path(
    get,
    path = "/v1/leads/funnel",
    tag = "leads",
    responses(
        (status = 200, description = "Stage counts and conversion", body = FunnelSnapshot)
    )
)]
pub(crate) async fn lead_funnel(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<FunnelSnapshot>, ApiError> {
    let caller = require_caller(&headers)?;
    Ok(Json(state.pipeline.funnel(&caller.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/v1/leads/{lead_id}",
    tag = "leads",
    params(("lead_id" = Uuid, Path, description = "Lead identifier")),
    responses(
        (status = 200, description = "Lead", body = Lead),
        (status = 404, description = "Lead not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_lead(
    Path(lead_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Lead>, ApiError> {
    let caller = require_caller(&headers)?;
    Ok(Json(state.pipeline.get_lead(&caller.user_id, lead_id).await?))
}

#[utoipa::path(
    put,
    path = "/v1/leads/{lead_id}",
    tag = "leads",
    params(("lead_id" = Uuid, Path, description = "Lead identifier")),
    request_body = LeadUpdateRequest,
    responses(
        (status = 200, description = "Lead updated", body = Lead),
        (status = 400, description = "Invalid field", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Lead not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_lead(
    Path(lead_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<LeadUpdateRequest>,
) -> Result<Json<Lead>, ApiError> {
    let caller = require_caller(&headers)?;
    let status = parse_status(&body.status)?;
    let lead = state
        .pipeline
        .update_lead(&caller.user_id, lead_id, body.into_update(status))
        .await?;
    Ok(Json(lead))
}

#[utoipa::path(
    put,
    path = "/v1/leads/{lead_id}/status",
    tag = "leads",
    params(("lead_id" = Uuid, Path, description = "Lead identifier")),
    request_body = LeadStatusRequest,
    responses(
        (status = 200, description = "Stage set", body = Lead),
        (status = 400, description = "Unknown stage", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Lead not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn set_lead_status(
    Path(lead_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<LeadStatusRequest>,
) -> Result<Json<Lead>, ApiError> {
    let caller = require_caller(&headers)?;
    let status = parse_status(&body.status)?;
    let lead = state
        .pipeline
        .set_status(&caller.user_id, lead_id, status)
        .await?;
    Ok(Json(lead))
}

#[utoipa::path(
    delete,
    path = "/v1/leads/{lead_id}",
    tag = "leads",
    params(("lead_id" = Uuid, Path, description = "Lead identifier")),
    responses(
        (status = 204, description = "Lead deleted or already absent")
    )
)]
pub(crate) async fn delete_lead(
    Path(lead_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let caller = require_caller(&headers)?;
    state.pipeline.delete_lead(&caller.user_id, lead_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
