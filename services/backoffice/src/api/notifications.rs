//! Notification center API handlers.
//!
//! # Purpose
//! Inbox and dropdown reads, read/delete operations, and the per-broker
//! server-sent event stream that tells every open consumer to re-fetch.
use crate::api::error::{ApiError, api_validation_error};
use crate::api::types::{
    AffectedResponse, NotificationListResponse, NotificationOpenResponse, NotificationView,
};
use crate::app::AppState;
use crate::auth::require_caller;
use crate::model::{NotificationCounts, ReadFilter, UnknownReadFilter};
use crate::notify::ListOptions;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use std::collections::HashMap;
use std::convert::Infallible;
use uuid::Uuid;

pub const SSE_EVENT_NAME: &str = "notifications";

fn list_options(
    params: &HashMap<String, String>,
    dropdown_limit: usize,
) -> Result<ListOptions, ApiError> {
    let filter: ReadFilter = match params.get("filter") {
        Some(value) => value
            .parse()
            .map_err(|err: UnknownReadFilter| api_validation_error(&err.to_string()))?,
        None => ReadFilter::All,
    };
    let limit = match params.get("limit") {
        Some(value) => {
            let limit: usize = value
                .trim()
                .parse()
                .map_err(|_| api_validation_error("limit must be a positive integer"))?;
            if limit == 0 {
                return Err(api_validation_error("limit must be a positive integer"));
            }
            Some(limit)
        }
        None => match params.get("view").map(String::as_str) {
            Some("dropdown") => Some(dropdown_limit),
            Some("inbox") | None => None,
            Some(other) => return Err(api_validation_error(&format!("unknown view: {other}"))),
        },
    };
    Ok(ListOptions { limit, filter })
}

#[utoipa::path(
    get,
    path = "/v1/notifications",
    tag = "notifications",
    params(
        ("limit" = Option<usize>, Query, description = "Page size; omitted returns everything"),
        ("filter" = Option<String>, Query, description = "all | unread | read"),
        ("view" = Option<String>, Query, description = "dropdown applies the configured page size")
    ),
    responses(
        (status = 200, description = "Newest first", body = NotificationListResponse),
        (status = 400, description = "Malformed query", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_notifications(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let caller = require_caller(&headers)?;
    let options = list_options(&params, state.center.config().dropdown_limit)?;
    let items = state.center.list(&caller.user_id, options).await?;
    let unread_count = state.center.unread_count(&caller.user_id).await?;
    Ok(Json(NotificationListResponse {
        items: items.into_iter().map(NotificationView::from).collect(),
        unread_count,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/notifications/summary",
    tag = "notifications",
    responses(
        (status = 200, description = "Inbox tab counts", body = NotificationCounts)
    )
)]
pub(crate) async fn notification_summary(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<NotificationCounts>, ApiError> {
    let caller = require_caller(&headers)?;
    Ok(Json(state.center.counts(&caller.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/v1/notifications/{notification_id}/read",
    tag = "notifications",
    params(("notification_id" = Uuid, Path, description = "Notification identifier")),
    responses(
        (status = 204, description = "Marked read, or nothing to do")
    )
)]
pub(crate) async fn mark_notification_read(
    Path(notification_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let caller = require_caller(&headers)?;
    state
        .center
        .mark_read(&caller.user_id, notification_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/notifications/{notification_id}/open",
    tag = "notifications",
    params(("notification_id" = Uuid, Path, description = "Notification identifier")),
    responses(
        (status = 200, description = "Marked read; navigation target", body = NotificationOpenResponse),
        (status = 404, description = "Notification not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn open_notification(
    Path(notification_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<NotificationOpenResponse>, ApiError> {
    let caller = require_caller(&headers)?;
    let link = state.center.open(&caller.user_id, notification_id).await?;
    Ok(Json(NotificationOpenResponse { link }))
}

#[utoipa::path(
    post,
    path = "/v1/notifications/read-all",
    tag = "notifications",
    responses(
        (status = 200, description = "Rows marked read", body = AffectedResponse)
    )
)]
pub(crate) async fn mark_all_notifications_read(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<AffectedResponse>, ApiError> {
    let caller = require_caller(&headers)?;
    let affected = state.center.mark_all_read(&caller.user_id).await?;
    Ok(Json(AffectedResponse { affected }))
}

#[utoipa::path(
    delete,
    path = "/v1/notifications/{notification_id}",
    tag = "notifications",
    params(("notification_id" = Uuid, Path, description = "Notification identifier")),
    responses(
        (status = 204, description = "Deleted or already absent")
    )
)]
pub(crate) async fn delete_notification(
    Path(notification_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let caller = require_caller(&headers)?;
    state.center.delete(&caller.user_id, notification_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/v1/notifications/read",
    tag = "notifications",
    responses(
        (status = 200, description = "Read notifications removed", body = AffectedResponse)
    )
)]
pub(crate) async fn delete_read_notifications(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<AffectedResponse>, ApiError> {
    let caller = require_caller(&headers)?;
    let affected = state.center.delete_all_read(&caller.user_id).await?;
    Ok(Json(AffectedResponse { affected }))
}

#[utoipa::path(
    get,
    path = "/v1/notifications/events",
    tag = "notifications",
    responses(
        (status = 200, description = "Server-sent `notifications` events, one per change")
    )
)]
pub(crate) async fn notification_events(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let caller = require_caller(&headers)?;
    let subscription = state.center.subscribe(&caller.user_id)?;
    tracing::debug!(recipient_id = %caller.user_id, "notification stream opened");
    // The subscription moves into the stream; a client disconnect drops both.
    let stream = futures::stream::unfold(subscription, |mut subscription| async move {
        let change = subscription.recv().await?;
        let event = Event::default()
            .event(SSE_EVENT_NAME)
            .json_data(&change)
            .unwrap_or_else(|_| Event::default().event(SSE_EVENT_NAME));
        Some((Ok(event), subscription))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
