//! Internal event intake.
//!
//! # Purpose
//! Receives time-driven domain events (task deadlines, due follow-ups,
//! announcements) from the scheduled-job collaborator and queues them for
//! the notification dispatcher.
//!
//! # Security considerations
//! - Served only on the internal listener.
//! - Requests must carry the shared `x-internal-token`.
use crate::api::error::ApiError;
use crate::api::types::EventAccepted;
use crate::app::AppState;
use crate::auth::require_internal_token;
use crate::model::DomainEvent;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

pub(crate) async fn ingest_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<DomainEvent>,
) -> Result<impl IntoResponse, ApiError> {
    require_internal_token(&headers, state.internal_token.as_deref())?;
    let name = event.name();
    let queued = state.dispatcher.dispatch(event);
    tracing::debug!(event = name, queued, "internal event received");
    Ok((
        StatusCode::ACCEPTED,
        Json(EventAccepted {
            event: name.to_string(),
            queued,
        }),
    ))
}
