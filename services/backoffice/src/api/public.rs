//! Public site handlers. No caller identity.
use crate::api::error::ApiError;
use crate::api::types::{InquiryAccepted, PropertyViewResponse, PublicInquiryRequest};
use crate::app::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/v1/public/inquiries",
    tag = "public",
    request_body = PublicInquiryRequest,
    responses(
        (status = 201, description = "Inquiry stored as a lead for the listing broker", body = InquiryAccepted),
        (status = 400, description = "Name or target missing", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Property not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_inquiry(
    State(state): State<AppState>,
    Json(body): Json<PublicInquiryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let lead = state.pipeline.create_public_inquiry(body.into()).await?;
    Ok((StatusCode::CREATED, Json(InquiryAccepted { lead_id: lead.id })))
}

#[utoipa::path(
    post,
    path = "/v1/public/properties/{property_id}/views",
    tag = "public",
    params(("property_id" = Uuid, Path, description = "Property identifier")),
    responses(
        (status = 200, description = "View counted", body = PropertyViewResponse),
        (status = 404, description = "Property not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn record_property_view(
    Path(property_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PropertyViewResponse>, ApiError> {
    let views = state.pipeline.record_property_view(property_id).await?;
    Ok(Json(PropertyViewResponse { property_id, views }))
}
