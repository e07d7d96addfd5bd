//! OpenAPI schema aggregation for the back-office API.
//!
//! # Purpose
//! Collects all public and back-office routes and schema types into a single
//! OpenAPI document served at `/v1/openapi.json`.
use crate::api::{
    leads, notifications, public, system,
    types::{
        AffectedResponse, ErrorResponse, HealthStatus, InquiryAccepted, LeadCreateRequest,
        LeadListResponse, LeadStatusRequest, LeadUpdateRequest, NotificationListResponse,
        NotificationOpenResponse, NotificationView, PropertyViewResponse, PublicInquiryRequest,
        SystemInfo,
    },
};
use crate::model::{
    Lead, LeadSort, LeadStatus, NotificationCounts, NotificationEvent, NotificationEventOp,
    NotificationKind, ReadFilter,
};
use crate::pipeline::{BoardColumn, FunnelSnapshot, LeadBoard, StageCounts};
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "realty-backoffice",
        version = "v1",
        description = "Brokerage back-office lead pipeline and notification center"
    ),
    paths(
        system::system_info,
        system::system_health,
        public::create_inquiry,
        public::record_property_view,
        leads::list_leads,
        leads::create_lead,
        leads::lead_board,
        leads::lead_funnel,
        leads::get_lead,
        leads::update_lead,
        leads::set_lead_status,
        leads::delete_lead,
        notifications::list_notifications,
        notifications::notification_summary,
        notifications::mark_notification_read,
        notifications::open_notification,
        notifications::mark_all_notifications_read,
        notifications::delete_notification,
        notifications::delete_read_notifications,
        notifications::notification_events
    ),
    components(schemas(
        SystemInfo,
        HealthStatus,
        ErrorResponse,
        Lead,
        LeadStatus,
        LeadSort,
        LeadCreateRequest,
        LeadUpdateRequest,
        LeadStatusRequest,
        LeadListResponse,
        LeadBoard,
        BoardColumn,
        FunnelSnapshot,
        StageCounts,
        PublicInquiryRequest,
        InquiryAccepted,
        PropertyViewResponse,
        NotificationKind,
        NotificationView,
        NotificationListResponse,
        NotificationCounts,
        NotificationOpenResponse,
        NotificationEvent,
        NotificationEventOp,
        ReadFilter,
        AffectedResponse
    )),
    tags(
        (name = "system", description = "Health and service metadata"),
        (name = "public", description = "Public site intake"),
        (name = "leads", description = "Lead pipeline"),
        (name = "notifications", description = "Notification center")
    )
)]
pub struct ApiDoc;

pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
