//! HTTP API request/response types.
//!
//! # Purpose
//! Defines shared payload shapes for the back-office REST API and OpenAPI
//! schema generation.
use crate::model::{
    Lead, LeadDraft, LeadStatus, LeadUpdate, Notification, NotificationKind,
};
use crate::pipeline::PublicInquiry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub service: String,
    pub api_version: String,
    pub storage_backend: String,
    pub durable_storage: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct LeadCreateRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub property_id: Option<Uuid>,
    #[serde(default)]
    pub contacted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<LeadCreateRequest> for LeadDraft {
    fn from(body: LeadCreateRequest) -> Self {
        LeadDraft {
            name: body.name,
            email: body.email,
            phone: body.phone,
            source: body.source,
            property_id: body.property_id,
            contacted_at: body.contacted_at,
            notes: body.notes,
        }
    }
}

/// Full-record edit. `status` accepts canonical names or board labels.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct LeadUpdateRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub property_id: Option<Uuid>,
    #[serde(default)]
    pub contacted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LeadUpdateRequest {
    pub fn into_update(self, status: LeadStatus) -> LeadUpdate {
        LeadUpdate {
            name: self.name,
            email: self.email,
            phone: self.phone,
            source: self.source,
            status,
            property_id: self.property_id,
            contacted_at: self.contacted_at,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct LeadStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeadListResponse {
    pub items: Vec<Lead>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PublicInquiryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub property_id: Option<Uuid>,
    #[serde(default)]
    pub broker_id: Option<String>,
}

impl From<PublicInquiryRequest> for PublicInquiry {
    fn from(body: PublicInquiryRequest) -> Self {
        PublicInquiry {
            name: body.name,
            email: body.email,
            phone: body.phone,
            message: body.message,
            property_id: body.property_id,
            broker_id: body.broker_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct InquiryAccepted {
    pub lead_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PropertyViewResponse {
    pub property_id: Uuid,
    pub views: u64,
}

/// Wire shape of a notification. `read` is always `read_at.is_some()`.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct NotificationView {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationView {
    fn from(notification: Notification) -> Self {
        NotificationView {
            read: notification.is_read(),
            id: notification.id,
            kind: notification.kind,
            title: notification.title,
            message: notification.message,
            link: notification.link,
            read_at: notification.read_at,
            created_at: notification.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationListResponse {
    pub items: Vec<NotificationView>,
    pub unread_count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct NotificationOpenResponse {
    /// Navigation target; absent for informational notifications.
    pub link: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AffectedResponse {
    pub affected: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct EventAccepted {
    pub event: String,
    pub queued: bool,
}
