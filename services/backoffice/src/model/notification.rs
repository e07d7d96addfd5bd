//! Notification records, read filters, and change-feed payloads.
//!
//! # Purpose
//! Defines the per-recipient notification entity and the events published
//! to live consumers after every store write.
//!
//! # Notes
//! Only `read_at` is stored. `read` is derived from it, so the two can never
//! disagree.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewLead,
    TaskDueSoon,
    TaskOverdue,
    PropertyViewsMilestone,
    StatusChanged,
    FollowUpPending,
    Generic,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 7] = [
        NotificationKind::NewLead,
        NotificationKind::TaskDueSoon,
        NotificationKind::TaskOverdue,
        NotificationKind::PropertyViewsMilestone,
        NotificationKind::StatusChanged,
        NotificationKind::FollowUpPending,
        NotificationKind::Generic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::NewLead => "new_lead",
            NotificationKind::TaskDueSoon => "task_due_soon",
            NotificationKind::TaskOverdue => "task_overdue",
            NotificationKind::PropertyViewsMilestone => "property_views_milestone",
            NotificationKind::StatusChanged => "status_changed",
            NotificationKind::FollowUpPending => "follow_up_pending",
            NotificationKind::Generic => "generic",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = std::convert::Infallible;

    /// Unrecognized kinds read back from storage degrade to `Generic`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .unwrap_or(NotificationKind::Generic))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// In-app route. May point at an entity that no longer exists.
    pub link: Option<String>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient_id: impl Into<String>,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        link: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id: recipient_id.into(),
            kind,
            title: title.into(),
            message: message.into(),
            link,
            read_at: None,
            created_at: now,
        }
    }

    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// Returns `true` when the notification moved from unread to read.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.read_at.is_some() {
            return false;
        }
        self.read_at = Some(at);
        true
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadFilter {
    #[default]
    All,
    Unread,
    Read,
}

impl ReadFilter {
    pub fn matches(self, notification: &Notification) -> bool {
        match self {
            ReadFilter::All => true,
            ReadFilter::Unread => !notification.is_read(),
            ReadFilter::Read => notification.is_read(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown notification filter: {0}")]
pub struct UnknownReadFilter(pub String);

impl FromStr for ReadFilter {
    type Err = UnknownReadFilter;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" | "todas" => Ok(ReadFilter::All),
            "unread" | "nao_lidas" | "nao-lidas" => Ok(ReadFilter::Unread),
            "read" | "lidas" => Ok(ReadFilter::Read),
            _ => Err(UnknownReadFilter(value.to_string())),
        }
    }
}

/// Recipient-scoped selection, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationQuery {
    pub recipient_id: String,
    pub filter: ReadFilter,
    pub limit: Option<usize>,
}

impl NotificationQuery {
    pub fn matches(&self, notification: &Notification) -> bool {
        notification.recipient_id == self.recipient_id && self.filter.matches(notification)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotificationCounts {
    pub total: u64,
    pub unread: u64,
    pub read: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEventOp {
    Created,
    Read,
    AllRead,
    Deleted,
    ReadDeleted,
}

/// Published on the recipient's feed after a successful store write.
///
/// Consumers treat the event as a signal to re-fetch; it carries no
/// notification body.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct NotificationEvent {
    pub op: NotificationEventOp,
    pub recipient_id: String,
    pub notification_id: Option<Uuid>,
    pub affected: u64,
    pub at: DateTime<Utc>,
}
