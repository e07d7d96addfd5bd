use crate::model::{
    Lead, LeadQuery, Notification, NotificationQuery, Property, ReadFilter,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row".into()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Unexpected(other.into()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row store for leads, notifications, and the property collaborator.
///
/// Every lead and notification operation is scoped to one owner or
/// recipient. Rows owned by someone else behave as if they did not exist.
#[async_trait]
pub trait BrokerageStore: Send + Sync {
    async fn insert_lead(&self, lead: Lead) -> StoreResult<Lead>;
    async fn get_lead(&self, owner_id: &str, lead_id: Uuid) -> StoreResult<Lead>;
    /// Replace a stored lead. Fails with `NotFound` when the row is missing.
    async fn update_lead(&self, lead: Lead) -> StoreResult<Lead>;
    async fn delete_lead(&self, owner_id: &str, lead_id: Uuid) -> StoreResult<bool>;
    async fn select_leads(&self, query: &LeadQuery) -> StoreResult<Vec<Lead>>;

    /// Stores `notification` with `created_at` set to the insert instant and
    /// returns the stored row.
    async fn insert_notification(&self, notification: Notification) -> StoreResult<Notification>;
    async fn get_notification(
        &self,
        recipient_id: &str,
        notification_id: Uuid,
    ) -> StoreResult<Notification>;
    async fn select_notifications(
        &self,
        query: &NotificationQuery,
    ) -> StoreResult<Vec<Notification>>;
    async fn count_notifications(&self, recipient_id: &str, filter: ReadFilter)
    -> StoreResult<u64>;
    /// Returns `true` when an unread row became read.
    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        recipient_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;
    /// Stamps `read_at = at` on unread rows with `created_at <= created_before`.
    async fn mark_all_notifications_read(
        &self,
        recipient_id: &str,
        at: DateTime<Utc>,
        created_before: DateTime<Utc>,
    ) -> StoreResult<u64>;
    async fn delete_notification(
        &self,
        notification_id: Uuid,
        recipient_id: &str,
    ) -> StoreResult<bool>;
    async fn delete_read_notifications(&self, recipient_id: &str) -> StoreResult<u64>;

    async fn upsert_property(&self, property: Property) -> StoreResult<Property>;
    async fn get_property(&self, property_id: Uuid) -> StoreResult<Property>;
    /// Increment the view counter, returning `(previous, current)`.
    async fn record_property_view(&self, property_id: Uuid) -> StoreResult<(u64, u64)>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
