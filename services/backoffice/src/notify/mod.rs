//! Notification center.
//!
//! # Purpose
//! Owns per-broker notifications: generates them from domain events, serves
//! the inbox and dropdown reads, and applies the read/delete operations.
//!
//! # Live consumers
//! After every store write that changes something, one [`NotificationEvent`]
//! is published on the recipient's feed topic. Each consumer (inbox page,
//! header dropdown, SSE connection) holds its own subscription and re-fetches
//! on any event, so a change made through one consumer reaches the others
//! without them knowing about each other.
pub mod dispatch;
pub mod rules;

pub use dispatch::NotificationDispatcher;

use crate::config::NotificationConfig;
use crate::model::{
    DomainEvent, Notification, NotificationCounts, NotificationEvent, NotificationEventOp,
    NotificationQuery, ReadFilter,
};
use crate::store::{BrokerageStore, StoreError};
use chrono::Utc;
use realty_feed::{Feed, FeedError, Subscription};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Feed(#[from] FeedError),
}

pub type NotificationResult<T> = Result<T, NotificationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListOptions {
    /// `None` returns every matching notification.
    pub limit: Option<usize>,
    pub filter: ReadFilter,
}

impl ListOptions {
    pub fn inbox(filter: ReadFilter) -> Self {
        Self {
            limit: None,
            filter,
        }
    }

    pub fn dropdown(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            filter: ReadFilter::All,
        }
    }
}

#[derive(Clone)]
pub struct NotificationCenter {
    store: Arc<dyn BrokerageStore>,
    feed: Feed<NotificationEvent>,
    config: Arc<NotificationConfig>,
}

impl NotificationCenter {
    pub fn new(
        store: Arc<dyn BrokerageStore>,
        feed: Feed<NotificationEvent>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            store,
            feed,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    pub fn feed(&self) -> &Feed<NotificationEvent> {
        &self.feed
    }

    pub async fn list(
        &self,
        recipient_id: &str,
        options: ListOptions,
    ) -> NotificationResult<Vec<Notification>> {
        let query = NotificationQuery {
            recipient_id: recipient_id.to_string(),
            filter: options.filter,
            limit: options.limit,
        };
        Ok(self.store.select_notifications(&query).await?)
    }

    /// Always recomputed from the store.
    pub async fn unread_count(&self, recipient_id: &str) -> NotificationResult<u64> {
        Ok(self
            .store
            .count_notifications(recipient_id, ReadFilter::Unread)
            .await?)
    }

    pub async fn counts(&self, recipient_id: &str) -> NotificationResult<NotificationCounts> {
        let total = self
            .store
            .count_notifications(recipient_id, ReadFilter::All)
            .await?;
        let unread = self.unread_count(recipient_id).await?;
        let unread = unread.min(total);
        Ok(NotificationCounts {
            total,
            unread,
            read: total - unread,
        })
    }

    /// Idempotent. A missing id or another broker's notification is a no-op.
    pub async fn mark_read(
        &self,
        recipient_id: &str,
        notification_id: Uuid,
    ) -> NotificationResult<bool> {
        let changed = self
            .store
            .mark_notification_read(notification_id, recipient_id, Utc::now())
            .await?;
        if changed {
            self.announce(recipient_id, NotificationEventOp::Read, Some(notification_id), 1)
                .await;
        }
        Ok(changed)
    }

    /// Marks every notification created up to the moment the call began.
    /// Notifications inserted while the call runs stay unread.
    pub async fn mark_all_read(&self, recipient_id: &str) -> NotificationResult<u64> {
        let started = Utc::now();
        let affected = self
            .store
            .mark_all_notifications_read(recipient_id, started, started)
            .await?;
        if affected > 0 {
            self.announce(recipient_id, NotificationEventOp::AllRead, None, affected)
                .await;
        }
        Ok(affected)
    }

    pub async fn delete(
        &self,
        recipient_id: &str,
        notification_id: Uuid,
    ) -> NotificationResult<bool> {
        let removed = self
            .store
            .delete_notification(notification_id, recipient_id)
            .await?;
        if removed {
            self.announce(
                recipient_id,
                NotificationEventOp::Deleted,
                Some(notification_id),
                1,
            )
            .await;
        }
        Ok(removed)
    }

    pub async fn delete_all_read(&self, recipient_id: &str) -> NotificationResult<u64> {
        let affected = self.store.delete_read_notifications(recipient_id).await?;
        if affected > 0 {
            self.announce(recipient_id, NotificationEventOp::ReadDeleted, None, affected)
                .await;
        }
        Ok(affected)
    }

    /// Click handling: mark read, then hand back the navigation target.
    pub async fn open(
        &self,
        recipient_id: &str,
        notification_id: Uuid,
    ) -> NotificationResult<Option<String>> {
        let notification = match self
            .store
            .get_notification(recipient_id, notification_id)
            .await
        {
            Ok(notification) => notification,
            Err(StoreError::NotFound(_)) => return Err(NotificationError::NotFound),
            Err(err) => return Err(err.into()),
        };
        if !notification.is_read() {
            self.mark_read(recipient_id, notification_id).await?;
        }
        Ok(notification.link)
    }

    pub fn subscribe(
        &self,
        recipient_id: &str,
    ) -> NotificationResult<Subscription<NotificationEvent>> {
        Ok(self.feed.subscribe(recipient_id)?)
    }

    /// Apply the rules to `event`, store the result, and announce it.
    pub async fn publish_from_event(
        &self,
        event: &DomainEvent,
    ) -> NotificationResult<Option<Notification>> {
        let Some(notification) = rules::notification_for(event, &self.config, Utc::now()) else {
            tracing::debug!(event = event.name(), "event produced no notification");
            return Ok(None);
        };
        let stored = self.store.insert_notification(notification).await?;
        metrics::counter!(
            "realty_notifications_created_total",
            "kind" => stored.kind.as_str()
        )
        .increment(1);
        self.announce(
            &stored.recipient_id,
            NotificationEventOp::Created,
            Some(stored.id),
            1,
        )
        .await;
        Ok(Some(stored))
    }

    async fn announce(
        &self,
        recipient_id: &str,
        op: NotificationEventOp,
        notification_id: Option<Uuid>,
        affected: u64,
    ) {
        let event = NotificationEvent {
            op,
            recipient_id: recipient_id.to_string(),
            notification_id,
            affected,
            at: Utc::now(),
        };
        let delivered = self.feed.publish(recipient_id, event).await;
        tracing::trace!(recipient_id, ?op, delivered, "notification change published");
    }
}
