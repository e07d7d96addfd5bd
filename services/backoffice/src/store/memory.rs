//! In-memory implementation of the brokerage store.
//!
//! # Purpose
//! This store implements the `BrokerageStore` trait entirely in memory using `HashMap`s guarded
//! by `tokio::sync::RwLock`. It exists for:
//! - local development and tests (no external dependencies)
//! - single-node deployments where durability is not required
//! - as a fallback when Postgres is not configured
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: each operation holds one table lock for its whole
//!   read-modify-write, so bulk operations (`mark_all_notifications_read`,
//!   `delete_read_notifications`) are atomic with respect to concurrent inserts.
//! - **Owner scoping**: rows owned by another broker are reported as missing.
//!
//! # Performance characteristics
//! - Selects scan the table and filter; fine for dev workloads, not for large data sets.
//! - Writes are serialized per table.
//!
//! # Metrics
//! `realty_store_leads_total` and `realty_store_notifications_total` gauges track table sizes.
use super::{BrokerageStore, StoreError, StoreResult};
use crate::model::{Lead, LeadQuery, Notification, NotificationQuery, Property, ReadFilter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory brokerage store.
///
/// All tables are wrapped in `Arc<RwLock<...>>` so reads proceed concurrently and
/// writes are serialized per table.
#[derive(Default)]
pub struct InMemoryStore {
    /// Leads keyed by id. Ownership is checked on every access.
    leads: Arc<RwLock<HashMap<Uuid, Lead>>>,
    /// Notifications keyed by id.
    notifications: Arc<RwLock<HashMap<Uuid, Notification>>>,
    /// Property collaborator rows keyed by id.
    properties: Arc<RwLock<HashMap<Uuid, Property>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn record_lead_gauge(leads: &HashMap<Uuid, Lead>) {
    metrics::gauge!("realty_store_leads_total").set(leads.len() as f64);
}

fn record_notification_gauge(notifications: &HashMap<Uuid, Notification>) {
    metrics::gauge!("realty_store_notifications_total").set(notifications.len() as f64);
}

#[async_trait]
impl BrokerageStore for InMemoryStore {
    async fn insert_lead(&self, lead: Lead) -> StoreResult<Lead> {
        let mut leads = self.leads.write().await;
        if leads.contains_key(&lead.id) {
            return Err(StoreError::Conflict("lead exists".into()));
        }
        leads.insert(lead.id, lead.clone());
        record_lead_gauge(&leads);
        Ok(lead)
    }

    async fn get_lead(&self, owner_id: &str, lead_id: Uuid) -> StoreResult<Lead> {
        self.leads
            .read()
            .await
            .get(&lead_id)
            .filter(|lead| lead.owner_id == owner_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("lead".into()))
    }

    async fn update_lead(&self, lead: Lead) -> StoreResult<Lead> {
        let mut leads = self.leads.write().await;
        match leads.get_mut(&lead.id) {
            Some(stored) if stored.owner_id == lead.owner_id => {
                *stored = lead.clone();
                Ok(lead)
            }
            _ => Err(StoreError::NotFound("lead".into())),
        }
    }

    async fn delete_lead(&self, owner_id: &str, lead_id: Uuid) -> StoreResult<bool> {
        let mut leads = self.leads.write().await;
        let owned = leads
            .get(&lead_id)
            .is_some_and(|lead| lead.owner_id == owner_id);
        if !owned {
            return Ok(false);
        }
        leads.remove(&lead_id);
        record_lead_gauge(&leads);
        Ok(true)
    }

    async fn select_leads(&self, query: &LeadQuery) -> StoreResult<Vec<Lead>> {
        let mut selected: Vec<Lead> = self
            .leads
            .read()
            .await
            .values()
            .filter(|lead| query.matches(lead))
            .cloned()
            .collect();
        query.sort(&mut selected);
        if let Some(limit) = query.limit {
            selected.truncate(limit);
        }
        Ok(selected)
    }

    async fn insert_notification(
        &self,
        mut notification: Notification,
    ) -> StoreResult<Notification> {
        let mut notifications = self.notifications.write().await;
        if notifications.contains_key(&notification.id) {
            return Err(StoreError::Conflict("notification exists".into()));
        }
        notification.created_at = Utc::now();
        notifications.insert(notification.id, notification.clone());
        record_notification_gauge(&notifications);
        Ok(notification)
    }

    async fn get_notification(
        &self,
        recipient_id: &str,
        notification_id: Uuid,
    ) -> StoreResult<Notification> {
        self.notifications
            .read()
            .await
            .get(&notification_id)
            .filter(|notification| notification.recipient_id == recipient_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("notification".into()))
    }

    async fn select_notifications(
        &self,
        query: &NotificationQuery,
    ) -> StoreResult<Vec<Notification>> {
        let mut selected: Vec<Notification> = self
            .notifications
            .read()
            .await
            .values()
            .filter(|notification| query.matches(notification))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = query.limit {
            selected.truncate(limit);
        }
        Ok(selected)
    }

    async fn count_notifications(
        &self,
        recipient_id: &str,
        filter: ReadFilter,
    ) -> StoreResult<u64> {
        let count = self
            .notifications
            .read()
            .await
            .values()
            .filter(|n| n.recipient_id == recipient_id && filter.matches(n))
            .count();
        Ok(count as u64)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        recipient_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut notifications = self.notifications.write().await;
        Ok(notifications
            .get_mut(&notification_id)
            .filter(|notification| notification.recipient_id == recipient_id)
            .is_some_and(|notification| notification.mark_read(at)))
    }

    async fn mark_all_notifications_read(
        &self,
        recipient_id: &str,
        at: DateTime<Utc>,
        created_before: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut notifications = self.notifications.write().await;
        let affected = notifications
            .values_mut()
            .filter(|n| n.recipient_id == recipient_id && n.created_at <= created_before)
            .filter_map(|n| n.mark_read(at).then_some(()))
            .count();
        Ok(affected as u64)
    }

    async fn delete_notification(
        &self,
        notification_id: Uuid,
        recipient_id: &str,
    ) -> StoreResult<bool> {
        let mut notifications = self.notifications.write().await;
        let owned = notifications
            .get(&notification_id)
            .is_some_and(|n| n.recipient_id == recipient_id);
        if !owned {
            return Ok(false);
        }
        notifications.remove(&notification_id);
        record_notification_gauge(&notifications);
        Ok(true)
    }

    async fn delete_read_notifications(&self, recipient_id: &str) -> StoreResult<u64> {
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|_, n| !(n.recipient_id == recipient_id && n.is_read()));
        record_notification_gauge(&notifications);
        Ok((before - notifications.len()) as u64)
    }

    async fn upsert_property(&self, property: Property) -> StoreResult<Property> {
        self.properties
            .write()
            .await
            .insert(property.id, property.clone());
        Ok(property)
    }

    async fn get_property(&self, property_id: Uuid) -> StoreResult<Property> {
        self.properties
            .read()
            .await
            .get(&property_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("property".into()))
    }

    async fn record_property_view(&self, property_id: Uuid) -> StoreResult<(u64, u64)> {
        let mut properties = self.properties.write().await;
        let property = properties
            .get_mut(&property_id)
            .ok_or_else(|| StoreError::NotFound("property".into()))?;
        let previous = property.views;
        property.views = previous.saturating_add(1);
        Ok((previous, property.views))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
