//! Lead pipeline.
//!
//! # Purpose
//! Owns lead creation, edits, stage moves, and the owner-scoped read views
//! (list, kanban board, funnel snapshot). Every write goes to the store
//! first; domain events are handed to the notification dispatcher only after
//! the store returned, and their fate never affects the caller.
use crate::model::{
    DomainEvent, Lead, LeadDraft, LeadOrigin, LeadQuery, LeadSort, LeadStatus, LeadUpdate,
};
use crate::notify::{NotificationDispatcher, rules};
use crate::store::{BrokerageStore, StoreError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

pub const PUBLIC_INQUIRY_SOURCE: &str = "public inquiry";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => PipelineError::NotFound(what),
            other => PipelineError::Store(other),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Inquiry submitted from a public property page. No caller identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublicInquiry {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub property_id: Option<Uuid>,
    /// Used only when no property is given.
    pub broker_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFilter {
    pub search: Option<String>,
    pub status: Option<LeadStatus>,
    pub sort: LeadSort,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct BoardColumn {
    pub status: LeadStatus,
    pub label: String,
    pub count: usize,
    pub leads: Vec<Lead>,
}

/// Kanban view. Always five columns in stage order.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct LeadBoard {
    pub columns: Vec<BoardColumn>,
}

impl LeadBoard {
    /// Group `leads` by stage, keeping their order inside each column.
    pub fn from_leads(leads: Vec<Lead>) -> Self {
        let mut columns: Vec<BoardColumn> = LeadStatus::ALL
            .into_iter()
            .map(|status| BoardColumn {
                status,
                label: status.label().to_string(),
                count: 0,
                leads: Vec::new(),
            })
            .collect();
        for lead in leads {
            if let Some(column) = columns.iter_mut().find(|column| column.status == lead.status) {
                column.leads.push(lead);
            }
        }
        for column in &mut columns {
            column.count = column.leads.len();
        }
        Self { columns }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageCounts {
    pub new: u64,
    pub in_progress: u64,
    pub qualified: u64,
    pub converted: u64,
    pub lost: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Default)]
pub struct FunnelSnapshot {
    pub total: u64,
    pub stages: StageCounts,
    pub active: u64,
    pub won: u64,
    pub lost: u64,
    /// `won / total`, 0 when there are no leads.
    pub conversion_rate: f64,
    /// Display-only share of qualified leads assumed to be negotiating. Not a
    /// pipeline stage and never stored.
    pub negotiation_estimate: u64,
}

impl FunnelSnapshot {
    pub fn from_leads(leads: &[Lead]) -> Self {
        let mut stages = StageCounts::default();
        for lead in leads {
            match lead.status {
                LeadStatus::New => stages.new += 1,
                LeadStatus::InProgress => stages.in_progress += 1,
                LeadStatus::Qualified => stages.qualified += 1,
                LeadStatus::Converted => stages.converted += 1,
                LeadStatus::Lost => stages.lost += 1,
            }
        }
        let total = leads.len() as u64;
        let conversion_rate = if total == 0 {
            0.0
        } else {
            stages.converted as f64 / total as f64
        };
        Self {
            total,
            stages,
            active: stages.new + stages.in_progress + stages.qualified,
            won: stages.converted,
            lost: stages.lost,
            conversion_rate,
            negotiation_estimate: stages.qualified - stages.qualified / 3,
        }
    }
}

#[derive(Clone)]
pub struct LeadPipeline {
    store: Arc<dyn BrokerageStore>,
    dispatcher: NotificationDispatcher,
    view_milestones: Arc<[u64]>,
}

fn required_name(name: &str) -> PipelineResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PipelineError::Validation("name is required".into()));
    }
    Ok(name.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl LeadPipeline {
    pub fn new(
        store: Arc<dyn BrokerageStore>,
        dispatcher: NotificationDispatcher,
        view_milestones: &[u64],
    ) -> Self {
        Self {
            store,
            dispatcher,
            view_milestones: view_milestones.into(),
        }
    }

    /// Manual back-office entry. Always starts in `New`.
    pub async fn create_lead(&self, owner_id: &str, draft: LeadDraft) -> PipelineResult<Lead> {
        let name = required_name(&draft.name)?;
        let now = Utc::now();
        let lead = Lead {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            name,
            email: optional(draft.email),
            phone: optional(draft.phone),
            source: optional(draft.source),
            status: LeadStatus::New,
            property_id: draft.property_id,
            contacted_at: draft.contacted_at.unwrap_or(now),
            notes: optional(draft.notes),
            created_at: now,
            updated_at: now,
        };
        self.insert(lead, LeadOrigin::Manual).await
    }

    /// Route a public inquiry to the property's broker, or to `broker_id`
    /// when no property is named.
    pub async fn create_public_inquiry(&self, inquiry: PublicInquiry) -> PipelineResult<Lead> {
        let name = required_name(&inquiry.name)?;
        let owner_id = match (inquiry.property_id, optional(inquiry.broker_id)) {
            (Some(property_id), _) => self.store.get_property(property_id).await?.owner_id,
            (None, Some(broker_id)) => broker_id,
            (None, None) => {
                return Err(PipelineError::Validation(
                    "property_id or broker_id is required".into(),
                ));
            }
        };
        let now = Utc::now();
        let lead = Lead {
            id: Uuid::new_v4(),
            owner_id,
            name,
            email: optional(inquiry.email),
            phone: optional(inquiry.phone),
            source: Some(PUBLIC_INQUIRY_SOURCE.to_string()),
            status: LeadStatus::New,
            property_id: inquiry.property_id,
            contacted_at: now,
            notes: optional(inquiry.message),
            created_at: now,
            updated_at: now,
        };
        self.insert(lead, LeadOrigin::PublicInquiry).await
    }

    async fn insert(&self, lead: Lead, origin: LeadOrigin) -> PipelineResult<Lead> {
        let lead = self.store.insert_lead(lead).await?;
        let origin_label = match origin {
            LeadOrigin::Manual => "manual",
            LeadOrigin::PublicInquiry => "public_inquiry",
        };
        metrics::counter!("realty_leads_created_total", "origin" => origin_label).increment(1);
        tracing::info!(lead_id = %lead.id, owner_id = %lead.owner_id, origin = origin_label, "lead created");
        self.dispatcher.dispatch(DomainEvent::LeadCreated {
            lead_id: lead.id,
            owner_id: lead.owner_id.clone(),
            lead_name: lead.name.clone(),
            origin,
        });
        Ok(lead)
    }

    /// Full-record edit. A changed stage emits `LeadStatusChanged`.
    pub async fn update_lead(
        &self,
        owner_id: &str,
        lead_id: Uuid,
        update: LeadUpdate,
    ) -> PipelineResult<Lead> {
        let name = required_name(&update.name)?;
        let current = self.store.get_lead(owner_id, lead_id).await?;
        let updated = Lead {
            name,
            email: optional(update.email),
            phone: optional(update.phone),
            source: optional(update.source),
            status: update.status,
            property_id: update.property_id,
            contacted_at: update.contacted_at.unwrap_or(current.contacted_at),
            notes: optional(update.notes),
            updated_at: Utc::now(),
            ..current.clone()
        };
        let updated = self.store.update_lead(updated).await?;
        self.status_moved(&current, &updated);
        Ok(updated)
    }

    /// Move a lead to `status`. Any transition is allowed; the same status is
    /// a no-op that emits nothing.
    pub async fn set_status(
        &self,
        owner_id: &str,
        lead_id: Uuid,
        status: LeadStatus,
    ) -> PipelineResult<Lead> {
        let current = self.store.get_lead(owner_id, lead_id).await?;
        if current.status == status {
            return Ok(current);
        }
        let updated = Lead {
            status,
            updated_at: Utc::now(),
            ..current.clone()
        };
        let updated = self.store.update_lead(updated).await?;
        self.status_moved(&current, &updated);
        Ok(updated)
    }

    fn status_moved(&self, before: &Lead, after: &Lead) {
        if before.status == after.status {
            return;
        }
        metrics::counter!("realty_lead_status_changes_total", "to" => after.status.as_str())
            .increment(1);
        tracing::info!(
            lead_id = %after.id,
            from = %before.status,
            to = %after.status,
            "lead status changed"
        );
        self.dispatcher.dispatch(DomainEvent::LeadStatusChanged {
            lead_id: after.id,
            owner_id: after.owner_id.clone(),
            lead_name: after.name.clone(),
            from: before.status,
            to: after.status,
        });
    }

    pub async fn get_lead(&self, owner_id: &str, lead_id: Uuid) -> PipelineResult<Lead> {
        Ok(self.store.get_lead(owner_id, lead_id).await?)
    }

    pub async fn list_leads(&self, owner_id: &str, filter: LeadFilter) -> PipelineResult<Vec<Lead>> {
        let mut query = LeadQuery::for_owner(owner_id).with_search(filter.search.as_deref());
        query.status = filter.status;
        query.sort = filter.sort;
        Ok(self.store.select_leads(&query).await?)
    }

    pub async fn board(&self, owner_id: &str, filter: LeadFilter) -> PipelineResult<LeadBoard> {
        let leads = self.list_leads(owner_id, filter).await?;
        Ok(LeadBoard::from_leads(leads))
    }

    pub async fn funnel(&self, owner_id: &str) -> PipelineResult<FunnelSnapshot> {
        let leads = self.list_leads(owner_id, LeadFilter::default()).await?;
        Ok(FunnelSnapshot::from_leads(&leads))
    }

    /// Idempotent. Notifications linking to the lead are left alone.
    pub async fn delete_lead(&self, owner_id: &str, lead_id: Uuid) -> PipelineResult<bool> {
        let removed = self.store.delete_lead(owner_id, lead_id).await?;
        if removed {
            tracing::info!(%lead_id, "lead deleted");
        }
        Ok(removed)
    }

    /// Count a public view of a property. Only a view that crosses a
    /// milestone reaches the notification queue.
    pub async fn record_property_view(&self, property_id: Uuid) -> PipelineResult<u64> {
        let (previous, current) = self.store.record_property_view(property_id).await?;
        if rules::crossed_milestone(&self.view_milestones, previous, current).is_none() {
            return Ok(current);
        }
        let property = self.store.get_property(property_id).await?;
        self.dispatcher.dispatch(DomainEvent::PropertyViewed {
            property_id,
            owner_id: property.owner_id,
            title: property.title,
            previous,
            current,
        });
        Ok(current)
    }
}
