//! Domain events that may produce notifications.
//!
//! # Purpose
//! The pipeline and the public view counter emit these after their store
//! write returns. The scheduled-job collaborator posts the time-driven
//! variants to the internal intake endpoint.
use super::{FollowUpSnapshot, LeadStatus, TaskSnapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeadOrigin {
    /// Entered by the broker in the back office.
    Manual,
    /// Submitted through a public property page.
    PublicInquiry,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    LeadCreated {
        lead_id: Uuid,
        owner_id: String,
        lead_name: String,
        origin: LeadOrigin,
    },
    LeadStatusChanged {
        lead_id: Uuid,
        owner_id: String,
        lead_name: String,
        from: LeadStatus,
        to: LeadStatus,
    },
    TaskDeadline {
        task: TaskSnapshot,
    },
    FollowUpDue {
        follow_up: FollowUpSnapshot,
    },
    PropertyViewed {
        property_id: Uuid,
        owner_id: String,
        title: String,
        previous: u64,
        current: u64,
    },
    Announcement {
        recipient_id: String,
        title: String,
        message: String,
        #[serde(default)]
        link: Option<String>,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::LeadCreated { .. } => "lead_created",
            DomainEvent::LeadStatusChanged { .. } => "lead_status_changed",
            DomainEvent::TaskDeadline { .. } => "task_deadline",
            DomainEvent::FollowUpDue { .. } => "follow_up_due",
            DomainEvent::PropertyViewed { .. } => "property_viewed",
            DomainEvent::Announcement { .. } => "announcement",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_are_internally_tagged() {
        let event: DomainEvent = serde_json::from_value(json!({
            "type": "announcement",
            "recipient_id": "b1",
            "title": "Maintenance",
            "message": "Portal offline at 22h"
        }))
        .expect("decode");
        assert_eq!(event.name(), "announcement");
        assert!(matches!(event, DomainEvent::Announcement { link: None, .. }));
    }

    #[test]
    fn task_deadline_decodes_nested_snapshot() {
        let event: DomainEvent = serde_json::from_value(json!({
            "type": "task_deadline",
            "task": {
                "task_id": "6f1c1d9e-8c1b-4c55-8a61-6f2d1f0452a1",
                "owner_id": "b1",
                "title": "Call Ana",
                "due_at": "2026-01-01T12:00:00Z",
                "status": "in_progress"
            }
        }))
        .expect("decode");
        let DomainEvent::TaskDeadline { task } = event else {
            panic!("expected task deadline");
        };
        assert!(task.status.is_unfinished());
    }
}
