//! Back-office data model module.
//!
//! # Purpose
//! Re-exports the lead, notification, property, and activity models plus the
//! domain events used by the pipeline, notification center, and store layers.
mod activity;
mod event;
mod lead;
mod notification;
mod property;

pub use activity::{FollowUpSnapshot, FollowUpStatus, TaskSnapshot, TaskStatus};
pub use event::{DomainEvent, LeadOrigin};
pub use lead::{
    Lead, LeadDraft, LeadQuery, LeadSort, LeadStatus, LeadUpdate, UnknownLeadSort,
    UnknownLeadStatus,
};
pub use notification::{
    Notification, NotificationCounts, NotificationEvent, NotificationEventOp, NotificationKind,
    NotificationQuery, ReadFilter, UnknownReadFilter,
};
pub use property::{FeatureError, Property, PropertyFeatures};
