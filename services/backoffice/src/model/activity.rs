//! Task and follow-up snapshots posted by the scheduled-job collaborator.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn is_unfinished(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub task_id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub due_at: Option<DateTime<Utc>>,
    pub status: TaskStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpStatus {
    Scheduled,
    Confirmed,
    Rescheduled,
    Done,
    Cancelled,
}

impl FollowUpStatus {
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            FollowUpStatus::Scheduled | FollowUpStatus::Confirmed | FollowUpStatus::Rescheduled
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FollowUpSnapshot {
    pub follow_up_id: Uuid,
    pub owner_id: String,
    pub lead_id: Option<Uuid>,
    pub lead_name: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub status: FollowUpStatus,
}
