//! Event to notification rules.
//!
//! Each rule is a pure function of the event, the configuration, and `now`.
//! Events whose condition does not hold produce nothing.
use crate::config::NotificationConfig;
use crate::model::{
    DomainEvent, FollowUpSnapshot, LeadOrigin, Notification, NotificationKind, TaskSnapshot,
};
use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

pub fn lead_link(lead_id: Uuid) -> String {
    format!("/crm/leads/{lead_id}")
}

pub fn task_link(task_id: Uuid) -> String {
    format!("/tasks/{task_id}")
}

pub fn follow_up_link(follow_up_id: Uuid) -> String {
    format!("/agenda/{follow_up_id}")
}

pub fn property_link(property_id: Uuid) -> String {
    format!("/properties/{property_id}")
}

pub fn notification_for(
    event: &DomainEvent,
    config: &NotificationConfig,
    now: DateTime<Utc>,
) -> Option<Notification> {
    match event {
        DomainEvent::LeadCreated {
            lead_id,
            owner_id,
            lead_name,
            origin,
        } => (*origin == LeadOrigin::PublicInquiry).then(|| {
            Notification::new(
                owner_id,
                NotificationKind::NewLead,
                "New lead",
                format!("{lead_name} sent an inquiry"),
                Some(lead_link(*lead_id)),
                now,
            )
        }),
        DomainEvent::LeadStatusChanged {
            lead_id,
            owner_id,
            lead_name,
            from,
            to,
        } => (from != to).then(|| {
            Notification::new(
                owner_id,
                NotificationKind::StatusChanged,
                "Lead status changed",
                format!("{lead_name} moved from {} to {}", from.label(), to.label()),
                Some(lead_link(*lead_id)),
                now,
            )
        }),
        DomainEvent::TaskDeadline { task } => task_notification(task, config, now),
        DomainEvent::FollowUpDue { follow_up } => follow_up_notification(follow_up, now),
        DomainEvent::PropertyViewed {
            property_id,
            owner_id,
            title,
            previous,
            current,
        } => crossed_milestone(&config.view_milestones, *previous, *current).map(|milestone| {
            Notification::new(
                owner_id,
                NotificationKind::PropertyViewsMilestone,
                format!("Property reached {milestone} views"),
                format!("\"{title}\" now has {current} views"),
                Some(property_link(*property_id)),
                now,
            )
        }),
        DomainEvent::Announcement {
            recipient_id,
            title,
            message,
            link,
        } => Some(Notification::new(
            recipient_id,
            NotificationKind::Generic,
            title,
            message,
            link.clone(),
            now,
        )),
    }
}

fn task_notification(
    task: &TaskSnapshot,
    config: &NotificationConfig,
    now: DateTime<Utc>,
) -> Option<Notification> {
    if !task.status.is_unfinished() {
        return None;
    }
    let due_at = task.due_at?;
    let (kind, title, message) = if due_at <= now {
        (
            NotificationKind::TaskOverdue,
            "Task overdue",
            format!("\"{}\" was due at {}", task.title, due_at.format("%Y-%m-%d %H:%M UTC")),
        )
    } else if within_lead_time(due_at, now, config) {
        (
            NotificationKind::TaskDueSoon,
            "Task due soon",
            format!("\"{}\" is due at {}", task.title, due_at.format("%Y-%m-%d %H:%M UTC")),
        )
    } else {
        return None;
    };
    Some(Notification::new(
        &task.owner_id,
        kind,
        title,
        message,
        Some(task_link(task.task_id)),
        now,
    ))
}

fn within_lead_time(due_at: DateTime<Utc>, now: DateTime<Utc>, config: &NotificationConfig) -> bool {
    TimeDelta::from_std(config.task_due_soon)
        .ok()
        .and_then(|lead_time| now.checked_add_signed(lead_time))
        .is_none_or(|horizon| due_at <= horizon)
}

fn follow_up_notification(
    follow_up: &FollowUpSnapshot,
    now: DateTime<Utc>,
) -> Option<Notification> {
    if !follow_up.status.is_pending() || follow_up.scheduled_for > now {
        return None;
    }
    let who = follow_up.lead_name.as_deref().unwrap_or("a lead");
    Some(Notification::new(
        &follow_up.owner_id,
        NotificationKind::FollowUpPending,
        "Follow-up pending",
        format!(
            "Follow-up with {who} scheduled for {}",
            follow_up.scheduled_for.format("%Y-%m-%d %H:%M UTC")
        ),
        Some(follow_up_link(follow_up.follow_up_id)),
        now,
    ))
}

/// Highest threshold `m` with `previous < m <= current`.
pub fn crossed_milestone(milestones: &[u64], previous: u64, current: u64) -> Option<u64> {
    milestones
        .iter()
        .copied()
        .filter(|milestone| previous < *milestone && *milestone <= current)
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FollowUpStatus, LeadStatus, TaskStatus};
    use chrono::Duration;

    fn task(due_at: Option<DateTime<Utc>>, status: TaskStatus) -> DomainEvent {
        DomainEvent::TaskDeadline {
            task: TaskSnapshot {
                task_id: Uuid::new_v4(),
                owner_id: "b1".to_string(),
                title: "Call Ana".to_string(),
                due_at,
                status,
            },
        }
    }

    fn kind_of(event: &DomainEvent, now: DateTime<Utc>) -> Option<NotificationKind> {
        notification_for(event, &NotificationConfig::default(), now).map(|n| n.kind)
    }

    #[test]
    fn public_inquiry_creates_new_lead_manual_does_not() {
        let lead_id = Uuid::new_v4();
        let event = DomainEvent::LeadCreated {
            lead_id,
            owner_id: "b1".to_string(),
            lead_name: "Ana".to_string(),
            origin: LeadOrigin::PublicInquiry,
        };
        let n = notification_for(&event, &NotificationConfig::default(), Utc::now())
            .expect("notification");
        assert_eq!(n.kind, NotificationKind::NewLead);
        assert_eq!(n.recipient_id, "b1");
        assert_eq!(n.link, Some(format!("/crm/leads/{lead_id}")));
        assert!(!n.is_read());

        let manual = DomainEvent::LeadCreated {
            lead_id,
            owner_id: "b1".to_string(),
            lead_name: "Ana".to_string(),
            origin: LeadOrigin::Manual,
        };
        assert_eq!(kind_of(&manual, Utc::now()), None);
    }

    #[test]
    fn status_change_uses_board_labels() {
        let event = DomainEvent::LeadStatusChanged {
            lead_id: Uuid::new_v4(),
            owner_id: "b1".to_string(),
            lead_name: "Ana".to_string(),
            from: LeadStatus::New,
            to: LeadStatus::Qualified,
        };
        let n = notification_for(&event, &NotificationConfig::default(), Utc::now())
            .expect("notification");
        assert_eq!(n.kind, NotificationKind::StatusChanged);
        assert!(n.message.contains("Novo"));
        assert!(n.message.contains("Qualificado"));
    }

    #[test]
    fn task_windows() {
        let now = Utc::now();
        assert_eq!(
            kind_of(&task(Some(now - Duration::minutes(1)), TaskStatus::Pending), now),
            Some(NotificationKind::TaskOverdue)
        );
        assert_eq!(
            kind_of(&task(Some(now), TaskStatus::InProgress), now),
            Some(NotificationKind::TaskOverdue)
        );
        assert_eq!(
            kind_of(&task(Some(now + Duration::hours(2)), TaskStatus::Pending), now),
            Some(NotificationKind::TaskDueSoon)
        );
        assert_eq!(
            kind_of(&task(Some(now + Duration::hours(24)), TaskStatus::Pending), now),
            Some(NotificationKind::TaskDueSoon)
        );
        assert_eq!(
            kind_of(&task(Some(now + Duration::hours(25)), TaskStatus::Pending), now),
            None
        );
        assert_eq!(kind_of(&task(None, TaskStatus::Pending), now), None);
        assert_eq!(
            kind_of(&task(Some(now - Duration::hours(1)), TaskStatus::Done), now),
            None
        );
        assert_eq!(
            kind_of(&task(Some(now - Duration::hours(1)), TaskStatus::Cancelled), now),
            None
        );
    }

    #[test]
    fn follow_up_fires_only_when_due_and_pending() {
        let now = Utc::now();
        let event = |scheduled_for, status| DomainEvent::FollowUpDue {
            follow_up: FollowUpSnapshot {
                follow_up_id: Uuid::new_v4(),
                owner_id: "b1".to_string(),
                lead_id: None,
                lead_name: Some("Ana".to_string()),
                scheduled_for,
                status,
            },
        };
        assert_eq!(
            kind_of(&event(now - Duration::minutes(5), FollowUpStatus::Confirmed), now),
            Some(NotificationKind::FollowUpPending)
        );
        assert_eq!(
            kind_of(&event(now + Duration::minutes(5), FollowUpStatus::Scheduled), now),
            None
        );
        assert_eq!(
            kind_of(&event(now - Duration::minutes(5), FollowUpStatus::Done), now),
            None
        );
    }

    #[test]
    fn milestone_reports_highest_crossed_threshold() {
        let milestones = NotificationConfig::default().view_milestones;
        assert_eq!(crossed_milestone(&milestones, 9, 10), Some(10));
        assert_eq!(crossed_milestone(&milestones, 10, 11), None);
        assert_eq!(crossed_milestone(&milestones, 0, 120), Some(100));
        assert_eq!(crossed_milestone(&milestones, 999, 1000), Some(1000));
        assert_eq!(crossed_milestone(&milestones, 1000, 5000), None);
        assert_eq!(crossed_milestone(&[], 0, 10), None);
    }

    #[test]
    fn property_view_links_to_property() {
        let property_id = Uuid::new_v4();
        let event = DomainEvent::PropertyViewed {
            property_id,
            owner_id: "b1".to_string(),
            title: "Casa".to_string(),
            previous: 49,
            current: 50,
        };
        let n = notification_for(&event, &NotificationConfig::default(), Utc::now())
            .expect("notification");
        assert_eq!(n.kind, NotificationKind::PropertyViewsMilestone);
        assert_eq!(n.link, Some(format!("/properties/{property_id}")));
    }

    #[test]
    fn announcement_is_generic_for_given_broker() {
        let event = DomainEvent::Announcement {
            recipient_id: "b7".to_string(),
            title: "Heads up".to_string(),
            message: "New portal release".to_string(),
            link: None,
        };
        let n = notification_for(&event, &NotificationConfig::default(), Utc::now())
            .expect("notification");
        assert_eq!(n.kind, NotificationKind::Generic);
        assert_eq!(n.recipient_id, "b7");
        assert_eq!(n.link, None);
    }
}
