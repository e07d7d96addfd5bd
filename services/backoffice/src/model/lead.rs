//! Lead records, pipeline stages, and listing queries.
//!
//! # Purpose
//! Defines the lead entity owned by one broker, the fixed ordered set of
//! pipeline stages, and the owner-scoped query used by every store backend.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Pipeline stage of a lead, in stage order.
///
/// Any stage may move to any other stage. `Converted` and `Lost` are end
/// states for reporting only.
#[derive(
    Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum LeadStatus {
    New,
    InProgress,
    Qualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::New,
        LeadStatus::InProgress,
        LeadStatus::Qualified,
        LeadStatus::Converted,
        LeadStatus::Lost,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, LeadStatus::Converted | LeadStatus::Lost)
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::InProgress => "InProgress",
            LeadStatus::Qualified => "Qualified",
            LeadStatus::Converted => "Converted",
            LeadStatus::Lost => "Lost",
        }
    }

    /// Column label shown on the back-office board.
    pub fn label(self) -> &'static str {
        match self {
            LeadStatus::New => "Novo",
            LeadStatus::InProgress => "Em Atendimento",
            LeadStatus::Qualified => "Qualificado",
            LeadStatus::Converted => "Convertido",
            LeadStatus::Lost => "Perdido",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown lead status: {0}")]
pub struct UnknownLeadStatus(pub String);

impl FromStr for LeadStatus {
    type Err = UnknownLeadStatus;

    /// Accepts canonical names in any case (`InProgress`, `in_progress`) and
    /// the board labels (`Em Atendimento`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "new" | "novo" => Ok(LeadStatus::New),
            "inprogress" | "ematendimento" => Ok(LeadStatus::InProgress),
            "qualified" | "qualificado" => Ok(LeadStatus::Qualified),
            "converted" | "convertido" => Ok(LeadStatus::Converted),
            "lost" | "perdido" => Ok(LeadStatus::Lost),
            _ => Err(UnknownLeadStatus(value.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Lead {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub status: LeadStatus,
    /// Weak reference; the property may no longer exist.
    pub property_id: Option<Uuid>,
    pub contacted_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Case-insensitive substring match over name, email, phone, and source.
    /// `needle` must already be lowercase.
    pub fn matches_search(&self, needle: &str) -> bool {
        let contains = |value: &str| value.to_lowercase().contains(needle);
        contains(&self.name)
            || self.email.as_deref().is_some_and(contains)
            || self.phone.as_deref().is_some_and(contains)
            || self.source.as_deref().is_some_and(contains)
    }
}

/// Fields accepted when a lead is created. The stage is always `New`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub property_id: Option<Uuid>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Full-record edit. Every field replaces the stored value except
/// `contacted_at`, where `None` keeps the current timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadUpdate {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub status: LeadStatus,
    pub property_id: Option<Uuid>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadSort {
    /// `created_at` descending.
    #[default]
    Newest,
    Oldest,
    Name,
    /// `contacted_at` descending.
    Contacted,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown lead sort: {0}")]
pub struct UnknownLeadSort(pub String);

impl FromStr for LeadSort {
    type Err = UnknownLeadSort;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "newest" => Ok(LeadSort::Newest),
            "oldest" => Ok(LeadSort::Oldest),
            "name" => Ok(LeadSort::Name),
            "contacted" => Ok(LeadSort::Contacted),
            _ => Err(UnknownLeadSort(value.to_string())),
        }
    }
}

/// Owner-scoped lead selection pushed down to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadQuery {
    pub owner_id: String,
    /// Lowercased, trimmed search needle; `None` matches everything.
    pub search: Option<String>,
    pub status: Option<LeadStatus>,
    pub sort: LeadSort,
    pub limit: Option<usize>,
}

impl LeadQuery {
    pub fn for_owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            search: None,
            status: None,
            sort: LeadSort::default(),
            limit: None,
        }
    }

    pub fn with_search(mut self, search: Option<&str>) -> Self {
        self.search = search
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase);
        self
    }

    pub fn matches(&self, lead: &Lead) -> bool {
        lead.owner_id == self.owner_id
            && self.status.is_none_or(|status| lead.status == status)
            && self
                .search
                .as_deref()
                .is_none_or(|needle| lead.matches_search(needle))
    }

    /// Order `leads` in place. Ties fall back to newest first.
    pub fn sort(&self, leads: &mut [Lead]) {
        match self.sort {
            LeadSort::Newest => leads.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            LeadSort::Oldest => leads.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            LeadSort::Name => leads.sort_by(|a, b| {
                a.name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
            LeadSort::Contacted => leads.sort_by(|a, b| {
                b.contacted_at
                    .cmp(&a.contacted_at)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
        }
    }
}
