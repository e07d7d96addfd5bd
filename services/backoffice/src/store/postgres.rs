//! Postgres-backed implementation of the brokerage store.
//!
//! # What this module is
//! Implements [`BrokerageStore`] on top of `sqlx::PgPool`. Leads and
//! notifications are authoritative tables scoped by `owner_id` and
//! `recipient_id`; properties carry the view counter and a JSONB feature set.
//!
//! # Key invariants
//! - Every lead or notification statement filters by its owner column, so a
//!   row that belongs to someone else is indistinguishable from a missing one.
//! - `read_at IS NULL` is the only unread marker; bulk updates never touch
//!   rows that are already read.
//! - View increments are a single `UPDATE ... RETURNING`, so concurrent views
//!   never lose a count.
//!
//! # Security model
//! - Database URLs may contain credentials; avoid logging them.
//! - Dynamic SQL is limited to the fixed `ORDER BY` clauses in [`lead_order`].
//!
//! # Operational notes
//! Migrations run at startup via `sqlx::migrate!("./migrations")` so handlers
//! can assume the schema exists. Pool timeouts are explicit; a database that
//! stops answering surfaces as [`StoreError::Unavailable`] instead of hanging.
use super::{BrokerageStore, StoreError, StoreResult};
use crate::config::PostgresConfig;
use crate::model::{
    Lead, LeadQuery, LeadSort, LeadStatus, Notification, NotificationKind, NotificationQuery,
    Property, PropertyFeatures, ReadFilter,
};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Durable brokerage store backed by Postgres.
///
/// # Example
/// ```rust,no_run
/// use backoffice::config::PostgresConfig;
/// use backoffice::store::postgres::PostgresStore;
///
/// async fn open(pg: PostgresConfig) {
///     let _ = PostgresStore::connect(&pg).await;
/// }
/// ```
pub struct PostgresStore {
    pool: PgPool,
}

/// Row shape for the `leads` table. Status is stored as its canonical name.
#[derive(Debug, Clone, FromRow)]
struct DbLead {
    id: Uuid,
    owner_id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    source: Option<String>,
    status: String,
    property_id: Option<Uuid>,
    contacted_at: DateTime<Utc>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbNotification {
    id: Uuid,
    recipient_id: String,
    kind: String,
    title: String,
    message: String,
    link: Option<String>,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbProperty {
    id: Uuid,
    owner_id: String,
    title: String,
    views: i64,
    features: Value,
}

const LEAD_COLUMNS: &str = "id, owner_id, name, email, phone, source, status, property_id, contacted_at, notes, created_at, updated_at";
const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, kind, title, message, link, read_at, created_at";

impl PostgresStore {
    /// Connect, size the pool from `pg`, and apply embedded migrations.
    ///
    /// # Errors
    /// - Malformed URL, unreachable database, or a failed migration.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        let store = Self::connect_without_migrations(pg).await?;
        sqlx::migrate!("./migrations").run(&store.pool).await?;
        Ok(store)
    }

    /// Connect without touching the schema. Used by tests that migrate
    /// separately.
    pub async fn connect_without_migrations(pg: &PostgresConfig) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BrokerageStore for PostgresStore {
    async fn insert_lead(&self, lead: Lead) -> StoreResult<Lead> {
        let insert = sqlx::query(
            r#"INSERT INTO leads (id, owner_id, name, email, phone, source, status, property_id, contacted_at, notes, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(lead.id)
        .bind(&lead.owner_id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.source)
        .bind(lead.status.as_str())
        .bind(lead.property_id)
        .bind(lead.contacted_at)
        .bind(&lead.notes)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("lead exists".into()));
            }
            return Err(err.into());
        }
        Ok(lead)
    }

    async fn get_lead(&self, owner_id: &str, lead_id: Uuid) -> StoreResult<Lead> {
        let row = sqlx::query_as::<_, DbLead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1 AND owner_id = $2"
        ))
        .bind(lead_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => lead_from_db(row),
            None => Err(StoreError::NotFound("lead".into())),
        }
    }

    async fn update_lead(&self, lead: Lead) -> StoreResult<Lead> {
        let result = sqlx::query(
            r#"UPDATE leads
               SET name = $3, email = $4, phone = $5, source = $6, status = $7,
                   property_id = $8, contacted_at = $9, notes = $10, updated_at = $11
               WHERE id = $1 AND owner_id = $2"#,
        )
        .bind(lead.id)
        .bind(&lead.owner_id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.source)
        .bind(lead.status.as_str())
        .bind(lead.property_id)
        .bind(lead.contacted_at)
        .bind(&lead.notes)
        .bind(lead.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("lead".into()));
        }
        Ok(lead)
    }

    async fn delete_lead(&self, owner_id: &str, lead_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1 AND owner_id = $2")
            .bind(lead_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn select_leads(&self, query: &LeadQuery) -> StoreResult<Vec<Lead>> {
        let sql = format!(
            r#"SELECT {LEAD_COLUMNS} FROM leads
               WHERE owner_id = $1
                 AND ($2::text IS NULL OR status = $2)
                 AND ($3::text IS NULL
                      OR strpos(lower(name), $3) > 0
                      OR strpos(lower(coalesce(email, '')), $3) > 0
                      OR strpos(lower(coalesce(phone, '')), $3) > 0
                      OR strpos(lower(coalesce(source, '')), $3) > 0)
               ORDER BY {}
               LIMIT $4"#,
            lead_order(query.sort)
        );
        let rows = sqlx::query_as::<_, DbLead>(&sql)
            .bind(&query.owner_id)
            .bind(query.status.map(LeadStatus::as_str))
            .bind(query.search.as_deref())
            .bind(query.limit.map(|limit| limit as i64))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(lead_from_db)
            .collect::<Result<Vec<_>, StoreError>>()
    }

    async fn insert_notification(
        &self,
        mut notification: Notification,
    ) -> StoreResult<Notification> {
        notification.created_at = Utc::now();
        let insert = sqlx::query(
            r#"INSERT INTO notifications (id, recipient_id, kind, title, message, link, read_at, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(notification.id)
        .bind(&notification.recipient_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.link)
        .bind(notification.read_at)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("notification exists".into()));
            }
            return Err(err.into());
        }
        Ok(notification)
    }

    async fn get_notification(
        &self,
        recipient_id: &str,
        notification_id: Uuid,
    ) -> StoreResult<Notification> {
        let row = sqlx::query_as::<_, DbNotification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1 AND recipient_id = $2"
        ))
        .bind(notification_id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(notification_from_db(row)),
            None => Err(StoreError::NotFound("notification".into())),
        }
    }

    async fn select_notifications(
        &self,
        query: &NotificationQuery,
    ) -> StoreResult<Vec<Notification>> {
        let sql = format!(
            r#"SELECT {NOTIFICATION_COLUMNS} FROM notifications
               WHERE recipient_id = $1 AND {}
               ORDER BY created_at DESC, id
               LIMIT $2"#,
            read_predicate(query.filter)
        );
        let rows = sqlx::query_as::<_, DbNotification>(&sql)
            .bind(&query.recipient_id)
            .bind(query.limit.map(|limit| limit as i64))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(notification_from_db).collect())
    }

    async fn count_notifications(
        &self,
        recipient_id: &str,
        filter: ReadFilter,
    ) -> StoreResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND {}",
            read_predicate(filter)
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(recipient_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        recipient_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"UPDATE notifications SET read_at = $3
               WHERE id = $1 AND recipient_id = $2 AND read_at IS NULL"#,
        )
        .bind(notification_id)
        .bind(recipient_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(
        &self,
        recipient_id: &str,
        at: DateTime<Utc>,
        created_before: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"UPDATE notifications SET read_at = $2
               WHERE recipient_id = $1 AND read_at IS NULL AND created_at <= $3"#,
        )
        .bind(recipient_id)
        .bind(at)
        .bind(created_before)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(
        &self,
        notification_id: Uuid,
        recipient_id: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND recipient_id = $2")
            .bind(notification_id)
            .bind(recipient_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_read_notifications(&self, recipient_id: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE recipient_id = $1 AND read_at IS NOT NULL",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn upsert_property(&self, property: Property) -> StoreResult<Property> {
        let features = serde_json::to_value(&property.features)
            .map_err(|err| StoreError::Unexpected(err.into()))?;
        sqlx::query(
            r#"INSERT INTO properties (id, owner_id, title, views, features)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (id) DO UPDATE
               SET owner_id = EXCLUDED.owner_id, title = EXCLUDED.title,
                   views = EXCLUDED.views, features = EXCLUDED.features"#,
        )
        .bind(property.id)
        .bind(&property.owner_id)
        .bind(&property.title)
        .bind(property.views as i64)
        .bind(features)
        .execute(&self.pool)
        .await?;
        Ok(property)
    }

    async fn get_property(&self, property_id: Uuid) -> StoreResult<Property> {
        let row = sqlx::query_as::<_, DbProperty>(
            "SELECT id, owner_id, title, views, features FROM properties WHERE id = $1",
        )
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => property_from_db(row),
            None => Err(StoreError::NotFound("property".into())),
        }
    }

    async fn record_property_view(&self, property_id: Uuid) -> StoreResult<(u64, u64)> {
        let current: Option<i64> = sqlx::query_scalar(
            "UPDATE properties SET views = views + 1 WHERE id = $1 RETURNING views",
        )
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await?;
        match current {
            Some(current) => {
                let current = current as u64;
                Ok((current.saturating_sub(1), current))
            }
            None => Err(StoreError::NotFound("property".into())),
        }
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

/// `ORDER BY` clause per sort. Ties fall back to newest first like the
/// in-memory store.
fn lead_order(sort: LeadSort) -> &'static str {
    match sort {
        LeadSort::Newest => "created_at DESC, id",
        LeadSort::Oldest => "created_at ASC, id",
        LeadSort::Name => "lower(name) ASC, created_at DESC, id",
        LeadSort::Contacted => "contacted_at DESC, created_at DESC, id",
    }
}

fn read_predicate(filter: ReadFilter) -> &'static str {
    match filter {
        ReadFilter::All => "TRUE",
        ReadFilter::Unread => "read_at IS NULL",
        ReadFilter::Read => "read_at IS NOT NULL",
    }
}

fn parse_status(value: &str) -> StoreResult<LeadStatus> {
    value
        .parse()
        .map_err(|_| StoreError::Unexpected(anyhow!("invalid lead status in row: {value}")))
}

fn lead_from_db(row: DbLead) -> StoreResult<Lead> {
    Ok(Lead {
        id: row.id,
        owner_id: row.owner_id,
        name: row.name,
        email: row.email,
        phone: row.phone,
        source: row.source,
        status: parse_status(&row.status)?,
        property_id: row.property_id,
        contacted_at: row.contacted_at,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn notification_from_db(row: DbNotification) -> Notification {
    let kind = match row.kind.parse::<NotificationKind>() {
        Ok(kind) => kind,
        Err(never) => match never {},
    };
    Notification {
        id: row.id,
        recipient_id: row.recipient_id,
        kind,
        title: row.title,
        message: row.message,
        link: row.link,
        read_at: row.read_at,
        created_at: row.created_at,
    }
}

fn property_from_db(row: DbProperty) -> StoreResult<Property> {
    let features: PropertyFeatures = serde_json::from_value(row.features)
        .map_err(|err| StoreError::Unexpected(anyhow!("invalid property features: {err}")))?;
    Ok(Property {
        id: row.id,
        owner_id: row.owner_id,
        title: row.title,
        views: row.views.max(0) as u64,
        features,
    })
}
