//! Back-office HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum routers, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! Route composition and state construction live here so `main` and the
//! integration tests share the same wiring.
use crate::api;
use crate::config::{BackofficeConfig, StorageBackend};
use crate::model::NotificationEvent;
use crate::notify::{NotificationCenter, NotificationDispatcher};
use crate::observability;
use crate::pipeline::LeadPipeline;
use crate::store::{BrokerageStore, memory::InMemoryStore, postgres::PostgresStore};
use anyhow::Context;
use axum::Router;
use realty_feed::{Feed, FeedConfig, QueuePolicy};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const SERVICE_NAME: &str = "realty-backoffice";
pub const API_VERSION: &str = "v1";

#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub api_version: String,
    pub store: Arc<dyn BrokerageStore>,
    pub pipeline: LeadPipeline,
    pub center: NotificationCenter,
    pub dispatcher: NotificationDispatcher,
    pub internal_token: Option<String>,
}

impl AppState {
    /// Assemble state around an existing store and start the dispatch worker.
    ///
    /// # Errors
    /// Fails when the feed queue capacity is zero.
    pub fn with_store(
        store: Arc<dyn BrokerageStore>,
        config: &BackofficeConfig,
    ) -> anyhow::Result<(Self, JoinHandle<()>)> {
        let feed: Feed<NotificationEvent> = Feed::with_config(FeedConfig {
            queue_capacity: config.feed_queue_capacity,
            policy: QueuePolicy::DropNew,
        })
        .context("notification feed configuration")?;
        let center = NotificationCenter::new(store.clone(), feed, config.notifications.clone());
        let (dispatcher, worker) = NotificationDispatcher::spawn(
            center.clone(),
            config.notifications.dispatch_queue_capacity,
        );
        let pipeline = LeadPipeline::new(
            store.clone(),
            dispatcher.clone(),
            &config.notifications.view_milestones,
        );
        Ok((
            Self {
                service_name: SERVICE_NAME.to_string(),
                api_version: API_VERSION.to_string(),
                store,
                pipeline,
                center,
                dispatcher,
                internal_token: config.internal.token.clone(),
            },
            worker,
        ))
    }
}

/// Open the configured store and build the application state.
///
/// # Errors
/// - Postgres is selected without a connection config.
/// - The database is unreachable or migrations fail.
pub async fn build_state(config: &BackofficeConfig) -> anyhow::Result<(AppState, JoinHandle<()>)> {
    let store: Arc<dyn BrokerageStore> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(PostgresStore::connect(pg).await?)
        }
    };
    tracing::info!(backend = store.backend_name(), "store ready");
    AppState::with_store(store, config)
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route(
            "/v1/system/info",
            axum::routing::get(api::system::system_info),
        )
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route(
            "/v1/openapi.json",
            axum::routing::get(api::openapi::openapi_json),
        )
        .route(
            "/v1/public/inquiries",
            axum::routing::post(api::public::create_inquiry),
        )
        .route(
            "/v1/public/properties/:property_id/views",
            axum::routing::post(api::public::record_property_view),
        )
        .route(
            "/v1/leads",
            axum::routing::get(api::leads::list_leads).post(api::leads::create_lead),
        )
        .route("/v1/leads/board", axum::routing::get(api::leads::lead_board))
        .route(
            "/v1/leads/funnel",
            axum::routing::get(api::leads::lead_funnel),
        )
        .route(
            "/v1/leads/:lead_id",
            axum::routing::get(api::leads::get_lead)
                .put(api::leads::update_lead)
                .delete(api::leads::delete_lead),
        )
        .route(
            "/v1/leads/:lead_id/status",
            axum::routing::put(api::leads::set_lead_status),
        )
        .route(
            "/v1/notifications",
            axum::routing::get(api::notifications::list_notifications),
        )
        .route(
            "/v1/notifications/summary",
            axum::routing::get(api::notifications::notification_summary),
        )
        .route(
            "/v1/notifications/events",
            axum::routing::get(api::notifications::notification_events),
        )
        .route(
            "/v1/notifications/read-all",
            axum::routing::post(api::notifications::mark_all_notifications_read),
        )
        .route(
            "/v1/notifications/read",
            axum::routing::delete(api::notifications::delete_read_notifications),
        )
        .route(
            "/v1/notifications/:notification_id",
            axum::routing::delete(api::notifications::delete_notification),
        )
        .route(
            "/v1/notifications/:notification_id/read",
            axum::routing::post(api::notifications::mark_notification_read),
        )
        .route(
            "/v1/notifications/:notification_id/open",
            axum::routing::post(api::notifications::open_notification),
        )
        .layer(trace_layer)
        .with_state(state)
}

pub fn build_internal_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/internal/events",
            axum::routing::post(api::internal::ingest_event),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
