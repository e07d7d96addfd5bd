#![allow(dead_code)]

use backoffice::app::AppState;
use backoffice::config::{BackofficeConfig, InternalConfig, NotificationConfig, StorageBackend};
use backoffice::model::{Property, PropertyFeatures};
use backoffice::store::BrokerageStore;
use backoffice::store::memory::InMemoryStore;
use std::sync::Arc;
use uuid::Uuid;

pub const INTERNAL_TOKEN: &str = "internal-test-token";

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub fn test_config() -> BackofficeConfig {
    BackofficeConfig {
        bind_addr: "127.0.0.1:0".parse().expect("bind"),
        metrics_bind: "127.0.0.1:0".parse().expect("metrics"),
        storage: StorageBackend::Memory,
        postgres: None,
        notifications: NotificationConfig::default(),
        feed_queue_capacity: 16,
        internal: InternalConfig {
            enabled: true,
            bind_addr: "127.0.0.1:0".parse().expect("internal"),
            token: Some(INTERNAL_TOKEN.to_string()),
        },
    }
}

/// State over a fresh in-memory store. Must be called inside a runtime.
pub fn memory_state() -> (AppState, Arc<InMemoryStore>) {
    state_with_store(Arc::new(InMemoryStore::new()))
}

pub fn state_with_store<S>(store: Arc<S>) -> (AppState, Arc<S>)
where
    S: BrokerageStore + 'static,
{
    let (state, _worker) =
        AppState::with_store(store.clone(), &test_config()).expect("app state");
    (state, store)
}

pub async fn seed_property(store: &dyn BrokerageStore, owner_id: &str, views: u64) -> Property {
    store
        .upsert_property(Property {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            title: "Apartamento Vila Mariana".to_string(),
            views,
            features: PropertyFeatures::default(),
        })
        .await
        .expect("seed property")
}
