mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use backoffice::app::{AppState, build_internal_router};
use backoffice::auth::INTERNAL_TOKEN_HEADER;
use backoffice::model::{NotificationKind, ReadFilter};
use backoffice::notify::ListOptions;
use chrono::{Duration, Utc};
use common::{INTERNAL_TOKEN, memory_state, read_json};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

fn event_request(token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/internal/events")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(INTERNAL_TOKEN_HEADER, token);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

async fn kinds(state: &AppState, recipient: &str) -> Vec<NotificationKind> {
    state
        .center
        .list(recipient, ListOptions::inbox(ReadFilter::All))
        .await
        .expect("list")
        .into_iter()
        .map(|notification| notification.kind)
        .collect()
}

fn announcement() -> serde_json::Value {
    json!({
        "type": "announcement",
        "recipient_id": "broker-1",
        "title": "Plantão",
        "message": "Plantão de vendas no sábado",
    })
}

#[tokio::test]
async fn events_require_the_shared_token() {
    let (state, _store) = memory_state();
    let app = build_internal_router(state.clone());

    let response = app
        .clone()
        .oneshot(event_request(None, announcement()))
        .await
        .expect("no token");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(event_request(Some("guess"), announcement()))
        .await
        .expect("wrong token");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    state.dispatcher.flush().await;
    assert!(kinds(&state, "broker-1").await.is_empty());
}

#[tokio::test]
async fn accepted_events_become_notifications() {
    let (state, _store) = memory_state();
    let app = build_internal_router(state.clone());

    let response = app
        .clone()
        .oneshot(event_request(Some(INTERNAL_TOKEN), announcement()))
        .await
        .expect("announcement");
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = read_json(response).await;
    assert_eq!(body["event"], "announcement");
    assert_eq!(body["queued"], true);

    let now = Utc::now();
    let overdue = json!({
        "type": "task_deadline",
        "task": {
            "task_id": Uuid::new_v4(),
            "owner_id": "broker-1",
            "title": "Enviar contrato",
            "due_at": now - Duration::hours(2),
            "status": "pending",
        }
    });
    let due_soon = json!({
        "type": "task_deadline",
        "task": {
            "task_id": Uuid::new_v4(),
            "owner_id": "broker-1",
            "title": "Visita",
            "due_at": now + Duration::hours(3),
            "status": "in_progress",
        }
    });
    let finished = json!({
        "type": "task_deadline",
        "task": {
            "task_id": Uuid::new_v4(),
            "owner_id": "broker-1",
            "title": "Fotos",
            "due_at": now - Duration::hours(1),
            "status": "done",
        }
    });
    for event in [overdue, due_soon, finished] {
        let response = app
            .clone()
            .oneshot(event_request(Some(INTERNAL_TOKEN), event))
            .await
            .expect("task event");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    state.dispatcher.flush().await;
    let mut found = kinds(&state, "broker-1").await;
    found.sort_by_key(|kind| kind.as_str());
    assert_eq!(
        found,
        vec![
            NotificationKind::Generic,
            NotificationKind::TaskDueSoon,
            NotificationKind::TaskOverdue,
        ]
    );
}

#[tokio::test]
async fn malformed_events_are_rejected() {
    let (state, _store) = memory_state();
    let response = build_internal_router(state)
        .oneshot(event_request(
            Some(INTERNAL_TOKEN),
            json!({ "type": "lead_archived", "lead_id": Uuid::new_v4() }),
        ))
        .await
        .expect("unknown event");
    assert!(response.status().is_client_error());
}
