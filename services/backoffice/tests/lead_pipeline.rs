mod common;

use axum::http::StatusCode;
use backoffice::app::build_router;
use common::{memory_state, read_json};
use http_helpers::{broker_request, get};
use serde_json::json;
use tower::ServiceExt;

async fn create(app: &axum::Router, user: &str, body: serde_json::Value) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(broker_request("POST", "/v1/leads", user, Some(body)))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

async fn list(app: &axum::Router, user: &str, query: &str) -> Vec<serde_json::Value> {
    let response = app
        .clone()
        .oneshot(get(&format!("/v1/leads{query}"), user))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await["items"]
        .as_array()
        .cloned()
        .unwrap_or_default()
}

#[tokio::test]
async fn first_lead_starts_in_new() {
    let (state, _store) = memory_state();
    let app = build_router(state);
    assert!(list(&app, "broker-1", "").await.is_empty());

    let before = chrono::Utc::now();
    let lead = create(
        &app,
        "broker-1",
        json!({ "name": "Ana", "phone": "11999999999" }),
    )
    .await;
    assert_eq!(lead["status"], "New");
    let created_at: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(lead["created_at"].clone()).expect("created_at");
    assert!(created_at >= before);

    let leads = list(&app, "broker-1", "").await;
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0]["name"], "Ana");
    assert_eq!(leads[0]["status"], "New");
}

#[tokio::test]
async fn status_change_is_listed_and_notified() {
    let (state, _store) = memory_state();
    let dispatcher = state.dispatcher.clone();
    let app = build_router(state);
    let lead = create(&app, "broker-1", json!({ "name": "Bruno" })).await;
    let id = lead["id"].as_str().expect("id").to_string();

    for (status, expected) in [
        ("Qualified", "Qualified"),
        ("Perdido", "Lost"),
        ("in progress", "InProgress"),
    ] {
        let response = app
            .clone()
            .oneshot(broker_request(
                "PUT",
                &format!("/v1/leads/{id}/status"),
                "broker-1",
                Some(json!({ "status": status })),
            ))
            .await
            .expect("set status");
        assert_eq!(response.status(), StatusCode::OK);
        let leads = list(&app, "broker-1", "").await;
        assert_eq!(leads[0]["status"], expected);
    }

    dispatcher.flush().await;
    let response = app
        .clone()
        .oneshot(get("/v1/notifications", "broker-1"))
        .await
        .expect("notifications");
    let body = read_json(response).await;
    let items = body["items"].as_array().expect("items");
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|item| item["kind"] == "status_changed"));
    assert!(items.iter().all(|item| item["read"] == false));
    assert_eq!(body["unread_count"], 3);
    assert_eq!(items[0]["link"], format!("/crm/leads/{id}"));
}

#[tokio::test]
async fn search_filter_and_sort_apply_per_broker() {
    let (state, _store) = memory_state();
    let app = build_router(state);
    create(
        &app,
        "broker-1",
        json!({ "name": "Carla Souza", "email": "carla@example.com" }),
    )
    .await;
    create(
        &app,
        "broker-1",
        json!({ "name": "Daniel", "source": "Instagram" }),
    )
    .await;
    create(&app, "broker-2", json!({ "name": "Carla Lima" })).await;

    let found = list(&app, "broker-1", "?q=CARLA").await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Carla Souza");

    let found = list(&app, "broker-1", "?q=insta").await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Daniel");

    let sorted = list(&app, "broker-1", "?sort=name").await;
    let names: Vec<_> = sorted.iter().map(|lead| lead["name"].clone()).collect();
    assert_eq!(names, vec![json!("Carla Souza"), json!("Daniel")]);

    assert!(list(&app, "broker-1", "?status=Qualified").await.is_empty());
    assert_eq!(list(&app, "broker-2", "").await.len(), 1);
}

#[tokio::test]
async fn board_and_funnel_bucket_by_stage() {
    let (state, _store) = memory_state();
    let app = build_router(state);
    let mut ids = Vec::new();
    for name in ["Ana", "Bruno", "Carla", "Davi"] {
        let lead = create(&app, "broker-1", json!({ "name": name })).await;
        ids.push(lead["id"].as_str().expect("id").to_string());
    }
    for (id, status) in ids.iter().zip(["Qualified", "Converted", "Lost"]) {
        let response = app
            .clone()
            .oneshot(broker_request(
                "PUT",
                &format!("/v1/leads/{id}/status"),
                "broker-1",
                Some(json!({ "status": status })),
            ))
            .await
            .expect("status");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let board = read_json(
        app.clone()
            .oneshot(get("/v1/leads/board", "broker-1"))
            .await
            .expect("board"),
    )
    .await;
    let columns = board["columns"].as_array().expect("columns");
    let statuses: Vec<_> = columns.iter().map(|c| c["status"].clone()).collect();
    assert_eq!(
        statuses,
        vec![
            json!("New"),
            json!("InProgress"),
            json!("Qualified"),
            json!("Converted"),
            json!("Lost")
        ]
    );
    let counts: Vec<_> = columns.iter().map(|c| c["count"].clone()).collect();
    assert_eq!(counts, vec![json!(1), json!(0), json!(1), json!(1), json!(1)]);

    let funnel = read_json(
        app.clone()
            .oneshot(get("/v1/leads/funnel", "broker-1"))
            .await
            .expect("funnel"),
    )
    .await;
    assert_eq!(funnel["total"], 4);
    assert_eq!(funnel["won"], 1);
    assert_eq!(funnel["lost"], 1);
    assert_eq!(funnel["active"], 2);
    assert_eq!(funnel["stages"]["qualified"], 1);
    assert_eq!(funnel["conversion_rate"], 0.25);
}

#[tokio::test]
async fn full_edit_keeps_contact_date_and_delete_is_idempotent() {
    let (state, _store) = memory_state();
    let app = build_router(state);
    let lead = create(
        &app,
        "broker-1",
        json!({ "name": "Eva", "contacted_at": "2026-01-10T12:00:00Z" }),
    )
    .await;
    let id = lead["id"].as_str().expect("id").to_string();

    let response = app
        .clone()
        .oneshot(broker_request(
            "PUT",
            &format!("/v1/leads/{id}"),
            "broker-1",
            Some(json!({ "name": "Eva Prado", "status": "Em Atendimento", "notes": "ligar" })),
        ))
        .await
        .expect("update");
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await;
    assert_eq!(updated["name"], "Eva Prado");
    assert_eq!(updated["status"], "InProgress");
    assert_eq!(updated["contacted_at"], lead["contacted_at"]);

    let response = app
        .clone()
        .oneshot(get(&format!("/v1/leads/{id}"), "broker-2"))
        .await
        .expect("foreign get");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(broker_request(
                "DELETE",
                &format!("/v1/leads/{id}"),
                "broker-1",
                None,
            ))
            .await
            .expect("delete");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
    assert!(list(&app, "broker-1", "").await.is_empty());
}
