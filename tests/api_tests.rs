use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use cinelist_api::api::{create_router, AppState};
use cinelist_api::db::{InMemoryDocumentStore, InMemoryKeyValueStore, LocalKeyValueStore, LOCAL_LISTS_KEY};
use cinelist_api::services::ToastQueue;

struct TestApp {
    server: TestServer,
    remote: Arc<InMemoryDocumentStore>,
    local: Arc<InMemoryKeyValueStore>,
}

fn create_test_app() -> TestApp {
    let remote = Arc::new(InMemoryDocumentStore::new());
    let local = Arc::new(InMemoryKeyValueStore::new());
    let toasts = Arc::new(ToastQueue::new(5, Duration::from_secs(60)));
    let state = AppState::new(remote.clone(), local.clone(), toasts);
    let server = TestServer::new(create_router(state)).unwrap();
    TestApp {
        server,
        remote,
        local,
    }
}

fn notification_titles(notifications: &Value) -> Vec<String> {
    notifications
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let response = app.server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_session_starts_uninitialized() {
    let app = create_test_app();

    let response = app.server.get("/session").await;
    response.assert_status_ok();
    let session: Value = response.json();
    assert_eq!(session["identity"], Value::Null);
    assert_eq!(session["status"], "uninitialized");
    assert_eq!(response.header("x-sync-mode"), "none");
}

#[tokio::test]
async fn test_guest_favorites_flow() {
    let app = create_test_app();

    let response = app
        .server
        .put("/session")
        .json(&json!({ "user_id": null }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.header("x-sync-mode"), "device");

    let response = app.server.post("/lists/favorites/42").await;
    response.assert_status_ok();
    let lists: Value = response.json();
    assert_eq!(lists["favorites"], json!(["42"]));
    assert_eq!(lists["loading"], false);

    let response = app.server.get("/lists/favorites/42").await;
    response.assert_status_ok();
    let membership: Value = response.json();
    assert_eq!(membership["present"], true);

    let notifications: Value = app.server.get("/notifications").await.json();
    assert_eq!(notification_titles(&notifications), vec!["Added to favorites"]);

    let blob: Value =
        serde_json::from_str(&app.local.read(LOCAL_LISTS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(blob["favorites"], json!(["42"]));
}

#[tokio::test]
async fn test_watched_rating_flow() {
    let app = create_test_app();
    app.server
        .put("/session")
        .json(&json!({ "user_id": null }))
        .await
        .assert_status_ok();

    let lists: Value = app
        .server
        .post("/lists/watched/7")
        .json(&json!({ "rating": 8 }))
        .await
        .json();
    assert_eq!(lists["watched"][0]["id"], "7");
    assert_eq!(lists["watched"][0]["rating"], 8);
    let date_watched = lists["watched"][0]["dateWatched"].clone();

    let response = app
        .server
        .put("/lists/watched/7/rating")
        .json(&json!({ "rating": 9 }))
        .await;
    response.assert_status_ok();
    let lists: Value = response.json();
    assert_eq!(lists["watched"].as_array().unwrap().len(), 1);
    assert_eq!(lists["watched"][0]["rating"], 9);
    assert_eq!(lists["watched"][0]["dateWatched"], date_watched);
}

#[tokio::test]
async fn test_watched_without_body_is_unrated() {
    let app = create_test_app();
    app.server
        .put("/session")
        .json(&json!({ "user_id": null }))
        .await
        .assert_status_ok();

    let lists: Value = app.server.post("/lists/watched/3").await.json();
    assert_eq!(lists["watched"][0]["rating"], 0);
}

#[tokio::test]
async fn test_malformed_watched_body_is_rejected() {
    let app = create_test_app();
    app.server
        .put("/session")
        .json(&json!({ "user_id": null }))
        .await
        .assert_status_ok();

    let response = app.server.post("/lists/watched/7").text("{broken").await;
    assert!(response.status_code().is_client_error());

    let response = app
        .server
        .post("/lists/watched/7")
        .json(&json!({ "rating": "x" }))
        .await;
    assert!(response.status_code().is_client_error());

    let lists: Value = app.server.get("/lists").await.json();
    assert_eq!(lists["watched"], json!([]));
}

#[tokio::test]
async fn test_remove_from_watchlist() {
    let app = create_test_app();
    app.server
        .put("/session")
        .json(&json!({ "user_id": null }))
        .await
        .assert_status_ok();

    app.server.post("/lists/watchlist/42").await.assert_status_ok();
    app.server.post("/lists/watchlist/42").await.assert_status_ok();
    let lists: Value = app.server.get("/lists").await.json();
    assert_eq!(lists["watchlist"], json!(["42"]));

    let lists: Value = app.server.delete("/lists/watchlist/42").await.json();
    assert_eq!(lists["watchlist"], json!([]));

    let membership: Value = app.server.get("/lists/watchlist/42").await.json();
    assert_eq!(membership["present"], false);
}

#[tokio::test]
async fn test_unknown_list_is_not_found() {
    let app = create_test_app();
    let response = app.server.post("/lists/queue/42").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rating_outside_watched_is_rejected() {
    let app = create_test_app();
    let response = app
        .server
        .put("/lists/favorites/42/rating")
        .json(&json!({ "rating": 5 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_authenticated_changes_reach_remote() {
    let app = create_test_app();

    let response = app
        .server
        .put("/session")
        .json(&json!({ "user_id": "u1" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.header("x-sync-mode"), "remote");

    app.server.post("/lists/watchlist/603").await.assert_status_ok();

    let document = app.remote.document("lists:u1").await.unwrap();
    assert_eq!(document["watchlist"], json!(["603"]));
    assert_eq!(document["favorites"], json!([]));
    assert_eq!(app.local.write_count(), 0);
}

#[tokio::test]
async fn test_authenticated_offline_falls_back_to_device() {
    let app = create_test_app();
    app.local.insert(
        LOCAL_LISTS_KEY,
        r#"{"owner":"user:u1","watchlist":["11"],"watched":[],"favorites":[]}"#,
    );
    app.remote.set_available(false);

    let response = app
        .server
        .put("/session")
        .json(&json!({ "user_id": "u1" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.header("x-sync-mode"), "offline");
    let lists: Value = response.json();
    assert_eq!(lists["watchlist"], json!(["11"]));

    let session: Value = app.server.get("/session").await.json();
    assert_eq!(session["degraded"], true);
    assert_eq!(session["identity"], json!({ "kind": "authenticated", "id": "u1" }));

    app.server.post("/lists/favorites/12").await.assert_status_ok();

    let notifications: Value = app.server.get("/notifications").await.json();
    assert_eq!(
        notification_titles(&notifications),
        vec!["Saved locally", "Offline mode"]
    );

    let blob: Value =
        serde_json::from_str(&app.local.read(LOCAL_LISTS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(blob["watchlist"], json!(["11"]));
    assert_eq!(blob["favorites"], json!(["12"]));
}

#[tokio::test]
async fn test_offline_sign_in_does_not_show_guest_lists() {
    let app = create_test_app();
    app.server
        .put("/session")
        .json(&json!({ "user_id": null }))
        .await
        .assert_status_ok();
    app.server.post("/lists/favorites/guest-fav").await.assert_status_ok();
    app.remote.set_available(false);

    let response = app
        .server
        .put("/session")
        .json(&json!({ "user_id": "u1" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.header("x-sync-mode"), "offline");
    let lists: Value = response.json();
    assert_eq!(lists["favorites"], json!([]));
}

#[tokio::test]
async fn test_change_before_session_is_ignored() {
    let app = create_test_app();

    let lists: Value = app.server.post("/lists/favorites/1").await.json();
    assert_eq!(lists["favorites"], json!([]));

    let notifications: Value = app.server.get("/notifications").await.json();
    assert_eq!(
        notification_titles(&notifications),
        vec!["Lists are still loading"]
    );
}

#[tokio::test]
async fn test_dismiss_notification() {
    let app = create_test_app();
    app.server
        .put("/session")
        .json(&json!({ "user_id": null }))
        .await
        .assert_status_ok();
    app.server.post("/lists/favorites/1").await.assert_status_ok();

    let notifications: Value = app.server.get("/notifications").await.json();
    let id = notifications[0]["id"].as_str().unwrap().to_string();

    let response = app.server.delete(&format!("/notifications/{}", id)).await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = app.server.delete(&format!("/notifications/{}", id)).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app();
    let request_id = "3f0c2a4e-9b7d-4c1e-8a55-2d6f1e0b9c11";

    let response = app
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static(request_id),
        )
        .await;

    assert_eq!(response.header("x-request-id"), request_id);
}
