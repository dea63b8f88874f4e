//! Smoke tests for the full account and package lifecycle.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use modelbay::config::Config;
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app() -> (Arc<modelbay::api::AppState>, Router) {
    let db_path =
        std::env::temp_dir().join(format!("modelbay-smoke-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.auth.key_path = std::env::temp_dir()
        .join(format!("modelbay-smoke-key-{}.json", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let state = modelbay::api::create_app_state_from_config(config, None)
        .await
        .expect("failed to create app state");

    let router = modelbay::api::router(state.clone()).await;
    (state, router)
}

async fn post_json(app: &Router, uri: &str, body: &serde_json::Value) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn smoke_register_login_package_logout_journey() {
    let (_, app) = spawn_app().await;

    let response = post_json(
        &app,
        "/api/users",
        &serde_json::json!({
            "username": "alice",
            "password": "Secret123",
            "email": "alice@example.com",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let alice_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    // Wrong password first, then the real one.
    let response = post_json(
        &app,
        "/api/auth/login",
        &serde_json::json!({ "username": "alice", "password": "invalid-password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        &app,
        "/api/auth/login",
        &serde_json::json!({ "username": "alice", "password": "Secret123" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let refresh_token = body_json(response).await["data"]["refresh_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = post_json(
        &app,
        "/api/auth/refresh",
        &serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let session_token = body_json(response).await["data"]["session_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/me")
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["username"],
        serde_json::json!("alice")
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/packages")
                .header("Authorization", format!("Bearer {session_token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "name": "whisper-small",
                        "category": "audio",
                        "description": "Speech to text",
                        "input": "audio/wav",
                        "output": "text/plain",
                        "markdown": "# Whisper",
                        "flags": [2],
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/packages?user_id={alice_id}"))
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let packages = body["data"].as_array().unwrap();
    assert_eq!(packages.len(), 1);
    assert_eq!(packages[0]["name"], serde_json::json!("whisper-small"));
    assert_eq!(packages[0]["flags"], serde_json::json!([2]));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/auth/logout")
                .header("Authorization", format!("Bearer {session_token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "refresh_token": refresh_token, "global": true })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(
        &app,
        "/api/auth/refresh",
        &serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn smoke_api_key_header_auth() {
    let (state, app) = spawn_app().await;

    let response = post_json(
        &app,
        "/api/users",
        &serde_json::json!({
            "username": "bob",
            "password": "Secret123",
            "email": "bob@example.com",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let api_key = state
        .store()
        .get_user_by_username("bob")
        .await
        .expect("fetch user")
        .expect("bob should exist")
        .api_key;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/me")
                .header("X-Api-Key", api_key.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["username"],
        serde_json::json!("bob")
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/system/status")
                .header("X-Api-Key", api_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Event stream is reachable with a key; don't consume the body, it
    // never ends.
    let api_key_again = state
        .store()
        .get_user_by_username("bob")
        .await
        .expect("fetch user")
        .expect("bob should exist")
        .api_key;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/events")
                .header("X-Api-Key", api_key_again)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with(mime::TEXT_EVENT_STREAM.as_ref()));
}

#[tokio::test]
async fn smoke_account_deletion_revokes_refresh_tokens() {
    let (_, app) = spawn_app().await;

    let response = post_json(
        &app,
        "/api/users",
        &serde_json::json!({
            "username": "carol",
            "password": "Secret123",
            "email": "carol@example.com",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let carol_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = post_json(
        &app,
        "/api/auth/login",
        &serde_json::json!({ "username": "carol", "password": "Secret123" }),
    )
    .await;
    let refresh_token = body_json(response).await["data"]["refresh_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = post_json(
        &app,
        "/api/auth/refresh",
        &serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await;
    let session_token = body_json(response).await["data"]["session_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/users?user_id={carol_id}"))
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(
        &app,
        "/api/auth/refresh",
        &serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The sealed session outlives the account until it expires, but the
    // profile behind it is gone.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/me")
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
