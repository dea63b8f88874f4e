use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use modelbay::config::Config;
use tower::ServiceExt;

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.auth.key_path = std::env::temp_dir()
        .join(format!("modelbay-api-test-{}.json", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    // Cheap hashing parameters keep the suite fast.
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let state = modelbay::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    modelbay::api::router(state).await
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

async fn register_user(app: &Router, username: &str) -> i32 {
    let response = post_json(
        app,
        "/api/users",
        &serde_json::json!({
            "username": username,
            "password": "Secret123",
            "email": format!("{username}@example.com"),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], serde_json::json!(true));
    i32::try_from(body["data"]["id"].as_i64().unwrap()).unwrap()
}

/// Registers are done elsewhere; this walks login -> refresh and hands
/// back a bearer session token.
async fn session_token_for(app: &Router, username: &str) -> String {
    let response = post_json(
        app,
        "/api/auth/login",
        &serde_json::json!({ "username": username, "password": "Secret123" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let refresh_token = body_json(response).await["data"]["refresh_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = post_json(
        app,
        "/api/auth/refresh",
        &serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]["session_token"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_register_validation_and_conflicts() {
    let app = spawn_app().await;

    let response = post_json(
        &app,
        "/api/users",
        &serde_json::json!({
            "username": "ab",
            "password": "Secret123",
            "email": "ab@example.com",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], serde_json::json!(false));
    assert_eq!(
        body["error"],
        serde_json::json!("Username must be between 3 and 20 characters")
    );

    let response = post_json(
        &app,
        "/api/users",
        &serde_json::json!({
            "username": "alice",
            "password": "onlyletters",
            "email": "alice@example.com",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        serde_json::json!("Password must contain at least one letter and one digit")
    );

    register_user(&app, "alice").await;

    // Same username, different email.
    let response = post_json(
        &app,
        "/api/users",
        &serde_json::json!({
            "username": "alice",
            "password": "Secret123",
            "email": "other@example.com",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], serde_json::json!("Username already exists"));

    // Same email, different username.
    let response = post_json(
        &app,
        "/api/users",
        &serde_json::json!({
            "username": "alice2",
            "password": "Secret123",
            "email": "alice@example.com",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], serde_json::json!("Email already exists"));
}

#[tokio::test]
async fn test_protected_routes_require_auth() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/system/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], serde_json::json!(false));
    assert_eq!(body["error"], serde_json::json!("Unauthorized"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/packages?user_id=1")
                .header("X-Api-Key", "wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/me")
                .header("Authorization", "Bearer not-a-real-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_refresh_logout_flow() {
    let app = spawn_app().await;
    register_user(&app, "alice").await;

    let response = post_json(
        &app,
        "/api/auth/login",
        &serde_json::json!({ "username": "alice", "password": "WrongPass1" }),
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
    assert_eq!(refresh_token.len(), 128);
    assert!(refresh_token.chars().all(|c| c.is_ascii_hexdigit()));

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
    assert!(!session_token.is_empty());

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
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], serde_json::json!("alice"));
    assert!(body["data"].get("password_hash").is_none());
    assert!(body["data"].get("api_key").is_none());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/auth/logout")
                .header("Authorization", format!("Bearer {session_token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "refresh_token": refresh_token }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A revoked refresh token mints no more sessions.
    let response = post_json(
        &app,
        "/api/auth/refresh",
        &serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_package_crud() {
    let app = spawn_app().await;
    let user_id = register_user(&app, "alice").await;
    let session_token = session_token_for(&app, "alice").await;

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
                        "name": "resnet-v2",
                        "category": "image",
                        "description": "Residual image classifier",
                        "input": "image/png",
                        "output": "application/json",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let location = response
        .headers()
        .get("location")
        .and_then(|h| h.to_str().ok())
        .unwrap()
        .to_string();
    let body = body_json(response).await;
    let package_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(location, format!("/api/packages?package_id={package_id}"));
    assert_eq!(body["data"]["category"], serde_json::json!("image"));
    assert_eq!(
        body["data"]["user_id"],
        serde_json::json!(i64::from(user_id))
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/packages?package_id={package_id}"))
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["name"], serde_json::json!("resnet-v2"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/packages?user_id={user_id}"))
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Neither selector is a client error.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/packages")
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/packages")
                .header("Authorization", format!("Bearer {session_token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "package_id": package_id,
                        "description": "Updated classifier",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["data"]["description"],
        serde_json::json!("Updated classifier")
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/packages")
                .header("Authorization", format!("Bearer {session_token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "package_id": package_id }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], serde_json::json!("No fields to update"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/packages?package_id={package_id}"))
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/packages?package_id={package_id}"))
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], serde_json::json!("Package not found"));
}

#[tokio::test]
async fn test_create_package_rejects_invalid_arguments() {
    let app = spawn_app().await;
    register_user(&app, "alice").await;
    let session_token = session_token_for(&app, "alice").await;

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
                        "name": "",
                        "category": "image",
                        "description": "d",
                        "input": "i",
                        "output": "o",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], serde_json::json!("New name is Invalid"));

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
                        "name": "voxel",
                        "category": "3d",
                        "description": "d",
                        "input": "i",
                        "output": "o",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], serde_json::json!("Unknown category: 3d"));
}

#[tokio::test]
async fn test_user_updates_are_self_only() {
    let app = spawn_app().await;
    let alice_id = register_user(&app, "alice").await;
    let bob_id = register_user(&app, "bob").await;
    let session_token = session_token_for(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/users")
                .header("Authorization", format!("Bearer {session_token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "user_id": bob_id,
                        "username": "hijacked",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/users")
                .header("Authorization", format!("Bearer {session_token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "user_id": alice_id,
                        "email": "alice@new.example.com",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["data"]["email"],
        serde_json::json!("alice@new.example.com")
    );

    // Reading another profile stays allowed.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/users?user_id={bob_id}"))
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], serde_json::json!("bob"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/users?user_id={bob_id}"))
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_system_status_and_logs() {
    let app = spawn_app().await;
    register_user(&app, "alice").await;
    let session_token = session_token_for(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/system/status")
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["users"], serde_json::json!(1));
    assert!(body["data"]["version"].is_string());
    assert_eq!(body["data"]["active_refresh_tokens"], serde_json::json!(1));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/system/logs?page=1&page_size=10")
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"]["logs"].is_array());
    assert!(body["data"]["total_pages"].is_u64());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/system/logs")
                .header("Authorization", format!("Bearer {session_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
