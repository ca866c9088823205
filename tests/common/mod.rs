// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use cycle_rental::config::Config;
use cycle_rental::db::Store;
use cycle_rental::middleware::auth::create_jwt;
use cycle_rental::models::{Cycle, User};
use cycle_rental::routes::create_router;
use cycle_rental::services::BlobStore;
use cycle_rental::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const BOUNDARY: &str = "cycle-rental-test-boundary";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a Firestore-backed store against the emulator.
#[allow(dead_code)]
pub async fn test_store() -> Store {
    Store::firestore("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app over the in-memory store and mock image store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(
        Config::test_default(),
        Store::in_memory(),
        BlobStore::new_mock(),
    ));

    (create_router(state.clone()), state)
}

/// Access token for `user_id`, signed with the test key.
#[allow(dead_code)]
pub fn token_for(state: &AppState, user_id: &str) -> String {
    create_jwt(user_id, &state.config.jwt_signing_key, 3600).unwrap()
}

/// Insert a user directly into the store.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, name: &str) -> User {
    let now = chrono::Utc::now().to_rfc3339();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        full_name: name.to_string(),
        email: format!("{}-{}@example.com", name.to_lowercase(), uuid::Uuid::new_v4()),
        phone_number: "9000000000".to_string(),
        password_hash: "unused".to_string(),
        upi_id: format!("{}@upi", name.to_lowercase()),
        avatar: "memory://avatars/seed".to_string(),
        refresh_token_hash: None,
        created_at: now.clone(),
        updated_at: now,
    };
    state.store.create_user(&user).await.unwrap();
    user
}

/// Insert an available cycle directly into the store.
#[allow(dead_code)]
pub async fn seed_cycle(state: &AppState, owner_id: &str, model: &str) -> Cycle {
    let cycle = Cycle {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: owner_id.to_string(),
        model: model.to_string(),
        rent_rate: 0.0,
        image: "memory://cycles/seed".to_string(),
        landmark: "Library".to_string(),
        cycle_type: "road".to_string(),
        is_active: true,
        available_till: None,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    state.store.insert_cycle(&cycle).await.unwrap();
    cycle
}

/// Request with an optional bearer token and JSON body.
#[allow(dead_code)]
pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Multipart body with text fields and an optional file part
/// `(field, content_type, bytes)`.
#[allow(dead_code)]
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a multipart form.
#[allow(dead_code)]
pub fn multipart_request(uri: &str, token: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

/// Send a request and decode the JSON envelope.
#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
