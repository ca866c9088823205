// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{http::StatusCode, response::IntoResponse};
use cycle_rental::error::AppError;

#[test]
fn test_error_status_mapping() {
    assert_eq!(
        AppError::bad_request("x").status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        AppError::NotFound("x".to_string()).status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        AppError::Conflict("x".to_string()).status(),
        StatusCode::CONFLICT
    );
    assert_eq!(
        AppError::Forbidden("x".to_string()).status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        AppError::Database("x".to_string()).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_error_renders_envelope() {
    let response = AppError::Conflict("Lender already has an open lease.".to_string())
        .into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["statusCode"], 409);
    assert_eq!(json["success"], false);
    assert!(json["data"].is_null());
    assert_eq!(json["message"], "Lender already has an open lease.");
}

#[tokio::test]
async fn test_database_error_details_not_leaked() {
    let response = AppError::Database("connection refused to 10.0.0.3".to_string())
        .into_response();
    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(!text.contains("10.0.0.3"));
}
