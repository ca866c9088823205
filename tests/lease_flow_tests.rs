// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lease lifecycle through the HTTP API.

use axum::http::{Method, StatusCode};
use serde_json::json;

mod common;
use common::{create_test_app, json_request, seed_cycle, seed_user, send, token_for};

#[tokio::test]
async fn test_lease_binds_owner_and_flips_availability() {
    let (app, state) = create_test_app();
    let owner = seed_user(&state, "Owner").await;
    let borrower = seed_user(&state, "Borrower").await;
    let cycle = seed_cycle(&state, &owner.id, "MTB-1").await;
    let token = token_for(&state, &borrower.id);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/leases",
            Some(&token),
            Some(json!({ "cycleId": cycle.id, "borrowerId": borrower.id })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["statusCode"], 201);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["lender"], owner.id.as_str());
    assert_eq!(body["data"]["borrower"], borrower.id.as_str());
    assert_eq!(body["data"]["cycleId"], cycle.id.as_str());
    assert_eq!(body["data"]["status"], "open");

    let stored = state.store.get_cycle(&cycle.id).await.unwrap().unwrap();
    assert!(!stored.is_active);
}

#[tokio::test]
async fn test_second_lease_for_same_lender_conflicts() {
    let (app, state) = create_test_app();
    let owner = seed_user(&state, "Owner").await;
    let first = seed_user(&state, "First").await;
    let second = seed_user(&state, "Second").await;
    let cycle_a = seed_cycle(&state, &owner.id, "Roadster").await;
    let cycle_b = seed_cycle(&state, &owner.id, "Tourer").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/leases",
            Some(&token_for(&state, &first.id)),
            Some(json!({ "cycleId": cycle_a.id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let first_lease: cycle_rental::models::Lease =
        serde_json::from_value(body["data"].clone()).unwrap();

    // Same lender, different cycle.
    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/leases",
            Some(&token_for(&state, &second.id)),
            Some(json!({ "cycleId": cycle_b.id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());

    // First lease untouched, second cycle still available.
    let stored = state.store.get_lease(&first_lease.id).await.unwrap().unwrap();
    assert_eq!(stored, first_lease);
    let cycle_b = state.store.get_cycle(&cycle_b.id).await.unwrap().unwrap();
    assert!(cycle_b.is_active);
}

#[tokio::test]
async fn test_concurrent_requests_open_exactly_one_lease() {
    let (app, state) = create_test_app();
    let owner = seed_user(&state, "Owner").await;
    let cycle = seed_cycle(&state, &owner.id, "Contested").await;

    let mut handles = Vec::new();
    for i in 0..12 {
        let borrower = seed_user(&state, &format!("Borrower{}", i)).await;
        let token = token_for(&state, &borrower.id);
        let app = app.clone();
        let cycle_id = cycle.id.clone();
        handles.push(tokio::spawn(async move {
            let (status, _) = send(
                &app,
                json_request(
                    Method::POST,
                    "/api/leases",
                    Some(&token),
                    Some(json!({ "cycleId": cycle_id })),
                ),
            )
            .await;
            status
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 11);
    assert_eq!(
        state.store.list_leases_for_user(&owner.id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_lease_request_validation() {
    let (app, state) = create_test_app();
    let owner = seed_user(&state, "Owner").await;
    let borrower = seed_user(&state, "Borrower").await;
    let cycle = seed_cycle(&state, &owner.id, "Roadster").await;
    let token = token_for(&state, &borrower.id);

    let cases = [
        (json!({}), StatusCode::BAD_REQUEST),
        (json!({ "cycleId": "   " }), StatusCode::BAD_REQUEST),
        (
            json!({ "cycleId": cycle.id, "lenderId": borrower.id }),
            StatusCode::BAD_REQUEST,
        ),
        (
            json!({ "cycleId": cycle.id, "borrowerId": owner.id }),
            StatusCode::BAD_REQUEST,
        ),
        (json!({ "cycleId": "no-such-cycle" }), StatusCode::NOT_FOUND),
    ];

    for (body, expected) in cases {
        let (status, _) = send(
            &app,
            json_request(Method::POST, "/api/leases", Some(&token), Some(body.clone())),
        )
        .await;
        assert_eq!(status, expected, "body: {}", body);
    }

    // Owners cannot lease their own cycle.
    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/leases",
            Some(&token_for(&state, &owner.id)),
            Some(json!({ "cycleId": cycle.id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was flipped by the rejected requests.
    let stored = state.store.get_cycle(&cycle.id).await.unwrap().unwrap();
    assert!(stored.is_active);
}

#[tokio::test]
async fn test_close_lease_releases_cycle_and_lender() {
    let (app, state) = create_test_app();
    let owner = seed_user(&state, "Owner").await;
    let borrower = seed_user(&state, "Borrower").await;
    let stranger = seed_user(&state, "Stranger").await;
    let cycle = seed_cycle(&state, &owner.id, "Roadster").await;
    let borrower_token = token_for(&state, &borrower.id);

    let (_, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/leases",
            Some(&borrower_token),
            Some(json!({ "cycleId": cycle.id })),
        ),
    )
    .await;
    let lease_id = body["data"]["id"].as_str().unwrap().to_string();
    let close_uri = format!("/api/leases/{}/close", lease_id);

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            &close_uri,
            Some(&token_for(&state, &stranger.id)),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        json_request(Method::POST, &close_uri, Some(&borrower_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "closed");
    assert!(body["data"]["closedAt"].is_string());

    let stored = state.store.get_cycle(&cycle.id).await.unwrap().unwrap();
    assert!(stored.is_active);
    assert!(state
        .store
        .get_open_lease_marker(&owner.id)
        .await
        .unwrap()
        .is_none());

    let (status, _) = send(
        &app,
        json_request(Method::POST, &close_uri, Some(&borrower_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The lender can lend again.
    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/leases",
            Some(&token_for(&state, &stranger.id)),
            Some(json!({ "cycleId": cycle.id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_lease_visibility() {
    let (app, state) = create_test_app();
    let owner = seed_user(&state, "Owner").await;
    let borrower = seed_user(&state, "Borrower").await;
    let stranger = seed_user(&state, "Stranger").await;
    let cycle = seed_cycle(&state, &owner.id, "Roadster").await;

    let (_, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/leases",
            Some(&token_for(&state, &borrower.id)),
            Some(json!({ "cycleId": cycle.id })),
        ),
    )
    .await;
    let lease_uri = format!("/api/leases/{}", body["data"]["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        json_request(Method::GET, &lease_uri, Some(&token_for(&state, &owner.id)), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["borrower"], borrower.id.as_str());

    let (status, _) = send(
        &app,
        json_request(
            Method::GET,
            &lease_uri,
            Some(&token_for(&state, &stranger.id)),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        json_request(
            Method::GET,
            "/api/leases/missing",
            Some(&token_for(&state, &owner.id)),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for (user, expected) in [(&owner, 1), (&borrower, 1), (&stranger, 0)] {
        let (status, body) = send(
            &app,
            json_request(
                Method::GET,
                "/api/leases",
                Some(&token_for(&state, &user.id)),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), expected);
    }
}
