// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lease routes.

use crate::envelope::ApiResponse;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Lease;
use crate::routes::extract::parse_json;
use crate::services::LeaseRequest;
use crate::validation;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Lease routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/leases", post(create_lease).get(list_leases))
        .route("/api/leases/{lease_id}", get(get_lease))
        .route("/api/leases/{lease_id}/close", post(close_lease))
}

/// Lease request body. Lender and borrower are optional echoes of what the
/// server derives from the cycle and the session.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeaseRequest {
    pub lender_id: Option<String>,
    pub borrower_id: Option<String>,
    pub cycle_id: Option<String>,
}

async fn create_lease(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<ApiResponse<Lease>> {
    let request: CreateLeaseRequest = parse_json(&body)?;
    let cycle_id = validation::require(request.cycle_id.as_deref(), "cycleId")?;

    if let Some(borrower_id) = request.borrower_id.as_deref() {
        if borrower_id.trim() != user.user_id {
            return Err(AppError::bad_request(
                "borrowerId must be the authenticated user.",
            ));
        }
    }

    let claimed_lender_id = request
        .lender_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let lease = state
        .availability
        .request_lease(LeaseRequest {
            cycle_id: cycle_id.to_string(),
            borrower_id: user.user_id,
            claimed_lender_id,
        })
        .await?;

    Ok(ApiResponse::ok(
        StatusCode::CREATED,
        lease,
        "Lease created successfully.",
    ))
}

/// Leases the caller is a party to.
async fn list_leases(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<Lease>>> {
    let leases = state.availability.list_leases(&user.user_id).await?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        leases,
        "Leases fetched successfully.",
    ))
}

async fn get_lease(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(lease_id): Path<String>,
) -> Result<ApiResponse<Lease>> {
    let lease = state.availability.get_lease(&user.user_id, &lease_id).await?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        lease,
        "Lease fetched successfully.",
    ))
}

/// Either party may close an open lease.
async fn close_lease(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(lease_id): Path<String>,
) -> Result<ApiResponse<Lease>> {
    let lease = state
        .availability
        .close_lease(&user.user_id, &lease_id)
        .await?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        lease,
        "Lease closed successfully.",
    ))
}
