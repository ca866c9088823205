// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cycle listing routes.

use crate::envelope::ApiResponse;
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{Cycle, EnrichedCycle, OwnerProfile, OwnerSummary};
use crate::routes::extract::{parse_json, read_multipart};
use crate::services::{CycleFilter, NewCycle};
use crate::validation;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;

const FORM_BODY_LIMIT: usize = crate::services::blob_store::MAX_IMAGE_BYTES + 64 * 1024;

/// Cycle routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/cycles",
            get(list_cycles)
                .post(upload_cycle)
                .layer(DefaultBodyLimit::max(FORM_BODY_LIMIT)),
        )
        .route("/api/cycles/{cycle_id}", get(get_cycle))
        .route(
            "/api/cycles/{cycle_id}/availability",
            patch(toggle_availability),
        )
}

/// Query parameters for the listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCyclesParams {
    pub end_time: Option<String>,
    pub landmark: Option<String>,
    pub cycle_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub available_till: Option<String>,
}

/// List a new cycle from a multipart form with an `image` part.
async fn upload_cycle(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<ApiResponse<Cycle>> {
    let mut form = read_multipart(multipart, "image").await?;

    let input = NewCycle {
        model: form.take("model"),
        rent_rate: form.take("rentRate"),
        landmark: form.take("landmark"),
        cycle_type: form.take("cycleType"),
    };

    let cycle = state
        .cycles
        .upload_cycle(&user.user_id, input, form.image)
        .await?;

    Ok(ApiResponse::ok(
        StatusCode::CREATED,
        cycle,
        "Cycle uploaded successfully.",
    ))
}

/// Available cycles near a landmark.
async fn list_cycles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListCyclesParams>,
) -> Result<ApiResponse<Vec<EnrichedCycle<OwnerSummary>>>> {
    let cycles = state
        .cycles
        .list_cycles(CycleFilter {
            end_time: params.end_time,
            landmark: params.landmark,
            cycle_type: params.cycle_type,
        })
        .await?;

    Ok(ApiResponse::ok(
        StatusCode::OK,
        cycles,
        "Cycles fetched successfully.",
    ))
}

/// One cycle with its owner's contact details.
async fn get_cycle(
    State(state): State<Arc<AppState>>,
    Path(cycle_id): Path<String>,
) -> Result<ApiResponse<EnrichedCycle<OwnerProfile>>> {
    let cycle = state.cycles.get_cycle(&cycle_id).await?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        cycle,
        "Cycle fetched successfully.",
    ))
}

/// Owner flips availability and sets the window end.
async fn toggle_availability(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(cycle_id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse<()>> {
    let request: AvailabilityRequest = parse_json(&body)?;
    let available_till =
        validation::require_timestamp(request.available_till.as_deref(), "availableTill")?;

    state
        .availability
        .toggle_availability(&user.user_id, &cycle_id, available_till)
        .await?;

    Ok(ApiResponse::empty(
        StatusCode::OK,
        "Cycle availability updated.",
    ))
}
