// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cycle model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Cycle listed for rent, stored in Firestore (document ID = `id`).
///
/// `is_active == true` means the cycle is available for a new lease.
/// Opening a lease clears it, closing the lease sets it again, and the
/// owner can flip it directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Cycle {
    pub id: String,
    /// Owning user ID
    pub owner_id: String,
    pub model: String,
    /// Rent per hour; 0 when the owner lends for free
    pub rent_rate: f64,
    /// Image URL from the blob store
    pub image: String,
    /// Location tag used to filter listings
    pub landmark: String,
    /// e.g. "road", "mtb", "hybrid"
    pub cycle_type: String,
    pub is_active: bool,
    /// End of the owner's availability window (RFC3339), if any
    pub available_till: Option<String>,
    pub created_at: String,
}

/// Cycle with a projection of its owner's profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EnrichedCycle<O> {
    #[serde(flatten)]
    pub cycle: Cycle,
    /// None when the owner record no longer exists
    pub owner: Option<O>,
}
