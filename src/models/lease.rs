// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lease model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Lifecycle state of a lease.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum LeaseStatus {
    Open,
    Closed,
}

/// Lease agreement between a cycle's owner (lender) and a borrower.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Lease {
    pub id: String,
    /// Owner of the leased cycle
    pub lender: String,
    pub borrower: String,
    pub cycle_id: String,
    pub status: LeaseStatus,
    pub created_at: String,
    pub closed_at: Option<String>,
}

impl Lease {
    pub fn is_open(&self) -> bool {
        self.status == LeaseStatus::Open
    }

    /// True if `user_id` is the lender or the borrower.
    pub fn involves(&self, user_id: &str) -> bool {
        self.lender == user_id || self.borrower == user_id
    }
}

/// Uniqueness marker for a lender's open lease.
///
/// Stored at `open_leases/{lender}`; at most one can exist per lender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpenLeaseMarker {
    pub lender: String,
    pub lease_id: String,
    pub cycle_id: String,
    pub opened_at: String,
}
