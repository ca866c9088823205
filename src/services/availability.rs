// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cycle availability and the lease lifecycle.
//!
//! A cycle's `is_active` flag means "available for a new lease". The
//! state changes are:
//!
//! - opening a lease: `is_active` true -> false, lease inserted with status
//!   `Open`, lender marker inserted;
//! - closing a lease: status `Closed`, `is_active` -> true, marker removed;
//! - owner toggle: `is_active` flipped and `available_till` set, refused
//!   while the cycle is out on a lease.
//!
//! Each change is decided by a pure `plan_*` function over the documents read
//! inside a store transaction, so the check and the writes commit together.

use crate::db::{LeaseClosing, LeaseOpening, Store};
use crate::error::{AppError, Result};
use crate::models::{Cycle, Lease, LeaseStatus, OpenLeaseMarker};
use crate::time_utils::{format_utc_rfc3339, parse_rfc3339};
use chrono::{DateTime, Utc};

/// Lease request as received from a client.
#[derive(Debug, Clone)]
pub struct LeaseRequest {
    pub cycle_id: String,
    /// Authenticated caller
    pub borrower_id: String,
    /// Lender claimed by the client; must match the cycle's owner
    pub claimed_lender_id: Option<String>,
}

/// Decide the writes for opening a lease.
pub fn plan_lease_opening(
    request: &LeaseRequest,
    cycle: Option<Cycle>,
    lender_marker: Option<OpenLeaseMarker>,
    lease_id: &str,
    now: DateTime<Utc>,
) -> Result<LeaseOpening> {
    let mut cycle = cycle
        .ok_or_else(|| AppError::NotFound(format!("Cycle {} not found.", request.cycle_id)))?;

    if let Some(claimed) = &request.claimed_lender_id {
        if *claimed != cycle.owner_id {
            return Err(AppError::bad_request("lenderId does not own this cycle."));
        }
    }

    if cycle.owner_id == request.borrower_id {
        return Err(AppError::bad_request("You cannot lease your own cycle."));
    }

    if lender_marker.is_some() {
        return Err(AppError::Conflict(
            "This lender already has an active lease.".to_string(),
        ));
    }

    if !cycle.is_active {
        return Err(AppError::Conflict(
            "Cycle is not available for lease.".to_string(),
        ));
    }

    if let Some(till) = cycle.available_till.as_deref().and_then(parse_rfc3339) {
        if till <= now {
            return Err(AppError::Conflict(
                "Cycle availability window has ended.".to_string(),
            ));
        }
    }

    let opened_at = format_utc_rfc3339(now);
    cycle.is_active = false;

    let lease = Lease {
        id: lease_id.to_string(),
        lender: cycle.owner_id.clone(),
        borrower: request.borrower_id.clone(),
        cycle_id: cycle.id.clone(),
        status: LeaseStatus::Open,
        created_at: opened_at.clone(),
        closed_at: None,
    };

    let marker = OpenLeaseMarker {
        lender: lease.lender.clone(),
        lease_id: lease.id.clone(),
        cycle_id: cycle.id.clone(),
        opened_at,
    };

    Ok(LeaseOpening {
        cycle,
        lease,
        marker,
    })
}

/// Decide the writes for closing a lease.
pub fn plan_lease_closing(
    caller_id: &str,
    lease_id: &str,
    lease: Option<Lease>,
    cycle: Option<Cycle>,
    now: DateTime<Utc>,
) -> Result<LeaseClosing> {
    let mut lease =
        lease.ok_or_else(|| AppError::NotFound(format!("Lease {} not found.", lease_id)))?;

    if !lease.involves(caller_id) {
        return Err(AppError::Forbidden(
            "Only the lender or borrower can close this lease.".to_string(),
        ));
    }

    if !lease.is_open() {
        return Err(AppError::Conflict("Lease is already closed.".to_string()));
    }

    lease.status = LeaseStatus::Closed;
    lease.closed_at = Some(format_utc_rfc3339(now));

    let cycle = cycle.map(|mut c| {
        c.is_active = true;
        c
    });

    Ok(LeaseClosing { lease, cycle })
}

/// Decide the new cycle document for an owner's availability toggle.
pub fn plan_availability_toggle(
    owner_id: &str,
    cycle_id: &str,
    available_till: DateTime<Utc>,
    cycle: Option<Cycle>,
    owner_marker: Option<OpenLeaseMarker>,
) -> Result<Cycle> {
    let mut cycle =
        cycle.ok_or_else(|| AppError::NotFound(format!("Cycle {} not found.", cycle_id)))?;

    if cycle.owner_id != owner_id {
        return Err(AppError::Forbidden("You do not own this cycle.".to_string()));
    }

    if owner_marker.is_some_and(|m| m.cycle_id == cycle.id) {
        return Err(AppError::Conflict(
            "Cycle is currently leased.".to_string(),
        ));
    }

    cycle.is_active = !cycle.is_active;
    cycle.available_till = Some(format_utc_rfc3339(available_till));
    Ok(cycle)
}

/// Availability coordinator.
#[derive(Clone)]
pub struct AvailabilityService {
    store: Store,
}

impl AvailabilityService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Open a lease on a cycle for the requesting borrower.
    pub async fn request_lease(&self, request: LeaseRequest) -> Result<Lease> {
        let lease_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let lease = self
            .store
            .open_lease_tx(&request.cycle_id, |cycle, marker| {
                plan_lease_opening(&request, cycle, marker, &lease_id, now)
            })
            .await
            .inspect_err(|e| {
                tracing::debug!(
                    cycle_id = %request.cycle_id,
                    borrower_id = %request.borrower_id,
                    error = %e,
                    "Lease request rejected"
                );
            })?;

        let persisted = self.store.get_lease(&lease.id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Lease {} missing after commit", lease.id))
        })?;

        tracing::info!(
            lease_id = %persisted.id,
            cycle_id = %persisted.cycle_id,
            lender_id = %persisted.lender,
            borrower_id = %persisted.borrower,
            "Lease opened"
        );

        Ok(persisted)
    }

    /// Close an open lease and make its cycle available again.
    pub async fn close_lease(&self, caller_id: &str, lease_id: &str) -> Result<Lease> {
        let now = Utc::now();

        let lease = self
            .store
            .close_lease_tx(lease_id, |lease, cycle| {
                plan_lease_closing(caller_id, lease_id, lease, cycle, now)
            })
            .await?;

        tracing::info!(
            lease_id = %lease.id,
            cycle_id = %lease.cycle_id,
            closed_by = %caller_id,
            "Lease closed"
        );

        Ok(lease)
    }

    /// Flip the owner's cycle availability and set its window end.
    pub async fn toggle_availability(
        &self,
        owner_id: &str,
        cycle_id: &str,
        available_till: DateTime<Utc>,
    ) -> Result<Cycle> {
        let cycle = self
            .store
            .update_cycle_tx(cycle_id, |cycle, marker| {
                plan_availability_toggle(owner_id, cycle_id, available_till, cycle, marker)
            })
            .await?;

        tracing::info!(
            cycle_id = %cycle.id,
            owner_id = %owner_id,
            is_active = cycle.is_active,
            available_till = ?cycle.available_till,
            "Cycle availability toggled"
        );

        Ok(cycle)
    }

    /// Fetch a lease visible to the caller.
    pub async fn get_lease(&self, caller_id: &str, lease_id: &str) -> Result<Lease> {
        let lease = self
            .store
            .get_lease(lease_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lease {} not found.", lease_id)))?;

        if !lease.involves(caller_id) {
            return Err(AppError::Forbidden(
                "You are not a party to this lease.".to_string(),
            ));
        }

        Ok(lease)
    }

    /// All leases the caller is a party to, newest first.
    pub async fn list_leases(&self, caller_id: &str) -> Result<Vec<Lease>> {
        self.store.list_leases_for_user(caller_id).await
    }
}
