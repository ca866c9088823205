// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Single-document reads and writes go straight to the maps. The
//! multi-document `*_tx` units hold `commit_lock` for their whole
//! read-decide-write sequence, so they are serialized against each other.

use super::{email_key, LeaseClosing, LeaseOpening};
use crate::error::{AppError, Result};
use crate::models::{Cycle, Lease, OpenLeaseMarker, User};
use dashmap::DashMap;
use tokio::sync::Mutex;

/// In-memory collections keyed by document ID.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    /// email key -> user ID
    user_emails: DashMap<String, String>,
    cycles: DashMap<String, Cycle>,
    leases: DashMap<String, Lease>,
    /// lender ID -> marker
    open_leases: DashMap<String, OpenLeaseMarker>,
    commit_lock: Mutex<()>,
}

impl MemoryStore {
    // ─── Users ───────────────────────────────────────────────────

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|u| u.clone())
    }

    pub fn get_user_by_email(&self, email: &str) -> Option<User> {
        let user_id = self.user_emails.get(&email_key(email))?.clone();
        self.get_user(&user_id)
    }

    pub async fn create_user(&self, user: &User) -> Result<()> {
        let _guard = self.commit_lock.lock().await;

        let key = email_key(&user.email);
        if self.user_emails.contains_key(&key) {
            return Err(AppError::Conflict("User already exists.".to_string()));
        }

        self.user_emails.insert(key, user.id.clone());
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    pub fn set_refresh_token_hash(&self, user_id: &str, hash: Option<String>) -> Result<()> {
        let mut user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        user.refresh_token_hash = hash;
        user.updated_at = crate::time_utils::now_rfc3339();
        Ok(())
    }

    // ─── Cycles ──────────────────────────────────────────────────

    pub fn get_cycle(&self, cycle_id: &str) -> Option<Cycle> {
        self.cycles.get(cycle_id).map(|c| c.clone())
    }

    pub fn insert_cycle(&self, cycle: &Cycle) {
        self.cycles.insert(cycle.id.clone(), cycle.clone());
    }

    pub fn list_available_cycles(&self, landmark: &str, cycle_type: &str) -> Vec<Cycle> {
        self.cycles
            .iter()
            .filter(|c| c.is_active && c.landmark == landmark && c.cycle_type == cycle_type)
            .map(|c| c.clone())
            .collect()
    }

    pub async fn update_cycle_tx<F>(&self, cycle_id: &str, decide: F) -> Result<Cycle>
    where
        F: Fn(Option<Cycle>, Option<OpenLeaseMarker>) -> Result<Cycle>,
    {
        let _guard = self.commit_lock.lock().await;

        let cycle = self.get_cycle(cycle_id);
        let marker = cycle
            .as_ref()
            .and_then(|c| self.get_open_lease_marker(&c.owner_id));

        let updated = decide(cycle, marker)?;
        self.cycles.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    // ─── Leases ──────────────────────────────────────────────────

    pub fn get_lease(&self, lease_id: &str) -> Option<Lease> {
        self.leases.get(lease_id).map(|l| l.clone())
    }

    pub fn list_leases_for_user(&self, user_id: &str) -> Vec<Lease> {
        self.leases
            .iter()
            .filter(|l| l.involves(user_id))
            .map(|l| l.clone())
            .collect()
    }

    pub fn get_open_lease_marker(&self, lender_id: &str) -> Option<OpenLeaseMarker> {
        self.open_leases.get(lender_id).map(|m| m.clone())
    }

    pub async fn open_lease_tx<F>(&self, cycle_id: &str, decide: F) -> Result<Lease>
    where
        F: Fn(Option<Cycle>, Option<OpenLeaseMarker>) -> Result<LeaseOpening>,
    {
        let _guard = self.commit_lock.lock().await;

        let cycle = self.get_cycle(cycle_id);
        let marker = cycle
            .as_ref()
            .and_then(|c| self.get_open_lease_marker(&c.owner_id));

        let opening = decide(cycle, marker)?;

        // Insert-if-absent on the marker backs up whatever `decide` checked.
        if self.open_leases.contains_key(&opening.marker.lender) {
            return Err(AppError::Conflict(
                "Lender already has an open lease.".to_string(),
            ));
        }

        self.open_leases
            .insert(opening.marker.lender.clone(), opening.marker);
        self.cycles.insert(opening.cycle.id.clone(), opening.cycle);
        self.leases
            .insert(opening.lease.id.clone(), opening.lease.clone());

        Ok(opening.lease)
    }

    pub async fn close_lease_tx<F>(&self, lease_id: &str, decide: F) -> Result<Lease>
    where
        F: Fn(Option<Lease>, Option<Cycle>) -> Result<LeaseClosing>,
    {
        let _guard = self.commit_lock.lock().await;

        let lease = self.get_lease(lease_id);
        let cycle = lease.as_ref().and_then(|l| self.get_cycle(&l.cycle_id));

        let closing = decide(lease, cycle)?;

        self.open_leases
            .remove_if(&closing.lease.lender, |_, m| m.lease_id == closing.lease.id);
        if let Some(cycle) = closing.cycle {
            self.cycles.insert(cycle.id.clone(), cycle);
        }
        self.leases
            .insert(closing.lease.id.clone(), closing.lease.clone());

        Ok(closing.lease)
    }
}
