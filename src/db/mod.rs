// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`Store`] is the handle the rest of the crate uses. It is backed either by
//! Firestore or by an in-process store (local runs without a GCP project, and
//! tests). Multi-document updates go through the `*_tx` methods, which read,
//! hand the current documents to a decision closure, and commit the writes it
//! returns as one unit. The closure may be called more than once if a
//! Firestore commit loses a race, so it must not have side effects.

pub mod firestore;
pub mod memory;

use crate::error::Result;
use crate::models::{Cycle, Lease, OpenLeaseMarker, User};
use sha2::{Digest, Sha256};
use std::sync::Arc;

pub use self::firestore::FirestoreStore;
pub use memory::MemoryStore;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email uniqueness markers (keyed by [`super::email_key`])
    pub const USER_EMAILS: &str = "user_emails";
    pub const CYCLES: &str = "cycles";
    pub const LEASES: &str = "leases";
    /// One document per lender with an open lease (keyed by lender ID)
    pub const OPEN_LEASES: &str = "open_leases";
}

/// Writes produced when a lease is opened.
#[derive(Debug, Clone)]
pub struct LeaseOpening {
    /// Cycle with its availability flag cleared
    pub cycle: Cycle,
    pub lease: Lease,
    pub marker: OpenLeaseMarker,
}

/// Writes produced when a lease is closed.
#[derive(Debug, Clone)]
pub struct LeaseClosing {
    pub lease: Lease,
    /// None if the cycle was deleted while leased
    pub cycle: Option<Cycle>,
}

/// Document ID for an email uniqueness marker.
///
/// Emails may contain characters that are not valid in document IDs, so the
/// key is a digest of the normalized address.
pub fn email_key(email: &str) -> String {
    hex::encode(Sha256::digest(email.trim().to_lowercase().as_bytes()))
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreStore),
    Memory(Arc<MemoryStore>),
}

/// Document store handle.
#[derive(Clone)]
pub struct Store {
    backend: Backend,
}

impl Store {
    /// Connect to Firestore.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn firestore(project_id: &str) -> Result<Self> {
        Ok(Self {
            backend: Backend::Firestore(FirestoreStore::new(project_id).await?),
        })
    }

    /// Create an empty in-process store.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    /// Short backend name for logs.
    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            Backend::Firestore(_) => "firestore",
            Backend::Memory(_) => "memory",
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        match &self.backend {
            Backend::Firestore(db) => db.get_user(user_id).await,
            Backend::Memory(db) => Ok(db.get_user(user_id)),
        }
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        match &self.backend {
            Backend::Firestore(db) => db.get_user_by_email(email).await,
            Backend::Memory(db) => Ok(db.get_user_by_email(email)),
        }
    }

    /// Insert a new user, failing with `Conflict` if the email is taken.
    pub async fn create_user(&self, user: &User) -> Result<()> {
        match &self.backend {
            Backend::Firestore(db) => db.create_user(user).await,
            Backend::Memory(db) => db.create_user(user).await,
        }
    }

    /// Store (or clear) the refresh token digest for a user.
    pub async fn set_refresh_token_hash(
        &self,
        user_id: &str,
        hash: Option<String>,
    ) -> Result<()> {
        match &self.backend {
            Backend::Firestore(db) => db.set_refresh_token_hash(user_id, hash).await,
            Backend::Memory(db) => db.set_refresh_token_hash(user_id, hash),
        }
    }

    // ─── Cycle Operations ────────────────────────────────────────

    pub async fn get_cycle(&self, cycle_id: &str) -> Result<Option<Cycle>> {
        match &self.backend {
            Backend::Firestore(db) => db.get_cycle(cycle_id).await,
            Backend::Memory(db) => Ok(db.get_cycle(cycle_id)),
        }
    }

    pub async fn insert_cycle(&self, cycle: &Cycle) -> Result<()> {
        match &self.backend {
            Backend::Firestore(db) => db.insert_cycle(cycle).await,
            Backend::Memory(db) => {
                db.insert_cycle(cycle);
                Ok(())
            }
        }
    }

    /// Cycles available for lease at a landmark, of a given type.
    pub async fn list_available_cycles(
        &self,
        landmark: &str,
        cycle_type: &str,
    ) -> Result<Vec<Cycle>> {
        match &self.backend {
            Backend::Firestore(db) => db.list_available_cycles(landmark, cycle_type).await,
            Backend::Memory(db) => Ok(db.list_available_cycles(landmark, cycle_type)),
        }
    }

    /// Atomically update a cycle.
    ///
    /// `decide` receives the cycle and the open-lease marker of its owner, and
    /// returns the new cycle document.
    pub async fn update_cycle_tx<F>(&self, cycle_id: &str, decide: F) -> Result<Cycle>
    where
        F: Fn(Option<Cycle>, Option<OpenLeaseMarker>) -> Result<Cycle> + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(db) => db.update_cycle_tx(cycle_id, decide).await,
            Backend::Memory(db) => db.update_cycle_tx(cycle_id, decide).await,
        }
    }

    // ─── Lease Operations ────────────────────────────────────────

    pub async fn get_lease(&self, lease_id: &str) -> Result<Option<Lease>> {
        match &self.backend {
            Backend::Firestore(db) => db.get_lease(lease_id).await,
            Backend::Memory(db) => Ok(db.get_lease(lease_id)),
        }
    }

    /// Leases where the user is lender or borrower, newest first.
    pub async fn list_leases_for_user(&self, user_id: &str) -> Result<Vec<Lease>> {
        let mut leases = match &self.backend {
            Backend::Firestore(db) => db.list_leases_for_user(user_id).await?,
            Backend::Memory(db) => db.list_leases_for_user(user_id),
        };
        leases.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(leases)
    }

    /// The lender's open-lease marker, if any.
    pub async fn get_open_lease_marker(&self, lender_id: &str) -> Result<Option<OpenLeaseMarker>> {
        match &self.backend {
            Backend::Firestore(db) => db.get_open_lease_marker(lender_id).await,
            Backend::Memory(db) => Ok(db.get_open_lease_marker(lender_id)),
        }
    }

    /// Atomically open a lease on a cycle.
    ///
    /// `decide` receives the cycle and the open-lease marker of its owner. The
    /// returned cycle, lease and marker are written together.
    pub async fn open_lease_tx<F>(&self, cycle_id: &str, decide: F) -> Result<Lease>
    where
        F: Fn(Option<Cycle>, Option<OpenLeaseMarker>) -> Result<LeaseOpening> + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(db) => db.open_lease_tx(cycle_id, decide).await,
            Backend::Memory(db) => db.open_lease_tx(cycle_id, decide).await,
        }
    }

    /// Atomically close a lease.
    ///
    /// `decide` receives the lease and its cycle. The returned documents are
    /// written and the lender's open-lease marker is removed in the same unit.
    pub async fn close_lease_tx<F>(&self, lease_id: &str, decide: F) -> Result<Lease>
    where
        F: Fn(Option<Lease>, Option<Cycle>) -> Result<LeaseClosing> + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(db) => db.close_lease_tx(lease_id, decide).await,
            Backend::Memory(db) => db.close_lease_tx(lease_id, decide).await,
        }
    }
}
