// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles, email uniqueness markers, refresh token digests)
//! - Cycles (listing, availability updates)
//! - Leases (open/close as transactions with the per-lender marker)

use super::{collections, email_key, LeaseClosing, LeaseOpening};
use crate::error::{AppError, Result};
use crate::models::{Cycle, Lease, OpenLeaseMarker, User};
use firestore::{FirestoreConsistencySelector, FirestoreTransaction};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Commits that lose a race are retried with fresh reads this many times.
const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

/// Email uniqueness marker document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmailMarker {
    user_id: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    pub async fn new(project_id: &str) -> Result<Self> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    // ─── Generic Helpers ─────────────────────────────────────────

    /// Read one document by ID, optionally through a transaction-bound client.
    async fn read<T>(db: &firestore::FirestoreDb, collection: &str, id: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        db.fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Begin a transaction and a client whose reads go through it.
    async fn begin(&self) -> Result<(FirestoreTransaction<'_>, firestore::FirestoreDb)> {
        let transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let tx_db = self
            .client
            .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ));

        Ok((transaction, tx_db))
    }

    /// Add an upsert of `object` to the transaction.
    fn write_in<T>(
        &self,
        transaction: &mut FirestoreTransaction<'_>,
        collection: &str,
        id: &str,
        object: &T,
    ) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        self.client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(object)
            .add_to_transaction(transaction)
            .map_err(|e| {
                AppError::Database(format!(
                    "Failed to add {} write to transaction: {}",
                    collection, e
                ))
            })?;
        Ok(())
    }

    /// Commit, returning `Ok(false)` when the attempt should be retried.
    async fn commit(
        transaction: FirestoreTransaction<'_>,
        attempt: u32,
        unit: &'static str,
    ) -> Result<bool> {
        match transaction.commit().await {
            Ok(_) => Ok(true),
            Err(e) if attempt < MAX_TRANSACTION_ATTEMPTS => {
                tracing::warn!(error = %e, attempt, unit, "Transaction commit failed, retrying");
                Ok(false)
            }
            Err(e) => Err(AppError::Database(format!(
                "Transaction commit failed for {}: {}",
                unit, e
            ))),
        }
    }

    fn exhausted() -> AppError {
        AppError::Database("Transaction retries exhausted".to_string())
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Self::read(&self.client, collections::USERS, user_id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let marker: Option<EmailMarker> =
            Self::read(&self.client, collections::USER_EMAILS, &email_key(email)).await?;

        match marker {
            Some(marker) => self.get_user(&marker.user_id).await,
            None => Ok(None),
        }
    }

    /// Insert a user and its email marker in one transaction.
    pub async fn create_user(&self, user: &User) -> Result<()> {
        let key = email_key(&user.email);
        let marker = EmailMarker {
            user_id: user.id.clone(),
        };

        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let (mut transaction, tx_db) = self.begin().await?;

            let existing: Option<EmailMarker> =
                Self::read(&tx_db, collections::USER_EMAILS, &key).await?;
            if existing.is_some() {
                let _ = transaction.rollback().await;
                return Err(AppError::Conflict("User already exists.".to_string()));
            }

            self.write_in(&mut transaction, collections::USER_EMAILS, &key, &marker)?;
            self.write_in(&mut transaction, collections::USERS, &user.id, user)?;

            if Self::commit(transaction, attempt, "create_user").await? {
                return Ok(());
            }
        }

        Err(Self::exhausted())
    }

    /// Store (or clear) the refresh token digest.
    ///
    /// We fetch-modify-write to preserve other fields.
    pub async fn set_refresh_token_hash(&self, user_id: &str, hash: Option<String>) -> Result<()> {
        let mut user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        user.refresh_token_hash = hash;
        user.updated_at = crate::time_utils::now_rfc3339();

        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Cycle Operations ────────────────────────────────────────

    pub async fn get_cycle(&self, cycle_id: &str) -> Result<Option<Cycle>> {
        Self::read(&self.client, collections::CYCLES, cycle_id).await
    }

    pub async fn insert_cycle(&self, cycle: &Cycle) -> Result<()> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::CYCLES)
            .document_id(&cycle.id)
            .object(cycle)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn list_available_cycles(
        &self,
        landmark: &str,
        cycle_type: &str,
    ) -> Result<Vec<Cycle>> {
        self.client
            .fluent()
            .select()
            .from(collections::CYCLES)
            .filter(|q| {
                q.for_all([
                    q.field("isActive").eq(true),
                    q.field("landmark").eq(landmark),
                    q.field("cycleType").eq(cycle_type),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn update_cycle_tx<F>(&self, cycle_id: &str, decide: F) -> Result<Cycle>
    where
        F: Fn(Option<Cycle>, Option<OpenLeaseMarker>) -> Result<Cycle>,
    {
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let (mut transaction, tx_db) = self.begin().await?;

            let cycle: Option<Cycle> = Self::read(&tx_db, collections::CYCLES, cycle_id).await?;
            let marker: Option<OpenLeaseMarker> = match &cycle {
                Some(c) => Self::read(&tx_db, collections::OPEN_LEASES, &c.owner_id).await?,
                None => None,
            };

            let updated = match decide(cycle, marker) {
                Ok(updated) => updated,
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(e);
                }
            };

            self.write_in(&mut transaction, collections::CYCLES, &updated.id, &updated)?;

            if Self::commit(transaction, attempt, "update_cycle").await? {
                return Ok(updated);
            }
        }

        Err(Self::exhausted())
    }

    // ─── Lease Operations ────────────────────────────────────────

    pub async fn get_lease(&self, lease_id: &str) -> Result<Option<Lease>> {
        Self::read(&self.client, collections::LEASES, lease_id).await
    }

    pub async fn list_leases_for_user(&self, user_id: &str) -> Result<Vec<Lease>> {
        let mut leases = Vec::new();

        for field in ["lender", "borrower"] {
            let found: Vec<Lease> = self
                .client
                .fluent()
                .select()
                .from(collections::LEASES)
                .filter(|q| q.for_all([q.field(field).eq(user_id)]))
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            leases.extend(found);
        }

        Ok(leases)
    }

    pub async fn get_open_lease_marker(&self, lender_id: &str) -> Result<Option<OpenLeaseMarker>> {
        Self::read(&self.client, collections::OPEN_LEASES, lender_id).await
    }

    /// Open a lease: cycle update, marker insert and lease insert commit together.
    ///
    /// The marker read registers `open_leases/{lender}` with the transaction, so
    /// a concurrent opening for the same lender makes one of the commits fail.
    /// The loser is retried, sees the marker, and `decide` rejects it.
    pub async fn open_lease_tx<F>(&self, cycle_id: &str, decide: F) -> Result<Lease>
    where
        F: Fn(Option<Cycle>, Option<OpenLeaseMarker>) -> Result<LeaseOpening>,
    {
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let (mut transaction, tx_db) = self.begin().await?;

            let cycle: Option<Cycle> = Self::read(&tx_db, collections::CYCLES, cycle_id).await?;
            let marker: Option<OpenLeaseMarker> = match &cycle {
                Some(c) => Self::read(&tx_db, collections::OPEN_LEASES, &c.owner_id).await?,
                None => None,
            };

            let opening = match decide(cycle, marker) {
                Ok(opening) => opening,
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(e);
                }
            };

            self.write_in(
                &mut transaction,
                collections::CYCLES,
                &opening.cycle.id,
                &opening.cycle,
            )?;
            self.write_in(
                &mut transaction,
                collections::OPEN_LEASES,
                &opening.marker.lender,
                &opening.marker,
            )?;
            self.write_in(
                &mut transaction,
                collections::LEASES,
                &opening.lease.id,
                &opening.lease,
            )?;

            if Self::commit(transaction, attempt, "open_lease").await? {
                return Ok(opening.lease);
            }
        }

        Err(Self::exhausted())
    }

    /// Close a lease: lease update, cycle release and marker delete commit together.
    pub async fn close_lease_tx<F>(&self, lease_id: &str, decide: F) -> Result<Lease>
    where
        F: Fn(Option<Lease>, Option<Cycle>) -> Result<LeaseClosing>,
    {
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let (mut transaction, tx_db) = self.begin().await?;

            let lease: Option<Lease> = Self::read(&tx_db, collections::LEASES, lease_id).await?;
            let cycle: Option<Cycle> = match &lease {
                Some(l) => Self::read(&tx_db, collections::CYCLES, &l.cycle_id).await?,
                None => None,
            };
            let marker: Option<OpenLeaseMarker> = match &lease {
                Some(l) => Self::read(&tx_db, collections::OPEN_LEASES, &l.lender).await?,
                None => None,
            };

            let closing = match decide(lease, cycle) {
                Ok(closing) => closing,
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(e);
                }
            };

            self.write_in(
                &mut transaction,
                collections::LEASES,
                &closing.lease.id,
                &closing.lease,
            )?;
            if let Some(cycle) = &closing.cycle {
                self.write_in(&mut transaction, collections::CYCLES, &cycle.id, cycle)?;
            }
            if marker.is_some_and(|m| m.lease_id == closing.lease.id) {
                self.client
                    .fluent()
                    .delete()
                    .from(collections::OPEN_LEASES)
                    .document_id(&closing.lease.lender)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add marker deletion to transaction: {}",
                            e
                        ))
                    })?;
            }

            if Self::commit(transaction, attempt, "close_lease").await? {
                return Ok(closing.lease);
            }
        }

        Err(Self::exhausted())
    }
}
