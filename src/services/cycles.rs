// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cycle registry: uploads and read paths.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{Cycle, EnrichedCycle, OwnerProfile, OwnerSummary, User};
use crate::services::blob_store::{BlobStore, ImageUpload};
use crate::time_utils::{now_rfc3339, parse_rfc3339};
use crate::validation;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::collections::{HashMap, HashSet};

const MAX_CONCURRENT_DB_OPS: usize = 16;
const CYCLE_IMAGE_FOLDER: &str = "cycles";

/// Fields of a new cycle listing, as submitted.
#[derive(Debug, Clone, Default)]
pub struct NewCycle {
    pub model: Option<String>,
    pub rent_rate: Option<String>,
    pub landmark: Option<String>,
    pub cycle_type: Option<String>,
}

/// Listing filter, as submitted.
#[derive(Debug, Clone, Default)]
pub struct CycleFilter {
    pub end_time: Option<String>,
    pub landmark: Option<String>,
    pub cycle_type: Option<String>,
}

/// Parse an optional rent rate; blank means free.
fn parse_rent_rate(raw: Option<&str>) -> Result<f64> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(0.0),
        Some(s) => {
            let rate: f64 = s
                .parse()
                .map_err(|_| AppError::bad_request("rentRate must be a number."))?;
            if !rate.is_finite() || rate < 0.0 {
                return Err(AppError::bad_request("rentRate must be zero or positive."));
            }
            Ok(rate)
        }
    }
}

/// True if the cycle's availability window covers `end_time`.
fn available_until(cycle: &Cycle, end_time: DateTime<Utc>) -> bool {
    match cycle.available_till.as_deref().and_then(parse_rfc3339) {
        Some(till) => till >= end_time,
        None => true,
    }
}

/// Cycle listings and lookups.
#[derive(Clone)]
pub struct CycleRegistry {
    store: Store,
    blob_store: BlobStore,
}

impl CycleRegistry {
    pub fn new(store: Store, blob_store: BlobStore) -> Self {
        Self { store, blob_store }
    }

    /// Create a listing owned by `owner_id`.
    pub async fn upload_cycle(
        &self,
        owner_id: &str,
        input: NewCycle,
        image: Option<ImageUpload>,
    ) -> Result<Cycle> {
        let model = validation::require(input.model.as_deref(), "model")?;
        let landmark = validation::require(input.landmark.as_deref(), "landmark")?;
        let cycle_type = validation::require(input.cycle_type.as_deref(), "cycleType")?;
        let rent_rate = parse_rent_rate(input.rent_rate.as_deref())?;
        let image = image.ok_or_else(|| AppError::bad_request("Cycle image is required."))?;

        let blob = self.blob_store.upload(&image, CYCLE_IMAGE_FOLDER).await?;

        let cycle = Cycle {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            model: model.to_string(),
            rent_rate,
            image: blob.url,
            landmark: landmark.to_string(),
            cycle_type: cycle_type.to_string(),
            is_active: true,
            available_till: None,
            created_at: now_rfc3339(),
        };

        self.store.insert_cycle(&cycle).await?;

        let created = self.store.get_cycle(&cycle.id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Cycle {} missing after insert", cycle.id))
        })?;

        tracing::info!(
            cycle_id = %created.id,
            owner_id = %owner_id,
            landmark = %created.landmark,
            cycle_type = %created.cycle_type,
            "Cycle listed"
        );

        Ok(created)
    }

    /// Available cycles matching the filter, with owner names.
    pub async fn list_cycles(&self, filter: CycleFilter) -> Result<Vec<EnrichedCycle<OwnerSummary>>> {
        validation::require_all(&[
            ("endTime", filter.end_time.as_deref()),
            ("landmark", filter.landmark.as_deref()),
            ("cycleType", filter.cycle_type.as_deref()),
        ])?;
        let end_time = validation::require_timestamp(filter.end_time.as_deref(), "endTime")?;
        let landmark = validation::require(filter.landmark.as_deref(), "landmark")?;
        let cycle_type = validation::require(filter.cycle_type.as_deref(), "cycleType")?;

        let mut cycles: Vec<Cycle> = self
            .store
            .list_available_cycles(landmark, cycle_type)
            .await?
            .into_iter()
            .filter(|c| available_until(c, end_time))
            .collect();
        cycles.sort_by(|a, b| a.rent_rate.total_cmp(&b.rent_rate).then_with(|| a.id.cmp(&b.id)));

        let owners = self
            .load_owners(cycles.iter().map(|c| c.owner_id.as_str()))
            .await?;

        tracing::debug!(
            landmark = %landmark,
            cycle_type = %cycle_type,
            count = cycles.len(),
            "Listed cycles"
        );

        Ok(cycles
            .into_iter()
            .map(|cycle| {
                let owner = owners.get(&cycle.owner_id).map(OwnerSummary::from);
                EnrichedCycle { cycle, owner }
            })
            .collect())
    }

    /// One cycle with its owner's contact details.
    pub async fn get_cycle(&self, cycle_id: &str) -> Result<EnrichedCycle<OwnerProfile>> {
        let cycle_id = validation::require(Some(cycle_id), "Cycle ID")?;

        let cycle = self
            .store
            .get_cycle(cycle_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Cycle {} not found.", cycle_id)))?;

        let owner = self.store.get_user(&cycle.owner_id).await?;
        if owner.is_none() {
            tracing::warn!(cycle_id = %cycle.id, owner_id = %cycle.owner_id, "Cycle owner missing");
        }

        Ok(EnrichedCycle {
            owner: owner.as_ref().map(OwnerProfile::from),
            cycle,
        })
    }

    /// Fetch each distinct owner once, a bounded number at a time.
    async fn load_owners<'a>(
        &self,
        owner_ids: impl Iterator<Item = &'a str>,
    ) -> Result<HashMap<String, User>> {
        let unique: HashSet<String> = owner_ids.map(str::to_string).collect();
        let store = &self.store;

        stream::iter(unique)
            .map(|owner_id| async move { store.get_user(&owner_id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<User>>>>()
            .await
            .into_iter()
            .filter_map(|r| r.transpose())
            .map(|r| r.map(|user| (user.id.clone(), user)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rent_rate() {
        assert_eq!(parse_rent_rate(None).unwrap(), 0.0);
        assert_eq!(parse_rent_rate(Some("  ")).unwrap(), 0.0);
        assert_eq!(parse_rent_rate(Some("12.5")).unwrap(), 12.5);
        assert!(parse_rent_rate(Some("-1")).is_err());
        assert!(parse_rent_rate(Some("NaN")).is_err());
        assert!(parse_rent_rate(Some("cheap")).is_err());
    }

    #[test]
    fn test_available_until() {
        let mut cycle = Cycle {
            id: "c1".to_string(),
            owner_id: "o1".to_string(),
            model: "Hybrid".to_string(),
            rent_rate: 10.0,
            image: "memory://cycles/c1".to_string(),
            landmark: "Gate 2".to_string(),
            cycle_type: "hybrid".to_string(),
            is_active: true,
            available_till: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let end = parse_rfc3339("2026-06-01T12:00:00Z").unwrap();

        assert!(available_until(&cycle, end));

        cycle.available_till = Some("2026-06-01T18:00:00Z".to_string());
        assert!(available_until(&cycle, end));

        cycle.available_till = Some("2026-06-01T09:00:00Z".to_string());
        assert!(!available_until(&cycle, end));
    }

    #[tokio::test]
    async fn test_list_rejects_blank_end_time() {
        let registry = CycleRegistry::new(Store::in_memory(), BlobStore::new_mock());

        let err = registry
            .list_cycles(CycleFilter {
                end_time: Some(String::new()),
                landmark: Some("X".to_string()),
                cycle_type: Some("road".to_string()),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
