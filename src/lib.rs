// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cycle rental backend.
//!
//! Owners list cycles, borrowers lease them, and the availability flag on
//! each cycle tracks whether it can be leased right now.

pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod validation;

use config::Config;
use db::Store;
use services::{AccountService, AvailabilityService, BlobStore, CycleRegistry};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub accounts: AccountService,
    pub cycles: CycleRegistry,
    pub availability: AvailabilityService,
}

impl AppState {
    pub fn new(config: Config, store: Store, blob_store: BlobStore) -> Self {
        Self {
            accounts: AccountService::new(&config, store.clone(), blob_store.clone()),
            cycles: CycleRegistry::new(store.clone(), blob_store),
            availability: AvailabilityService::new(store.clone()),
            config,
            store,
        }
    }
}
