// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod availability;
pub mod blob_store;
pub mod cycles;
pub mod passwords;

pub use accounts::{AccountService, LoginOutcome, Registration, TokenPair};
pub use availability::{AvailabilityService, LeaseRequest};
pub use blob_store::{BlobStore, ImageUpload};
pub use cycles::{CycleFilter, CycleRegistry, NewCycle};
