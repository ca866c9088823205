// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod cycle;
pub mod lease;
pub mod user;

pub use cycle::{Cycle, EnrichedCycle};
pub use lease::{Lease, LeaseStatus, OpenLeaseMarker};
pub use user::{OwnerProfile, OwnerSummary, PublicUser, User};
