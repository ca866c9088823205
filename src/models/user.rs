// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User account stored in Firestore (document ID = `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub full_name: String,
    /// Lower-cased, unique across users
    pub email: String,
    pub phone_number: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// UPI payment handle shown to borrowers
    pub upi_id: String,
    /// Avatar image URL
    pub avatar: String,
    /// HMAC digest of the current refresh token (hex)
    #[serde(default)]
    pub refresh_token_hash: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// User as returned by the API (no credentials).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PublicUser {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub upi_id: String,
    pub avatar: String,
    pub created_at: String,
}

/// Owner projection used in cycle listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OwnerSummary {
    pub id: String,
    pub full_name: String,
}

/// Owner projection used on the cycle detail view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OwnerProfile {
    pub id: String,
    pub full_name: String,
    pub avatar: String,
    pub phone_number: String,
    pub email: String,
    pub upi_id: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            upi_id: user.upi_id.clone(),
            avatar: user.avatar.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

impl From<&User> for OwnerSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            full_name: user.full_name.clone(),
        }
    }
}

impl From<&User> for OwnerProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            full_name: user.full_name.clone(),
            avatar: user.avatar.clone(),
            phone_number: user.phone_number.clone(),
            email: user.email.clone(),
            upi_id: user.upi_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_user_omits_credentials() {
        let user = User {
            id: "u1".to_string(),
            full_name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone_number: "9999999999".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            upi_id: "asha@upi".to_string(),
            avatar: "memory://avatar".to_string(),
            refresh_token_hash: Some("abc".to_string()),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("refreshTokenHash"));
        assert!(json.contains("\"fullName\":\"Asha Rao\""));
    }
}
