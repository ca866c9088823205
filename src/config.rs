// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. Optional backends (Firestore and
//! Cloudinary) fall back to in-memory implementations when unset.

use std::env;

const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 10 * 24 * 60 * 60;

/// Credentials for the Cloudinary image store.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (None = in-memory store)
    pub gcp_project_id: Option<String>,
    /// Server port
    pub port: u16,
    /// Lifetime of access tokens in seconds
    pub access_token_ttl_secs: u64,
    /// Lifetime of refresh tokens in seconds
    pub refresh_token_ttl_secs: u64,
    /// Mark auth cookies `Secure`
    pub secure_cookies: bool,

    // --- Secrets ---
    /// JWT signing key for access tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// JWT signing key for refresh tokens (raw bytes)
    pub refresh_signing_key: Vec<u8>,
    /// Image store credentials (None = in-memory blob store)
    pub cloudinary: Option<CloudinaryConfig>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let cloudinary = match (
            env::var("CLOUDINARY_CLOUD_NAME"),
            env::var("CLOUDINARY_API_KEY"),
            env::var("CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(api_key), Ok(api_secret)) => Some(CloudinaryConfig {
                cloud_name: cloud_name.trim().to_string(),
                api_key: api_key.trim().to_string(),
                api_secret: api_secret.trim().to_string(),
            }),
            _ => None,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            port: parse_or("PORT", 8080)?,
            access_token_ttl_secs: parse_or("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)?,
            refresh_token_ttl_secs: parse_or(
                "REFRESH_TOKEN_TTL_SECS",
                DEFAULT_REFRESH_TOKEN_TTL_SECS,
            )?,
            secure_cookies: parse_or("SECURE_COOKIES", true)?,

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            refresh_signing_key: env::var("REFRESH_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("REFRESH_SIGNING_KEY"))?
                .into_bytes(),
            cloudinary,
        })
    }

    /// Config for tests: in-memory backends and fixed keys.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: None,
            port: 8080,
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            secure_cookies: false,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            refresh_signing_key: b"test_refresh_key_32_bytes_min!!".to_vec(),
            cloudinary: None,
        }
    }
}

/// Read an optional variable, parsing it when present.
fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("REFRESH_SIGNING_KEY", "test_refresh_key_32_bytes_min!!");
        env::set_var("ACCESS_TOKEN_TTL_SECS", "600");
        env::remove_var("GCP_PROJECT_ID");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.jwt_signing_key, b"test_jwt_key_32_bytes_minimum!!");
        assert_eq!(config.access_token_ttl_secs, 600);
        assert!(config.gcp_project_id.is_none());

        env::set_var("ACCESS_TOKEN_TTL_SECS", "ten minutes");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("ACCESS_TOKEN_TTL_SECS"))
        ));
        env::remove_var("ACCESS_TOKEN_TTL_SECS");
    }
}
