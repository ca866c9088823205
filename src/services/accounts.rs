// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User accounts: registration, login, token refresh and logout.
//!
//! Access and refresh tokens are HS256 JWTs signed with separate keys. Only
//! an HMAC digest of the current refresh token is stored, and a refresh
//! rotates both tokens, so a replayed refresh token stops working as soon as
//! it has been used once.

use crate::config::Config;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, decode_jwt};
use crate::models::{PublicUser, User};
use crate::services::blob_store::{BlobStore, ImageUpload};
use crate::services::passwords;
use crate::time_utils::now_rfc3339;
use crate::validation;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use validator::Validate;

type HmacSha256 = Hmac<Sha256>;

const AVATAR_FOLDER: &str = "avatars";

/// Registration form, as submitted.
#[derive(Debug, Clone, Default, Validate)]
pub struct Registration {
    pub full_name: Option<String>,
    #[validate(email(message = "email is not a valid address."))]
    pub email: Option<String>,
    pub phone_number: Option<String>,
    #[validate(length(min = 8, max = 128, message = "password must be 8 to 128 characters."))]
    pub password: Option<String>,
    pub upi_id: Option<String>,
}

/// Freshly issued credentials.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: PublicUser,
    pub tokens: TokenPair,
}

/// Hex HMAC of a refresh token under the refresh signing key.
fn refresh_token_digest(token: &str, key: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(token.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Account operations.
#[derive(Clone)]
pub struct AccountService {
    store: Store,
    blob_store: BlobStore,
    jwt_signing_key: Vec<u8>,
    refresh_signing_key: Vec<u8>,
    access_token_ttl_secs: u64,
    refresh_token_ttl_secs: u64,
}

impl AccountService {
    pub fn new(config: &Config, store: Store, blob_store: BlobStore) -> Self {
        Self {
            store,
            blob_store,
            jwt_signing_key: config.jwt_signing_key.clone(),
            refresh_signing_key: config.refresh_signing_key.clone(),
            access_token_ttl_secs: config.access_token_ttl_secs,
            refresh_token_ttl_secs: config.refresh_token_ttl_secs,
        }
    }

    /// Create an account. The avatar image is required.
    pub async fn register(
        &self,
        form: Registration,
        avatar: Option<ImageUpload>,
    ) -> Result<PublicUser> {
        validation::require_all(&[
            ("fullName", form.full_name.as_deref()),
            ("email", form.email.as_deref()),
            ("phoneNumber", form.phone_number.as_deref()),
            ("password", form.password.as_deref()),
            ("upiId", form.upi_id.as_deref()),
        ])?;

        let form = Registration {
            email: form.email.map(|e| e.trim().to_lowercase()),
            ..form
        };
        form.validate()
            .map_err(|e| AppError::BadRequest(format!("Invalid registration: {}", e)))?;

        let email = validation::require(form.email.as_deref(), "email")?;
        if self.store.get_user_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("User already exists.".to_string()));
        }

        let avatar = avatar.ok_or_else(|| AppError::bad_request("Avatar image is required."))?;
        let blob = self.blob_store.upload(&avatar, AVATAR_FOLDER).await?;

        let password = form.password.clone().unwrap_or_default();
        let password_hash = passwords::hash_password_blocking(password).await?;

        let now = now_rfc3339();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            full_name: validation::require(form.full_name.as_deref(), "fullName")?.to_string(),
            email: email.to_string(),
            phone_number: validation::require(form.phone_number.as_deref(), "phoneNumber")?
                .to_string(),
            password_hash,
            upi_id: validation::require(form.upi_id.as_deref(), "upiId")?.to_string(),
            avatar: blob.url,
            refresh_token_hash: None,
            created_at: now.clone(),
            updated_at: now,
        };

        self.store.create_user(&user).await?;

        let created = self.store.get_user(&user.id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("User {} missing after insert", user.id))
        })?;

        tracing::info!(user_id = %created.id, "User registered");
        Ok(PublicUser::from(&created))
    }

    /// Check credentials and issue a token pair.
    pub async fn login(&self, email: Option<&str>, password: Option<&str>) -> Result<LoginOutcome> {
        let email = validation::require(email, "email")?.to_lowercase();
        let password = match password {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return Err(AppError::bad_request("password is required.")),
        };

        let user = self
            .store
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist.".to_string()))?;

        if !passwords::verify_password_blocking(user.password_hash.clone(), password).await? {
            tracing::warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AppError::Unauthorized);
        }

        let tokens = self.issue_tokens(&user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutcome {
            user: PublicUser::from(&user),
            tokens,
        })
    }

    /// Revoke the stored refresh token.
    pub async fn logout(&self, user_id: &str) -> Result<()> {
        self.store.set_refresh_token_hash(user_id, None).await?;
        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Exchange a valid, current refresh token for a new pair.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<TokenPair> {
        let token = validation::require(refresh_token, "refreshToken")?;

        let claims = decode_jwt(token, &self.refresh_signing_key)?;

        let user = self
            .store
            .get_user(&claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        let presented = refresh_token_digest(token, &self.refresh_signing_key)?;
        let matches = user
            .refresh_token_hash
            .as_deref()
            .is_some_and(|stored| bool::from(stored.as_bytes().ct_eq(presented.as_bytes())));

        if !matches {
            tracing::warn!(user_id = %user.id, "Refresh token is not the current one");
            return Err(AppError::InvalidToken);
        }

        let tokens = self.issue_tokens(&user.id).await?;
        tracing::debug!(user_id = %user.id, "Tokens refreshed");
        Ok(tokens)
    }

    /// Public profile of the caller.
    pub async fn current_user(&self, user_id: &str) -> Result<PublicUser> {
        self.store
            .get_user(user_id)
            .await?
            .map(|u| PublicUser::from(&u))
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Sign a new pair and record the refresh token digest.
    async fn issue_tokens(&self, user_id: &str) -> Result<TokenPair> {
        let access_token = create_jwt(user_id, &self.jwt_signing_key, self.access_token_ttl_secs)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;
        let refresh_token =
            create_jwt(user_id, &self.refresh_signing_key, self.refresh_token_ttl_secs)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

        let digest = refresh_token_digest(&refresh_token, &self.refresh_signing_key)?;
        self.store
            .set_refresh_token_hash(user_id, Some(digest))
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
