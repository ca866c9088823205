// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image storage (Cloudinary).
//!
//! Images are sent as base64 data URIs in a signed form upload, so no
//! multipart client is needed. Without credentials the store runs in mock
//! mode and hands out `memory://` URLs.

use crate::config::CloudinaryConfig;
use crate::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Image received from a client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImageUpload {
    /// Reject empty, oversized, or non-image payloads.
    pub fn validate(&self) -> Result<()> {
        if self.bytes.is_empty() {
            return Err(AppError::bad_request("Image file is empty."));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::bad_request("Image file is too large."));
        }
        if !self.content_type.starts_with("image/") {
            return Err(AppError::bad_request("Uploaded file must be an image."));
        }
        Ok(())
    }
}

/// Where an uploaded image can be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedBlob {
    pub url: String,
}

#[derive(Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
}

/// Image store client.
#[derive(Clone)]
pub struct BlobStore {
    http: reqwest::Client,
    /// None = mock mode
    cloudinary: Option<CloudinaryConfig>,
}

impl BlobStore {
    pub fn new(cloudinary: CloudinaryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            cloudinary: Some(cloudinary),
        }
    }

    /// Offline store for local runs and tests.
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            cloudinary: None,
        }
    }

    /// Upload an image into `folder` and return its URL.
    pub async fn upload(&self, image: &ImageUpload, folder: &str) -> Result<UploadedBlob> {
        image.validate()?;

        let Some(cloudinary) = &self.cloudinary else {
            let url = format!("memory://{}/{}", folder, uuid::Uuid::new_v4());
            tracing::debug!(url = %url, bytes = image.bytes.len(), "Stored image in mock blob store");
            return Ok(UploadedBlob { url });
        };

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", folder), ("timestamp", &timestamp)],
            &cloudinary.api_secret,
        );
        let data_uri = format!(
            "data:{};base64,{}",
            image.content_type,
            BASE64.encode(&image.bytes)
        );

        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            cloudinary.cloud_name
        );

        let response = self
            .http
            .post(&url)
            .form(&[
                ("file", data_uri.as_str()),
                ("api_key", cloudinary.api_key.as_str()),
                ("folder", folder),
                ("timestamp", timestamp.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await
            .map_err(|e| AppError::BlobStore(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BlobStore(format!(
                "Upload rejected ({}): {}",
                status, body
            )));
        }

        let uploaded: CloudinaryUploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::BlobStore(format!("Invalid upload response: {}", e)))?;

        tracing::info!(url = %uploaded.secure_url, "Image uploaded");
        Ok(UploadedBlob {
            url: uploaded.secure_url,
        })
    }
}

/// Cloudinary request signature: SHA-256 over the sorted `k=v&...` string
/// with the API secret appended.
fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{}{}", joined, api_secret).as_bytes()))
}
