// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request body helpers that report failures through `AppError`.

use crate::error::{AppError, Result};
use crate::services::ImageUpload;
use axum::body::Bytes;
use axum::extract::Multipart;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Text fields and at most one image from a multipart form.
#[derive(Debug, Default)]
pub struct FormParts {
    fields: HashMap<String, String>,
    pub image: Option<ImageUpload>,
}

impl FormParts {
    /// Take a text field out of the form.
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }
}

/// Drain a multipart body. The part named `image_field` is kept as bytes,
/// every other part is read as text.
pub async fn read_multipart(mut multipart: Multipart, image_field: &str) -> Result<FormParts> {
    let mut parts = FormParts::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == image_field {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
            parts.image = Some(ImageUpload {
                bytes: bytes.to_vec(),
                content_type,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
            parts.fields.insert(name, value);
        }
    }

    Ok(parts)
}

/// Parse a JSON body; an empty body yields the default value.
pub fn parse_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))
}
