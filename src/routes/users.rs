// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: registration, login, token refresh, logout.

use crate::envelope::ApiResponse;
use crate::error::Result;
use crate::middleware::auth::{AuthUser, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::models::PublicUser;
use crate::routes::extract::{parse_json, read_multipart};
use crate::services::{Registration, TokenPair};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Headroom over the image limit for the text fields.
const FORM_BODY_LIMIT: usize = crate::services::blob_store::MAX_IMAGE_BYTES + 64 * 1024;

/// Routes that work without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/users/register",
            post(register).layer(DefaultBodyLimit::max(FORM_BODY_LIMIT)),
        )
        .route("/api/users/login", post(login))
        .route("/api/users/refresh-token", post(refresh_token))
}

/// Routes behind `require_auth`; the layer is applied in routes/mod.rs.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/logout", post(logout))
        .route("/api/users/me", get(me))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

fn auth_cookie(
    name: &'static str,
    value: String,
    ttl_secs: u64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(ttl_secs as i64))
        .build()
}

/// Attach both tokens as http-only cookies.
fn with_token_cookies(jar: CookieJar, state: &AppState, tokens: &TokenPair) -> CookieJar {
    let cfg = &state.config;
    jar.add(auth_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        cfg.access_token_ttl_secs,
        cfg.secure_cookies,
    ))
    .add(auth_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        cfg.refresh_token_ttl_secs,
        cfg.secure_cookies,
    ))
}

/// Register a new user from a multipart form with an `avatar` image.
async fn register(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<ApiResponse<PublicUser>> {
    let mut form = read_multipart(multipart, "avatar").await?;

    let registration = Registration {
        full_name: form.take("fullName"),
        email: form.take("email"),
        phone_number: form.take("phoneNumber"),
        password: form.take("password"),
        upi_id: form.take("upiId"),
    };

    let user = state.accounts.register(registration, form.image).await?;

    Ok(ApiResponse::ok(
        StatusCode::CREATED,
        user,
        "User registered successfully.",
    ))
}

/// Log in with email and password.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<LoginResponse>)> {
    let request: LoginRequest = parse_json(&body)?;

    let outcome = state
        .accounts
        .login(request.email.as_deref(), request.password.as_deref())
        .await?;

    let jar = with_token_cookies(jar, &state, &outcome.tokens);

    Ok((
        jar,
        ApiResponse::ok(
            StatusCode::OK,
            LoginResponse {
                user: outcome.user,
                access_token: outcome.tokens.access_token,
                refresh_token: outcome.tokens.refresh_token,
            },
            "User logged in successfully.",
        ),
    ))
}

/// Rotate tokens. The refresh token comes from the cookie or the JSON body.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<TokenResponse>)> {
    let token = match jar.get(REFRESH_TOKEN_COOKIE) {
        Some(cookie) => Some(cookie.value().to_string()),
        None => parse_json::<RefreshRequest>(&body)?.refresh_token,
    };

    let tokens = state.accounts.refresh(token.as_deref()).await?;
    let jar = with_token_cookies(jar, &state, &tokens);

    Ok((
        jar,
        ApiResponse::ok(
            StatusCode::OK,
            TokenResponse {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "Access token refreshed.",
        ),
    ))
}

/// Revoke the refresh token and clear both cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<()>)> {
    state.accounts.logout(&user.user_id).await?;

    let jar = jar
        .remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_TOKEN_COOKIE).path("/"));

    Ok((jar, ApiResponse::empty(StatusCode::OK, "User logged out.")))
}

/// Current user's public profile.
async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<PublicUser>> {
    let profile = state.accounts.current_user(&user.user_id).await?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        profile,
        "Current user fetched successfully.",
    ))
}
