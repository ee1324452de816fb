use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use kanda_core::config::AuthMode;

use crate::{error::AppError, state::AppState};

use super::jwt::encode_jwt;
use super::middleware::{session_token, validate_session};
use super::password::verify_password;
use super::SESSION_COOKIE;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /api/auth/login`: email + password against the `admins` table.
///
/// Unknown email and wrong password are indistinguishable (both 401).
#[tracing::instrument(skip_all)]
pub async fn auth_login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Rejected login body");
        AppError::BadRequest("Invalid request body".to_string())
    })?;
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let admin = state
        .metadata
        .find_admin(&email)
        .await
        .map_err(AppError::internal("Failed to log in"))?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&req.password, &admin.password_hash) {
        tracing::warn!(email = %email, "Failed admin login");
        return Err(AppError::Unauthorized);
    }

    let jwt_secret = state
        .metadata
        .ensure_jwt_secret()
        .await
        .map_err(AppError::internal("Failed to log in"))?;
    let (token, expires_at) = encode_jwt(
        &jwt_secret,
        &admin.email,
        admin.role.as_str(),
        state.config.session_hours,
    )
    .map_err(AppError::internal("Failed to log in"))?;

    let cookie = build_session_cookie(
        &token,
        state.config.https,
        state.config.session_max_age_secs(),
    );
    tracing::info!(email = %admin.email, "Admin logged in");
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "success": true,
            "user": { "email": admin.email, "role": admin.role.as_str() },
            "expiresAt": expires_at.to_rfc3339(),
        })),
    ))
}

/// `POST /api/auth/logout`: clear session cookie. Always 200.
pub async fn auth_logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cookie = clear_session_cookie(state.config.https);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    )
}

/// `GET /api/auth/session`: 401 unless the cookie holds a valid token.
pub async fn auth_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if state.config.auth_mode == AuthMode::None {
        return Ok(Json(json!({ "authenticated": true, "mode": "none" })));
    }

    let token = session_token(&headers).ok_or(AppError::Unauthorized)?;
    let claims = validate_session(&state, &token)
        .await
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(json!({
        "authenticated": true,
        "mode": "local",
        "user": { "email": claims.sub, "role": claims.role },
        "expiresAt": chrono::DateTime::from_timestamp(claims.exp, 0)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default(),
    })))
}

fn build_session_cookie(token: &str, https: bool, max_age_secs: u64) -> String {
    let secure = if https { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age_secs}{secure}")
}

fn clear_session_cookie(https: bool) -> String {
    let secure = if https { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0{secure}")
}
