use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use kanda_core::config::AuthMode;
use kanda_metadata::AdminRole;

use crate::{error::AppError, state::AppState};

use super::jwt::{decode_jwt, Claims};
use super::SESSION_COOKIE;

/// Guard for `/api/admin/*`: a valid session cookie whose role is `admin`.
///
/// Open in `KANDA_AUTH=none` mode.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.config.auth_mode == AuthMode::None {
        return next.run(request).await;
    }

    let Some(token) = session_token(request.headers()) else {
        return AppError::Unauthorized.into_response();
    };

    match validate_session(&state, &token).await {
        Some(claims) if AdminRole::parse(&claims.role) == AdminRole::Admin => {
            tracing::debug!(admin = %claims.sub, "Admin request authorized");
            next.run(request).await
        }
        _ => AppError::Unauthorized.into_response(),
    }
}

/// Extract the session token from the `Cookie` header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{SESSION_COOKIE}=");
    headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookie_str| {
            cookie_str
                .split(';')
                .find_map(|c| c.trim().strip_prefix(prefix.as_str()))
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string())
        })
}

/// Decode `token` with the stored signing secret. Any failure is `None`.
pub async fn validate_session(state: &AppState, token: &str) -> Option<Claims> {
    let jwt_secret = match state.metadata.get_setting("jwt_secret").await {
        Ok(Some(secret)) => secret,
        Ok(None) => return None,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read JWT secret");
            return None;
        }
    };
    decode_jwt(token, &jwt_secret).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_the_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; kanda_session=abc.def.ghi; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn empty_cookie_value_is_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("kanda_session="));
        assert_eq!(session_token(&headers), None);
    }
}
