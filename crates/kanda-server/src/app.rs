use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth, routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// `/api/admin/*` sits behind [`auth::middleware::require_admin`]. Outer
/// layers:
///
/// 1. `TraceLayer` for request/response spans.
/// 2. `CorsLayer`: any origin when `KANDA_CORS_ORIGINS` is empty, otherwise
///    the listed origins with credentials allowed.
pub fn build_app(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/api/admin/analytics", get(routes::analytics::get_analytics))
        .route("/api/admin/leads", get(routes::leads::list_leads))
        .route(
            "/api/admin/leads/{id}",
            patch(routes::leads::update_lead_status),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::middleware::require_admin,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/analytics/track", post(routes::track::track))
        .route("/api/submit-lead", post(routes::leads::submit_lead))
        .route("/api/auth/login", post(auth::handlers::auth_login))
        .route("/api/auth/logout", post(auth::handlers::auth_logout))
        .route("/api/auth/session", get(auth::handlers::auth_session))
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    if allowed.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
