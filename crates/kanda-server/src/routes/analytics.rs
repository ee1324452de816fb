use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use kanda_core::analytics::{parse_period, ReportWindow};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    /// Window length in days. Kept as a string so garbage falls back to the
    /// default instead of failing extraction.
    pub period: Option<String>,
}

/// `GET /api/admin/analytics?period=N`: the dashboard report bundle.
///
/// `period` defaults to 7 days, falls back to 7 when not a positive integer,
/// and is capped at 365.
#[tracing::instrument(skip(state))]
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let days = parse_period(query.period.as_deref());
    let window = ReportWindow::last_days(days, Utc::now());

    let report = state
        .analytics
        .report(&window)
        .await
        .map_err(AppError::internal("Failed to fetch analytics"))?;

    Ok(Json(report))
}
