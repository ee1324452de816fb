use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;

use kanda_core::event::{
    non_empty, PageExitData, PageViewRecord, PageviewData, TrackEnvelope, TrackEvent,
};
use kanda_core::geo::GeoLocation;
use kanda_core::referrer::{categorize_referrer, extract_search_keywords, extract_social_campaign};

use crate::enrich::{client_ip, parse_user_agent};
use crate::geo::locate_or_empty;
use crate::{error::AppError, state::AppState};

/// `POST /api/analytics/track`: ingest one tracking event.
///
/// Body: `{"eventType": "...", "data": {...}}`. Unknown event types and
/// payloads that do not fit their type are rejected with 400. Each store
/// write is independent; a failure part-way leaves earlier writes in place.
///
/// ## Response
/// `200 OK` with `{ "success": true }`.
#[tracing::instrument(skip(state, headers, payload))]
pub async fn track(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<TrackEnvelope>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(envelope) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Rejected tracking body");
        AppError::BadRequest("Invalid request body".to_string())
    })?;
    let event = TrackEvent::from_envelope(envelope)?;
    let kind = event.kind();

    dispatch(&state, &headers, event, Utc::now())
        .await
        .map_err(AppError::internal("Failed to track event"))?;

    tracing::debug!(event_type = %kind, "Event tracked");
    Ok(Json(json!({ "success": true })))
}

async fn dispatch(
    state: &AppState,
    headers: &HeaderMap,
    event: TrackEvent,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let store = &state.analytics;
    match event {
        TrackEvent::Pageview(data) => {
            let geo = locate_or_empty(state.geo.as_ref(), client_ip(headers).as_deref()).await;
            let record =
                build_page_view(data, headers, geo, state.config.site_host.as_deref(), now);
            store.insert_page_view(&record).await?;
            store.upsert_session(&record).await?;
        }
        TrackEvent::PageExit(data) => record_exit(state, &data, now).await?,
        TrackEvent::Scroll(data) => store.upsert_scroll(&data, now).await?,
        TrackEvent::Click(data) => store.insert_click(&data, now).await?,
        TrackEvent::FormInteraction(data) => store.insert_form_interaction(&data, now).await?,
        TrackEvent::FormSubmission(data) => {
            store.insert_form_submission(&data, now).await?;
            if data.success && !store.mark_converted(&data.session_id).await? {
                tracing::debug!(session_id = %data.session_id, "Conversion for unknown session");
            }
        }
    }
    Ok(())
}

/// Close the newest open view of the page, then the session. Both steps are
/// no-ops when there is nothing to close.
async fn record_exit(
    state: &AppState,
    data: &PageExitData,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let store = &state.analytics;
    if !store
        .mark_page_exit(&data.session_id, &data.page, data.time_on_page)
        .await?
    {
        tracing::debug!(session_id = %data.session_id, page = %data.page, "No open page view to exit");
    }

    match store.close_session(&data.session_id, &data.page, now).await? {
        Some(exit) => tracing::debug!(
            session_id = %data.session_id,
            duration_ms = exit.session_duration_ms,
            bounced = exit.bounced,
            "Session exit recorded"
        ),
        None => tracing::debug!(session_id = %data.session_id, "Page exit for unknown session"),
    }
    Ok(())
}

/// Enrich a client pageview into the stored record.
///
/// The `User-Agent` header stands in for a missing `userAgent`, and fills
/// device, browser and OS when the client did not report them.
pub fn build_page_view(
    data: PageviewData,
    headers: &HeaderMap,
    geo: GeoLocation,
    site_host: Option<&str>,
    now: DateTime<Utc>,
) -> PageViewRecord {
    let user_agent = non_empty(data.user_agent).or_else(|| {
        headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .filter(|v| !v.trim().is_empty())
    });

    let mut device = data.device.map(|d| d.as_str().to_string());
    let mut browser = non_empty(data.browser);
    let mut os = non_empty(data.os);
    if device.is_none() || browser.is_none() || os.is_none() {
        if let Some(ua) = user_agent.as_deref().and_then(parse_user_agent) {
            device = device.or_else(|| Some(ua.device.as_str().to_string()));
            browser = browser.or(ua.browser);
            os = os.or(ua.os);
        }
    }

    let referrer = non_empty(data.referrer);
    let utm = data.utm.normalized();
    let info = categorize_referrer(
        referrer.as_deref().unwrap_or(""),
        utm.utm_source.as_deref(),
        site_host,
    );
    let search_keywords = referrer.as_deref().and_then(extract_search_keywords);
    let social = referrer
        .as_deref()
        .map(extract_social_campaign)
        .unwrap_or_default();

    PageViewRecord {
        id: uuid::Uuid::new_v4().to_string(),
        session_id: data.session_id,
        page: data.page,
        timestamp: now,
        user_agent,
        referrer,
        referrer_category: info.category,
        referrer_source: info.source,
        search_keywords,
        social,
        geo,
        device,
        browser,
        os,
        screen_resolution: non_empty(data.screen_resolution),
        utm,
        entry_page: data.entry_page,
        is_returning: data.is_returning,
    }
}
