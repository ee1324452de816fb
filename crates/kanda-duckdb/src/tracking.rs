//! Append-only event writes plus the two in-place event updates
//! (page exit marking and the scroll keep-maximum).

use anyhow::Result;
use chrono::{DateTime, Utc};
use duckdb::OptionalExt;

use kanda_core::event::{
    ClickData, FormInteractionData, FormSubmissionData, PageViewRecord, ScrollData,
};

use crate::backend::{new_id, ts};
use crate::DuckDbBackend;

pub(crate) async fn insert_page_view_inner(db: &DuckDbBackend, pv: &PageViewRecord) -> Result<()> {
    let conn = db.conn.lock().await;
    conn.execute(
        r#"INSERT INTO page_views (
            id, session_id, page, created_at,
            user_agent, referrer, referrer_category, referrer_source, search_keywords,
            country, country_code, city, region, latitude, longitude, timezone, ip,
            device, browser, os, screen_resolution,
            utm_source, utm_medium, utm_campaign, utm_term, utm_content,
            entry_page, is_returning, social_platform, social_campaign_id
        ) VALUES (
            ?1,  ?2,  ?3,  ?4,
            ?5,  ?6,  ?7,  ?8,  ?9,
            ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
            ?18, ?19, ?20, ?21,
            ?22, ?23, ?24, ?25, ?26,
            ?27, ?28, ?29, ?30
        )"#,
        duckdb::params![
            pv.id,
            pv.session_id,
            pv.page,
            ts(pv.timestamp),
            pv.user_agent,
            pv.referrer,
            pv.referrer_category.as_str(),
            pv.referrer_source,
            pv.search_keywords,
            pv.geo.country,
            pv.geo.country_code,
            pv.geo.city,
            pv.geo.region,
            pv.geo.latitude,
            pv.geo.longitude,
            pv.geo.timezone,
            pv.geo.ip,
            pv.device,
            pv.browser,
            pv.os,
            pv.screen_resolution,
            pv.utm.utm_source,
            pv.utm.utm_medium,
            pv.utm.utm_campaign,
            pv.utm.utm_term,
            pv.utm.utm_content,
            pv.entry_page,
            pv.is_returning,
            pv.social.platform,
            pv.social.campaign_id,
        ],
    )?;
    Ok(())
}

/// Mark the newest not-yet-exited view of `page` in this session.
pub(crate) async fn mark_page_exit_inner(
    db: &DuckDbBackend,
    session_id: &str,
    page: &str,
    time_on_page_ms: u64,
) -> Result<bool> {
    let conn = db.conn.lock().await;

    let id: Option<String> = conn
        .prepare(
            "SELECT id FROM page_views \
             WHERE session_id = ?1 AND page = ?2 AND exit_page = false \
             ORDER BY created_at DESC \
             LIMIT 1",
        )?
        .query_row(duckdb::params![session_id, page], |row| row.get(0))
        .optional()?;

    let Some(id) = id else {
        return Ok(false);
    };

    let time_on_page = i64::try_from(time_on_page_ms).unwrap_or(i64::MAX);
    conn.execute(
        "UPDATE page_views SET exit_page = true, time_on_page = ?1 WHERE id = ?2",
        duckdb::params![time_on_page, id],
    )?;
    Ok(true)
}

/// Keep-maximum upsert keyed on `(session_id, page)`.
pub(crate) async fn upsert_scroll_inner(
    db: &DuckDbBackend,
    data: &ScrollData,
    now: DateTime<Utc>,
) -> Result<()> {
    let conn = db.conn.lock().await;
    conn.execute(
        "INSERT INTO scroll_events (session_id, page, scroll_depth, max_scroll_depth, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (session_id, page) DO UPDATE SET \
             scroll_depth = EXCLUDED.scroll_depth, \
             max_scroll_depth = GREATEST(scroll_events.max_scroll_depth, EXCLUDED.max_scroll_depth), \
             created_at = EXCLUDED.created_at",
        duckdb::params![
            data.session_id,
            data.page,
            i64::from(data.scroll_depth.min(100)),
            i64::from(data.depth_candidate()),
            ts(now),
        ],
    )?;
    Ok(())
}

pub(crate) async fn insert_click_inner(
    db: &DuckDbBackend,
    data: &ClickData,
    now: DateTime<Utc>,
) -> Result<()> {
    let conn = db.conn.lock().await;
    conn.execute(
        "INSERT INTO click_events \
             (id, session_id, element_id, element_type, element_text, page, x_position, y_position, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        duckdb::params![
            new_id(),
            data.session_id,
            data.element_id,
            data.element_type,
            data.element_text,
            data.page,
            data.x_position,
            data.y_position,
            ts(now),
        ],
    )?;
    Ok(())
}

pub(crate) async fn insert_form_interaction_inner(
    db: &DuckDbBackend,
    data: &FormInteractionData,
    now: DateTime<Utc>,
) -> Result<()> {
    let conn = db.conn.lock().await;
    conn.execute(
        "INSERT INTO form_interactions \
             (id, session_id, form_id, field_name, action, time_spent, page, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        duckdb::params![
            new_id(),
            data.session_id,
            data.form_id,
            data.field_name,
            data.action.as_str(),
            data.time_spent.map(|ms| i64::try_from(ms).unwrap_or(i64::MAX)),
            data.page,
            ts(now),
        ],
    )?;
    Ok(())
}

pub(crate) async fn insert_form_submission_inner(
    db: &DuckDbBackend,
    data: &FormSubmissionData,
    now: DateTime<Utc>,
) -> Result<()> {
    let field_errors = data
        .field_errors
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let conn = db.conn.lock().await;
    conn.execute(
        "INSERT INTO form_submissions \
             (id, session_id, form_type, page, success, time_taken, field_errors, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        duckdb::params![
            new_id(),
            data.session_id,
            data.form_type,
            data.page,
            data.success,
            data.time_taken.map(|ms| i64::try_from(ms).unwrap_or(i64::MAX)),
            field_errors,
            ts(now),
        ],
    )?;
    Ok(())
}
