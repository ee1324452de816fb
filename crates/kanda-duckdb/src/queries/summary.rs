use anyhow::Result;
use duckdb::Connection;

use kanda_core::analytics::{ms_to_seconds, percentage, round2, ReportSummary};

/// Headline counters and rates.
///
/// Session metrics are scoped by `first_seen >= start`, event metrics by
/// `created_at >= start`. `active_visitors` uses its own 5-minute cutoff.
pub(crate) fn query_summary(
    conn: &Connection,
    start: &str,
    realtime_cutoff: &str,
) -> Result<ReportSummary> {
    let total_page_views: i64 = conn
        .prepare("SELECT COUNT(*) FROM page_views WHERE created_at >= ?1")?
        .query_row(duckdb::params![start], |row| row.get(0))?;

    let total_clicks: i64 = conn
        .prepare("SELECT COUNT(*) FROM click_events WHERE created_at >= ?1")?
        .query_row(duckdb::params![start], |row| row.get(0))?;

    let total_form_submissions: i64 = conn
        .prepare("SELECT COUNT(*) FROM form_submissions WHERE created_at >= ?1 AND success")?
        .query_row(duckdb::params![start], |row| row.get(0))?;

    let (total_sessions, conversions, bounced, avg_duration_ms, avg_pages, returning): (
        i64,
        i64,
        i64,
        Option<f64>,
        Option<f64>,
        i64,
    ) = conn
        .prepare(
            "SELECT \
                 COUNT(*), \
                 COUNT(*) FILTER (WHERE converted), \
                 COUNT(*) FILTER (WHERE bounced), \
                 AVG(session_duration), \
                 AVG(page_views), \
                 COUNT(*) FILTER (WHERE is_returning) \
             FROM user_sessions \
             WHERE first_seen >= ?1",
        )?
        .query_row(duckdb::params![start], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })?;

    let active_visitors: i64 = conn
        .prepare("SELECT COUNT(DISTINCT session_id) FROM page_views WHERE created_at >= ?1")?
        .query_row(duckdb::params![realtime_cutoff], |row| row.get(0))?;

    Ok(ReportSummary {
        total_page_views,
        total_sessions,
        total_clicks,
        total_form_submissions,
        conversions,
        conversion_rate: percentage(conversions, total_sessions),
        bounce_rate: percentage(bounced, total_sessions),
        avg_session_duration: ms_to_seconds(avg_duration_ms),
        avg_pages_per_session: avg_pages.map(round2).unwrap_or(0.0),
        returning_visitors: returning,
        new_visitors: total_sessions - returning,
        active_visitors,
    })
}
