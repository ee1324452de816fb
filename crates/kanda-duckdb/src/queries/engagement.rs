use std::collections::HashMap;

use anyhow::Result;
use duckdb::Connection;

use kanda_core::analytics::{
    ms_to_seconds, percentage, FormAbandonment, FormAnalytics, FormSubmissionStat,
    RecentActivity, RecentConversion, ScrollDepthStat, UserFlow, RECENT_ACTIVITY_LIMIT,
    RECENT_CONVERSIONS_LIMIT, TOP_N,
};
use kanda_core::session::FLOW_PREFIX_LEN;

use crate::backend::from_epoch_ms;

/// Most common opening paths: the first five distinct pages of each session.
///
/// `pages_visited` is JSON text, so grouping happens here rather than in SQL.
pub(crate) fn query_user_flows(conn: &Connection, start: &str) -> Result<Vec<UserFlow>> {
    let mut stmt = conn.prepare(
        "SELECT pages_visited FROM user_sessions \
         WHERE first_seen >= ?1 AND pages_visited <> '[]'",
    )?;
    let rows = stmt.query_map(duckdb::params![start], |row| row.get::<_, String>(0))?;

    let mut counts: HashMap<Vec<String>, i64> = HashMap::new();
    for row in rows {
        let raw = row?;
        let Ok(mut pages) = serde_json::from_str::<Vec<String>>(&raw) else {
            tracing::warn!(pages_visited = %raw, "Skipping unreadable pages_visited");
            continue;
        };
        if pages.is_empty() {
            continue;
        }
        pages.truncate(FLOW_PREFIX_LEN);
        *counts.entry(pages).or_default() += 1;
    }

    let mut flows: Vec<UserFlow> = counts
        .into_iter()
        .map(|(path, count)| UserFlow { path, count })
        .collect();
    flows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
    flows.truncate(TOP_N);
    Ok(flows)
}

pub(crate) fn query_scroll_depth(conn: &Connection, start: &str) -> Result<Vec<ScrollDepthStat>> {
    let mut stmt = conn.prepare(
        "SELECT page, AVG(max_scroll_depth), COUNT(*) AS sessions \
         FROM scroll_events \
         WHERE created_at >= ?1 \
         GROUP BY page ORDER BY sessions DESC, page LIMIT ?2",
    )?;
    let rows = stmt.query_map(duckdb::params![start, TOP_N as i64], |row| {
        let avg: Option<f64> = row.get(1)?;
        Ok(ScrollDepthStat {
            page: row.get(0)?,
            avg_max_scroll: avg.filter(|v| v.is_finite()).map(|v| v.round() as i64).unwrap_or(0),
            sessions: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

pub(crate) fn query_form_analytics(conn: &Connection, start: &str) -> Result<FormAnalytics> {
    let mut stmt = conn.prepare(
        "SELECT form_id, COUNT(*) AS interactions, COUNT(DISTINCT session_id) \
         FROM form_interactions \
         WHERE created_at >= ?1 \
         GROUP BY form_id ORDER BY interactions DESC, form_id LIMIT ?2",
    )?;
    let abandonments = stmt
        .query_map(duckdb::params![start, TOP_N as i64], |row| {
            Ok(FormAbandonment {
                form_id: row.get(0)?,
                interactions: row.get(1)?,
                unique_sessions: row.get(2)?,
            })
        })?
        .collect::<duckdb::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT form_type, COUNT(*) AS total, COUNT(*) FILTER (WHERE success), AVG(time_taken) \
         FROM form_submissions \
         WHERE created_at >= ?1 \
         GROUP BY form_type ORDER BY total DESC, form_type LIMIT ?2",
    )?;
    let submissions = stmt
        .query_map(duckdb::params![start, TOP_N as i64], |row| {
            let total: i64 = row.get(1)?;
            let successful: i64 = row.get(2)?;
            Ok(FormSubmissionStat {
                form_type: row.get(0)?,
                total,
                successful,
                success_rate: percentage(successful, total),
                avg_time_taken: ms_to_seconds(row.get::<_, Option<f64>>(3)?),
            })
        })?
        .collect::<duckdb::Result<Vec<_>>>()?;

    Ok(FormAnalytics {
        abandonments,
        submissions,
    })
}

/// Successful submissions since `cutoff`, newest first.
pub(crate) fn query_recent_conversions(
    conn: &Connection,
    cutoff: &str,
) -> Result<Vec<RecentConversion>> {
    let mut stmt = conn.prepare(
        "SELECT form_type, epoch_ms(created_at) FROM form_submissions \
         WHERE created_at >= ?1 AND success \
         ORDER BY created_at DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(
        duckdb::params![cutoff, RECENT_CONVERSIONS_LIMIT as i64],
        |row| {
            Ok(RecentConversion {
                form_type: row.get(0)?,
                timestamp: from_epoch_ms(row.get(1)?),
            })
        },
    )?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

/// Newest page views in the window.
pub(crate) fn query_recent_activity(conn: &Connection, start: &str) -> Result<Vec<RecentActivity>> {
    let mut stmt = conn.prepare(
        "SELECT session_id, page, epoch_ms(created_at), device, country, city, browser \
         FROM page_views \
         WHERE created_at >= ?1 \
         ORDER BY created_at DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(
        duckdb::params![start, RECENT_ACTIVITY_LIMIT as i64],
        |row| {
            Ok(RecentActivity {
                session_id: row.get(0)?,
                page: row.get(1)?,
                timestamp: from_epoch_ms(row.get(2)?),
                device: row.get(3)?,
                country: row.get(4)?,
                city: row.get(5)?,
                browser: row.get(6)?,
            })
        },
    )?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}
