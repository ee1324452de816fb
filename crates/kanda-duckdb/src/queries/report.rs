use anyhow::Result;

use kanda_core::analytics::{AnalyticsReport, ReportWindow};

use crate::backend::ts;
use crate::queries::{breakdowns, engagement, summary};
use crate::DuckDbBackend;

/// Build the full dashboard bundle for `window`.
///
/// Every section is read under one lock acquisition, so the bundle reflects a
/// single store state.
pub async fn get_report_inner(
    db: &DuckDbBackend,
    window: &ReportWindow,
) -> Result<AnalyticsReport> {
    let start = ts(window.start);
    let realtime_cutoff = ts(window.realtime_cutoff());
    let conn = db.conn.lock().await;

    Ok(AnalyticsReport {
        period_days: (window.now - window.start).num_days(),
        summary: summary::query_summary(&conn, &start, &realtime_cutoff)?,
        page_views_by_page: breakdowns::query_pages(&conn, &start)?,
        entry_pages: breakdowns::query_entry_pages(&conn, &start)?,
        exit_pages: breakdowns::query_exit_pages(&conn, &start)?,
        top_clicked_elements: breakdowns::query_clicked_elements(&conn, &start)?,
        device_breakdown: breakdowns::query_devices(&conn, &start)?,
        browser_breakdown: breakdowns::query_browsers(&conn, &start)?,
        os_breakdown: breakdowns::query_os(&conn, &start)?,
        country_breakdown: breakdowns::query_countries(&conn, &start)?,
        city_breakdown: breakdowns::query_cities(&conn, &start)?,
        utm_sources: breakdowns::query_utm_sources(&conn, &start)?,
        utm_campaigns: breakdowns::query_utm_campaigns(&conn, &start)?,
        daily_stats: breakdowns::query_daily_views(&conn, &start)?,
        daily_visitors: breakdowns::query_daily_visitors(&conn, &start)?,
        top_referrers: breakdowns::query_referrers(&conn, &start)?,
        referrer_categories: breakdowns::query_referrer_categories(&conn, &start)?,
        user_flows: engagement::query_user_flows(&conn, &start)?,
        scroll_depth: engagement::query_scroll_depth(&conn, &start)?,
        form_analytics: engagement::query_form_analytics(&conn, &start)?,
        recent_conversions: engagement::query_recent_conversions(&conn, &realtime_cutoff)?,
        recent_activity: engagement::query_recent_activity(&conn, &start)?,
    })
}

impl DuckDbBackend {
    pub async fn get_report(&self, window: &ReportWindow) -> Result<AnalyticsReport> {
        get_report_inner(self, window).await
    }
}
