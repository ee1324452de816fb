//! Analytics store abstraction and the reporting DTOs it produces.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::event::{
    ClickData, FormInteractionData, FormSubmissionData, PageViewRecord, ScrollData,
};

pub const DEFAULT_PERIOD_DAYS: u32 = 7;
pub const MAX_PERIOD_DAYS: u32 = 365;
/// Cap for every "top N" breakdown.
pub const TOP_N: usize = 10;
pub const RECENT_ACTIVITY_LIMIT: usize = 20;
pub const RECENT_CONVERSIONS_LIMIT: usize = 5;
/// Look-back used for "active now" visitors and recent conversions.
pub const REALTIME_WINDOW_MINUTES: i64 = 5;

/// Parse the `period` query parameter. Missing, non-numeric or zero values
/// fall back to [`DEFAULT_PERIOD_DAYS`]; large values are capped.
pub fn parse_period(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|days| *days > 0)
        .map(|days| days.min(MAX_PERIOD_DAYS))
        .unwrap_or(DEFAULT_PERIOD_DAYS)
}

/// The time range a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl ReportWindow {
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(i64::from(days)),
            now,
        }
    }

    pub fn realtime_cutoff(&self) -> DateTime<Utc> {
        self.now - Duration::minutes(REALTIME_WINDOW_MINUTES)
    }
}

/// What `close_session` observed and wrote for a page exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionExit {
    pub session_duration_ms: i64,
    pub page_views: i64,
    pub bounced: bool,
}

/// Persistence operations behind the ingestion and reporting endpoints.
///
/// Each method is one independent store primitive; callers compose them
/// without a surrounding transaction.
#[async_trait]
pub trait AnalyticsStore: Send + Sync + 'static {
    async fn insert_page_view(&self, record: &PageViewRecord) -> anyhow::Result<()>;

    /// Create or update the session a pageview belongs to.
    async fn upsert_session(&self, record: &PageViewRecord) -> anyhow::Result<()>;

    /// Mark the newest page view for `(session_id, page)` that has not exited
    /// yet. Returns `false` when no such row exists.
    async fn mark_page_exit(
        &self,
        session_id: &str,
        page: &str,
        time_on_page_ms: u64,
    ) -> anyhow::Result<bool>;

    /// Record exit page, duration and bounce classification on the session.
    /// Returns `None` (and writes nothing) when the session does not exist.
    async fn close_session(
        &self,
        session_id: &str,
        exit_page: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<SessionExit>>;

    async fn upsert_scroll(&self, data: &ScrollData, now: DateTime<Utc>) -> anyhow::Result<()>;

    async fn insert_click(&self, data: &ClickData, now: DateTime<Utc>) -> anyhow::Result<()>;

    async fn insert_form_interaction(
        &self,
        data: &FormInteractionData,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    async fn insert_form_submission(
        &self,
        data: &FormSubmissionData,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// Set `converted = true` on the session. Returns `false` when the
    /// session does not exist.
    async fn mark_converted(&self, session_id: &str) -> anyhow::Result<bool>;

    async fn report(&self, window: &ReportWindow) -> anyhow::Result<AnalyticsReport>;
}

/// `numerator / denominator * 100`, rounded to two decimals; 0 when the
/// denominator is zero.
pub fn percentage(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        return 0.0;
    }
    round2(numerator as f64 / denominator as f64 * 100.0)
}

pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

/// Convert an average in milliseconds to whole seconds; `None`/NaN → 0.
pub fn ms_to_seconds(avg_ms: Option<f64>) -> i64 {
    match avg_ms {
        Some(ms) if ms.is_finite() => (ms / 1000.0).round() as i64,
        _ => 0,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_page_views: i64,
    pub total_sessions: i64,
    pub total_clicks: i64,
    /// Successful submissions only.
    pub total_form_submissions: i64,
    pub conversions: i64,
    pub conversion_rate: f64,
    pub bounce_rate: f64,
    /// Seconds.
    pub avg_session_duration: i64,
    pub avg_pages_per_session: f64,
    pub returning_visitors: i64,
    pub new_visitors: i64,
    pub active_visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStat {
    pub page: String,
    pub views: i64,
    /// Seconds.
    pub avg_time_on_page: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageCount {
    pub page: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickedElement {
    pub element_id: String,
    pub element_type: String,
    pub element_text: Option<String>,
    pub clicks: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowserCount {
    pub browser: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OsCount {
    pub os: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryCount {
    pub country: String,
    pub visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityCount {
    pub city: String,
    pub country: Option<String>,
    pub visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtmSourceStat {
    pub source: String,
    pub visitors: i64,
    pub conversions: i64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtmCampaignStat {
    pub campaign: String,
    pub visitors: i64,
    pub conversions: i64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyViews {
    pub date: String,
    pub views: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyVisitors {
    pub date: String,
    pub visitors: i64,
    pub conversions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferrerStat {
    pub referrer: String,
    /// Bare hostname for display.
    pub label: String,
    pub count: i64,
    pub conversions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferrerCategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserFlow {
    pub path: Vec<String>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollDepthStat {
    pub page: String,
    pub avg_max_scroll: i64,
    pub sessions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormAbandonment {
    pub form_id: String,
    pub interactions: i64,
    pub unique_sessions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmissionStat {
    pub form_type: String,
    pub total: i64,
    pub successful: i64,
    pub success_rate: f64,
    /// Seconds.
    pub avg_time_taken: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormAnalytics {
    pub abandonments: Vec<FormAbandonment>,
    pub submissions: Vec<FormSubmissionStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentConversion {
    pub form_type: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub session_id: String,
    pub page: String,
    pub timestamp: DateTime<Utc>,
    pub device: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub browser: Option<String>,
}

/// Everything the admin dashboard renders for one period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub period_days: i64,
    pub summary: ReportSummary,
    pub page_views_by_page: Vec<PageStat>,
    pub entry_pages: Vec<PageCount>,
    pub exit_pages: Vec<PageCount>,
    pub top_clicked_elements: Vec<ClickedElement>,
    pub device_breakdown: BTreeMap<String, i64>,
    pub browser_breakdown: Vec<BrowserCount>,
    pub os_breakdown: Vec<OsCount>,
    pub country_breakdown: Vec<CountryCount>,
    pub city_breakdown: Vec<CityCount>,
    pub utm_sources: Vec<UtmSourceStat>,
    pub utm_campaigns: Vec<UtmCampaignStat>,
    pub daily_stats: Vec<DailyViews>,
    pub daily_visitors: Vec<DailyVisitors>,
    pub top_referrers: Vec<ReferrerStat>,
    pub referrer_categories: Vec<ReferrerCategoryCount>,
    pub user_flows: Vec<UserFlow>,
    pub scroll_depth: Vec<ScrollDepthStat>,
    pub form_analytics: FormAnalytics,
    pub recent_conversions: Vec<RecentConversion>,
    pub recent_activity: Vec<RecentActivity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_zero_without_denominator() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 0), 0.0);
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 2), 100.0);
    }

    #[test]
    fn ms_to_seconds_handles_missing_and_nan() {
        assert_eq!(ms_to_seconds(None), 0);
        assert_eq!(ms_to_seconds(Some(f64::NAN)), 0);
        assert_eq!(ms_to_seconds(Some(12_600.0)), 13);
    }

    #[test]
    fn period_parsing_defaults_and_caps() {
        assert_eq!(parse_period(None), 7);
        assert_eq!(parse_period(Some("abc")), 7);
        assert_eq!(parse_period(Some("0")), 7);
        assert_eq!(parse_period(Some("30")), 30);
        assert_eq!(parse_period(Some("9999")), MAX_PERIOD_DAYS);
    }

    #[test]
    fn window_covers_requested_days() {
        let now = Utc::now();
        let window = ReportWindow::last_days(7, now);
        assert_eq!(window.now - window.start, Duration::days(7));
        assert_eq!(window.now - window.realtime_cutoff(), Duration::minutes(5));
    }
}
