use async_trait::async_trait;
use chrono::{DateTime, Utc};

use kanda_core::analytics::{AnalyticsReport, AnalyticsStore, ReportWindow, SessionExit};
use kanda_core::event::{
    ClickData, FormInteractionData, FormSubmissionData, PageViewRecord, ScrollData,
};

use crate::DuckDbBackend;

#[async_trait]
impl AnalyticsStore for DuckDbBackend {
    async fn insert_page_view(&self, record: &PageViewRecord) -> anyhow::Result<()> {
        crate::tracking::insert_page_view_inner(self, record).await
    }

    async fn upsert_session(&self, record: &PageViewRecord) -> anyhow::Result<()> {
        crate::session::upsert_session_inner(self, record).await
    }

    async fn mark_page_exit(
        &self,
        session_id: &str,
        page: &str,
        time_on_page_ms: u64,
    ) -> anyhow::Result<bool> {
        crate::tracking::mark_page_exit_inner(self, session_id, page, time_on_page_ms).await
    }

    async fn close_session(
        &self,
        session_id: &str,
        exit_page: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<SessionExit>> {
        crate::session::close_session_inner(self, session_id, exit_page, now).await
    }

    async fn upsert_scroll(&self, data: &ScrollData, now: DateTime<Utc>) -> anyhow::Result<()> {
        crate::tracking::upsert_scroll_inner(self, data, now).await
    }

    async fn insert_click(&self, data: &ClickData, now: DateTime<Utc>) -> anyhow::Result<()> {
        crate::tracking::insert_click_inner(self, data, now).await
    }

    async fn insert_form_interaction(
        &self,
        data: &FormInteractionData,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        crate::tracking::insert_form_interaction_inner(self, data, now).await
    }

    async fn insert_form_submission(
        &self,
        data: &FormSubmissionData,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        crate::tracking::insert_form_submission_inner(self, data, now).await
    }

    async fn mark_converted(&self, session_id: &str) -> anyhow::Result<bool> {
        crate::session::mark_converted_inner(self, session_id).await
    }

    async fn report(&self, window: &ReportWindow) -> anyhow::Result<AnalyticsReport> {
        crate::queries::report::get_report_inner(self, window).await
    }
}
