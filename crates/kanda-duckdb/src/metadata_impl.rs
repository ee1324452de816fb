use async_trait::async_trait;
use chrono::{DateTime, Utc};

use kanda_core::lead::{LeadStatus, NewLead};
use kanda_metadata::{AdminRecord, AdminRole, Lead, MetadataStore};

use crate::DuckDbBackend;

#[async_trait]
impl MetadataStore for DuckDbBackend {
    async fn get_setting(&self, key: &str) -> anyhow::Result<Option<String>> {
        DuckDbBackend::get_setting(self, key).await
    }

    async fn set_setting(&self, key: &str, value: &str) -> anyhow::Result<()> {
        DuckDbBackend::set_setting(self, key, value).await
    }

    async fn ensure_jwt_secret(&self) -> anyhow::Result<String> {
        DuckDbBackend::ensure_jwt_secret(self).await
    }

    async fn create_admin(
        &self,
        email: &str,
        password_hash: &str,
        role: AdminRole,
    ) -> anyhow::Result<bool> {
        DuckDbBackend::create_admin(self, email, password_hash, role).await
    }

    async fn find_admin(&self, email: &str) -> anyhow::Result<Option<AdminRecord>> {
        DuckDbBackend::find_admin(self, email).await
    }

    async fn insert_lead(&self, lead: &NewLead, now: DateTime<Utc>) -> anyhow::Result<String> {
        DuckDbBackend::insert_lead(self, lead, now).await
    }

    async fn list_leads(&self) -> anyhow::Result<Vec<Lead>> {
        DuckDbBackend::list_leads(self).await
    }

    async fn update_lead_status(
        &self,
        id: &str,
        status: LeadStatus,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        DuckDbBackend::update_lead_status(self, id, status, now).await
    }
}
