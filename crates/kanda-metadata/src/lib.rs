use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use kanda_core::lead::{LeadStatus, NewLead};

/// A stored lead as returned by the admin listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub business_name: String,
    pub instagram_handle: String,
    pub services: Vec<String>,
    pub business_type: String,
    pub budget: String,
    pub biggest_goal: String,
    pub status: LeadStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRole {
    Admin,
    Viewer,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::Admin => "admin",
            AdminRole::Viewer => "viewer",
        }
    }

    /// Unknown stored roles are treated as read-only.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "admin" => AdminRole::Admin,
            _ => AdminRole::Viewer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminRecord {
    pub email: String,
    pub password_hash: String,
    pub role: AdminRole,
}

/// Storage interface for everything that is not behavioural analytics:
/// leads, admin accounts and server settings.
#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    async fn get_setting(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set_setting(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn ensure_jwt_secret(&self) -> anyhow::Result<String>;

    /// Insert an admin. Returns `false` (and changes nothing) when one with
    /// this email already exists.
    async fn create_admin(
        &self,
        email: &str,
        password_hash: &str,
        role: AdminRole,
    ) -> anyhow::Result<bool>;
    async fn find_admin(&self, email: &str) -> anyhow::Result<Option<AdminRecord>>;

    /// Store a validated submission with `status = new`; returns the new id.
    async fn insert_lead(&self, lead: &NewLead, now: DateTime<Utc>) -> anyhow::Result<String>;

    /// All leads, most recently submitted first.
    async fn list_leads(&self) -> anyhow::Result<Vec<Lead>>;

    /// Returns `false` when no lead has this id.
    async fn update_lead_status(
        &self,
        id: &str,
        status: LeadStatus,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool>;
}
