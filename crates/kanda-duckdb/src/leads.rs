use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use kanda_core::lead::{LeadStatus, NewLead};
use kanda_metadata::Lead;

use crate::backend::{from_epoch_ms, new_id, ts};
use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Store a validated submission as a `new` lead and return its id.
    pub async fn insert_lead(&self, lead: &NewLead, now: DateTime<Utc>) -> Result<String> {
        let id = new_id();
        let services = serde_json::to_string(&lead.services)?;
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO leads (
                id, full_name, email, phone, business_name, instagram_handle,
                services, business_type, budget, biggest_goal, status, submitted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            duckdb::params![
                id,
                lead.full_name,
                lead.email,
                lead.phone,
                lead.business_name,
                lead.instagram_handle,
                services,
                lead.business_type,
                lead.budget,
                lead.biggest_goal,
                LeadStatus::New.as_str(),
                ts(now),
            ],
        )?;
        Ok(id)
    }

    /// All leads, newest submission first.
    pub async fn list_leads(&self) -> Result<Vec<Lead>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, full_name, email, phone, business_name, instagram_handle, \
                    services, business_type, budget, biggest_goal, status, \
                    epoch_ms(submitted_at), epoch_ms(updated_at) \
             FROM leads \
             ORDER BY submitted_at DESC, id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, String>(9)?,
                row.get::<_, String>(10)?,
                row.get::<_, i64>(11)?,
                row.get::<_, Option<i64>>(12)?,
            ))
        })?;

        let mut leads = Vec::new();
        for row in rows {
            let (
                id,
                full_name,
                email,
                phone,
                business_name,
                instagram_handle,
                services,
                business_type,
                budget,
                biggest_goal,
                status,
                submitted_ms,
                updated_ms,
            ) = row?;
            let status: LeadStatus = status
                .parse()
                .map_err(|_| anyhow!("lead {id} has unknown status {status:?}"))?;
            leads.push(Lead {
                services: serde_json::from_str(&services)?,
                id,
                full_name,
                email,
                phone,
                business_name,
                instagram_handle,
                business_type,
                budget,
                biggest_goal,
                status,
                submitted_at: from_epoch_ms(submitted_ms),
                updated_at: updated_ms.map(from_epoch_ms),
            });
        }
        Ok(leads)
    }

    /// Set the status and `updated_at`; `false` when the id is unknown.
    pub async fn update_lead_status(
        &self,
        id: &str,
        status: LeadStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            "UPDATE leads SET status = ?1, updated_at = ?2 WHERE id = ?3",
            duckdb::params![status.as_str(), ts(now), id],
        )?;
        Ok(rows > 0)
    }
}
