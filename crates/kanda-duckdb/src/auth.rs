use anyhow::Result;
use duckdb::OptionalExt;

use kanda_metadata::{AdminRecord, AdminRole};

use crate::backend::rand_hex;
use crate::DuckDbBackend;

impl DuckDbBackend {
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let result = conn
            .prepare("SELECT value FROM settings WHERE key = ?1")?
            .query_row(duckdb::params![key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(result)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
            duckdb::params![key, value],
        )?;
        Ok(())
    }

    /// Return the JWT signing secret, generating and storing one on first use.
    pub async fn ensure_jwt_secret(&self) -> Result<String> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES ('jwt_secret', ?1)",
            duckdb::params![rand_hex(32)],
        )?;
        let secret: String = conn
            .prepare("SELECT value FROM settings WHERE key = 'jwt_secret'")?
            .query_row([], |row| row.get(0))?;
        Ok(secret)
    }

    /// Insert an admin unless one with this email already exists.
    pub async fn create_admin(
        &self,
        email: &str,
        password_hash: &str,
        role: AdminRole,
    ) -> Result<bool> {
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            "INSERT OR IGNORE INTO admins (email, password_hash, role, created_at) \
             VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)",
            duckdb::params![email, password_hash, role.as_str()],
        )?;
        Ok(rows > 0)
    }

    pub async fn find_admin(&self, email: &str) -> Result<Option<AdminRecord>> {
        let conn = self.conn.lock().await;
        let admin = conn
            .prepare("SELECT email, password_hash, role FROM admins WHERE email = ?1")?
            .query_row(duckdb::params![email], |row| {
                Ok(AdminRecord {
                    email: row.get(0)?,
                    password_hash: row.get(1)?,
                    role: AdminRole::parse(&row.get::<_, String>(2)?),
                })
            })
            .optional()?;
        Ok(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn jwt_secret_is_stable_across_calls() {
        let db = DuckDbBackend::open_in_memory().expect("db");
        let first = db.ensure_jwt_secret().await.expect("secret");
        let second = db.ensure_jwt_secret().await.expect("secret");
        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn fresh_store_has_no_settings_until_the_secret_is_made() {
        let db = DuckDbBackend::open_in_memory().expect("db");
        let count = |conn: &duckdb::Connection| -> i64 {
            conn.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))
                .expect("count")
        };
        assert_eq!(count(&*db.conn_for_test().await), 0);
        assert!(db.get_setting("jwt_secret").await.expect("get").is_none());

        db.ensure_jwt_secret().await.expect("secret");
        assert_eq!(count(&*db.conn_for_test().await), 1);
    }

    #[tokio::test]
    async fn create_admin_is_idempotent() {
        let db = DuckDbBackend::open_in_memory().expect("db");
        assert!(db
            .create_admin("ops@kanda.test", "hash-1", AdminRole::Admin)
            .await
            .expect("create"));
        assert!(!db
            .create_admin("ops@kanda.test", "hash-2", AdminRole::Viewer)
            .await
            .expect("create"));

        let admin = db
            .find_admin("ops@kanda.test")
            .await
            .expect("find")
            .expect("admin exists");
        assert_eq!(admin.password_hash, "hash-1");
        assert_eq!(admin.role, AdminRole::Admin);
        assert!(db.find_admin("nobody@kanda.test").await.expect("find").is_none());
    }
}
