use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use rishta_types::models::Admin;

use super::{OptionalExt, get_ts, get_uuid, ts};
use crate::Database;
use crate::models::AdminCredentials;

fn admin_from_row(row: &Row<'_>) -> rusqlite::Result<Admin> {
    Ok(Admin {
        id: get_uuid(row, 0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        created_at: get_ts(row, 3)?,
    })
}

impl Database {
    pub fn create_admin(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Admin> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO admins (id, email, name, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id.to_string(), email, name, password_hash, ts(now)),
            )?;
            Ok(Admin {
                id,
                email: email.to_string(),
                name: name.to_string(),
                created_at: now,
            })
        })
    }

    pub fn count_admins(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM admins", [], |r| r.get(0))?))
    }

    pub fn get_admin(&self, id: Uuid) -> Result<Option<Admin>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, name, created_at FROM admins WHERE id = ?1",
                [id.to_string()],
                admin_from_row,
            )
            .optional()
        })
    }

    pub fn get_admin_credentials(&self, email: &str) -> Result<Option<AdminCredentials>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, name, created_at, password FROM admins WHERE email = ?1",
                [email],
                |row| {
                    Ok(AdminCredentials {
                        admin: admin_from_row(row)?,
                        password_hash: row.get(4)?,
                    })
                },
            )
            .optional()
        })
    }
}
