use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use rishta_types::api::DashboardStats;
use rishta_types::models::{BoostStatus, Role, User};

use super::{OptionalExt, get_enum, get_opt_ts, get_ts, get_uuid, is_unique_violation, ts};
use crate::Database;
use crate::models::{NewUser, Page, UserCredentials, UserFilter};

pub(crate) const USER_COLUMNS: &str = "id, name, email, phone, role, is_verified, is_blocked, \
     block_reason, boost_status, boost_expires_at, created_at, updated_at";

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: get_uuid(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        role: get_enum(row, 4)?,
        is_verified: row.get(5)?,
        is_blocked: row.get(6)?,
        block_reason: row.get(7)?,
        boost_status: get_enum(row, 8)?,
        boost_expires_at: get_opt_ts(row, 9)?,
        created_at: get_ts(row, 10)?,
        updated_at: get_ts(row, 11)?,
    })
}

pub(crate) fn query_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, [id.to_string()], user_from_row).optional()
}

pub(crate) fn query_blocked_users(conn: &Connection, user_id: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT blocked_user_id FROM user_blocks WHERE user_id = ?1 ORDER BY created_at",
    )?;
    let ids = stmt
        .query_map([user_id.to_string()], |row| get_uuid(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

impl Database {
    // -- Members --

    /// Returns `None` when the email is already registered.
    pub fn create_user(&self, new: &NewUser<'_>, now: DateTime<Utc>) -> Result<Option<User>> {
        let id = Uuid::new_v4();
        let now_s = ts(now);
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, name, email, phone, password, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                rusqlite::params![
                    id.to_string(),
                    new.name,
                    new.email,
                    new.phone,
                    new.password_hash,
                    new.role.as_str(),
                    now_s,
                ],
            );
            match inserted {
                Ok(_) => query_user(conn, id),
                Err(e) if is_unique_violation(&e) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n: i64 =
                conn.query_row("SELECT COUNT(*) FROM users WHERE email = ?1", [email], |r| r.get(0))?;
            Ok(n > 0)
        })
    }

    pub fn get_credentials_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS}, password FROM users WHERE email = ?1");
            conn.query_row(&sql, [email], |row| {
                Ok(UserCredentials {
                    user: user_from_row(row)?,
                    password_hash: row.get(12)?,
                })
            })
            .optional()
        })
    }

    /// Lazy write-back of a stale `active` boost. Returns whether a row changed.
    pub fn expire_stale_boost(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let now_s = ts(now);
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET boost_status = 'expired', updated_at = ?2
                 WHERE id = ?1 AND boost_status = 'active'
                   AND (boost_expires_at IS NULL OR boost_expires_at <= ?2)",
                (id.to_string(), &now_s),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn list_users(
        &self,
        filter: &UserFilter,
        page: Page,
        now: DateTime<Utc>,
    ) -> Result<(Vec<User>, i64)> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(role) = filter.role {
            clauses.push("role = ?");
            params.push(Value::Text(role.as_str().to_string()));
        }
        if let Some(verified) = filter.verified {
            clauses.push("is_verified = ?");
            params.push(Value::Integer(verified.into()));
        }
        if let Some(blocked) = filter.blocked {
            clauses.push("is_blocked = ?");
            params.push(Value::Integer(blocked.into()));
        }
        match filter.boost {
            Some(BoostStatus::Active) => {
                clauses.push("(boost_status = 'active' AND boost_expires_at > ?)");
                params.push(Value::Text(ts(now)));
            }
            Some(BoostStatus::Expired) => {
                clauses.push(
                    "(boost_status = 'expired' OR (boost_status = 'active' \
                     AND (boost_expires_at IS NULL OR boost_expires_at <= ?)))",
                );
                params.push(Value::Text(ts(now)));
            }
            Some(BoostStatus::None) => clauses.push("boost_status = 'none'"),
            None => {}
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            clauses.push("(name LIKE ? OR email LIKE ? OR phone LIKE ?)");
            let pattern = format!("%{}%", search);
            for _ in 0..3 {
                params.push(Value::Text(pattern.clone()));
            }
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM users {where_sql}"),
                rusqlite::params_from_iter(params.iter()),
                |r| r.get(0),
            )?;

            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users {where_sql} ORDER BY created_at DESC LIMIT {} OFFSET {}",
                page.limit,
                page.offset()
            );
            let mut stmt = conn.prepare(&sql)?;
            let users = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok((users, total))
        })
    }

    /// Member ids, optionally restricted to one role. Admin-blocked members
    /// are skipped.
    pub fn active_user_ids(&self, role: Option<Role>) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM users WHERE is_blocked = 0 AND (?1 IS NULL OR role = ?1)",
            )?;
            let ids = stmt
                .query_map([role.map(|r| r.as_str())], |row| get_uuid(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn set_verified(&self, id: Uuid, verified: bool, now: DateTime<Utc>) -> Result<Option<User>> {
        let now_s = ts(now);
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET is_verified = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id.to_string(), verified, now_s],
            )?;
            query_user(conn, id)
        })
    }

    /// Admin block (`Some(reason)`) or unblock (`None`).
    pub fn set_blocked(&self, id: Uuid, reason: Option<&str>, now: DateTime<Utc>) -> Result<Option<User>> {
        let now_s = ts(now);
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET is_blocked = ?2, block_reason = ?3, updated_at = ?4 WHERE id = ?1",
                rusqlite::params![id.to_string(), reason.is_some(), reason, now_s],
            )?;
            query_user(conn, id)
        })
    }

    pub fn delete_user(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
            Ok(n > 0)
        })
    }

    // -- Member-to-member blocks --

    /// Returns false when the block already existed.
    pub fn block_user(&self, user_id: Uuid, blocked_user_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO user_blocks (user_id, blocked_user_id, created_at) VALUES (?1, ?2, ?3)",
                (user_id.to_string(), blocked_user_id.to_string(), ts(now)),
            )?;
            Ok(n > 0)
        })
    }

    pub fn unblock_user(&self, user_id: Uuid, blocked_user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM user_blocks WHERE user_id = ?1 AND blocked_user_id = ?2",
                (user_id.to_string(), blocked_user_id.to_string()),
            )?;
            Ok(n > 0)
        })
    }

    pub fn get_blocked_users(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| query_blocked_users(conn, user_id))
    }

    // -- Dashboard --

    pub fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats> {
        let now_s = ts(now);
        self.with_conn(|conn| {
            let mut stats = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(role = 'bride'), 0),
                        COALESCE(SUM(role = 'groom'), 0),
                        COALESCE(SUM(is_verified), 0),
                        COALESCE(SUM(is_blocked), 0),
                        COALESCE(SUM(boost_status = 'active' AND boost_expires_at > ?1), 0)
                 FROM users",
                [&now_s],
                |r| {
                    Ok(DashboardStats {
                        total_users: r.get(0)?,
                        brides: r.get(1)?,
                        grooms: r.get(2)?,
                        verified_users: r.get(3)?,
                        blocked_users: r.get(4)?,
                        active_boosts: r.get(5)?,
                        ..Default::default()
                    })
                },
            )?;

            stats.pending_reports = conn.query_row(
                "SELECT COUNT(*) FROM reports WHERE status = 'pending'",
                [],
                |r| r.get(0),
            )?;
            stats.pending_requests = conn.query_row(
                "SELECT COUNT(*) FROM contact_requests WHERE status = 'pending'",
                [],
                |r| r.get(0),
            )?;
            stats.total_conversations =
                conn.query_row("SELECT COUNT(*) FROM conversations", [], |r| r.get(0))?;
            stats.revenue_cents = conn.query_row(
                "SELECT COALESCE(SUM(final_amount_cents), 0) FROM transactions WHERE status = 'completed'",
                [],
                |r| r.get(0),
            )?;
            Ok(stats)
        })
    }
}
