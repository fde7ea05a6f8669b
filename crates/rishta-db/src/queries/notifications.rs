use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use rishta_types::models::{Notification, NotificationKind};

use super::{get_enum, get_ts, get_uuid, ts};
use crate::Database;
use crate::models::Page;

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, body, is_read, created_at";

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: get_uuid(row, 0)?,
        user_id: get_uuid(row, 1)?,
        kind: get_enum(row, 2)?,
        title: row.get(3)?,
        body: row.get(4)?,
        is_read: row.get(5)?,
        created_at: get_ts(row, 6)?,
    })
}

impl Database {
    pub fn insert_notification(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<Notification> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, kind, title, body, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                (id.to_string(), user_id.to_string(), kind.as_str(), title, body, ts(now)),
            )?;
            Ok(Notification {
                id,
                user_id,
                kind,
                title: title.to_string(),
                body: body.to_string(),
                is_read: false,
                created_at: now,
            })
        })
    }

    /// Same notification for many members, written in one transaction.
    pub fn insert_notifications(
        &self,
        user_ids: &[Uuid],
        kind: NotificationKind,
        title: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let now_s = ts(now);
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO notifications (id, user_id, kind, title, body, is_read, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                )?;
                for user_id in user_ids {
                    stmt.execute((
                        Uuid::new_v4().to_string(),
                        user_id.to_string(),
                        kind.as_str(),
                        title,
                        body,
                        &now_s,
                    ))?;
                }
            }
            tx.commit()?;
            Ok(user_ids.len())
        })
    }

    pub fn list_notifications(&self, user_id: Uuid, limit: u32) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ?1
                 ORDER BY created_at DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map((user_id.to_string(), limit), notification_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn unread_notification_count(&self, user_id: Uuid) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                [user_id.to_string()],
                |r| r.get(0),
            )?)
        })
    }

    /// Only the owner can mark a notification; returns false otherwise.
    pub fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                (id.to_string(), user_id.to_string()),
            )?;
            Ok(n > 0)
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user_id.to_string()],
            )?)
        })
    }

    pub fn list_all_notifications(&self, page: Page) -> Result<(Vec<Notification>, i64)> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM notifications", [], |r| r.get(0))?;
            let sql = format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map((page.limit, page.offset()), notification_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok((rows, total))
        })
    }
}
