use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use rishta_types::models::{Report, ReportStatus};
use rishta_types::policy;

use super::{OptionalExt, get_enum, get_opt_ts, get_opt_uuid, get_ts, get_uuid, ts};
use crate::Database;
use crate::models::{Page, ResolveOutcome};

const REPORT_COLUMNS: &str = "id, reporter_id, reported_user_id, reason, description, status, \
     action_taken, resolved_by, resolved_at, created_at";

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: get_uuid(row, 0)?,
        reporter_id: get_uuid(row, 1)?,
        reported_user_id: get_uuid(row, 2)?,
        reason: row.get(3)?,
        description: row.get(4)?,
        status: get_enum(row, 5)?,
        action_taken: row.get(6)?,
        resolved_by: get_opt_uuid(row, 7)?,
        resolved_at: get_opt_ts(row, 8)?,
        created_at: get_ts(row, 9)?,
    })
}

fn query_report(conn: &Connection, id: Uuid) -> Result<Option<Report>> {
    let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1");
    conn.query_row(&sql, [id.to_string()], report_from_row).optional()
}

/// Closes a pending report. Shared by resolve and dismiss.
fn close_report(
    conn: &Connection,
    id: Uuid,
    status: ReportStatus,
    action: &str,
    admin_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<Report>> {
    let changed = conn.execute(
        "UPDATE reports SET status = ?2, action_taken = ?3, resolved_by = ?4, resolved_at = ?5
         WHERE id = ?1 AND status = 'pending'",
        (
            id.to_string(),
            status.as_str(),
            action,
            admin_id.to_string(),
            ts(now),
        ),
    )?;
    if changed == 0 {
        return Ok(None);
    }
    query_report(conn, id)
}

impl Database {
    pub fn create_report(
        &self,
        reporter_id: Uuid,
        reported_user_id: Uuid,
        reason: &str,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Report> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reports (id, reporter_id, reported_user_id, reason, description, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
                rusqlite::params![
                    id.to_string(),
                    reporter_id.to_string(),
                    reported_user_id.to_string(),
                    reason,
                    description,
                    ts(now),
                ],
            )?;
            query_report(conn, id)?.ok_or_else(|| anyhow::anyhow!("report {} vanished after insert", id))
        })
    }

    pub fn list_reports(&self, status: Option<ReportStatus>, page: Page) -> Result<(Vec<Report>, i64)> {
        let status = status.map(|s| s.as_str());
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM reports WHERE (?1 IS NULL OR status = ?1)",
                [status],
                |r| r.get(0),
            )?;
            let sql = format!(
                "SELECT {REPORT_COLUMNS} FROM reports WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![status, page.limit, page.offset()], report_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok((rows, total))
        })
    }

    /// Resolves a pending report with the admin's free-text action. If the
    /// action mentions "block", the reported member is blocked in the same
    /// SQL transaction, with a reason pointing back at the report.
    pub fn resolve_report(
        &self,
        id: Uuid,
        admin_id: Uuid,
        action: &str,
        now: DateTime<Utc>,
    ) -> Result<ResolveOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(report) = close_report(&tx, id, ReportStatus::Resolved, action, admin_id, now)? else {
                return Ok(match query_report(&tx, id)? {
                    Some(existing) => ResolveOutcome::AlreadyClosed(existing),
                    None => ResolveOutcome::NotFound,
                });
            };

            let user_blocked = policy::action_blocks_user(action);
            if user_blocked {
                let reason = format!("Blocked after report {}: {}", report.id, report.reason);
                tx.execute(
                    "UPDATE users SET is_blocked = 1, block_reason = ?2, updated_at = ?3 WHERE id = ?1",
                    (report.reported_user_id.to_string(), reason, ts(now)),
                )?;
            }

            tx.commit()?;
            Ok(ResolveOutcome::Closed { report, user_blocked })
        })
    }

    pub fn dismiss_report(
        &self,
        id: Uuid,
        admin_id: Uuid,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ResolveOutcome> {
        self.with_conn(|conn| {
            let action = note.unwrap_or("Dismissed");
            match close_report(conn, id, ReportStatus::Dismissed, action, admin_id, now)? {
                Some(report) => Ok(ResolveOutcome::Closed {
                    report,
                    user_blocked: false,
                }),
                None => Ok(match query_report(conn, id)? {
                    Some(existing) => ResolveOutcome::AlreadyClosed(existing),
                    None => ResolveOutcome::NotFound,
                }),
            }
        })
    }
}
