use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use rishta_types::models::{ContactRequest, RequestStatus};

use super::{OptionalExt, get_enum, get_opt_ts, get_ts, get_uuid, is_unique_violation, ts};
use crate::Database;
use crate::models::{CreateRequestOutcome, NewContactRequest, Page, RespondOutcome};

const REQUEST_COLUMNS: &str =
    "id, from_user_id, to_user_id, request_type, status, message, created_at, responded_at";

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<ContactRequest> {
    Ok(ContactRequest {
        id: get_uuid(row, 0)?,
        from_user_id: get_uuid(row, 1)?,
        to_user_id: get_uuid(row, 2)?,
        request_type: get_enum(row, 3)?,
        status: get_enum(row, 4)?,
        message: row.get(5)?,
        created_at: get_ts(row, 6)?,
        responded_at: get_opt_ts(row, 7)?,
    })
}

fn query_request(conn: &Connection, id: Uuid) -> Result<Option<ContactRequest>> {
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM contact_requests WHERE id = ?1");
    conn.query_row(&sql, [id.to_string()], request_from_row).optional()
}

fn query_requests(
    conn: &Connection,
    column: &str,
    user_id: Uuid,
    status: Option<RequestStatus>,
) -> Result<Vec<ContactRequest>> {
    let sql = format!(
        "SELECT {REQUEST_COLUMNS} FROM contact_requests
         WHERE {column} = ?1 AND (?2 IS NULL OR status = ?2)
         ORDER BY created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            (user_id.to_string(), status.map(|s| s.as_str())),
            request_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

impl Database {
    // -- Contact requests --

    /// Inserts a new `pending` request. The partial unique index on
    /// (from, to) for pending rows is the authority on duplicates.
    pub fn create_contact_request(
        &self,
        new: &NewContactRequest<'_>,
        now: DateTime<Utc>,
    ) -> Result<CreateRequestOutcome> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO contact_requests (id, from_user_id, to_user_id, request_type, status, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6)",
                rusqlite::params![
                    id.to_string(),
                    new.from_user_id.to_string(),
                    new.to_user_id.to_string(),
                    new.request_type.as_str(),
                    new.message,
                    ts(now),
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(CreateRequestOutcome::DuplicatePending),
                Err(e) => return Err(e.into()),
            }
            let request = query_request(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("contact request {} vanished after insert", id))?;
            Ok(CreateRequestOutcome::Created(request))
        })
    }

    /// Moves a pending request to `accepted` or `rejected`. The update is
    /// conditioned on `status = 'pending'` and the recipient, so a request
    /// leaves `pending` at most once no matter how many callers race.
    pub fn respond_to_request(
        &self,
        id: Uuid,
        recipient_id: Uuid,
        status: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<RespondOutcome> {
        if status == RequestStatus::Pending {
            anyhow::bail!("cannot transition a contact request back to pending");
        }

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE contact_requests SET status = ?1, responded_at = ?2
                 WHERE id = ?3 AND to_user_id = ?4 AND status = 'pending'",
                (
                    status.as_str(),
                    ts(now),
                    id.to_string(),
                    recipient_id.to_string(),
                ),
            )?;

            let Some(request) = query_request(conn, id)? else {
                return Ok(RespondOutcome::NotFound);
            };
            if changed == 1 {
                return Ok(RespondOutcome::Updated(request));
            }
            if request.to_user_id != recipient_id {
                return Ok(RespondOutcome::NotRecipient);
            }
            Ok(RespondOutcome::NotPending(request))
        })
    }

    pub fn list_received_requests(
        &self,
        user_id: Uuid,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ContactRequest>> {
        self.with_conn(|conn| query_requests(conn, "to_user_id", user_id, status))
    }

    pub fn list_sent_requests(
        &self,
        user_id: Uuid,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ContactRequest>> {
        self.with_conn(|conn| query_requests(conn, "from_user_id", user_id, status))
    }

    /// Admin listing across all members.
    pub fn list_contact_requests(
        &self,
        status: Option<RequestStatus>,
        page: Page,
    ) -> Result<(Vec<ContactRequest>, i64)> {
        let status = status.map(|s| s.as_str());
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM contact_requests WHERE (?1 IS NULL OR status = ?1)",
                [status],
                |r| r.get(0),
            )?;
            let sql = format!(
                "SELECT {REQUEST_COLUMNS} FROM contact_requests
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![status, page.limit, page.offset()],
                    request_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok((rows, total))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rishta_types::models::{RequestStatus, RequestType, Role};

    use crate::models::{CreateRequestOutcome, NewContactRequest, Page, RespondOutcome};
    use crate::queries::fixtures;

    fn send(db: &crate::Database, from: uuid::Uuid, to: uuid::Uuid) -> CreateRequestOutcome {
        db.create_contact_request(
            &NewContactRequest {
                from_user_id: from,
                to_user_id: to,
                request_type: RequestType::Both,
                message: Some("Hello"),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn one_pending_request_per_ordered_pair() {
        let db = fixtures::db();
        let a = fixtures::member(&db, "a@example.com", Role::Bride);
        let b = fixtures::member(&db, "b@example.com", Role::Groom);

        assert!(matches!(send(&db, a.id, b.id), CreateRequestOutcome::Created(_)));
        assert!(matches!(send(&db, a.id, b.id), CreateRequestOutcome::DuplicatePending));
        // The reverse direction is a different ordered pair.
        assert!(matches!(send(&db, b.id, a.id), CreateRequestOutcome::Created(_)));
    }

    #[test]
    fn new_request_allowed_after_previous_was_answered() {
        let db = fixtures::db();
        let a = fixtures::member(&db, "a@example.com", Role::Bride);
        let b = fixtures::member(&db, "b@example.com", Role::Groom);

        let CreateRequestOutcome::Created(first) = send(&db, a.id, b.id) else {
            panic!("expected creation");
        };
        db.respond_to_request(first.id, b.id, RequestStatus::Rejected, Utc::now())
            .unwrap();
        assert!(matches!(send(&db, a.id, b.id), CreateRequestOutcome::Created(_)));
    }

    #[test]
    fn only_recipient_can_respond_and_only_once() {
        let db = fixtures::db();
        let a = fixtures::member(&db, "a@example.com", Role::Bride);
        let b = fixtures::member(&db, "b@example.com", Role::Groom);
        let CreateRequestOutcome::Created(req) = send(&db, a.id, b.id) else {
            panic!("expected creation");
        };

        let outcome = db
            .respond_to_request(req.id, a.id, RequestStatus::Accepted, Utc::now())
            .unwrap();
        assert!(matches!(outcome, RespondOutcome::NotRecipient));

        let outcome = db
            .respond_to_request(req.id, b.id, RequestStatus::Accepted, Utc::now())
            .unwrap();
        let RespondOutcome::Updated(updated) = outcome else {
            panic!("expected update");
        };
        assert_eq!(updated.status, RequestStatus::Accepted);
        assert!(updated.responded_at.is_some());

        let outcome = db
            .respond_to_request(req.id, b.id, RequestStatus::Rejected, Utc::now())
            .unwrap();
        let RespondOutcome::NotPending(current) = outcome else {
            panic!("expected terminal state to hold");
        };
        assert_eq!(current.status, RequestStatus::Accepted);

        let outcome = db
            .respond_to_request(uuid::Uuid::new_v4(), b.id, RequestStatus::Accepted, Utc::now())
            .unwrap();
        assert!(matches!(outcome, RespondOutcome::NotFound));
    }

    #[test]
    fn concurrent_accepts_transition_once() {
        let db = Arc::new(fixtures::db());
        let a = fixtures::member(&db, "a@example.com", Role::Bride);
        let b = fixtures::member(&db, "b@example.com", Role::Groom);
        let CreateRequestOutcome::Created(req) = send(&db, a.id, b.id) else {
            panic!("expected creation");
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || {
                    matches!(
                        db.respond_to_request(req.id, b.id, RequestStatus::Accepted, Utc::now())
                            .unwrap(),
                        RespondOutcome::Updated(_)
                    )
                })
            })
            .collect();

        let updated = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(updated, 1);
    }

    #[test]
    fn listings_by_direction_and_status() {
        let db = fixtures::db();
        let a = fixtures::member(&db, "a@example.com", Role::Bride);
        let b = fixtures::member(&db, "b@example.com", Role::Groom);
        let c = fixtures::member(&db, "c@example.com", Role::Groom);
        send(&db, a.id, b.id);
        send(&db, c.id, b.id);

        assert_eq!(db.list_received_requests(b.id, None).unwrap().len(), 2);
        assert_eq!(db.list_sent_requests(a.id, None).unwrap().len(), 1);
        assert!(
            db.list_received_requests(b.id, Some(RequestStatus::Accepted))
                .unwrap()
                .is_empty()
        );

        let (rows, total) = db
            .list_contact_requests(Some(RequestStatus::Pending), Page::new(1, 1))
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 1);
    }
}
