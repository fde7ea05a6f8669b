use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use rishta_types::error::PromoRejection;
use rishta_types::models::{
    BoostStatus, PromoCode, Transaction, TransactionKind, TransactionStatus,
};
use rishta_types::policy;

use super::users::query_user;
use super::{OptionalExt, get_enum, get_ts, get_uuid, is_unique_violation, ts};
use crate::Database;
use crate::models::{
    BoostPurchase, NewPromoCode, Page, PromoCodeChanges, PurchaseOutcome, Redemption,
};

const PROMO_COLUMNS: &str = "id, code, description, discount_type, discount_value, usage_limit, \
     usage_count, valid_from, valid_until, is_active, created_at";

const TRANSACTION_COLUMNS: &str = "id, user_id, kind, amount_cents, discount_cents, \
     final_amount_cents, currency, promo_code, payment_reference, status, created_at";

fn promo_from_row(row: &Row<'_>) -> rusqlite::Result<PromoCode> {
    Ok(PromoCode {
        id: get_uuid(row, 0)?,
        code: row.get(1)?,
        description: row.get(2)?,
        discount_type: get_enum(row, 3)?,
        discount_value: row.get(4)?,
        usage_limit: row.get(5)?,
        usage_count: row.get(6)?,
        valid_from: get_ts(row, 7)?,
        valid_until: get_ts(row, 8)?,
        is_active: row.get(9)?,
        created_at: get_ts(row, 10)?,
    })
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: get_uuid(row, 0)?,
        user_id: get_uuid(row, 1)?,
        kind: get_enum(row, 2)?,
        amount_cents: row.get(3)?,
        discount_cents: row.get(4)?,
        final_amount_cents: row.get(5)?,
        currency: row.get(6)?,
        promo_code: row.get(7)?,
        payment_reference: row.get(8)?,
        status: get_enum(row, 9)?,
        created_at: get_ts(row, 10)?,
    })
}

fn query_promo_by_code(conn: &Connection, code: &str) -> Result<Option<PromoCode>> {
    let sql = format!("SELECT {PROMO_COLUMNS} FROM promo_codes WHERE code = ?1");
    conn.query_row(&sql, [code], promo_from_row).optional()
}

fn query_promo(conn: &Connection, id: Uuid) -> Result<Option<PromoCode>> {
    let sql = format!("SELECT {PROMO_COLUMNS} FROM promo_codes WHERE id = ?1");
    conn.query_row(&sql, [id.to_string()], promo_from_row).optional()
}

/// Claims one use of `code`. The increment is conditional on the limit and
/// validity window in the same statement, so concurrent redemptions can never
/// push `usage_count` past `usage_limit`.
fn redeem_in(conn: &Connection, code: &str, now: DateTime<Utc>) -> Result<Redemption> {
    let Some(promo) = query_promo_by_code(conn, code)? else {
        return Ok(Err(PromoRejection::NotFound));
    };
    if let Err(rejection) = promo.check_window(now) {
        return Ok(Err(rejection));
    }

    let now_s = ts(now);
    let claimed = conn.execute(
        "UPDATE promo_codes SET usage_count = usage_count + 1
         WHERE id = ?1 AND is_active = 1 AND usage_count < usage_limit
           AND valid_from <= ?2 AND valid_until > ?2",
        (promo.id.to_string(), &now_s),
    )?;
    if claimed == 0 {
        return Ok(Err(PromoRejection::LimitReached));
    }

    let promo = query_promo(conn, promo.id)?
        .ok_or_else(|| anyhow::anyhow!("promo code {} vanished", promo.id))?;
    Ok(Ok(promo))
}

fn insert_transaction(conn: &Connection, t: &Transaction) -> Result<()> {
    conn.execute(
        "INSERT INTO transactions (id, user_id, kind, amount_cents, discount_cents, final_amount_cents,
                                   currency, promo_code, payment_reference, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            t.id.to_string(),
            t.user_id.to_string(),
            t.kind.as_str(),
            t.amount_cents,
            t.discount_cents,
            t.final_amount_cents,
            t.currency,
            t.promo_code,
            t.payment_reference,
            t.status.as_str(),
            ts(t.created_at),
        ],
    )?;
    Ok(())
}

fn activate_boost(conn: &Connection, user_id: Uuid, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE users SET boost_status = ?2, boost_expires_at = ?3, updated_at = ?4 WHERE id = ?1",
        (
            user_id.to_string(),
            BoostStatus::Active.as_str(),
            ts(expires_at),
            ts(now),
        ),
    )?;
    Ok(())
}

impl Database {
    // -- Promo codes --

    /// Returns `None` when the code is already taken.
    pub fn create_promo_code(&self, new: &NewPromoCode<'_>, now: DateTime<Utc>) -> Result<Option<PromoCode>> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO promo_codes (id, code, description, discount_type, discount_value, usage_limit,
                                          usage_count, valid_from, valid_until, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, 1, ?9)",
                rusqlite::params![
                    id.to_string(),
                    new.code,
                    new.description,
                    new.discount_type.as_str(),
                    new.discount_value,
                    new.usage_limit,
                    ts(new.valid_from),
                    ts(new.valid_until),
                    ts(now),
                ],
            );
            match inserted {
                Ok(_) => query_promo(conn, id),
                Err(e) if is_unique_violation(&e) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_promo_code(&self, id: Uuid) -> Result<Option<PromoCode>> {
        self.with_conn(|conn| query_promo(conn, id))
    }

    pub fn get_promo_code_by_code(&self, code: &str) -> Result<Option<PromoCode>> {
        self.with_conn(|conn| query_promo_by_code(conn, code))
    }

    pub fn list_promo_codes(&self) -> Result<Vec<PromoCode>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {PROMO_COLUMNS} FROM promo_codes ORDER BY created_at DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], promo_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Applies only the fields present in `changes`.
    pub fn update_promo_code(&self, id: Uuid, changes: &PromoCodeChanges) -> Result<Option<PromoCode>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE promo_codes SET
                    description    = COALESCE(?2, description),
                    discount_type  = COALESCE(?3, discount_type),
                    discount_value = COALESCE(?4, discount_value),
                    usage_limit    = COALESCE(?5, usage_limit),
                    valid_from     = COALESCE(?6, valid_from),
                    valid_until    = COALESCE(?7, valid_until),
                    is_active      = COALESCE(?8, is_active)
                 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    changes.description,
                    changes.discount_type.map(|d| d.as_str()),
                    changes.discount_value,
                    changes.usage_limit,
                    changes.valid_from.map(ts),
                    changes.valid_until.map(ts),
                    changes.is_active,
                ],
            )?;
            query_promo(conn, id)
        })
    }

    pub fn toggle_promo_code(&self, id: Uuid) -> Result<Option<PromoCode>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE promo_codes SET is_active = 1 - is_active WHERE id = ?1",
                [id.to_string()],
            )?;
            query_promo(conn, id)
        })
    }

    pub fn delete_promo_code(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM promo_codes WHERE id = ?1", [id.to_string()])?;
            Ok(n > 0)
        })
    }

    // -- Boost purchases --

    /// Redeems the promo (if any), records a completed transaction and
    /// extends the member's boost, all in one SQL transaction. A rejected
    /// promo leaves everything untouched.
    pub fn purchase_boost(&self, purchase: &BoostPurchase<'_>, now: DateTime<Utc>) -> Result<PurchaseOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(user) = query_user(&tx, purchase.user_id)? else {
                return Ok(PurchaseOutcome::UserNotFound);
            };

            let (discount_cents, promo_code) = match purchase.promo_code {
                Some(code) => match redeem_in(&tx, code, now)? {
                    Ok(promo) => (promo.discount_for(purchase.amount_cents), Some(promo.code)),
                    Err(rejection) => return Ok(PurchaseOutcome::PromoRejected(rejection)),
                },
                None => (0, None),
            };

            let transaction = Transaction {
                id: Uuid::new_v4(),
                user_id: user.id,
                kind: TransactionKind::Boost,
                amount_cents: purchase.amount_cents,
                discount_cents,
                final_amount_cents: purchase.amount_cents - discount_cents,
                currency: purchase.currency.to_string(),
                promo_code,
                payment_reference: Some(purchase.payment_reference.to_string()),
                status: TransactionStatus::Completed,
                created_at: now,
            };
            insert_transaction(&tx, &transaction)?;

            let boost_expires_at = policy::extended_boost_expiry(&user, purchase.duration_days, now);
            activate_boost(&tx, user.id, boost_expires_at, now)?;

            tx.commit()?;
            Ok(PurchaseOutcome::Completed {
                transaction,
                boost_expires_at,
            })
        })
    }

    /// Promotional boost from an admin, recorded as a zero-amount
    /// transaction. Returns `None` for an unknown member.
    pub fn grant_boost(
        &self,
        user_id: Uuid,
        days: i64,
        currency: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(Transaction, DateTime<Utc>)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(user) = query_user(&tx, user_id)? else {
                return Ok(None);
            };

            let transaction = Transaction {
                id: Uuid::new_v4(),
                user_id,
                kind: TransactionKind::BoostGrant,
                amount_cents: 0,
                discount_cents: 0,
                final_amount_cents: 0,
                currency: currency.to_string(),
                promo_code: None,
                payment_reference: None,
                status: TransactionStatus::Completed,
                created_at: now,
            };
            insert_transaction(&tx, &transaction)?;

            let expires_at = policy::extended_boost_expiry(&user, days, now);
            activate_boost(&tx, user_id, expires_at, now)?;
            tx.commit()?;
            Ok(Some((transaction, expires_at)))
        })
    }

    // -- Transactions --

    pub fn list_transactions(
        &self,
        status: Option<TransactionStatus>,
        user_id: Option<Uuid>,
        page: Page,
    ) -> Result<(Vec<Transaction>, i64)> {
        let status = status.map(|s| s.as_str());
        let user_id = user_id.map(|u| u.to_string());
        self.with_conn(|conn| {
            let filter = "(?1 IS NULL OR status = ?1) AND (?2 IS NULL OR user_id = ?2)";
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM transactions WHERE {filter}"),
                (status, user_id.as_deref()),
                |r| r.get(0),
            )?;
            let sql = format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE {filter}
                 ORDER BY created_at DESC LIMIT ?3 OFFSET ?4"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![status, user_id.as_deref(), page.limit, page.offset()],
                    transaction_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok((rows, total))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use rishta_types::error::PromoRejection;
    use rishta_types::models::{BoostStatus, DiscountType, Role, TransactionKind, TransactionStatus};

    use crate::Database;
    use crate::models::{BoostPurchase, NewPromoCode, Page, PromoCodeChanges, PurchaseOutcome};
    use crate::queries::fixtures;

    fn promo(db: &Database, code: &str, limit: i64) -> rishta_types::models::PromoCode {
        let now = Utc::now();
        db.create_promo_code(
            &NewPromoCode {
                code,
                description: "launch offer",
                discount_type: DiscountType::Percentage,
                discount_value: 20,
                usage_limit: limit,
                valid_from: now - Duration::days(1),
                valid_until: now + Duration::days(7),
            },
            now,
        )
        .unwrap()
        .unwrap()
    }

    fn purchase<'a>(user_id: uuid::Uuid, promo_code: Option<&'a str>) -> BoostPurchase<'a> {
        BoostPurchase {
            user_id,
            amount_cents: 50_000,
            currency: "INR",
            duration_days: 30,
            promo_code,
            payment_reference: "pay_123",
        }
    }

    fn rejection(outcome: PurchaseOutcome) -> Option<PromoRejection> {
        match outcome {
            PurchaseOutcome::PromoRejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    #[test]
    fn concurrent_redemptions_respect_usage_limit() {
        let db = Arc::new(fixtures::db());
        promo(&db, "SINGLE", 1);

        let handles: Vec<_> = ["a@example.com", "b@example.com"]
            .into_iter()
            .map(|email| {
                let db = db.clone();
                let user = fixtures::member(&db, email, Role::Groom);
                std::thread::spawn(move || {
                    db.purchase_boost(&purchase(user.id, Some("SINGLE")), Utc::now()).unwrap()
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, PurchaseOutcome::Completed { .. }))
                .count(),
            1
        );
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, PurchaseOutcome::PromoRejected(PromoRejection::LimitReached)))
                .count(),
            1
        );
        let code = db.get_promo_code_by_code("SINGLE").unwrap().unwrap();
        assert_eq!(code.usage_count, 1);
    }

    #[test]
    fn redemption_rejections() {
        let db = fixtures::db();
        let user = fixtures::member(&db, "r@example.com", Role::Bride);
        let code = promo(&db, "SPRING", 5);
        let now = Utc::now();
        let buy = |code: &str, at| rejection(db.purchase_boost(&purchase(user.id, Some(code)), at).unwrap());

        assert_eq!(buy("NOPE", now), Some(PromoRejection::NotFound));
        assert_eq!(buy("SPRING", now + Duration::days(8)), Some(PromoRejection::Expired));

        db.toggle_promo_code(code.id).unwrap();
        assert_eq!(buy("SPRING", now), Some(PromoRejection::Inactive));
        assert_eq!(db.list_transactions(None, None, Page::new(1, 10)).unwrap().1, 0);
    }

    #[test]
    fn duplicate_code_is_reported_as_none() {
        let db = fixtures::db();
        promo(&db, "DUP", 1);
        let now = Utc::now();
        let again = db
            .create_promo_code(
                &NewPromoCode {
                    code: "DUP",
                    description: "",
                    discount_type: DiscountType::Fixed,
                    discount_value: 100,
                    usage_limit: 1,
                    valid_from: now,
                    valid_until: now + Duration::days(1),
                },
                now,
            )
            .unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let db = fixtures::db();
        let code = promo(&db, "EDIT", 3);
        let updated = db
            .update_promo_code(
                code.id,
                &PromoCodeChanges {
                    usage_limit: Some(10),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.usage_limit, 10);
        assert_eq!(updated.discount_value, 20);
        assert_eq!(updated.description, "launch offer");

        assert!(db.delete_promo_code(code.id).unwrap());
        assert!(db.get_promo_code(code.id).unwrap().is_none());
    }

    #[test]
    fn purchase_applies_discount_and_activates_boost() {
        let db = fixtures::db();
        let user = fixtures::member(&db, "p@example.com", Role::Groom);
        promo(&db, "TWENTY", 5);

        let outcome = db
            .purchase_boost(&purchase(user.id, Some("TWENTY")), Utc::now())
            .unwrap();
        let PurchaseOutcome::Completed { transaction, boost_expires_at } = outcome else {
            panic!("expected purchase to complete");
        };
        assert_eq!(transaction.discount_cents, 10_000);
        assert_eq!(transaction.final_amount_cents, 40_000);
        assert_eq!(transaction.promo_code.as_deref(), Some("TWENTY"));
        assert_eq!(transaction.status, TransactionStatus::Completed);

        let user = db.get_user(user.id).unwrap().unwrap();
        assert_eq!(user.boost_status, BoostStatus::Active);
        assert!(boost_expires_at > Utc::now() + Duration::days(29));

        let (rows, total) = db.list_transactions(None, Some(user.id), Page::new(1, 10)).unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, transaction.id);
    }

    #[test]
    fn rejected_promo_rolls_back_purchase() {
        let db = fixtures::db();
        let first = fixtures::member(&db, "first@example.com", Role::Bride);
        let user = fixtures::member(&db, "p@example.com", Role::Groom);
        promo(&db, "ONCE", 1);
        let outcome = db.purchase_boost(&purchase(first.id, Some("ONCE")), Utc::now()).unwrap();
        assert!(matches!(outcome, PurchaseOutcome::Completed { .. }));

        let outcome = db.purchase_boost(&purchase(user.id, Some("ONCE")), Utc::now()).unwrap();
        assert_eq!(rejection(outcome), Some(PromoRejection::LimitReached));

        let user = db.get_user(user.id).unwrap().unwrap();
        assert_eq!(user.boost_status, BoostStatus::None);
        assert_eq!(db.list_transactions(None, Some(user.id), Page::new(1, 10)).unwrap().1, 0);
    }

    #[test]
    fn repeat_purchase_extends_remaining_time() {
        let db = fixtures::db();
        let user = fixtures::member(&db, "p@example.com", Role::Bride);
        let now = Utc::now();

        let PurchaseOutcome::Completed { boost_expires_at: first, .. } =
            db.purchase_boost(&purchase(user.id, None), now).unwrap()
        else {
            panic!("expected purchase to complete");
        };
        let PurchaseOutcome::Completed { boost_expires_at: second, .. } =
            db.purchase_boost(&purchase(user.id, None), now).unwrap()
        else {
            panic!("expected purchase to complete");
        };
        // Stored expiry loses sub-millisecond precision.
        assert!((second - first - Duration::days(30)).num_milliseconds().abs() <= 1);
    }

    #[test]
    fn grant_records_zero_amount_transaction() {
        let db = fixtures::db();
        let user = fixtures::member(&db, "g@example.com", Role::Bride);
        let (transaction, _) = db.grant_boost(user.id, 7, "INR", Utc::now()).unwrap().unwrap();
        assert_eq!(transaction.kind, TransactionKind::BoostGrant);
        assert_eq!(transaction.final_amount_cents, 0);
        assert!(db.grant_boost(uuid::Uuid::new_v4(), 7, "INR", Utc::now()).unwrap().is_none());
    }
}
