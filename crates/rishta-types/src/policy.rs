//! Authorization predicates over entity snapshots.
//!
//! Everything here is pure: callers pass the user state they loaded and the
//! wall-clock time, and get back a decision. The stored `boost_status` is
//! never trusted on its own; activity is always re-derived from
//! `boost_expires_at`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::PolicyError;
use crate::models::{BoostStatus, User};

pub fn is_boost_active(user: &User, now: DateTime<Utc>) -> bool {
    user.boost_status == BoostStatus::Active
        && user.boost_expires_at.is_some_and(|expires| expires > now)
}

/// The boost status a reader should see. A stored `active` whose expiry has
/// passed reads as `expired`.
pub fn effective_boost_status(user: &User, now: DateTime<Utc>) -> BoostStatus {
    match user.boost_status {
        BoostStatus::Active if !is_boost_active(user, now) => BoostStatus::Expired,
        status => status,
    }
}

/// True when the stored status is stale and should be written back.
pub fn boost_needs_writeback(user: &User, now: DateTime<Utc>) -> bool {
    user.boost_status == BoostStatus::Active && !is_boost_active(user, now)
}

/// Expiry after buying or being granted `days` of boost. Time left on an
/// active boost is kept; an expired boost starts from `now`.
pub fn extended_boost_expiry(user: &User, days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    let base = match user.boost_expires_at {
        Some(expires) if is_boost_active(user, now) => expires,
        _ => now,
    };
    base + chrono::Duration::days(days)
}

pub fn ensure_not_blocked(user: &User) -> Result<(), PolicyError> {
    if user.is_blocked {
        return Err(PolicyError::AccountBlocked);
    }
    Ok(())
}

pub fn can_send_request(user: &User, now: DateTime<Utc>) -> Result<(), PolicyError> {
    ensure_not_blocked(user)?;
    if !user.is_verified {
        return Err(PolicyError::VerificationRequired);
    }
    if !is_boost_active(user, now) {
        return Err(PolicyError::BoostRequired);
    }
    Ok(())
}

pub fn can_receive_request(user: &User) -> Result<(), PolicyError> {
    if user.is_blocked {
        return Err(PolicyError::RecipientUnavailable);
    }
    if !user.is_verified {
        return Err(PolicyError::RecipientNotVerified);
    }
    Ok(())
}

/// Symmetric block check between two members. The error tells the caller
/// which side holds the block.
pub fn check_block(
    sender_id: Uuid,
    sender_blocked: &[Uuid],
    receiver_id: Uuid,
    receiver_blocked: &[Uuid],
) -> Result<(), PolicyError> {
    if sender_blocked.contains(&receiver_id) {
        return Err(PolicyError::BlockedByYou);
    }
    if receiver_blocked.contains(&sender_id) {
        return Err(PolicyError::BlockedByRecipient);
    }
    Ok(())
}

/// A message from `sender` to `receiver` requires an active boost on the
/// sender and no block in either direction.
pub fn can_send_message(
    sender: &User,
    sender_blocked: &[Uuid],
    receiver: &User,
    receiver_blocked: &[Uuid],
    now: DateTime<Utc>,
) -> Result<(), PolicyError> {
    ensure_not_blocked(sender)?;
    if !is_boost_active(sender, now) {
        return Err(PolicyError::BoostRequired);
    }
    if receiver.is_blocked {
        return Err(PolicyError::RecipientUnavailable);
    }
    check_block(sender.id, sender_blocked, receiver.id, receiver_blocked)
}

/// Admin free-text actions that mention "block" (any case) block the
/// reported member.
pub fn action_blocks_user(action: &str) -> bool {
    action.to_lowercase().contains("block")
}
