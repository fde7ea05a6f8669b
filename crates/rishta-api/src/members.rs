use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use rishta_types::models::User;
use rishta_types::policy;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Loads the calling member. A token for a deleted member is treated as
/// unauthenticated and an admin-blocked member is refused outright.
///
/// A boost whose expiry has passed while the stored status still says
/// `active` is corrected here. The write is best effort: every check reads
/// the expiry timestamp, never the stored status.
pub(crate) async fn load_actor(state: &AppState, user_id: Uuid, now: DateTime<Utc>) -> ApiResult<User> {
    let user = state
        .run(move |db| {
            let Some(user) = db.get_user(user_id)? else {
                return Ok(None);
            };
            if policy::boost_needs_writeback(&user, now) {
                if let Err(e) = db.expire_stale_boost(user_id, now) {
                    warn!("Failed to expire stale boost for {}: {}", user_id, e);
                }
            }
            Ok(Some(user))
        })
        .await?
        .ok_or(ApiError::Unauthorized)?;

    policy::ensure_not_blocked(&user)?;
    Ok(user)
}

pub(crate) async fn load_target(state: &AppState, user_id: Uuid) -> ApiResult<User> {
    state
        .run(move |db| db.get_user(user_id))
        .await?
        .ok_or(ApiError::NotFound("User"))
}
