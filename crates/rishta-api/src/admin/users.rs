use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use rishta_db::models::UserFilter;
use rishta_types::api::{
    AdminClaims, BlockUserRequest, GrantBoostRequest, Profile, ProfileResponse,
    PurchaseBoostResponse, UserDetail, UserList, UserListQuery, VerifyUserRequest,
};
use rishta_types::models::NotificationKind;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AppJson, AppPath, AppQuery, Settings};
use crate::response::{done, ok, ok_with, page, pagination};
use crate::state::AppState;

const MAX_GRANT_DAYS: i64 = 365;

pub async fn list_users(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UserListQuery>,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    let page = page(query.page, query.limit);
    let filter = UserFilter {
        role: query.role,
        verified: query.verified,
        blocked: query.blocked,
        boost: query.boost,
        search: query.search,
    };
    let (users, total) = state.run(move |db| db.list_users(&filter, page, now)).await?;
    Ok(ok(UserList {
        users: users.into_iter().map(|u| Profile::from_user(u, now)).collect(),
        pagination: pagination(page, total),
    }))
}

pub async fn get_user(
    State(state): State<AppState>,
    AppPath(user_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let (user, blocked_users) = state
        .run(move |db| {
            let Some(user) = db.get_user(user_id)? else {
                return Ok((None, Vec::new()));
            };
            Ok((Some(user), db.get_blocked_users(user_id)?))
        })
        .await?;
    let user = user.ok_or(ApiError::NotFound("User"))?;
    Ok(ok(UserDetail {
        user: Profile::from_user(user, Utc::now()),
        blocked_users,
    }))
}

pub async fn verify_user(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    AppPath(user_id): AppPath<Uuid>,
    AppJson(req): AppJson<VerifyUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    let verified = req.verified;
    let user = state
        .run(move |db| db.set_verified(user_id, verified, now))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    info!("Admin {} set verified={} on {}", claims.email, verified, user_id);
    if verified {
        let _ = state.notifier.notify(
            user_id,
            NotificationKind::AccountVerified,
            "Profile verified",
            "Your profile has been verified",
        );
    }

    let message = if verified { "User verified" } else { "User unverified" };
    Ok(ok_with(message, ProfileResponse {
        user: Profile::from_user(user, now),
    }))
}

pub async fn block_user(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    AppPath(user_id): AppPath<Uuid>,
    AppJson(req): AppJson<BlockUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let reason = req.reason.trim().to_string();
    if reason.is_empty() {
        return Err(ApiError::validation("A block reason is required"));
    }
    let now = Utc::now();
    let user = state
        .run(move |db| db.set_blocked(user_id, Some(&reason), now))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    info!("Admin {} blocked {}", claims.email, user_id);
    let _ = state.notifier.notify(
        user_id,
        NotificationKind::AccountBlocked,
        "Account blocked",
        user.block_reason.clone().unwrap_or_default(),
    );

    Ok(ok_with("User blocked", ProfileResponse {
        user: Profile::from_user(user, now),
    }))
}

pub async fn unblock_user(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    AppPath(user_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    let user = state
        .run(move |db| db.set_blocked(user_id, None, now))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    info!("Admin {} unblocked {}", claims.email, user_id);
    Ok(ok_with("User unblocked", ProfileResponse {
        user: Profile::from_user(user, now),
    }))
}

/// Promotional boost, recorded as a zero-amount transaction.
pub async fn grant_boost(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Settings(settings): Settings,
    AppPath(user_id): AppPath<Uuid>,
    AppJson(req): AppJson<GrantBoostRequest>,
) -> ApiResult<impl IntoResponse> {
    if !(1..=MAX_GRANT_DAYS).contains(&req.days) {
        return Err(ApiError::validation(format!(
            "Days must be between 1 and {}",
            MAX_GRANT_DAYS
        )));
    }
    let now = Utc::now();
    let days = req.days;
    let (transaction, boost_expires_at) = state
        .run(move |db| db.grant_boost(user_id, days, &settings.currency, now))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    info!("Admin {} granted {} boost days to {}", claims.email, days, user_id);
    let _ = state.notifier.notify(
        user_id,
        NotificationKind::BoostActivated,
        "Boost activated",
        format!("You have been granted a {} day boost", days),
    );

    Ok(ok_with(
        "Boost granted",
        PurchaseBoostResponse {
            transaction,
            boost_expires_at,
        },
    ))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    AppPath(user_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state.run(move |db| db.delete_user(user_id)).await?;
    if !deleted {
        return Err(ApiError::NotFound("User"));
    }
    info!("Admin {} deleted {}", claims.email, user_id);
    Ok(done("User deleted"))
}
