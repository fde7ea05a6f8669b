use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use rishta_types::api::{BlockedUsersResponse, Profile, ProfileResponse, UserClaims};

use crate::error::{ApiError, ApiResult};
use crate::extract::{AppPath, Settings};
use crate::members::{load_actor, load_target};
use crate::response::{done, ok};
use crate::state::AppState;

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    let user = load_actor(&state, claims.sub, now).await?;
    Ok(ok(ProfileResponse {
        user: Profile::from_user(user, now),
    }))
}

pub async fn block_user(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    settings: Settings,
    AppPath(target_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    settings.ensure_open()?;
    let now = Utc::now();
    let actor = load_actor(&state, claims.sub, now).await?;
    if actor.id == target_id {
        return Err(ApiError::validation("You cannot block yourself"));
    }
    load_target(&state, target_id).await?;

    let added = state
        .run(move |db| db.block_user(actor.id, target_id, now))
        .await?;
    if added {
        info!("Member {} blocked {}", actor.id, target_id);
    }
    Ok(done("User blocked"))
}

pub async fn unblock_user(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    settings: Settings,
    AppPath(target_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    settings.ensure_open()?;
    let actor = load_actor(&state, claims.sub, Utc::now()).await?;

    let removed = state
        .run(move |db| db.unblock_user(actor.id, target_id))
        .await?;
    if !removed {
        return Err(ApiError::NotFound("Block"));
    }
    Ok(done("User unblocked"))
}

pub async fn list_blocked(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> ApiResult<impl IntoResponse> {
    let actor = load_actor(&state, claims.sub, Utc::now()).await?;
    let blocked_users = state.run(move |db| db.get_blocked_users(actor.id)).await?;
    Ok(ok(BlockedUsersResponse { blocked_users }))
}
