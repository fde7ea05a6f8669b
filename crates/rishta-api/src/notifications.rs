use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use rishta_types::api::{NotificationList, UserClaims};

use crate::error::{ApiError, ApiResult};
use crate::extract::{AppPath, AppQuery};
use crate::members::load_actor;
use crate::response::{done, ok};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    AppQuery(query): AppQuery<NotificationQuery>,
) -> ApiResult<impl IntoResponse> {
    let actor = load_actor(&state, claims.sub, Utc::now()).await?;
    let limit = query.limit.clamp(1, 100);
    let (notifications, unread_count) = state
        .run(move |db| {
            Ok((
                db.list_notifications(actor.id, limit)?,
                db.unread_notification_count(actor.id)?,
            ))
        })
        .await?;
    Ok(ok(NotificationList {
        notifications,
        unread_count,
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    AppPath(notification_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let actor = load_actor(&state, claims.sub, Utc::now()).await?;
    let found = state
        .run(move |db| db.mark_notification_read(notification_id, actor.id))
        .await?;
    if !found {
        return Err(ApiError::NotFound("Notification"));
    }
    Ok(done("Notification marked as read"))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> ApiResult<impl IntoResponse> {
    let actor = load_actor(&state, claims.sub, Utc::now()).await?;
    let marked = state
        .run(move |db| db.mark_all_notifications_read(actor.id))
        .await?;
    Ok(done(format!("{} notifications marked as read", marked)))
}
