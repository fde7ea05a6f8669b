use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use tracing::info;

use rishta_types::api::{
    AdminClaims, AdminNotificationList, BroadcastRequest, BroadcastResponse, PageQuery,
    SettingsResponse, UpdateSettingsRequest,
};
use rishta_types::models::{AppSettings, NotificationKind};

use crate::error::{ApiError, ApiResult};
use crate::extract::{AppJson, AppQuery, Settings};
use crate::response::{ok, ok_with, page, pagination};
use crate::state::AppState;

const MAX_TITLE_LEN: usize = 120;
const MAX_BODY_LEN: usize = 1000;

/// Writes an announcement for every active member (optionally one role) in
/// a single store transaction, then pushes in the background.
pub async fn broadcast(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    AppJson(req): AppJson<BroadcastRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = req.title.trim().to_string();
    let body = req.body.trim().to_string();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::validation(format!(
            "Title must be between 1 and {} characters",
            MAX_TITLE_LEN
        )));
    }
    if body.is_empty() || body.chars().count() > MAX_BODY_LEN {
        return Err(ApiError::validation(format!(
            "Body must be between 1 and {} characters",
            MAX_BODY_LEN
        )));
    }

    let now = Utc::now();
    let role = req.role;
    let (t, b) = (title.clone(), body.clone());
    let recipients = state
        .run(move |db| {
            let ids = db.active_user_ids(role)?;
            db.insert_notifications(&ids, NotificationKind::Announcement, &t, &b, now)?;
            Ok(ids)
        })
        .await?;

    let count = recipients.len();
    info!("Admin {} broadcast \"{}\" to {} members", claims.email, title, count);
    let _ = state
        .notifier
        .push_many(recipients, NotificationKind::Announcement, title, body);

    Ok(ok_with("Broadcast sent", BroadcastResponse { recipients: count }))
}

pub async fn list_notifications(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = page(query.page, query.limit);
    let (notifications, total) = state.run(move |db| db.list_all_notifications(page)).await?;
    Ok(ok(AdminNotificationList {
        notifications,
        pagination: pagination(page, total),
    }))
}

pub async fn get_settings(Settings(settings): Settings) -> ApiResult<impl IntoResponse> {
    Ok(ok(SettingsResponse { settings }))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Settings(current): Settings,
    AppJson(req): AppJson<UpdateSettingsRequest>,
) -> ApiResult<impl IntoResponse> {
    let updated = apply_settings(current, req)?;
    let settings = state.run(move |db| db.save_settings(&updated)).await?;
    info!(
        "Admin {} updated settings (maintenance: {})",
        claims.email, settings.maintenance_mode
    );
    Ok(ok_with("Settings updated", SettingsResponse { settings }))
}

/// Upper bound on the boost price, in minor units.
const MAX_BOOST_PRICE_CENTS: i64 = 100_000_000;

fn apply_settings(mut settings: AppSettings, req: UpdateSettingsRequest) -> ApiResult<AppSettings> {
    if let Some(price) = req.boost_price_cents {
        if !(0..=MAX_BOOST_PRICE_CENTS).contains(&price) {
            return Err(ApiError::validation(format!(
                "Boost price must be between 0 and {} minor units",
                MAX_BOOST_PRICE_CENTS
            )));
        }
        settings.boost_price_cents = price;
    }
    if let Some(days) = req.boost_duration_days {
        if !(1..=365).contains(&days) {
            return Err(ApiError::validation("Boost duration must be between 1 and 365 days"));
        }
        settings.boost_duration_days = days;
    }
    if let Some(currency) = req.currency {
        let currency = currency.trim().to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ApiError::validation("Currency must be a three-letter code"));
        }
        settings.currency = currency;
    }
    if let Some(len) = req.max_message_length {
        if !(1..=10_000).contains(&len) {
            return Err(ApiError::validation("Max message length must be between 1 and 10000"));
        }
        settings.max_message_length = len;
    }
    if let Some(on) = req.maintenance_mode {
        settings.maintenance_mode = on;
    }
    if let Some(email) = req.support_email {
        let email = email.trim().to_string();
        if !email.contains('@') {
            return Err(ApiError::validation("Support email must be a valid address"));
        }
        settings.support_email = email;
    }
    Ok(settings)
}
