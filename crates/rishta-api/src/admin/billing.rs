use axum::{Extension, extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use rishta_db::models::{NewPromoCode, PromoCodeChanges};
use rishta_types::api::{
    AdminClaims, CreatePromoCodeRequest, PromoCodeList, PromoCodeResponse, StatusQuery,
    TransactionList, UpdatePromoCodeRequest,
};
use rishta_types::models::{DiscountType, TransactionStatus};

use super::moderation::parse_status;
use crate::boost::normalize_code;
use crate::error::{ApiError, ApiResult};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::response::{created, done, ok, ok_with, page, pagination};
use crate::state::AppState;

const CODE_LEN: usize = 8;
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const GENERATE_ATTEMPTS: usize = 5;

pub async fn list_transactions(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<StatusQuery>,
) -> ApiResult<impl IntoResponse> {
    let status: Option<TransactionStatus> = parse_status(query.status.as_deref())?;
    let page = page(query.page, query.limit);
    let user_id = query.user_id;
    let (transactions, total) = state
        .run(move |db| db.list_transactions(status, user_id, page))
        .await?;
    Ok(ok(TransactionList {
        transactions,
        pagination: pagination(page, total),
    }))
}

fn random_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

fn validate_code(code: &str) -> ApiResult<()> {
    let valid = (3..=32).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ApiError::validation(
            "Code must be 3 to 32 letters, digits, '-' or '_'",
        ));
    }
    Ok(())
}

/// Terms shared by create and update, checked on the merged result.
fn validate_terms(
    discount_type: DiscountType,
    discount_value: i64,
    usage_limit: i64,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
) -> ApiResult<()> {
    match discount_type {
        DiscountType::Percentage if !(1..=100).contains(&discount_value) => {
            return Err(ApiError::validation("Percentage discount must be between 1 and 100"));
        }
        DiscountType::Fixed if discount_value <= 0 => {
            return Err(ApiError::validation("Fixed discount must be greater than zero"));
        }
        _ => {}
    }
    if usage_limit < 1 {
        return Err(ApiError::validation("Usage limit must be at least 1"));
    }
    if valid_until <= valid_from {
        return Err(ApiError::validation("valid_until must be after valid_from"));
    }
    Ok(())
}

pub async fn list_promo_codes(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let promo_codes = state.run(|db| db.list_promo_codes()).await?;
    Ok(ok(PromoCodeList { promo_codes }))
}

pub async fn create_promo_code(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    AppJson(req): AppJson<CreatePromoCodeRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_terms(
        req.discount_type,
        req.discount_value,
        req.usage_limit,
        req.valid_from,
        req.valid_until,
    )?;
    let explicit = req.code.as_deref().map(normalize_code).filter(|c| !c.is_empty());
    if let Some(code) = &explicit {
        validate_code(code)?;
    }

    let now = Utc::now();
    let promo = state
        .run(move |db| {
            let attempts = if explicit.is_some() { 1 } else { GENERATE_ATTEMPTS };
            for _ in 0..attempts {
                let code = explicit.clone().unwrap_or_else(random_code);
                let new = NewPromoCode {
                    code: &code,
                    description: req.description.trim(),
                    discount_type: req.discount_type,
                    discount_value: req.discount_value,
                    usage_limit: req.usage_limit,
                    valid_from: req.valid_from,
                    valid_until: req.valid_until,
                };
                if let Some(promo) = db.create_promo_code(&new, now)? {
                    return Ok(Some(promo));
                }
            }
            Ok(None)
        })
        .await?
        .ok_or_else(|| ApiError::Conflict("A promo code with this code already exists".into()))?;

    info!("Admin {} created promo code {}", claims.email, promo.code);
    Ok(created("Promo code created", PromoCodeResponse { promo_code: promo }))
}

pub async fn update_promo_code(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    AppPath(promo_id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdatePromoCodeRequest>,
) -> ApiResult<impl IntoResponse> {
    let existing = state
        .run(move |db| db.get_promo_code(promo_id))
        .await?
        .ok_or(ApiError::NotFound("Promo code"))?;

    let changes = PromoCodeChanges {
        description: req.description.map(|d| d.trim().to_string()),
        discount_type: req.discount_type,
        discount_value: req.discount_value,
        usage_limit: req.usage_limit,
        valid_from: req.valid_from,
        valid_until: req.valid_until,
        is_active: req.is_active,
    };
    let usage_limit = changes.usage_limit.unwrap_or(existing.usage_limit);
    validate_terms(
        changes.discount_type.unwrap_or(existing.discount_type),
        changes.discount_value.unwrap_or(existing.discount_value),
        usage_limit,
        changes.valid_from.unwrap_or(existing.valid_from),
        changes.valid_until.unwrap_or(existing.valid_until),
    )?;
    if usage_limit < existing.usage_count {
        return Err(ApiError::validation(format!(
            "Usage limit cannot be below the {} uses already made",
            existing.usage_count
        )));
    }

    let promo = state
        .run(move |db| db.update_promo_code(promo_id, &changes))
        .await?
        .ok_or(ApiError::NotFound("Promo code"))?;

    info!("Admin {} updated promo code {}", claims.email, promo.code);
    Ok(ok_with("Promo code updated", PromoCodeResponse { promo_code: promo }))
}

pub async fn toggle_promo_code(
    State(state): State<AppState>,
    AppPath(promo_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let promo = state
        .run(move |db| db.toggle_promo_code(promo_id))
        .await?
        .ok_or(ApiError::NotFound("Promo code"))?;
    let message = if promo.is_active { "Promo code activated" } else { "Promo code deactivated" };
    Ok(ok_with(message, PromoCodeResponse { promo_code: promo }))
}

pub async fn delete_promo_code(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    AppPath(promo_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state.run(move |db| db.delete_promo_code(promo_id)).await?;
    if !deleted {
        return Err(ApiError::NotFound("Promo code"));
    }
    info!("Admin {} deleted promo code {}", claims.email, promo_id);
    Ok(done("Promo code deleted"))
}
