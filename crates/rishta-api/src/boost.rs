use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use tracing::info;

use rishta_db::models::{BoostPurchase, PurchaseOutcome};
use rishta_types::api::{
    BoostInfo, PromoPreview, PurchaseBoostRequest, PurchaseBoostResponse, UserClaims,
    ValidatePromoRequest,
};
use rishta_types::error::PromoRejection;
use rishta_types::models::NotificationKind;
use rishta_types::policy;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AppJson, Settings};
use crate::members::load_actor;
use crate::response::{created, ok};
use crate::state::AppState;

/// Promo codes are stored upper-cased.
pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub async fn boost_info(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Settings(settings): Settings,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    let user = load_actor(&state, claims.sub, now).await?;
    Ok(ok(BoostInfo {
        boost_status: policy::effective_boost_status(&user, now),
        boost_expires_at: user.boost_expires_at,
        price_cents: settings.boost_price_cents,
        currency: settings.currency,
        duration_days: settings.boost_duration_days,
    }))
}

pub async fn purchase_boost(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    settings: Settings,
    AppJson(req): AppJson<PurchaseBoostRequest>,
) -> ApiResult<impl IntoResponse> {
    settings.ensure_open()?;
    let payment_reference = req.payment_reference.trim().to_string();
    if payment_reference.is_empty() {
        return Err(ApiError::validation("Payment reference is required"));
    }
    let promo_code = req
        .promo_code
        .as_deref()
        .map(normalize_code)
        .filter(|c| !c.is_empty());

    let now = Utc::now();
    let user = load_actor(&state, claims.sub, now).await?;
    let Settings(settings) = settings;

    let user_id = user.id;
    let outcome = state
        .run(move |db| {
            db.purchase_boost(
                &BoostPurchase {
                    user_id,
                    amount_cents: settings.boost_price_cents,
                    currency: &settings.currency,
                    duration_days: settings.boost_duration_days,
                    promo_code: promo_code.as_deref(),
                    payment_reference: &payment_reference,
                },
                now,
            )
        })
        .await?;

    let (transaction, boost_expires_at) = match outcome {
        PurchaseOutcome::Completed {
            transaction,
            boost_expires_at,
        } => (transaction, boost_expires_at),
        PurchaseOutcome::PromoRejected(rejection) => return Err(rejection.into()),
        PurchaseOutcome::UserNotFound => return Err(ApiError::Unauthorized),
    };

    info!(
        "Member {} bought a boost until {} (paid {} {})",
        user_id, boost_expires_at, transaction.final_amount_cents, transaction.currency
    );
    let _ = state.notifier.notify(
        user_id,
        NotificationKind::BoostActivated,
        "Boost activated",
        format!("Your boost is active until {}", boost_expires_at.format("%d %b %Y")),
    );

    Ok(created(
        "Boost activated",
        PurchaseBoostResponse {
            transaction,
            boost_expires_at,
        },
    ))
}

/// Previews a discount against the current boost price without claiming a
/// use of the code.
pub async fn validate_promo(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Settings(settings): Settings,
    AppJson(req): AppJson<ValidatePromoRequest>,
) -> ApiResult<impl IntoResponse> {
    let code = normalize_code(&req.code);
    if code.is_empty() {
        return Err(ApiError::validation("Promo code is required"));
    }
    let now = Utc::now();
    load_actor(&state, claims.sub, now).await?;

    let promo = state
        .run(move |db| db.get_promo_code_by_code(&code))
        .await?
        .ok_or(PromoRejection::NotFound)?;
    promo.check_redeemable(now)?;

    let amount_cents = settings.boost_price_cents;
    let discount_cents = promo.discount_for(amount_cents);
    Ok(ok(PromoPreview {
        code: promo.code,
        amount_cents,
        discount_cents,
        final_amount_cents: amount_cents - discount_cents,
    }))
}
