//! Admin surface. Every handler here runs behind `require_admin`.

pub mod billing;
pub mod moderation;
pub mod platform;
pub mod users;

use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;

use rishta_types::api::{AdminClaims, AdminProfile, DashboardResponse};

use crate::error::{ApiError, ApiResult};
use crate::response::ok;
use crate::state::AppState;

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
) -> ApiResult<impl IntoResponse> {
    let admin = state
        .run(move |db| db.get_admin(claims.sub))
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(ok(serde_json::json!({
        "admin": AdminProfile {
            id: admin.id,
            email: admin.email,
            name: admin.name,
        }
    })))
}

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    let stats = state.run(move |db| db.dashboard_stats(now)).await?;
    Ok(ok(DashboardResponse { stats }))
}
