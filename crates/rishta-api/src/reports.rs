use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use tracing::info;

use rishta_types::api::{CreateReportRequest, ReportResponse, UserClaims};

use crate::error::{ApiError, ApiResult};
use crate::extract::{AppJson, Settings};
use crate::members::{load_actor, load_target};
use crate::response::created;
use crate::state::AppState;

const MAX_REASON_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2000;

pub async fn create_report(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    settings: Settings,
    AppJson(req): AppJson<CreateReportRequest>,
) -> ApiResult<impl IntoResponse> {
    settings.ensure_open()?;
    if req.reported_user_id == claims.sub {
        return Err(ApiError::validation("You cannot report yourself"));
    }
    let reason = req.reason.trim().to_string();
    if reason.is_empty() || reason.chars().count() > MAX_REASON_LEN {
        return Err(ApiError::validation(format!(
            "Reason must be between 1 and {} characters",
            MAX_REASON_LEN
        )));
    }
    let description = req
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if description.as_ref().is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN) {
        return Err(ApiError::validation(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }

    let now = Utc::now();
    let reporter = load_actor(&state, claims.sub, now).await?;
    let reported = load_target(&state, req.reported_user_id).await?;

    let (reporter_id, reported_id) = (reporter.id, reported.id);
    let report = state
        .run(move |db| db.create_report(reporter_id, reported_id, &reason, description.as_deref(), now))
        .await?;

    info!("Report {} filed by {} against {}", report.id, reporter_id, reported_id);
    Ok(created("Report submitted", ReportResponse { report }))
}
