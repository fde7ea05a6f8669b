use std::str::FromStr;

use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use rishta_db::models::ResolveOutcome;
use rishta_types::api::{
    AdminClaims, AdminContactRequestList, AdminConversationList, DismissReportRequest, PageQuery,
    ReportList, ResolveReportRequest, ResolveReportResponse, StatusQuery,
};
use rishta_types::error::ParseEnumError;
use rishta_types::models::{NotificationKind, Report, ReportStatus, RequestStatus};

use crate::error::{ApiError, ApiResult};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::response::{ok, ok_with, page, pagination};
use crate::state::AppState;

/// `?status=` filter. An empty value or `all` means no filter.
pub(crate) fn parse_status<T>(status: Option<&str>) -> ApiResult<Option<T>>
where
    T: FromStr<Err = ParseEnumError>,
{
    match status.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => Ok(Some(s.parse()?)),
    }
}

pub async fn list_contact_requests(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<StatusQuery>,
) -> ApiResult<impl IntoResponse> {
    let status: Option<RequestStatus> = parse_status(query.status.as_deref())?;
    let page = page(query.page, query.limit);
    let (requests, total) = state
        .run(move |db| db.list_contact_requests(status, page))
        .await?;
    Ok(ok(AdminContactRequestList {
        requests,
        pagination: pagination(page, total),
    }))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = page(query.page, query.limit);
    let (conversations, total) = state.run(move |db| db.list_conversations(page)).await?;
    Ok(ok(AdminConversationList {
        conversations,
        pagination: pagination(page, total),
    }))
}

pub async fn list_reports(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<StatusQuery>,
) -> ApiResult<impl IntoResponse> {
    let status: Option<ReportStatus> = parse_status(query.status.as_deref())?;
    let page = page(query.page, query.limit);
    let (reports, total) = state.run(move |db| db.list_reports(status, page)).await?;
    Ok(ok(ReportList {
        reports,
        pagination: pagination(page, total),
    }))
}

/// Any action mentioning "block", in any case, also blocks the reported
/// member.
pub async fn resolve_report(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    AppPath(report_id): AppPath<Uuid>,
    AppJson(req): AppJson<ResolveReportRequest>,
) -> ApiResult<impl IntoResponse> {
    let action = req.action.trim().to_string();
    if action.is_empty() {
        return Err(ApiError::validation("An action is required"));
    }
    let now = Utc::now();
    let admin_id = claims.sub;
    let outcome = state
        .run(move |db| db.resolve_report(report_id, admin_id, &action, now))
        .await?;

    let (report, user_blocked) = closed(outcome)?;
    info!(
        "Admin {} resolved report {} (user blocked: {})",
        claims.email, report.id, user_blocked
    );
    if user_blocked {
        let _ = state.notifier.notify(
            report.reported_user_id,
            NotificationKind::AccountBlocked,
            "Account blocked",
            "Your account has been blocked following a report",
        );
    }

    Ok(ok_with("Report resolved", ResolveReportResponse { report, user_blocked }))
}

pub async fn dismiss_report(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    AppPath(report_id): AppPath<Uuid>,
    AppJson(req): AppJson<DismissReportRequest>,
) -> ApiResult<impl IntoResponse> {
    let note = req.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let now = Utc::now();
    let admin_id = claims.sub;
    let outcome = state
        .run(move |db| db.dismiss_report(report_id, admin_id, note.as_deref(), now))
        .await?;

    let (report, user_blocked) = closed(outcome)?;
    info!("Admin {} dismissed report {}", claims.email, report.id);
    Ok(ok_with("Report dismissed", ResolveReportResponse { report, user_blocked }))
}

fn closed(outcome: ResolveOutcome) -> ApiResult<(Report, bool)> {
    match outcome {
        ResolveOutcome::Closed { report, user_blocked } => Ok((report, user_blocked)),
        ResolveOutcome::NotFound => Err(ApiError::NotFound("Report")),
        ResolveOutcome::AlreadyClosed(report) => Err(ApiError::InvalidState(format!(
            "Report has already been {}",
            report.status
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_parsing() {
        assert_eq!(parse_status::<ReportStatus>(None).unwrap(), None);
        assert_eq!(parse_status::<ReportStatus>(Some("all")).unwrap(), None);
        assert_eq!(
            parse_status::<ReportStatus>(Some("resolved")).unwrap(),
            Some(ReportStatus::Resolved)
        );
        assert!(parse_status::<RequestStatus>(Some("maybe")).is_err());
    }
}
