use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use rishta_db::models::{CreateRequestOutcome, NewContactRequest, RespondOutcome};
use rishta_types::api::{
    ContactRequestList, ContactRequestResponse, RespondContactRequest, SendContactRequest,
    UserClaims,
};
use rishta_types::models::{NotificationKind, RequestStatus, RequestType};
use rishta_types::policy;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AppJson, AppPath, AppQuery, Settings};
use crate::members::{load_actor, load_target};
use crate::response::{created, ok, ok_with};
use crate::state::AppState;

const MAX_NOTE_LEN: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
}

pub async fn send_request(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    settings: Settings,
    AppJson(req): AppJson<SendContactRequest>,
) -> ApiResult<impl IntoResponse> {
    settings.ensure_open()?;
    if req.to_user_id == claims.sub {
        return Err(ApiError::validation("You cannot send a contact request to yourself"));
    }
    let note = req.message.as_deref().map(str::trim).filter(|m| !m.is_empty());
    if note.is_some_and(|m| m.chars().count() > MAX_NOTE_LEN) {
        return Err(ApiError::validation(format!(
            "Message must be at most {} characters",
            MAX_NOTE_LEN
        )));
    }
    let note = note.map(str::to_string);

    let now = Utc::now();
    let sender = load_actor(&state, claims.sub, now).await?;
    policy::can_send_request(&sender, now)?;

    let recipient = load_target(&state, req.to_user_id).await?;
    policy::can_receive_request(&recipient)?;

    let (sender_id, recipient_id) = (sender.id, recipient.id);
    let (sender_blocked, recipient_blocked) = state
        .run(move |db| Ok((db.get_blocked_users(sender_id)?, db.get_blocked_users(recipient_id)?)))
        .await?;
    policy::check_block(sender_id, &sender_blocked, recipient_id, &recipient_blocked)?;

    let request_type = req.request_type;
    let outcome = state
        .run(move |db| {
            db.create_contact_request(
                &NewContactRequest {
                    from_user_id: sender_id,
                    to_user_id: recipient_id,
                    request_type,
                    message: note.as_deref(),
                },
                now,
            )
        })
        .await?;

    let request = match outcome {
        CreateRequestOutcome::Created(request) => request,
        CreateRequestOutcome::DuplicatePending => {
            return Err(ApiError::Conflict(
                "You already have a pending request to this member".into(),
            ));
        }
    };

    info!("Contact request {} from {} to {}", request.id, sender_id, recipient_id);
    let _ = state.notifier.notify(
        recipient_id,
        NotificationKind::ContactRequest,
        "New contact request",
        format!("{} wants to see your {}", sender.name, request_type_label(request.request_type)),
    );

    Ok(created("Contact request sent", ContactRequestResponse { request }))
}

pub async fn received_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    AppQuery(filter): AppQuery<RequestFilter>,
) -> ApiResult<impl IntoResponse> {
    let actor = load_actor(&state, claims.sub, Utc::now()).await?;
    let requests = state
        .run(move |db| db.list_received_requests(actor.id, filter.status))
        .await?;
    Ok(ok(ContactRequestList { requests }))
}

pub async fn sent_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    AppQuery(filter): AppQuery<RequestFilter>,
) -> ApiResult<impl IntoResponse> {
    let actor = load_actor(&state, claims.sub, Utc::now()).await?;
    let requests = state
        .run(move |db| db.list_sent_requests(actor.id, filter.status))
        .await?;
    Ok(ok(ContactRequestList { requests }))
}

/// Only the recipient may answer, and only once. A losing concurrent answer
/// sees `InvalidState` and fires no notification.
pub async fn respond_to_request(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    settings: Settings,
    AppPath(request_id): AppPath<Uuid>,
    AppJson(req): AppJson<RespondContactRequest>,
) -> ApiResult<impl IntoResponse> {
    settings.ensure_open()?;
    if req.status == RequestStatus::Pending {
        return Err(ApiError::validation("Status must be accepted or rejected"));
    }

    let now = Utc::now();
    let actor = load_actor(&state, claims.sub, now).await?;
    let status = req.status;
    let outcome = state
        .run(move |db| db.respond_to_request(request_id, actor.id, status, now))
        .await?;

    let request = match outcome {
        RespondOutcome::Updated(request) => request,
        RespondOutcome::NotFound => return Err(ApiError::NotFound("Contact request")),
        RespondOutcome::NotRecipient => {
            return Err(ApiError::Forbidden(
                "Only the recipient can respond to this request".into(),
            ));
        }
        RespondOutcome::NotPending(existing) => {
            return Err(ApiError::InvalidState(format!(
                "Contact request has already been {}",
                existing.status
            )));
        }
    };

    let (kind, title, verb) = match request.status {
        RequestStatus::Accepted => (NotificationKind::RequestAccepted, "Contact request accepted", "accepted"),
        _ => (NotificationKind::RequestRejected, "Contact request declined", "declined"),
    };
    let _ = state.notifier.notify(
        request.from_user_id,
        kind,
        title,
        format!("{} {} your request", actor.name, verb),
    );

    Ok(ok_with(format!("Contact request {}", request.status), ContactRequestResponse { request }))
}

fn request_type_label(request_type: RequestType) -> &'static str {
    match request_type {
        RequestType::Mobile => "mobile number",
        RequestType::Photos => "photos",
        RequestType::Both => "mobile number and photos",
    }
}
