use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use rishta_db::models::NewMessage;
use rishta_types::api::{
    ConversationList, ConversationSummary, MarkReadResponse, MessageList, SendMessageRequest,
    SendMessageResponse, UserClaims,
};
use rishta_types::models::{Conversation, MessageType, NotificationKind};
use rishta_types::policy;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AppJson, AppPath, AppQuery, Settings};
use crate::members::{load_actor, load_target};
use crate::response::{created, ok};
use crate::state::AppState;

const MAX_PAGE: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor: id of the oldest message already shown.
    pub before: Option<Uuid>,
}

fn default_limit() -> u32 {
    50
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    settings: Settings,
    AppJson(req): AppJson<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    settings.ensure_open()?;
    if req.receiver_id == claims.sub {
        return Err(ApiError::validation("You cannot message yourself"));
    }
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::validation("Message content is required"));
    }
    let max_len = settings.0.max_message_length;
    if content.chars().count() as i64 > max_len {
        return Err(ApiError::validation(format!(
            "Message must be at most {} characters",
            max_len
        )));
    }

    let now = Utc::now();
    let sender = load_actor(&state, claims.sub, now).await?;
    let receiver = load_target(&state, req.receiver_id).await?;

    let (sender_id, receiver_id) = (sender.id, receiver.id);
    let (sender_blocked, receiver_blocked) = state
        .run(move |db| Ok((db.get_blocked_users(sender_id)?, db.get_blocked_users(receiver_id)?)))
        .await?;
    policy::can_send_message(&sender, &sender_blocked, &receiver, &receiver_blocked, now)?;

    let message_type = req.message_type;
    let sent = state
        .run(move |db| {
            db.send_message(
                &NewMessage {
                    sender_id,
                    receiver_id,
                    message_type,
                    content: &content,
                },
                now,
            )
        })
        .await?;

    let body = match message_type {
        MessageType::Text => sent.message.content.chars().take(80).collect(),
        MessageType::Image => "sent you a photo".to_string(),
        MessageType::File => "sent you a file".to_string(),
    };
    let _ = state.notifier.notify(
        receiver_id,
        NotificationKind::NewMessage,
        format!("New message from {}", sender.name),
        body,
    );

    Ok(created(
        "Message sent",
        SendMessageResponse {
            conversation_id: sent.conversation.id,
            message: sent.message,
        },
    ))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> ApiResult<impl IntoResponse> {
    let actor = load_actor(&state, claims.sub, Utc::now()).await?;
    let user_id = actor.id;
    let conversations = state
        .run(move |db| db.list_conversations_for_user(user_id))
        .await?
        .iter()
        .filter_map(|conv| ConversationSummary::for_user(conv, user_id))
        .collect();
    Ok(ok(ConversationList { conversations }))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    AppPath(conversation_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<MessageQuery>,
) -> ApiResult<impl IntoResponse> {
    let actor = load_actor(&state, claims.sub, Utc::now()).await?;
    participant_conversation(&state, conversation_id, actor.id).await?;

    let limit = query.limit.clamp(1, MAX_PAGE);
    let messages = state
        .run(move |db| db.get_messages(conversation_id, limit, query.before))
        .await?;
    Ok(ok(MessageList { messages }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    AppPath(conversation_id): AppPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let actor = load_actor(&state, claims.sub, Utc::now()).await?;
    participant_conversation(&state, conversation_id, actor.id).await?;

    let reader = actor.id;
    let marked = state
        .run(move |db| db.mark_conversation_read(conversation_id, reader))
        .await?;
    Ok(ok(MarkReadResponse { marked }))
}

/// Non-participants get the same answer as for a missing conversation.
async fn participant_conversation(
    state: &AppState,
    conversation_id: Uuid,
    user_id: Uuid,
) -> ApiResult<Conversation> {
    state
        .run(move |db| db.get_conversation(conversation_id))
        .await?
        .filter(|conv| conv.has_participant(user_id))
        .ok_or(ApiError::NotFound("Conversation"))
}
