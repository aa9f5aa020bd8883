use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::middleware::AuthenticatedUser;
use crate::models::{Conversation, Message};
use crate::services::messages_service::{ConversationCreated, ConversationWithMessages};
use crate::services::{CreateConversationInput, ReportInput};

use super::AppState;

pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<Conversation>>> {
    let conversations = state.messages.list_conversations(&user.uid).await?;
    Ok(Json(conversations))
}

pub async fn create_conversation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<CreateConversationInput>,
) -> AppResult<(StatusCode, Json<ConversationCreated>)> {
    let created = state.messages.create_conversation(&user.uid, input).await?;
    let status = if created.is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(created)))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<ConversationWithMessages>> {
    let with_messages = state.messages.get_conversation(&id, &user.uid).await?;
    Ok(Json(with_messages))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    #[serde(default)]
    pub text: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(body): Json<SendMessageBody>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let message = state.messages.send_message(&id, &user.uid, &body.text).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<serde_json::Value>> {
    let count = state.messages.unread_count(&user.uid).await?;
    Ok(Json(json!({ "unreadCount": count })))
}

pub async fn contact_admin(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<(StatusCode, Json<ConversationCreated>)> {
    let created = state.messages.contact_admin(&user.uid).await?;
    let status = if created.is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(created)))
}

pub async fn report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<ReportInput>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    state.messages.report(&user.uid, &user.email, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "通報を受け付けました" })),
    ))
}
