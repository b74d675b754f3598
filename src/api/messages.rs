//! Two-party chat endpoints.
//!
//! A guardian holds threads with staff only; staff may message anyone. New
//! messages reach an open counterpart thread through the long-poll feed, so
//! the recipient appends without refetching. Edit and delete apply to own
//! messages only; deletion is followed by a full thread refetch client-side.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::time::Duration;

use super::{success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::feed::POLL_TIMEOUT;
use crate::models::{ChatSummary, EditMessageRequest, Message, Role, SendMessageRequest};
use crate::AppState;

/// GET /api/chat/:counterpart - Full message thread, timestamp ascending.
pub async fn get_thread(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(counterpart): Path<String>,
) -> ApiResult<Vec<Message>> {
    ensure_counterpart(&state, &current, &counterpart).await?;

    let thread = state
        .repo
        .message_thread(&current.user.id, &counterpart)
        .await?;
    success(thread)
}

/// POST /api/chat - Send a message and publish it to the realtime feed.
pub async fn send_message(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<Message> {
    let body = request.message.trim();
    if body.is_empty() {
        return Err(AppError::Validation("Pesan tidak boleh kosong".to_string()));
    }

    ensure_counterpart(&state, &current, &request.receiver_id).await?;

    let message = state
        .repo
        .insert_message(&current.user.id, &request.receiver_id, body)
        .await?;

    state.feed.publish(message.clone());
    success(message)
}

/// PUT /api/chat/messages/:id - Edit an own message in place.
pub async fn edit_message(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<EditMessageRequest>,
) -> ApiResult<Message> {
    let body = request.message.trim();
    if body.is_empty() {
        return Err(AppError::Validation("Pesan tidak boleh kosong".to_string()));
    }

    let existing = state
        .repo
        .get_message(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))?;

    if existing.sender_id != current.user.id {
        return Err(AppError::Forbidden(
            "Hanya pengirim yang dapat mengedit pesan".to_string(),
        ));
    }

    let message = state.repo.edit_message(&id, body).await?;
    success(message)
}

/// DELETE /api/chat/messages/:id - Delete an own message.
pub async fn delete_message(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let existing = state
        .repo
        .get_message(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))?;

    if existing.sender_id != current.user.id {
        return Err(AppError::Forbidden(
            "Hanya pengirim yang dapat menghapus pesan".to_string(),
        ));
    }

    state.repo.delete_message(&id).await?;
    success(())
}

/// GET /api/chat - Staff console: counterparts with the latest exchange.
pub async fn chat_summaries(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Vec<ChatSummary>> {
    current.require_admin()?;
    let summaries = state.repo.chat_summaries(&current.user.id).await?;
    success(summaries)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollParams {
    /// Optional shorter wait in milliseconds, mainly for tests
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// GET /api/chat/poll - Long-poll for the next message addressed to the caller.
///
/// Returns `null` on timeout; the client immediately polls again while a
/// thread is open and drops the loop when it closes.
pub async fn poll_messages(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<PollParams>,
) -> ApiResult<Option<Message>> {
    let wait = params
        .timeout_ms
        .map(Duration::from_millis)
        .map(|d| d.min(POLL_TIMEOUT))
        .unwrap_or(POLL_TIMEOUT);

    let message = state.feed.poll(&current.user.id, wait).await;
    success(message)
}

/// A guardian may only hold threads with staff accounts; staff may message
/// anyone. The counterpart must exist either way.
async fn ensure_counterpart(
    state: &AppState,
    current: &CurrentUser,
    counterpart_id: &str,
) -> Result<(), AppError> {
    let counterpart = state
        .repo
        .get_user(counterpart_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", counterpart_id)))?;

    if !current.is_admin() && counterpart.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Wali hanya dapat mengirim pesan ke admin".to_string(),
        ));
    }

    Ok(())
}
