//! Two-party message model for the guardian/staff chat.

use serde::{Deserialize, Serialize};

/// One chat message. Threads are ordered by `created_at` ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message: String,
    pub is_edited: bool,
    pub created_at: String,
}

/// Request body for sending a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub message: String,
}

/// Request body for editing an own message in place.
#[derive(Debug, Clone, Deserialize)]
pub struct EditMessageRequest {
    pub message: String,
}

/// One entry in the staff chat console: a counterpart with the latest
/// message exchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub user_id: String,
    pub nama: String,
    pub last_message: String,
    pub last_at: String,
}
