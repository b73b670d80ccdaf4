//! Table chat types.
//!
//! Messages live inside the game record. `MessageGroup` is a display-side
//! projection: consecutive messages from one sender rendered under a single
//! name and timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::UserId;

/// A single chat line posted at a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user_id: UserId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(user_id: impl Into<UserId>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One entry inside a [`MessageGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedMessage {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Consecutive messages from the same sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageGroup {
    pub user_id: UserId,
    /// Sender display name resolved from the game's users.
    pub name: String,
    /// Timestamp of the first message in the group.
    pub started_at: DateTime<Utc>,
    pub messages: Vec<GroupedMessage>,
}

/// Request body for posting a chat line. `message` is trimmed and must hold
/// 1 to 500 characters.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageRequest {
    pub user_id: String,
    pub message: String,
}
