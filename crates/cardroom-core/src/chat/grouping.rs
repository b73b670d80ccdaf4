//! Groups a game's chat log by sender for display.
//!
//! Messages are ordered by timestamp first (stable, so equal timestamps keep
//! log order), then runs of consecutive messages from the same user collapse
//! into one [`MessageGroup`].

use cardroom_types::chat::{ChatMessage, GroupedMessage, MessageGroup};
use cardroom_types::game::Game;

/// Display name used when the sender is no longer seated at the table.
pub const UNKNOWN_SENDER: &str = "unknown";

pub fn group_messages(game: &Game) -> Vec<MessageGroup> {
    let mut ordered: Vec<&ChatMessage> = game.messages.iter().collect();
    ordered.sort_by_key(|m| m.timestamp);

    let mut groups: Vec<MessageGroup> = Vec::new();
    for msg in ordered {
        let entry = GroupedMessage {
            message: msg.message.clone(),
            timestamp: msg.timestamp,
        };
        match groups.last_mut() {
            Some(group) if group.user_id == msg.user_id => group.messages.push(entry),
            _ => groups.push(MessageGroup {
                user_id: msg.user_id.clone(),
                name: game
                    .user_name(&msg.user_id)
                    .unwrap_or(UNKNOWN_SENDER)
                    .to_string(),
                started_at: msg.timestamp,
                messages: vec![entry],
            }),
        }
    }
    groups
}
