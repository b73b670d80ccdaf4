//! Websocket wire events exchanged with lobby clients.
//!
//! Every frame is a JSON text frame of the shape
//! `{"event": "<name>", "data": <payload>}`. Events without a payload omit
//! `data`.

use serde::{Deserialize, Serialize};

use crate::game::{GameId, GameSummary};

/// Event names as they appear on the wire.
pub mod names {
    pub const GAMES_LIST: &str = "games:list";
    pub const GAMES_ITEM_UPDATE: &str = "games:item-update";
    pub const GAMES_ITEM_REMOVE: &str = "games:item-remove";
    pub const GAMES_REQUEST: &str = "games:request";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
}

/// Events pushed from the server to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Full game list, sent only to the connection that asked for it.
    #[serde(rename = "games:list")]
    GamesList(Vec<GameSummary>),

    /// A game changed; carries its current abridged projection.
    #[serde(rename = "games:item-update")]
    GameItemUpdate(GameSummary),

    /// A game no longer exists.
    #[serde(rename = "games:item-remove")]
    GameItemRemove(GameId),

    /// Reply to a client `ping`.
    #[serde(rename = "pong")]
    Pong,
}

impl ServerEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::GamesList(_) => names::GAMES_LIST,
            ServerEvent::GameItemUpdate(_) => names::GAMES_ITEM_UPDATE,
            ServerEvent::GameItemRemove(_) => names::GAMES_ITEM_REMOVE,
            ServerEvent::Pong => names::PONG,
        }
    }
}

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Ask for the full game list.
    #[serde(rename = "games:request")]
    RequestGames,

    /// Keep-alive.
    #[serde(rename = "ping")]
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameStatus, GameSummary};
    use chrono::Utc;

    fn summary(id: &str, players: u32) -> GameSummary {
        GameSummary {
            id: GameId::from(id),
            name: "Table".to_string(),
            status: GameStatus::Waiting,
            players,
            max_players: 6,
            small_blind: 1,
            big_blind: 2,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_item_remove_wire_shape() {
        let event = ServerEvent::GameItemRemove(GameId::from("g1"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "games:item-remove");
        assert_eq!(json["data"], "g1");
    }

    #[test]
    fn test_item_update_wire_shape() {
        let event = ServerEvent::GameItemUpdate(summary("g2", 2));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "games:item-update");
        assert_eq!(json["data"]["id"], "g2");
        assert_eq!(json["data"]["players"], 2);
    }

    #[test]
    fn test_games_list_wire_shape() {
        let event = ServerEvent::GamesList(vec![summary("a", 1), summary("b", 3)]);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "games:list");
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_pong_has_no_data() {
        let json = serde_json::to_string(&ServerEvent::Pong).unwrap();
        assert_eq!(json, r#"{"event":"pong"}"#);
    }

    #[test]
    fn test_parse_request_without_data() {
        let event: ClientEvent = serde_json::from_str(r#"{"event":"games:request"}"#).unwrap();
        assert_eq!(event, ClientEvent::RequestGames);
    }

    #[test]
    fn test_parse_ping() {
        let event: ClientEvent = serde_json::from_str(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(event, ClientEvent::Ping);
    }

    #[test]
    fn test_unknown_client_event_is_rejected() {
        let result = serde_json::from_str::<ClientEvent>(r#"{"event":"games:delete"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_event_names_match_serde() {
        let event = ServerEvent::GameItemRemove(GameId::from("x"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
    }
}
