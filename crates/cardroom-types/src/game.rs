use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::ChatMessage;

/// Smallest table the lobby will open.
pub const MIN_PLAYERS: u32 = 2;

/// Largest table the lobby will open.
pub const MAX_PLAYERS: u32 = 10;

/// Opaque game identifier.
///
/// Freshly created games get a UUID v7 string, but any non-empty string is
/// accepted so ids coming from clients or older records round-trip untouched.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub String);

impl GameId {
    /// Create a new time-sortable GameId.
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GameId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a user seated at a game.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Display metadata the client renders next to a user's avatar and messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    pub name: String,
}

/// A user seated at a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub metadata: UserMetadata,
    pub joined_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: UserMetadata { name: name.into() },
            joined_at: Utc::now(),
        }
    }
}

/// Table lifecycle.
///
/// - Waiting: seats open, hand not started
/// - Playing: hands in progress
/// - Finished: table closed, kept for history until deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Waiting,
    Playing,
    Finished,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Waiting => write!(f, "waiting"),
            GameStatus::Playing => write!(f, "playing"),
            GameStatus::Finished => write!(f, "finished"),
        }
    }
}

impl FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "waiting" => Ok(GameStatus::Waiting),
            "playing" => Ok(GameStatus::Playing),
            "finished" => Ok(GameStatus::Finished),
            other => Err(format!("invalid game status: '{other}'")),
        }
    }
}

/// Full game record as held by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub status: GameStatus,
    pub max_players: u32,
    pub small_blind: u64,
    pub big_blind: u64,
    /// Seated users keyed by user id.
    #[serde(default)]
    pub users: BTreeMap<UserId, User>,
    /// Chat log, in insertion order.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    /// Build a new empty table in the `Waiting` state.
    pub fn new(name: impl Into<String>, max_players: u32, small_blind: u64, big_blind: u64) -> Self {
        let now = Utc::now();
        Self {
            id: GameId::new(),
            name: name.into(),
            status: GameStatus::Waiting,
            max_players,
            small_blind,
            big_blind,
            users: BTreeMap::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn player_count(&self) -> u32 {
        self.users.len() as u32
    }

    pub fn is_full(&self) -> bool {
        self.player_count() >= self.max_players
    }

    /// Summary projection used by list views and `games:item-update`.
    pub fn abridged(&self) -> GameSummary {
        GameSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status,
            players: self.player_count(),
            max_players: self.max_players,
            small_blind: self.small_blind,
            big_blind: self.big_blind,
            updated_at: self.updated_at,
        }
    }

    /// Look up the display name of a seated user.
    pub fn user_name(&self, user_id: &UserId) -> Option<&str> {
        self.users.get(user_id).map(|u| u.metadata.name.as_str())
    }
}

/// Abridged game: the list-view projection of a [`Game`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: GameId,
    pub name: String,
    pub status: GameStatus,
    /// Number of seated users.
    pub players: u32,
    pub max_players: u32,
    pub small_blind: u64,
    pub big_blind: u64,
    pub updated_at: DateTime<Utc>,
}

/// Request body for opening a new table.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGameRequest {
    pub name: String,
    #[serde(default = "default_max_players")]
    pub max_players: u32,
    pub small_blind: u64,
    pub big_blind: u64,
}

fn default_max_players() -> u32 {
    6
}

/// Request body for seating a user at a table.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinGameRequest {
    pub user_id: String,
    pub name: String,
}

/// Request body for renaming a table.
#[derive(Debug, Clone, Deserialize)]
pub struct RenameGameRequest {
    pub name: String,
}

/// Request body for moving a table to another status.
#[derive(Debug, Clone, Deserialize)]
pub struct SetStatusRequest {
    /// One of `waiting`, `playing`, `finished`.
    pub status: String,
}
