//! Game service: validated lobby mutations.
//!
//! Every successful mutation goes through the repository exactly once, so
//! each produces exactly one change notification for the relay. Changes to
//! an existing game use [`GameRepository::update`], which makes the
//! read-check-write of a join or leave atomic.

use std::sync::Arc;

use cardroom_types::chat::{ChatMessage, MessageGroup};
use cardroom_types::error::GameError;
use cardroom_types::game::{
    CreateGameRequest, Game, GameId, GameStatus, GameSummary, MAX_PLAYERS, MIN_PLAYERS, User,
    UserId,
};
use tracing::info;

use crate::chat::group_messages;
use crate::repository::GameRepository;

/// Longest accepted table name, in characters.
const MAX_NAME_LEN: usize = 64;

/// Longest accepted chat line, in characters.
const MAX_MESSAGE_LEN: usize = 500;

/// Orchestrates game lifecycle on top of a [`GameRepository`].
///
/// Generic over the repository to maintain clean architecture (cardroom-core
/// never depends on cardroom-infra).
pub struct GameService<R: GameRepository> {
    repo: Arc<R>,
}

impl<R: GameRepository> GameService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &Arc<R> {
        &self.repo
    }

    /// Open a new table in the `Waiting` state.
    pub async fn create_game(&self, req: CreateGameRequest) -> Result<Game, GameError> {
        let name = validate_name(&req.name)?;
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&req.max_players) {
            return Err(GameError::InvalidSeats(req.max_players));
        }
        if req.small_blind == 0 || req.small_blind >= req.big_blind {
            return Err(GameError::InvalidBlinds {
                small: req.small_blind,
                big: req.big_blind,
            });
        }

        let game = Game::new(name, req.max_players, req.small_blind, req.big_blind);
        self.repo.save(&game).await?;
        info!(game_id = %game.id, name = %game.name, "game created");
        Ok(game)
    }

    pub async fn get_game(&self, id: &GameId) -> Result<Game, GameError> {
        self.repo.get(id).await?.ok_or(GameError::NotFound)
    }

    pub async fn list_games(&self) -> Result<Vec<GameSummary>, GameError> {
        Ok(self.repo.list().await?)
    }

    pub async fn rename_game(&self, id: &GameId, name: &str) -> Result<Game, GameError> {
        let name = validate_name(name)?;
        self.repo
            .update(id, |game| -> Result<(), GameError> {
                game.name = name;
                Ok(())
            })
            .await
    }

    pub async fn set_status(&self, id: &GameId, status: GameStatus) -> Result<Game, GameError> {
        let game = self
            .repo
            .update(id, |game| -> Result<(), GameError> {
                game.status = status;
                Ok(())
            })
            .await?;
        info!(game_id = %id, %status, "game status changed");
        Ok(game)
    }

    /// Seat a user at the table.
    ///
    /// The duplicate and capacity checks run inside the repository update,
    /// against the latest stored seats.
    pub async fn join_game(&self, id: &GameId, user_id: &str, name: &str) -> Result<Game, GameError> {
        let display = name.trim();
        if user_id.trim().is_empty() || display.is_empty() {
            return Err(GameError::InvalidName("user id and name are required".to_string()));
        }

        let uid = UserId::from(user_id.trim());
        let game = self
            .repo
            .update(id, |game| -> Result<(), GameError> {
                if game.users.contains_key(&uid) {
                    return Err(GameError::DuplicateUser(uid.0.clone()));
                }
                if game.is_full() {
                    return Err(GameError::TableFull(game.max_players));
                }
                game.users.insert(uid.clone(), User::new(uid.clone(), display));
                Ok(())
            })
            .await?;
        info!(game_id = %id, user_id = %uid, players = game.player_count(), "user joined");
        Ok(game)
    }

    pub async fn leave_game(&self, id: &GameId, user_id: &str) -> Result<Game, GameError> {
        let uid = UserId::from(user_id);
        let game = self
            .repo
            .update(id, |game| -> Result<(), GameError> {
                if game.users.remove(&uid).is_none() {
                    return Err(GameError::UserNotSeated(uid.0.clone()));
                }
                Ok(())
            })
            .await?;
        info!(game_id = %id, user_id = %uid, players = game.player_count(), "user left");
        Ok(game)
    }

    /// Post a chat line. Only seated users may chat, and lines longer than
    /// 500 characters are rejected.
    pub async fn post_message(
        &self,
        id: &GameId,
        user_id: &str,
        text: &str,
    ) -> Result<ChatMessage, GameError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GameError::EmptyMessage);
        }
        if text.chars().count() > MAX_MESSAGE_LEN {
            return Err(GameError::MessageTooLong(MAX_MESSAGE_LEN));
        }

        let game = self.get_game(id).await?;
        let uid = UserId::from(user_id);
        if !game.users.contains_key(&uid) {
            return Err(GameError::UserNotSeated(uid.0));
        }

        let message = ChatMessage::new(uid, text);
        self.repo.add_message(id, &message).await?;
        Ok(message)
    }

    /// The chat log grouped by sender.
    pub async fn message_groups(&self, id: &GameId) -> Result<Vec<MessageGroup>, GameError> {
        let game = self.get_game(id).await?;
        Ok(group_messages(&game))
    }

    pub async fn delete_game(&self, id: &GameId) -> Result<(), GameError> {
        if !self.repo.delete(id).await? {
            return Err(GameError::NotFound);
        }
        info!(game_id = %id, "game deleted");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, GameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidName("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(GameError::InvalidName(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}
