//! In-memory game repository.
//!
//! Backs `serve --in-memory` and the core test suites. Publishes on its
//! [`ChangeFeed`] exactly like the SQLite implementation.

use cardroom_types::chat::ChatMessage;
use cardroom_types::error::RepositoryError;
use cardroom_types::game::{Game, GameId, GameSummary};
use chrono::Utc;
use dashmap::DashMap;

use super::game::GameRepository;
use crate::feed::{ChangeFeed, ChangeSubscription, GameListener};

pub struct MemoryGameRepository {
    games: DashMap<GameId, Game>,
    feed: ChangeFeed,
}

impl MemoryGameRepository {
    pub fn new(feed: ChangeFeed) -> Self {
        Self {
            games: DashMap::new(),
            feed,
        }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl GameListener for MemoryGameRepository {
    fn subscribe(&self) -> ChangeSubscription {
        self.feed.subscribe()
    }
}

impl GameRepository for MemoryGameRepository {
    async fn exists(&self, id: &GameId) -> Result<bool, RepositoryError> {
        Ok(self.games.contains_key(id))
    }

    async fn get(&self, id: &GameId) -> Result<Option<Game>, RepositoryError> {
        Ok(self.games.get(id).map(|g| g.value().clone()))
    }

    async fn abridged(&self, id: &GameId) -> Result<Option<GameSummary>, RepositoryError> {
        Ok(self.games.get(id).map(|g| g.abridged()))
    }

    async fn list(&self) -> Result<Vec<GameSummary>, RepositoryError> {
        let mut games: Vec<GameSummary> = self.games.iter().map(|g| g.abridged()).collect();
        games.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(games)
    }

    async fn save(&self, game: &Game) -> Result<(), RepositoryError> {
        self.games.insert(game.id.clone(), game.clone());
        self.feed.publish(game.id.clone());
        Ok(())
    }

    async fn update<F, E>(&self, id: &GameId, apply: F) -> Result<Game, E>
    where
        F: FnOnce(&mut Game) -> Result<(), E> + Send,
        E: From<RepositoryError> + Send,
    {
        let game = {
            let mut entry = self.games.get_mut(id).ok_or(RepositoryError::NotFound)?;
            let mut game = entry.value().clone();
            apply(&mut game)?;
            game.messages = std::mem::take(&mut entry.messages);
            game.updated_at = Utc::now();
            *entry = game.clone();
            game
        };
        self.feed.publish(id.clone());
        Ok(game)
    }

    async fn delete(&self, id: &GameId) -> Result<bool, RepositoryError> {
        let removed = self.games.remove(id).is_some();
        if removed {
            self.feed.publish(id.clone());
        }
        Ok(removed)
    }

    async fn add_message(&self, id: &GameId, message: &ChatMessage) -> Result<(), RepositoryError> {
        {
            let mut game = self.games.get_mut(id).ok_or(RepositoryError::NotFound)?;
            game.messages.push(message.clone());
            game.updated_at = Utc::now();
        }
        self.feed.publish(id.clone());
        Ok(())
    }
}
