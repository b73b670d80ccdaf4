//! Runtime choice of game storage.
//!
//! The server runs against SQLite by default and against the in-memory
//! repository with `--in-memory`. [`LobbyStore`] wraps both behind one
//! concrete type so the service, relay and supervisor are instantiated once.

use std::path::Path;

use cardroom_core::feed::{ChangeFeed, ChangeSubscription, GameListener};
use cardroom_core::repository::{GameRepository, MemoryGameRepository};
use cardroom_types::chat::ChatMessage;
use cardroom_types::error::RepositoryError;
use cardroom_types::game::{Game, GameId, GameSummary};

use crate::sqlite::{DatabasePool, SqliteGameRepository, database_url};

pub enum LobbyStore {
    Sqlite(SqliteGameRepository),
    Memory(MemoryGameRepository),
}

impl LobbyStore {
    /// Open (and migrate) `{data_dir}/cardroom.db`.
    pub async fn open(data_dir: &Path, feed_capacity: usize) -> Result<Self, sqlx::Error> {
        let pool = DatabasePool::new(&database_url(data_dir)).await?;
        tracing::debug!(data_dir = %data_dir.display(), "opened sqlite game store");
        Ok(Self::Sqlite(SqliteGameRepository::new(
            pool,
            ChangeFeed::new(feed_capacity),
        )))
    }

    /// A volatile store; everything is lost on exit.
    pub fn in_memory(feed_capacity: usize) -> Self {
        Self::Memory(MemoryGameRepository::new(ChangeFeed::new(feed_capacity)))
    }

    pub fn feed(&self) -> &ChangeFeed {
        match self {
            Self::Sqlite(repo) => repo.feed(),
            Self::Memory(repo) => repo.feed(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Memory(_) => "memory",
        }
    }
}

impl GameListener for LobbyStore {
    fn subscribe(&self) -> ChangeSubscription {
        self.feed().subscribe()
    }
}

impl GameRepository for LobbyStore {
    async fn exists(&self, id: &GameId) -> Result<bool, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.exists(id).await,
            Self::Memory(repo) => repo.exists(id).await,
        }
    }

    async fn get(&self, id: &GameId) -> Result<Option<Game>, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.get(id).await,
            Self::Memory(repo) => repo.get(id).await,
        }
    }

    async fn abridged(&self, id: &GameId) -> Result<Option<GameSummary>, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.abridged(id).await,
            Self::Memory(repo) => repo.abridged(id).await,
        }
    }

    async fn list(&self) -> Result<Vec<GameSummary>, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.list().await,
            Self::Memory(repo) => repo.list().await,
        }
    }

    async fn save(&self, game: &Game) -> Result<(), RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.save(game).await,
            Self::Memory(repo) => repo.save(game).await,
        }
    }

    async fn update<F, E>(&self, id: &GameId, apply: F) -> Result<Game, E>
    where
        F: FnOnce(&mut Game) -> Result<(), E> + Send,
        E: From<RepositoryError> + Send,
    {
        match self {
            Self::Sqlite(repo) => repo.update(id, apply).await,
            Self::Memory(repo) => repo.update(id, apply).await,
        }
    }

    async fn delete(&self, id: &GameId) -> Result<bool, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.delete(id).await,
            Self::Memory(repo) => repo.delete(id).await,
        }
    }

    async fn add_message(&self, id: &GameId, message: &ChatMessage) -> Result<(), RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.add_message(id, message).await,
            Self::Memory(repo) => repo.add_message(id, message).await,
        }
    }
}
