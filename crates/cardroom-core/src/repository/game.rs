//! Game repository trait definition.

use cardroom_types::chat::ChatMessage;
use cardroom_types::error::RepositoryError;
use cardroom_types::game::{Game, GameId, GameSummary};

/// Storage interface for games.
///
/// Implementations must announce every successful write or delete on their
/// change feed; the relay relies on that to reach clients.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait GameRepository: Send + Sync {
    /// Whether a game with this id is currently stored.
    fn exists(
        &self,
        id: &GameId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Fetch the full record, users and chat log included.
    fn get(
        &self,
        id: &GameId,
    ) -> impl std::future::Future<Output = Result<Option<Game>, RepositoryError>> + Send;

    /// Fetch the abridged projection of one game.
    fn abridged(
        &self,
        id: &GameId,
    ) -> impl std::future::Future<Output = Result<Option<GameSummary>, RepositoryError>> + Send;

    /// Abridged projections of every game, most recently updated first.
    fn list(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<GameSummary>, RepositoryError>> + Send;

    /// Insert or replace a game, including its users and chat log.
    ///
    /// Used when a table is opened. Changes to an existing game go through
    /// [`update`](Self::update) so concurrent writers cannot overwrite each
    /// other.
    fn save(
        &self,
        game: &Game,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Apply `apply` to the stored game as one atomic read-modify-write,
    /// stamp `updated_at`, and return the new state.
    ///
    /// No other write to the same game can interleave. `NotFound` if the game
    /// does not exist, and nothing is written (or published) when `apply`
    /// returns an error. Only metadata and seats are persisted; chat lines go
    /// through [`add_message`](Self::add_message).
    fn update<F, E>(
        &self,
        id: &GameId,
        apply: F,
    ) -> impl std::future::Future<Output = Result<Game, E>> + Send
    where
        F: FnOnce(&mut Game) -> Result<(), E> + Send,
        E: From<RepositoryError> + Send;

    /// Delete a game. Returns `true` if it existed.
    fn delete(
        &self,
        id: &GameId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Append a chat line and bump `updated_at`. `NotFound` if the game is gone.
    fn add_message(
        &self,
        id: &GameId,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
