//! Bridges the game change stream to the connection registry.
//!
//! The relay holds no mutable state of its own: the repository is only read
//! and the registry is only written to. Delivery is publish-forward; there is
//! no sequencing, acknowledgement or replay for clients that reconnect.

use std::sync::Arc;

use cardroom_types::error::RepositoryError;
use cardroom_types::event::{ClientEvent, ServerEvent};
use cardroom_types::game::GameId;
use thiserror::Error;
use tracing::{debug, info};

use crate::registry::{Connection, ConnectionId, ConnectionRegistry, RegistryError};
use crate::repository::GameRepository;

/// Failures while relaying a notification or answering a request.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("existence check for game {id} failed: {source}")]
    ExistenceCheck {
        id: GameId,
        #[source]
        source: RepositoryError,
    },

    #[error("abridged projection for game {id} failed: {source}")]
    Projection {
        id: GameId,
        #[source]
        source: RepositoryError,
    },

    #[error("listing games failed: {source}")]
    List {
        #[source]
        source: RepositoryError,
    },

    #[error("delivery failed: {0}")]
    Delivery(#[from] RegistryError),
}

/// What a single change notification turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// `games:item-remove` broadcast to this many connections.
    Removed { delivered: usize },
    /// `games:item-update` broadcast to this many connections.
    Updated { delivered: usize },
}

/// Relay between a [`GameRepository`] and a [`ConnectionRegistry`].
pub struct GameRelay<R: GameRepository> {
    repo: Arc<R>,
    registry: ConnectionRegistry,
}

impl<R: GameRepository> GameRelay<R> {
    pub fn new(repo: Arc<R>, registry: ConnectionRegistry) -> Self {
        Self { repo, registry }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn repo(&self) -> &Arc<R> {
        &self.repo
    }

    /// Handle one change notification for `id`.
    ///
    /// Broadcasts `games:item-remove` when the game no longer exists, and
    /// `games:item-update` with the current abridged projection otherwise.
    /// A game that disappears between the existence check and the projection
    /// fetch is reported as removed. Errors are returned to the caller; the
    /// notification is not retried.
    pub async fn on_change(&self, id: &GameId) -> Result<RelayOutcome, RelayError> {
        let exists = self
            .repo
            .exists(id)
            .await
            .map_err(|source| RelayError::ExistenceCheck {
                id: id.clone(),
                source,
            })?;

        let summary = if exists {
            self.repo
                .abridged(id)
                .await
                .map_err(|source| RelayError::Projection {
                    id: id.clone(),
                    source,
                })?
        } else {
            None
        };

        match summary {
            Some(summary) => {
                let delivered = self.registry.broadcast(&ServerEvent::GameItemUpdate(summary));
                debug!(game_id = %id, delivered, "broadcast game update");
                Ok(RelayOutcome::Updated { delivered })
            }
            None => {
                let delivered = self.registry.broadcast(&ServerEvent::GameItemRemove(id.clone()));
                debug!(game_id = %id, delivered, "broadcast game removal");
                Ok(RelayOutcome::Removed { delivered })
            }
        }
    }

    /// Register a newly connected client.
    ///
    /// The returned queue carries every broadcast from now on, plus the
    /// answers to this connection's own requests.
    pub fn on_connect(&self) -> Connection {
        let connection = self.registry.register();
        info!(connection_id = %connection.id, "client connected");
        connection
    }

    /// Dispatch an event received from a connection.
    pub async fn on_client_event(
        &self,
        connection: &ConnectionId,
        event: ClientEvent,
    ) -> Result<(), RelayError> {
        match event {
            ClientEvent::RequestGames => self.send_games_list(connection).await,
            ClientEvent::Ping => Ok(self.registry.send_to(connection, ServerEvent::Pong)?),
        }
    }

    /// Fetch the full game list and send it to `connection` only.
    ///
    /// A full queue fails with `Delivery(QueueFull)` and the reply is not
    /// retried; the client asks again with `games:request`.
    pub async fn send_games_list(&self, connection: &ConnectionId) -> Result<(), RelayError> {
        let games = self
            .repo
            .list()
            .await
            .map_err(|source| RelayError::List { source })?;
        let count = games.len();
        self.registry
            .send_to(connection, ServerEvent::GamesList(games))?;
        debug!(connection_id = %connection, count, "sent games list");
        Ok(())
    }

    /// A client went away. No relay state to clean up; the registry drops
    /// the connection's queue.
    pub fn on_disconnect(&self, connection: &ConnectionId) {
        self.registry.unregister(connection);
        info!(connection_id = %connection, "client disconnected");
    }
}
