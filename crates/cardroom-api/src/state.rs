//! Application state wiring the lobby together.
//!
//! AppState holds the concrete service, relay and store used by both the CLI
//! and the server. Core types are generic over the repository; AppState pins
//! them to [`LobbyStore`].

use std::path::PathBuf;
use std::sync::Arc;

use cardroom_core::registry::ConnectionRegistry;
use cardroom_core::relay::{GameRelay, RelaySupervisor};
use cardroom_core::service::GameService;
use cardroom_infra::config::load_server_config;
use cardroom_infra::filesystem::{ensure_data_dir, resolve_data_dir};
use cardroom_infra::store::LobbyStore;
use cardroom_types::config::ServerConfig;

pub type ConcreteGameService = GameService<LobbyStore>;
pub type ConcreteGameRelay = GameRelay<LobbyStore>;
pub type ConcreteSupervisor = RelaySupervisor<LobbyStore, LobbyStore>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub game_service: Arc<ConcreteGameService>,
    pub relay: Arc<ConcreteGameRelay>,
    pub store: Arc<LobbyStore>,
    pub config: Arc<ServerConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Resolve the data dir, load config and open the store.
    pub async fn init(in_memory: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        ensure_data_dir(&data_dir).await?;

        let config = load_server_config(&data_dir).await;
        let store = if in_memory {
            LobbyStore::in_memory(config.change_feed_capacity)
        } else {
            LobbyStore::open(&data_dir, config.change_feed_capacity).await?
        };

        Ok(Self::from_parts(store, config, data_dir))
    }

    pub fn from_parts(store: LobbyStore, config: ServerConfig, data_dir: PathBuf) -> Self {
        let store = Arc::new(store);
        let registry = ConnectionRegistry::new(config.connection_buffer);

        Self {
            game_service: Arc::new(GameService::new(store.clone())),
            relay: Arc::new(GameRelay::new(store.clone(), registry)),
            store,
            config: Arc::new(config),
            data_dir,
        }
    }

    /// The supervisor that drives the relay from the store's change feed.
    pub fn supervisor(&self) -> ConcreteSupervisor {
        RelaySupervisor::new(
            self.relay.clone(),
            self.store.clone(),
            self.config.failure_policy,
            self.config.restart_backoff(),
        )
    }

    #[cfg(test)]
    pub fn in_memory_for_tests() -> Self {
        Self::from_parts(
            LobbyStore::in_memory(64),
            ServerConfig::default(),
            PathBuf::from("."),
        )
    }
}
