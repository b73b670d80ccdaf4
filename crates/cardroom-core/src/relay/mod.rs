//! Game-change relay.
//!
//! Turns persistence change notifications into client-facing websocket
//! events, and answers per-connection game list requests.
//!
//! - [`GameRelay`] handles one notification or one client request at a time.
//! - [`RelaySupervisor`] owns the listener loop and applies the configured
//!   [`FailurePolicy`](cardroom_types::config::FailurePolicy).

pub mod game_relay;
pub mod supervisor;

pub use game_relay::{GameRelay, RelayError, RelayOutcome};
pub use supervisor::{RelaySupervisor, SupervisorStats};
