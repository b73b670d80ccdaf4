//! SQLite storage for the lobby.

pub mod game;
pub mod pool;

pub use game::SqliteGameRepository;
pub use pool::{DatabasePool, database_url};
