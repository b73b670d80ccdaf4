//! Business logic services.

pub mod game;

pub use game::GameService;
