//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (cardroom-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod game;
pub mod memory;

pub use game::GameRepository;
pub use memory::MemoryGameRepository;
