//! Infrastructure layer for Cardroom.
//!
//! Contains the implementations of the ports defined in `cardroom-core`:
//! SQLite game storage, the runtime store selector, config loading, and
//! data directory resolution.

pub mod config;
pub mod filesystem;
pub mod sqlite;
pub mod store;
