//! Shared domain types for Cardroom.
//!
//! Games, seated users, table chat, the websocket wire events, server
//! configuration, and the error types shared by the other crates.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod game;
