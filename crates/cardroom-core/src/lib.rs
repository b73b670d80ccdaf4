//! Lobby logic and repository trait definitions for Cardroom.
//!
//! This crate defines the "ports" (repository and change listener traits)
//! that the infrastructure layer implements, plus the pieces that sit on top
//! of them: the connection registry, the game-change relay and its
//! supervisor, chat grouping, and the game service. It depends only on
//! `cardroom-types` -- never on `cardroom-infra` or any database/IO crate.

pub mod chat;
pub mod feed;
pub mod registry;
pub mod relay;
pub mod repository;
pub mod service;
