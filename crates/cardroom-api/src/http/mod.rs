//! HTTP layer for Cardroom.
//!
//! Axum REST API at `/api/v1/` with an envelope response format, plus the
//! lobby websocket at `/ws/games`.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
