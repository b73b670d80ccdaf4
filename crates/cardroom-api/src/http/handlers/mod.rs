//! HTTP request handlers.

pub mod games;
pub mod ws;
