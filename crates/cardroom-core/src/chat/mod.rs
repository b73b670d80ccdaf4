//! Table chat projections.

pub mod grouping;

pub use grouping::{UNKNOWN_SENDER, group_messages};
