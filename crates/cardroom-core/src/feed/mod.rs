//! Game change notifications.
//!
//! A [`GameListener`] hands out [`ChangeSubscription`]s that yield the id of
//! every game the persistence layer wrote or deleted. [`ChangeFeed`] is the
//! in-process implementation shared by the repositories.

pub mod change;

pub use change::{ChangeFeed, ChangeSubscription, GameListener, ListenError};
