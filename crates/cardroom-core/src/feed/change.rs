//! Broadcast feed of changed game ids.
//!
//! Built on `tokio::sync::broadcast`. Publishing with no active subscribers
//! is a no-op. A subscriber only sees changes published after it subscribed.

use cardroom_types::game::GameId;
use thiserror::Error;
use tokio::sync::broadcast;

/// Why a subscription could not yield the next id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenError {
    /// The subscriber fell behind and this many notifications were dropped.
    #[error("subscription lagged, {0} notifications dropped")]
    Lagged(u64),

    /// Every publisher is gone; no further notifications will arrive.
    #[error("change feed closed")]
    Closed,
}

/// Source of change subscriptions.
pub trait GameListener: Send + Sync {
    /// Start a new subscription receiving all future changes.
    fn subscribe(&self) -> ChangeSubscription;
}

/// A single subscriber's view of the change stream.
pub struct ChangeSubscription {
    receiver: broadcast::Receiver<GameId>,
}

impl ChangeSubscription {
    pub fn new(receiver: broadcast::Receiver<GameId>) -> Self {
        Self { receiver }
    }

    /// Wait for the next changed game id.
    pub async fn next(&mut self) -> Result<GameId, ListenError> {
        match self.receiver.recv().await {
            Ok(id) => Ok(id),
            Err(broadcast::error::RecvError::Lagged(n)) => Err(ListenError::Lagged(n)),
            Err(broadcast::error::RecvError::Closed) => Err(ListenError::Closed),
        }
    }

    /// Non-blocking variant of [`next`](Self::next). `None` when nothing is queued.
    pub fn try_next(&mut self) -> Option<Result<GameId, ListenError>> {
        match self.receiver.try_recv() {
            Ok(id) => Some(Ok(id)),
            Err(broadcast::error::TryRecvError::Empty) => None,
            Err(broadcast::error::TryRecvError::Lagged(n)) => Some(Err(ListenError::Lagged(n))),
            Err(broadcast::error::TryRecvError::Closed) => Some(Err(ListenError::Closed)),
        }
    }
}

/// Multi-producer, multi-consumer feed of changed game ids.
///
/// Cloning the feed clones the sender, so every clone publishes into and
/// subscribes from the same channel.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<GameId>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Announce that a game was written or deleted.
    pub fn publish(&self, id: GameId) {
        let _ = self.sender.send(id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl GameListener for ChangeFeed {
    fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription::new(self.sender.subscribe())
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_subscribe_delivers_id() {
        let feed = ChangeFeed::new(16);
        let mut sub = feed.subscribe();

        feed.publish(GameId::from("g1"));

        assert_eq!(sub.next().await.unwrap(), GameId::from("g1"));
    }

    #[tokio::test]
    async fn every_subscriber_receives_each_id() {
        let feed = ChangeFeed::new(16);
        let mut a = feed.subscribe();
        let mut b = feed.subscribe();

        feed.publish(GameId::from("g1"));

        assert_eq!(a.next().await.unwrap(), GameId::from("g1"));
        assert_eq!(b.next().await.unwrap(), GameId::from("g1"));
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let feed = ChangeFeed::new(16);
        feed.publish(GameId::from("g1"));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn late_subscriber_misses_earlier_changes() {
        let feed = ChangeFeed::new(16);
        feed.publish(GameId::from("early"));
        let mut sub = feed.subscribe();
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn lagged_subscriber_reports_dropped_count() {
        let feed = ChangeFeed::new(2);
        let mut sub = feed.subscribe();
        for i in 0..5 {
            feed.publish(GameId::from(format!("g{i}")));
        }
        assert!(matches!(sub.try_next(), Some(Err(ListenError::Lagged(3)))));
        assert_eq!(sub.try_next(), Some(Ok(GameId::from("g3"))));
    }

    #[tokio::test]
    async fn dropped_feed_closes_subscription() {
        let feed = ChangeFeed::new(4);
        let mut sub = feed.subscribe();
        drop(feed);
        assert_eq!(sub.next().await, Err(ListenError::Closed));
    }

    #[test]
    fn clone_shares_channel() {
        let feed = ChangeFeed::new(16);
        let clone = feed.clone();
        let mut sub = feed.subscribe();

        clone.publish(GameId::from("g9"));

        assert_eq!(sub.try_next(), Some(Ok(GameId::from("g9"))));
    }

    #[test]
    fn debug_impl() {
        let feed = ChangeFeed::new(16);
        let _sub = feed.subscribe();
        let debug = format!("{feed:?}");
        assert!(debug.contains("ChangeFeed"));
        assert!(debug.contains("receiver_count"));
    }
}
