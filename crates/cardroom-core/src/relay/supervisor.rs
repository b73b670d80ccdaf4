//! Listener loop for the game relay.
//!
//! Pulls changed ids from a [`GameListener`] subscription, hands each one to
//! [`GameRelay::on_change`] in arrival order, and decides what a failure
//! means according to the [`FailurePolicy`]:
//!
//! - `LogAndContinue`: warn and move on to the next notification. A closed
//!   stream ends the loop.
//! - `RestartSubscription`: warn, wait `backoff`, then take a fresh
//!   subscription. A closed stream is resubscribed the same way.
//!
//! Lagging (notifications dropped because the loop fell behind) is logged and
//! otherwise ignored; clients reconcile with `games:request`.

use std::sync::Arc;
use std::time::Duration;

use cardroom_types::config::FailurePolicy;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::game_relay::{GameRelay, RelayOutcome};
use crate::feed::{ChangeSubscription, GameListener, ListenError};
use crate::repository::GameRepository;

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    pub updates: u64,
    pub removals: u64,
    pub failures: u64,
    pub lagged: u64,
    pub restarts: u64,
}

/// Owns the relay's listener subscription.
pub struct RelaySupervisor<R: GameRepository, L: GameListener> {
    relay: Arc<GameRelay<R>>,
    listener: Arc<L>,
    policy: FailurePolicy,
    backoff: Duration,
}

impl<R, L> RelaySupervisor<R, L>
where
    R: GameRepository + 'static,
    L: GameListener + 'static,
{
    pub fn new(
        relay: Arc<GameRelay<R>>,
        listener: Arc<L>,
        policy: FailurePolicy,
        backoff: Duration,
    ) -> Self {
        Self {
            relay,
            listener,
            policy,
            backoff,
        }
    }

    /// Spawn the loop on the current runtime.
    pub fn start(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<SupervisorStats> {
        tokio::spawn(self.run(shutdown))
    }

    /// Run until `shutdown` is cancelled, or until the stream closes under
    /// `LogAndContinue`.
    pub async fn run(self, shutdown: CancellationToken) -> SupervisorStats {
        let mut stats = SupervisorStats::default();
        let mut subscription = self.listener.subscribe();
        info!(policy = %self.policy, "game relay started");

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = subscription.next() => next,
            };

            match next {
                Ok(id) => match self.relay.on_change(&id).await {
                    Ok(RelayOutcome::Updated { .. }) => stats.updates += 1,
                    Ok(RelayOutcome::Removed { .. }) => stats.removals += 1,
                    Err(err) => {
                        stats.failures += 1;
                        warn!(game_id = %id, error = %err, policy = %self.policy, "game change relay failed");
                        if self.policy == FailurePolicy::RestartSubscription {
                            match self.resubscribe(&shutdown).await {
                                Some(fresh) => {
                                    subscription = fresh;
                                    stats.restarts += 1;
                                }
                                None => break,
                            }
                        }
                    }
                },
                Err(ListenError::Lagged(skipped)) => {
                    stats.lagged += skipped;
                    warn!(skipped, "game relay lagged, notifications dropped");
                }
                Err(ListenError::Closed) => match self.policy {
                    FailurePolicy::LogAndContinue => {
                        warn!("change feed closed, stopping game relay");
                        break;
                    }
                    FailurePolicy::RestartSubscription => {
                        warn!("change feed closed, resubscribing");
                        match self.resubscribe(&shutdown).await {
                            Some(fresh) => {
                                subscription = fresh;
                                stats.restarts += 1;
                            }
                            None => break,
                        }
                    }
                },
            }
        }

        info!(
            updates = stats.updates,
            removals = stats.removals,
            failures = stats.failures,
            lagged = stats.lagged,
            restarts = stats.restarts,
            "game relay stopped"
        );
        stats
    }

    /// Wait out the backoff and take a new subscription. `None` on shutdown.
    async fn resubscribe(&self, shutdown: &CancellationToken) -> Option<ChangeSubscription> {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return None,
            _ = tokio::time::sleep(self.backoff) => {}
        }
        debug!("taking fresh change subscription");
        Some(self.listener.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ChangeFeed;
    use crate::registry::ConnectionRegistry;
    use crate::repository::MemoryGameRepository;
    use cardroom_types::chat::ChatMessage;
    use cardroom_types::error::RepositoryError;
    use cardroom_types::event::ServerEvent;
    use cardroom_types::game::{Game, GameId, GameSummary};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    const WAIT: Duration = Duration::from_secs(2);

    /// Listener that counts how many subscriptions were taken.
    struct CountingListener {
        feed: ChangeFeed,
        subscriptions: AtomicUsize,
    }

    impl CountingListener {
        fn new(feed: ChangeFeed) -> Self {
            Self {
                feed,
                subscriptions: AtomicUsize::new(0),
            }
        }

        fn count(&self) -> usize {
            self.subscriptions.load(Ordering::SeqCst)
        }
    }

    impl GameListener for CountingListener {
        fn subscribe(&self) -> ChangeSubscription {
            self.subscriptions.fetch_add(1, Ordering::SeqCst);
            self.feed.subscribe()
        }
    }

    /// Repository that fails the existence check for ids starting with `bad`
    /// and holds ids starting with `slow` until `gate` has a permit.
    struct PoisonedRepository {
        inner: MemoryGameRepository,
        gate: Semaphore,
        stalled: AtomicUsize,
    }

    impl GameRepository for PoisonedRepository {
        async fn exists(&self, id: &GameId) -> Result<bool, RepositoryError> {
            if id.as_str().starts_with("bad") {
                return Err(RepositoryError::Connection);
            }
            if id.as_str().starts_with("slow") {
                self.stalled.fetch_add(1, Ordering::SeqCst);
                let _permit = self.gate.acquire().await.unwrap();
            }
            self.inner.exists(id).await
        }

        async fn get(&self, id: &GameId) -> Result<Option<Game>, RepositoryError> {
            self.inner.get(id).await
        }

        async fn abridged(&self, id: &GameId) -> Result<Option<GameSummary>, RepositoryError> {
            self.inner.abridged(id).await
        }

        async fn list(&self) -> Result<Vec<GameSummary>, RepositoryError> {
            self.inner.list().await
        }

        async fn save(&self, game: &Game) -> Result<(), RepositoryError> {
            self.inner.save(game).await
        }

        async fn update<F, E>(&self, id: &GameId, apply: F) -> Result<Game, E>
        where
            F: FnOnce(&mut Game) -> Result<(), E> + Send,
            E: From<RepositoryError> + Send,
        {
            self.inner.update(id, apply).await
        }

        async fn delete(&self, id: &GameId) -> Result<bool, RepositoryError> {
            self.inner.delete(id).await
        }

        async fn add_message(
            &self,
            id: &GameId,
            message: &ChatMessage,
        ) -> Result<(), RepositoryError> {
            self.inner.add_message(id, message).await
        }
    }

    struct Harness {
        feed: ChangeFeed,
        listener: Arc<CountingListener>,
        relay: Arc<GameRelay<PoisonedRepository>>,
    }

    fn harness() -> Harness {
        harness_with_capacity(64)
    }

    fn harness_with_capacity(capacity: usize) -> Harness {
        let feed = ChangeFeed::new(capacity);
        let repo = PoisonedRepository {
            inner: MemoryGameRepository::new(feed.clone()),
            gate: Semaphore::new(0),
            stalled: AtomicUsize::new(0),
        };
        Harness {
            listener: Arc::new(CountingListener::new(feed.clone())),
            relay: Arc::new(GameRelay::new(Arc::new(repo), ConnectionRegistry::new(64))),
            feed,
        }
    }

    async fn wait_for_subscriptions(listener: &CountingListener, n: usize) {
        tokio::time::timeout(WAIT, async {
            while listener.count() < n {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("subscription not taken in time");
    }

    async fn recv(conn: &mut crate::registry::Connection) -> ServerEvent {
        tokio::time::timeout(WAIT, conn.events.recv())
            .await
            .expect("no event in time")
            .expect("queue closed")
    }

    #[tokio::test]
    async fn relays_changes_in_arrival_order() {
        let h = harness();
        let mut conn = h.relay.on_connect();
        let shutdown = CancellationToken::new();
        let handle = RelaySupervisor::new(
            h.relay.clone(),
            h.listener.clone(),
            FailurePolicy::LogAndContinue,
            Duration::ZERO,
        )
        .start(shutdown.clone());
        wait_for_subscriptions(&h.listener, 1).await;

        let game = Game::new("Table", 6, 1, 2);
        h.relay.repo().save(&game).await.unwrap();
        h.feed.publish(GameId::from("gone"));

        assert!(matches!(recv(&mut conn).await, ServerEvent::GameItemUpdate(s) if s.id == game.id));
        assert_eq!(
            recv(&mut conn).await,
            ServerEvent::GameItemRemove(GameId::from("gone"))
        );

        shutdown.cancel();
        let stats = handle.await.unwrap();
        assert_eq!(stats.updates, 1);
        assert_eq!(stats.removals, 1);
        assert_eq!(stats.failures, 0);
    }

    #[tokio::test]
    async fn lagging_behind_is_counted_and_relaying_resumes() {
        let h = harness_with_capacity(2);
        let mut conn = h.relay.on_connect();
        let shutdown = CancellationToken::new();
        let handle = RelaySupervisor::new(
            h.relay.clone(),
            h.listener.clone(),
            FailurePolicy::LogAndContinue,
            Duration::ZERO,
        )
        .start(shutdown.clone());
        wait_for_subscriptions(&h.listener, 1).await;

        h.feed.publish(GameId::from("slow-1"));
        tokio::time::timeout(WAIT, async {
            while h.relay.repo().stalled.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("relay never reached the stalled game");

        for i in 1..=5 {
            h.feed.publish(GameId::from(format!("g{i}")));
        }
        h.relay.repo().gate.add_permits(1);
        h.feed.publish(GameId::from("after"));

        assert_eq!(
            recv(&mut conn).await,
            ServerEvent::GameItemRemove(GameId::from("slow-1"))
        );
        loop {
            if recv(&mut conn).await == ServerEvent::GameItemRemove(GameId::from("after")) {
                break;
            }
        }

        shutdown.cancel();
        let stats = handle.await.unwrap();
        assert!(stats.lagged >= 3, "lagged = {}", stats.lagged);
        assert_eq!(stats.failures, 0);
        assert_eq!(h.listener.count(), 1);
    }

    #[tokio::test]
    async fn log_and_continue_keeps_processing_after_failure() {
        let h = harness();
        let mut conn = h.relay.on_connect();
        let shutdown = CancellationToken::new();
        let handle = RelaySupervisor::new(
            h.relay.clone(),
            h.listener.clone(),
            FailurePolicy::LogAndContinue,
            Duration::ZERO,
        )
        .start(shutdown.clone());
        wait_for_subscriptions(&h.listener, 1).await;

        h.feed.publish(GameId::from("bad-1"));
        h.feed.publish(GameId::from("g1"));

        assert_eq!(
            recv(&mut conn).await,
            ServerEvent::GameItemRemove(GameId::from("g1"))
        );

        shutdown.cancel();
        let stats = handle.await.unwrap();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.removals, 1);
        assert_eq!(stats.restarts, 0);
        assert_eq!(h.listener.count(), 1);
    }

    #[tokio::test]
    async fn restart_subscription_resubscribes_after_failure() {
        let h = harness();
        let mut conn = h.relay.on_connect();
        let shutdown = CancellationToken::new();
        let handle = RelaySupervisor::new(
            h.relay.clone(),
            h.listener.clone(),
            FailurePolicy::RestartSubscription,
            Duration::ZERO,
        )
        .start(shutdown.clone());
        wait_for_subscriptions(&h.listener, 1).await;

        h.feed.publish(GameId::from("bad-1"));
        wait_for_subscriptions(&h.listener, 2).await;
        h.feed.publish(GameId::from("g2"));

        assert_eq!(
            recv(&mut conn).await,
            ServerEvent::GameItemRemove(GameId::from("g2"))
        );

        shutdown.cancel();
        let stats = handle.await.unwrap();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.restarts, 1);
    }

    /// Listener whose subscriptions are closed from the start.
    struct ClosedListener {
        subscriptions: AtomicUsize,
    }

    impl GameListener for ClosedListener {
        fn subscribe(&self) -> ChangeSubscription {
            self.subscriptions.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = tokio::sync::broadcast::channel(1);
            drop(tx);
            ChangeSubscription::new(rx)
        }
    }

    fn memory_relay() -> Arc<GameRelay<MemoryGameRepository>> {
        let repo = Arc::new(MemoryGameRepository::new(ChangeFeed::new(4)));
        Arc::new(GameRelay::new(repo, ConnectionRegistry::new(4)))
    }

    #[tokio::test]
    async fn closed_feed_stops_under_log_and_continue() {
        let listener = Arc::new(ClosedListener {
            subscriptions: AtomicUsize::new(0),
        });

        let handle = RelaySupervisor::new(
            memory_relay(),
            listener.clone(),
            FailurePolicy::LogAndContinue,
            Duration::ZERO,
        )
        .start(CancellationToken::new());

        let stats = tokio::time::timeout(WAIT, handle)
            .await
            .expect("supervisor did not stop")
            .unwrap();
        assert_eq!(stats, SupervisorStats::default());
        assert_eq!(listener.subscriptions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn closed_feed_is_resubscribed_under_restart_subscription() {
        let listener = Arc::new(ClosedListener {
            subscriptions: AtomicUsize::new(0),
        });
        let shutdown = CancellationToken::new();

        let handle = RelaySupervisor::new(
            memory_relay(),
            listener.clone(),
            FailurePolicy::RestartSubscription,
            Duration::from_millis(1),
        )
        .start(shutdown.clone());

        tokio::time::timeout(WAIT, async {
            while listener.subscriptions.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("no resubscription");
        shutdown.cancel();

        let stats = tokio::time::timeout(WAIT, handle)
            .await
            .expect("supervisor did not stop")
            .unwrap();
        assert!(stats.restarts >= 2);
        assert_eq!(stats.failures, 0);
    }

    #[tokio::test]
    async fn shutdown_interrupts_backoff() {
        let h = harness();
        let shutdown = CancellationToken::new();
        let handle = RelaySupervisor::new(
            h.relay.clone(),
            h.listener.clone(),
            FailurePolicy::RestartSubscription,
            Duration::from_secs(3600),
        )
        .start(shutdown.clone());
        wait_for_subscriptions(&h.listener, 1).await;

        h.feed.publish(GameId::from("bad-1"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        let stats = tokio::time::timeout(WAIT, handle)
            .await
            .expect("supervisor did not stop")
            .unwrap();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.restarts, 0);
    }
}
