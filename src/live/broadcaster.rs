//! Fan-out of poll events to every connected subscriber
//!
//! The broadcaster owns the connection registry. Handlers call
//! [`Broadcaster::broadcast`] after a committed mutation; the WebSocket
//! endpoint registers and unregisters connections through it.
//!
//! Delivery is best effort: a subscriber whose send fails or does not finish
//! within the send timeout is closed and dropped from the registry. The
//! caller never sees delivery errors.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::events::PollEvent;
use super::registry::{ConnectionRegistry, SubscriberId};
use super::subscriber::{SendError, Subscriber};
use crate::db::models::PollWithOptions;

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Broadcaster<S> {
    registry: ConnectionRegistry<S>,
    send_timeout: Duration,
}

impl<S: Subscriber> Broadcaster<S> {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            send_timeout,
        }
    }

    pub fn register(&self, subscriber: Arc<S>) -> SubscriberId {
        let id = self.registry.register(subscriber);
        info!(subscriber = %id, active = self.registry.len(), "live subscriber connected");
        id
    }

    /// Idempotent; the read loop and a failed delivery may both call this.
    pub fn unregister(&self, id: SubscriberId) {
        if self.registry.unregister(id) {
            info!(subscriber = %id, active = self.registry.len(), "live subscriber disconnected");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &ConnectionRegistry<S> {
        &self.registry
    }

    /// Deliver `event` to every subscriber registered when the call starts.
    pub async fn broadcast(&self, event: &PollEvent) {
        let payload = match event.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!(event = event.kind(), "failed to serialize live event: {}", e);
                return;
            }
        };

        let subscribers = self.registry.snapshot();
        if subscribers.is_empty() {
            debug!(event = event.kind(), "no live subscribers");
            return;
        }

        let deliveries = subscribers
            .iter()
            .map(|(id, subscriber)| self.deliver(*id, subscriber, &payload));
        let dropped = join_all(deliveries)
            .await
            .into_iter()
            .filter(|delivered| !delivered)
            .count();

        debug!(
            event = event.kind(),
            attempted = subscribers.len(),
            dropped,
            "live event broadcast"
        );
    }

    async fn deliver(&self, id: SubscriberId, subscriber: &S, payload: &str) -> bool {
        let result = match timeout(self.send_timeout, subscriber.send_text(payload)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout(self.send_timeout)),
        };

        let Err(e) = result else {
            return true;
        };

        warn!(subscriber = %id, "dropping live subscriber: {}", e);
        match timeout(self.send_timeout, subscriber.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(close_err)) => debug!(subscriber = %id, "close failed: {}", close_err),
            Err(_) => debug!(subscriber = %id, "close timed out"),
        }
        self.unregister(id);
        false
    }

    pub async fn poll_created(&self, poll: PollWithOptions) {
        self.broadcast(&PollEvent::PollCreated { poll }).await;
    }

    pub async fn vote_updated(&self, poll: PollWithOptions) {
        self.broadcast(&PollEvent::VoteUpdate { poll }).await;
    }

    pub async fn like_updated(&self, poll: PollWithOptions) {
        self.broadcast(&PollEvent::LikeUpdate { poll }).await;
    }

    pub async fn poll_deleted(&self, poll_id: i32) {
        self.broadcast(&PollEvent::PollDeleted { poll_id }).await;
    }
}

impl<S: Subscriber> Default for Broadcaster<S> {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::OptionView;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct MockSubscriber {
        received: parking_lot::Mutex<Vec<String>>,
        broken: AtomicBool,
        hangs: bool,
        close_fails: bool,
        closed: AtomicBool,
    }

    impl MockSubscriber {
        fn healthy() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn broken() -> Arc<Self> {
            let sub = Self::default();
            sub.broken.store(true, Ordering::SeqCst);
            Arc::new(sub)
        }

        fn messages(&self) -> Vec<String> {
            self.received.lock().clone()
        }
    }

    impl Subscriber for MockSubscriber {
        async fn send_text(&self, text: &str) -> Result<(), SendError> {
            if self.hangs {
                std::future::pending::<()>().await;
            }
            if self.broken.load(Ordering::SeqCst) {
                return Err(SendError::Closed);
            }
            self.received.lock().push(text.to_string());
            Ok(())
        }

        async fn close(&self) -> Result<(), SendError> {
            self.closed.store(true, Ordering::SeqCst);
            if self.close_fails {
                return Err(SendError::Transport("already gone".to_string()));
            }
            Ok(())
        }
    }

    fn sample_poll() -> PollWithOptions {
        PollWithOptions {
            id: 1,
            question: "Lunch?".to_string(),
            likes: 0,
            options: vec![
                OptionView {
                    id: 10,
                    text: "Pizza".to_string(),
                    votes: 2,
                },
                OptionView {
                    id: 11,
                    text: "Salad".to_string(),
                    votes: 1,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_registry() {
        let broadcaster: Broadcaster<MockSubscriber> = Broadcaster::default();
        broadcaster.poll_deleted(1).await;
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_all_subscribers_receive_identical_message() {
        let broadcaster = Broadcaster::default();
        let a = MockSubscriber::healthy();
        let b = MockSubscriber::healthy();
        broadcaster.register(Arc::clone(&a));
        broadcaster.register(Arc::clone(&b));

        broadcaster.vote_updated(sample_poll()).await;

        let expected = PollEvent::VoteUpdate {
            poll: sample_poll(),
        }
        .to_json()
        .unwrap();
        assert_eq!(a.messages(), vec![expected.clone()]);
        assert_eq!(b.messages(), vec![expected]);
        assert_eq!(broadcaster.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_subscribers_are_pruned() {
        let broadcaster = Broadcaster::default();
        let mut healthy = Vec::new();
        let mut failed = Vec::new();

        for i in 0..10 {
            if i % 3 == 0 {
                let sub = MockSubscriber::broken();
                failed.push((broadcaster.register(Arc::clone(&sub)), sub));
            } else {
                let sub = MockSubscriber::healthy();
                healthy.push((broadcaster.register(Arc::clone(&sub)), sub));
            }
        }

        broadcaster.like_updated(sample_poll()).await;

        assert_eq!(broadcaster.subscriber_count(), healthy.len());
        for (id, sub) in &failed {
            assert!(!broadcaster.registry().contains(*id));
            assert!(sub.closed.load(Ordering::SeqCst));
        }
        for (id, sub) in &healthy {
            assert!(broadcaster.registry().contains(*id));
            assert_eq!(sub.messages().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_dead_subscriber_not_retried() {
        let broadcaster = Broadcaster::default();
        let a = MockSubscriber::healthy();
        let b = MockSubscriber::healthy();
        let a_id = broadcaster.register(Arc::clone(&a));
        broadcaster.register(Arc::clone(&b));

        a.broken.store(true, Ordering::SeqCst);
        broadcaster.poll_created(sample_poll()).await;
        assert!(!broadcaster.registry().contains(a_id));
        assert_eq!(b.messages().len(), 1);

        a.broken.store(false, Ordering::SeqCst);
        broadcaster.poll_deleted(1).await;

        assert!(a.messages().is_empty());
        assert_eq!(b.messages().len(), 2);
        assert_eq!(
            b.messages()[1],
            r#"{"event":"poll_deleted","poll_id":1}"#.to_string()
        );
    }

    #[tokio::test]
    async fn test_close_failure_still_unregisters() {
        let broadcaster = Broadcaster::default();
        let sub = Arc::new(MockSubscriber {
            close_fails: true,
            ..Default::default()
        });
        sub.broken.store(true, Ordering::SeqCst);
        let id = broadcaster.register(Arc::clone(&sub));

        broadcaster.poll_deleted(3).await;

        assert!(sub.closed.load(Ordering::SeqCst));
        assert!(!broadcaster.registry().contains(id));
    }

    #[tokio::test]
    async fn test_slow_subscriber_times_out_and_is_pruned() {
        let broadcaster = Broadcaster::new(Duration::from_millis(50));
        let slow = Arc::new(MockSubscriber {
            hangs: true,
            ..Default::default()
        });
        let fast = MockSubscriber::healthy();
        let slow_id = broadcaster.register(Arc::clone(&slow));
        let fast_id = broadcaster.register(Arc::clone(&fast));

        broadcaster.poll_deleted(9).await;

        assert!(!broadcaster.registry().contains(slow_id));
        assert!(broadcaster.registry().contains(fast_id));
        assert_eq!(fast.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_redundant_unregister_after_prune() {
        let broadcaster = Broadcaster::default();
        let sub = MockSubscriber::broken();
        let id = broadcaster.register(Arc::clone(&sub));

        broadcaster.poll_deleted(1).await;
        broadcaster.unregister(id);
        broadcaster.unregister(id);

        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_registration_during_broadcast() {
        let broadcaster = Arc::new(Broadcaster::default());
        let early: Vec<_> = (0..20).map(|_| MockSubscriber::healthy()).collect();
        for sub in &early {
            broadcaster.register(Arc::clone(sub));
        }

        let registering = {
            let broadcaster = Arc::clone(&broadcaster);
            tokio::spawn(async move {
                for _ in 0..20 {
                    broadcaster.register(MockSubscriber::healthy());
                    tokio::task::yield_now().await;
                }
            })
        };
        broadcaster.vote_updated(sample_poll()).await;
        registering.await.unwrap();

        assert_eq!(broadcaster.subscriber_count(), 40);
        assert!(early.iter().all(|sub| sub.messages().len() == 1));
    }
}
