// In-process change feed with one topic per key (a recipient id in the back office).
// Publishers fan an event out to every live subscriber of the topic; subscribers
// re-fetch whatever view they render. A subscriber unregisters when its
// `Subscription` is dropped, and a topic disappears with its last subscriber.
use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use slab::Slab;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

pub type Result<T> = std::result::Result<T, FeedError>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FeedError {
    #[error("subscriber queue capacity must be greater than zero")]
    ZeroCapacity,
    #[error("topic must not be empty")]
    EmptyTopic,
}

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// What `publish` does when a subscriber queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Wait for the slow subscriber to make room.
    Block,
    /// Drop the event for that subscriber only. Consumers must tolerate gaps
    /// and re-fetch on the next event they do receive.
    #[default]
    DropNew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    pub queue_capacity: usize,
    pub policy: QueuePolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            policy: QueuePolicy::default(),
        }
    }
}

#[derive(Debug)]
struct SubscriberEntry<T> {
    id: usize,
    sender: mpsc::Sender<T>,
}

impl<T> Clone for SubscriberEntry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sender: self.sender.clone(),
        }
    }
}

#[derive(Debug)]
struct TopicState<T> {
    // Read by publish without taking the registry lock.
    snapshot: ArcSwap<Vec<SubscriberEntry<T>>>,
    // Mutated only on subscribe/unsubscribe.
    subscribers: Mutex<Slab<mpsc::Sender<T>>>,
}

impl<T> TopicState<T> {
    fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Vec::new()),
            subscribers: Mutex::new(Slab::new()),
        }
    }

    fn register(&self, capacity: usize) -> (usize, mpsc::Receiver<T>) {
        let mut subscribers = self.subscribers.lock();
        let (tx, rx) = mpsc::channel(capacity);
        let id = subscribers.insert(tx);
        self.rebuild_snapshot(&subscribers);
        (id, rx)
    }

    // Returns the number of subscribers left on the topic.
    fn remove(&self, id: usize) -> usize {
        let mut subscribers = self.subscribers.lock();
        if subscribers.contains(id) {
            subscribers.remove(id);
            self.rebuild_snapshot(&subscribers);
        }
        subscribers.len()
    }

    fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn rebuild_snapshot(&self, subscribers: &Slab<mpsc::Sender<T>>) {
        let snapshot = subscribers
            .iter()
            .map(|(id, sender)| SubscriberEntry {
                id,
                sender: sender.clone(),
            })
            .collect::<Vec<_>>();
        self.snapshot.store(Arc::new(snapshot));
    }
}

#[derive(Debug)]
struct FeedInner<T> {
    // Lock order: `topics` before any topic's `subscribers`.
    topics: RwLock<HashMap<String, Arc<TopicState<T>>>>,
    config: FeedConfig,
    subscriber_total: AtomicUsize,
}

impl<T> FeedInner<T> {
    fn unsubscribe(&self, topic: &str, id: usize) {
        let mut topics = self.topics.write();
        let Some(state) = topics.get(topic) else {
            return;
        };
        let before = state.len();
        let remaining = state.remove(id);
        if remaining == 0 {
            topics.remove(topic);
        }
        if remaining < before {
            let total = self.subscriber_total.fetch_sub(1, Ordering::Relaxed) - 1;
            metrics::gauge!("realty_feed_subscribers").set(total as f64);
        }
    }
}

/// In-process publish/subscribe feed.
///
/// ```
/// use realty_feed::Feed;
///
/// let feed = Feed::<&'static str>::new();
/// let rt = tokio::runtime::Runtime::new().expect("rt");
/// rt.block_on(async {
///     let mut sub = feed.subscribe("broker-1").expect("subscribe");
///     assert_eq!(feed.publish("broker-1", "changed").await, 1);
///     assert_eq!(sub.recv().await, Some("changed"));
/// });
/// ```
#[derive(Debug)]
pub struct Feed<T> {
    inner: Arc<FeedInner<T>>,
}

impl<T> Clone for Feed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Default for Feed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Feed<T> {
    pub fn new() -> Self {
        Self::build(FeedConfig::default())
    }

    pub fn with_config(config: FeedConfig) -> Result<Self> {
        if config.queue_capacity == 0 {
            return Err(FeedError::ZeroCapacity);
        }
        Ok(Self::build(config))
    }

    fn build(config: FeedConfig) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                topics: RwLock::new(HashMap::new()),
                config,
                subscriber_total: AtomicUsize::new(0),
            }),
        }
    }

    pub fn config(&self) -> FeedConfig {
        self.inner.config
    }

    /// Open a live subscription on `topic`. Events published before this call
    /// are not replayed.
    pub fn subscribe(&self, topic: &str) -> Result<Subscription<T>> {
        if topic.is_empty() {
            return Err(FeedError::EmptyTopic);
        }
        // Registration happens under the topics lock so a concurrent
        // unsubscribe can't remove the topic between lookup and insert.
        let mut topics = self.inner.topics.write();
        let state = topics
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(TopicState::new()));
        let (id, receiver) = state.register(self.inner.config.queue_capacity);
        drop(topics);

        let total = self.inner.subscriber_total.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::gauge!("realty_feed_subscribers").set(total as f64);
        Ok(Subscription {
            receiver,
            guard: SubscriptionGuard {
                feed: Arc::downgrade(&self.inner),
                topic: topic.to_string(),
                id,
            },
        })
    }

    /// Deliver `event` to every current subscriber of `topic` and return how
    /// many subscribers accepted it.
    pub async fn publish(&self, topic: &str, event: T) -> usize {
        let state = self.inner.topics.read().get(topic).cloned();
        let Some(state) = state else {
            return 0;
        };
        let subscribers = state.snapshot.load_full();
        let mut delivered = 0;
        for entry in subscribers.iter() {
            match self.inner.config.policy {
                QueuePolicy::DropNew => match entry.sender.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        metrics::counter!("realty_feed_dropped_total").increment(1);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                },
                QueuePolicy::Block => {
                    if entry.sender.send(event.clone()).await.is_ok() {
                        delivered += 1;
                    }
                }
            }
        }
        metrics::counter!("realty_feed_delivered_total").increment(delivered as u64);
        delivered
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .topics
            .read()
            .get(topic)
            .map(|state| state.len())
            .unwrap_or(0)
    }

    pub fn topic_count(&self) -> usize {
        self.inner.topics.read().len()
    }
}

/// RAII handle that unregisters a subscriber on drop.
#[derive(Debug)]
pub struct SubscriptionGuard<T> {
    feed: Weak<FeedInner<T>>,
    topic: String,
    id: usize,
}

impl<T> Drop for SubscriptionGuard<T> {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.upgrade() {
            feed.unsubscribe(&self.topic, self.id);
        }
    }
}

/// Receiver half of a topic subscription.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: mpsc::Receiver<T>,
    guard: SubscriptionGuard<T>,
}

impl<T> Subscription<T> {
    /// Wait for the next event. Pending forever while the topic is quiet.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> std::result::Result<T, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn topic(&self) -> &str {
        &self.guard.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn publish_delivers_to_subscriber() {
        let feed = Feed::new();
        let mut sub = feed.subscribe("b1").expect("subscribe");
        let delivered = feed.publish("b1", 7u32).await;
        assert_eq!(delivered, 1);
        assert_eq!(sub.recv().await, Some(7));
        assert_eq!(sub.topic(), "b1");
    }

    #[tokio::test]
    async fn publish_without_subscribers_returns_zero() {
        let feed = Feed::<u32>::new();
        assert_eq!(feed.publish("nobody", 1).await, 0);
        assert_eq!(feed.topic_count(), 0);
    }

    #[tokio::test]
    async fn every_subscriber_of_a_topic_receives_the_event() {
        let feed = Feed::new();
        let mut inbox = feed.subscribe("b1").expect("inbox");
        let mut dropdown = feed.subscribe("b1").expect("dropdown");
        assert_eq!(feed.publish("b1", "changed").await, 2);
        assert_eq!(inbox.recv().await, Some("changed"));
        assert_eq!(dropdown.recv().await, Some("changed"));
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let feed = Feed::new();
        let mut b1 = feed.subscribe("b1").expect("b1");
        let mut b2 = feed.subscribe("b2").expect("b2");
        feed.publish("b1", 1u8).await;
        assert_eq!(b1.recv().await, Some(1));
        assert!(matches!(
            b2.try_recv(),
            Err(mpsc::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let feed = Feed::new();
        let mut sub = feed.subscribe("b1").expect("subscribe");
        for value in 0..5u32 {
            feed.publish("b1", value).await;
        }
        for value in 0..5u32 {
            assert_eq!(sub.recv().await, Some(value));
        }
    }

    #[tokio::test]
    async fn dropping_subscription_unregisters_and_removes_topic() {
        let feed = Feed::<u32>::new();
        let first = feed.subscribe("b1").expect("first");
        let second = feed.subscribe("b1").expect("second");
        assert_eq!(feed.subscriber_count("b1"), 2);

        drop(first);
        assert_eq!(feed.subscriber_count("b1"), 1);
        assert_eq!(feed.publish("b1", 1).await, 1);

        drop(second);
        assert_eq!(feed.subscriber_count("b1"), 0);
        assert_eq!(feed.topic_count(), 0);
        assert_eq!(feed.publish("b1", 2).await, 0);
    }

    #[tokio::test]
    async fn resubscribe_after_topic_removal_works() {
        let feed = Feed::new();
        drop(feed.subscribe("b1").expect("first"));
        let mut again = feed.subscribe("b1").expect("again");
        assert_eq!(feed.publish("b1", 3u32).await, 1);
        assert_eq!(again.recv().await, Some(3));
    }

    #[tokio::test]
    async fn drop_new_policy_discards_when_queue_is_full() {
        let feed = Feed::with_config(FeedConfig {
            queue_capacity: 1,
            policy: QueuePolicy::DropNew,
        })
        .expect("feed");
        let mut sub = feed.subscribe("b1").expect("subscribe");
        assert_eq!(feed.publish("b1", 1u32).await, 1);
        assert_eq!(feed.publish("b1", 2u32).await, 0);
        assert_eq!(sub.recv().await, Some(1));
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn block_policy_waits_for_room() {
        let feed = Feed::with_config(FeedConfig {
            queue_capacity: 1,
            policy: QueuePolicy::Block,
        })
        .expect("feed");
        let mut sub = feed.subscribe("b1").expect("subscribe");
        feed.publish("b1", 1u32).await;

        let publisher = feed.clone();
        let pending = tokio::spawn(async move { publisher.publish("b1", 2u32).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        assert_eq!(sub.recv().await, Some(1));
        let delivered = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("publisher finished")
            .expect("join");
        assert_eq!(delivered, 1);
        assert_eq!(sub.recv().await, Some(2));
    }

    #[test]
    fn rejects_zero_capacity_and_empty_topic() {
        let err = Feed::<u32>::with_config(FeedConfig {
            queue_capacity: 0,
            policy: QueuePolicy::DropNew,
        })
        .expect_err("zero capacity");
        assert_eq!(err, FeedError::ZeroCapacity);

        let feed = Feed::<u32>::new();
        let err = feed.subscribe("").expect_err("empty topic");
        assert_eq!(err, FeedError::EmptyTopic);
    }

    #[tokio::test]
    async fn subscription_outliving_feed_drops_cleanly() {
        let feed = Feed::<u32>::new();
        let sub = feed.subscribe("b1").expect("subscribe");
        drop(feed);
        drop(sub);
    }
}
