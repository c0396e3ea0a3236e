//! In-process publish/subscribe with one private queue per subscription.
//!
//! Every subscription owns a bounded `tokio::sync::mpsc` queue registered under
//! its topic. `publish` copies the value into each queue registered on the topic
//! at that moment; nothing is retained for subscriptions created later. The
//! registry sits behind a single mutex, so publish, subscribe and cancel are
//! serialized against each other.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

/// Default number of undelivered events a single subscription may hold.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

// ============================================================================
// Types
// ============================================================================

/// Named event channel, e.g. `BOOK_ADDED`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(Arc<str>);

impl Topic {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Topic {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Topic {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&Topic> for Topic {
    fn from(topic: &Topic) -> Self {
        topic.clone()
    }
}

/// Identifier of a live subscription, unique for the lifetime of its bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A published value together with the topic it was published on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<T> {
    pub topic: Topic,
    pub value: T,
}

/// Event bus failures. These are infrastructure faults, never domain errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventBusError {
    #[error("subscription limit reached ({limit} live subscriptions)")]
    CapacityExceeded { limit: usize },
}

/// Event bus tuning.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Undelivered events a subscription may hold before it is evicted
    pub queue_capacity: usize,
    /// Upper bound on live subscriptions across all topics (None = unlimited)
    pub max_subscriptions: Option<usize>,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_subscriptions: None,
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

struct Slot<T> {
    tx: mpsc::Sender<Event<T>>,
    cancelled: Arc<AtomicBool>,
}

struct Registry<T> {
    topics: HashMap<Topic, HashMap<SubscriptionId, Slot<T>>>,
    index: HashMap<SubscriptionId, Topic>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            topics: HashMap::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Registry<T> {
    /// Deregister a subscription. The cancelled flag is raised before the
    /// sender is dropped so a woken consumer never reads a stale event.
    fn remove(&mut self, id: SubscriptionId) -> bool {
        let Some(topic) = self.index.remove(&id) else {
            return false;
        };

        if let Some(slots) = self.topics.get_mut(&topic) {
            if let Some(slot) = slots.remove(&id) {
                slot.cancelled.store(true, Ordering::Release);
                drop(slot.tx);
            }
            if slots.is_empty() {
                self.topics.remove(&topic);
            }
        }

        true
    }
}

struct Inner<T> {
    registry: Mutex<Registry<T>>,
    next_id: AtomicU64,
    config: EventBusConfig,
}

impl<T> Inner<T> {
    fn cancel(&self, id: SubscriptionId) -> bool {
        let removed = self.registry.lock().remove(id);
        if removed {
            debug!(subscription = %id, "Subscription cancelled");
        }
        removed
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Multi-topic fan-out bus.
///
/// Cloning the bus shares the same registry.
pub struct EventBus<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("EventBus")
            .field("topics", &registry.topics.len())
            .field("subscriptions", &registry.index.len())
            .field("queue_capacity", &self.inner.config.queue_capacity)
            .finish()
    }
}

impl<T> Default for EventBus<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

impl<T> EventBus<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(mut config: EventBusConfig) -> Self {
        // mpsc::channel panics on a zero capacity
        config.queue_capacity = config.queue_capacity.max(1);

        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::default()),
                next_id: AtomicU64::new(1),
                config,
            }),
        }
    }

    /// Enqueue `value` on every subscription currently registered on `topic`.
    ///
    /// Never waits. Returns how many subscriptions received the event; with no
    /// subscribers the event is dropped. A subscription whose queue is full is
    /// evicted rather than allowed to miss this event silently.
    pub fn publish(&self, topic: impl Into<Topic>, value: T) -> usize {
        let topic = topic.into();
        let mut registry = self.inner.registry.lock();

        let Some(slots) = registry.topics.get(&topic) else {
            trace!(topic = %topic, "Publish with no subscribers");
            return 0;
        };

        let mut delivered = 0;
        let mut evicted = Vec::new();
        for (id, slot) in slots {
            let event = Event {
                topic: topic.clone(),
                value: value.clone(),
            };
            match slot.tx.try_send(event) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        topic = %topic,
                        subscription = %id,
                        capacity = self.inner.config.queue_capacity,
                        "Subscription queue full, evicting slow subscriber"
                    );
                    evicted.push(*id);
                }
                Err(TrySendError::Closed(_)) => evicted.push(*id),
            }
        }

        for id in evicted {
            registry.remove(id);
        }

        trace!(topic = %topic, delivered, "Event published");
        delivered
    }

    /// Register a new subscription on `topic`.
    ///
    /// The subscription observes only events published after this call returns.
    pub fn subscribe(&self, topic: impl Into<Topic>) -> Result<Subscription<T>, EventBusError> {
        let topic = topic.into();
        let mut registry = self.inner.registry.lock();

        if let Some(limit) = self.inner.config.max_subscriptions
            && registry.index.len() >= limit
        {
            warn!(topic = %topic, limit, "Refusing subscription, limit reached");
            return Err(EventBusError::CapacityExceeded { limit });
        }

        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.inner.config.queue_capacity);
        let cancelled = Arc::new(AtomicBool::new(false));

        registry.topics.entry(topic.clone()).or_default().insert(
            id,
            Slot {
                tx,
                cancelled: cancelled.clone(),
            },
        );
        registry.index.insert(id, topic.clone());
        drop(registry);

        debug!(topic = %topic, subscription = %id, "Subscription registered");

        Ok(Subscription {
            id,
            topic,
            rx,
            cancelled,
            bus: Arc::downgrade(&self.inner),
        })
    }

    /// Deregister a subscription by id, discarding its undelivered events.
    ///
    /// A consumer suspended in [`Subscription::next`] wakes up and observes
    /// end-of-stream. Returns false if the subscription was already gone.
    pub fn cancel(&self, id: SubscriptionId) -> bool {
        self.inner.cancel(id)
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .registry
            .lock()
            .topics
            .get(topic)
            .map_or(0, HashMap::len)
    }

    /// Number of topics with at least one live subscription.
    pub fn topic_count(&self) -> usize {
        self.inner.registry.lock().topics.len()
    }
}

// ============================================================================
// Subscription handle
// ============================================================================

/// Consumer side of a subscription.
///
/// Yields events in publish order until cancelled. Dropping the handle
/// cancels the subscription.
pub struct Subscription<T> {
    id: SubscriptionId,
    topic: Topic,
    rx: mpsc::Receiver<Event<T>>,
    cancelled: Arc<AtomicBool>,
    bus: Weak<Inner<T>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Wait for the next event. `None` means the subscription was cancelled;
    /// every later call returns `None` as well.
    pub async fn next(&mut self) -> Option<Event<T>> {
        futures::future::poll_fn(|cx| self.poll_event(cx)).await
    }

    /// Cancel this subscription. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.cancel(self.id);
        }
        self.cancelled.store(true, Ordering::Release);
        self.rx.close();
    }

    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<Option<Event<T>>> {
        if self.is_cancelled() {
            return Poll::Ready(None);
        }

        match self.rx.poll_recv(cx) {
            // cancelled between the flag check and the dequeue
            Poll::Ready(Some(_)) if self.is_cancelled() => Poll::Ready(None),
            Poll::Ready(Some(event)) => Poll::Ready(Some(event)),
            Poll::Ready(None) => {
                self.cancelled.store(true, Ordering::Release);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Event<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_event(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if !self.is_cancelled()
            && let Some(inner) = self.bus.upgrade()
        {
            inner.cancel(self.id);
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
