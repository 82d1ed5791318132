//! Named-topic publish/subscribe between independently scheduled actors.
//!
//! The orchestrating flow, the fetch service, the playback sink and the
//! playback bridge never call into each other. Everything they need to know
//! about one another travels as a [`Signal`] on a [`SignalBus`].
//!
//! Delivery rules:
//! - `publish` never blocks on handlers; every subscriber owns an unbounded
//!   queue drained on its own task (or by its own `recv` calls).
//! - A subscriber sees same-topic signals in publish order. Nothing is
//!   promised across topics.
//! - Only subscribers registered when `publish` runs receive the signal.
//!   There is no replay.
//! - Publishing to a topic without subscribers is a no-op.

mod signal;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::{Stream, stream};
use parking_lot::RwLock;
pub use signal::{Signal, topics};
use tokio::sync::mpsc;

/// Errors surfaced by bus consumers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("Signal bus closed")]
    Closed,
}

/// Identifies one registration on one topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    topic: String,
}

impl SubscriptionHandle {
    /// Topic this registration listens on.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[derive(Debug)]
struct Subscriber {
    id: u64,
    sender: mpsc::UnboundedSender<Signal>,
}

#[derive(Debug, Default)]
struct Registry {
    topics: RwLock<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl Registry {
    fn register(&self, topic: &str, sender: mpsc::UnboundedSender<Signal>) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(Subscriber { id, sender });

        tracing::trace!("Subscribed #{} to '{}'", id, topic);
        SubscriptionHandle {
            id,
            topic: topic.to_string(),
        }
    }

    fn remove(&self, handle: &SubscriptionHandle) -> bool {
        let mut topics = self.topics.write();
        let Some(subscribers) = topics.get_mut(&handle.topic) else {
            return false;
        };

        let before = subscribers.len();
        subscribers.retain(|subscriber| subscriber.id != handle.id);
        let removed = subscribers.len() != before;

        if subscribers.is_empty() {
            topics.remove(&handle.topic);
        }
        removed
    }
}

/// Cloneable handle to a shared topic registry.
#[derive(Debug, Clone, Default)]
pub struct SignalBus {
    registry: Arc<Registry>,
}

impl SignalBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `signal` to every current subscriber of `topic`.
    ///
    /// Returns how many subscribers the signal was queued for. Subscribers
    /// whose receiving side is gone are pruned here.
    pub fn publish(&self, topic: &str, signal: Signal) -> usize {
        let mut topics = self.registry.topics.write();
        let Some(subscribers) = topics.get_mut(topic) else {
            tracing::trace!("No subscribers for '{}', dropping signal", topic);
            return 0;
        };

        subscribers.retain(|subscriber| subscriber.sender.send(signal.clone()).is_ok());
        let delivered = subscribers.len();

        if subscribers.is_empty() {
            topics.remove(topic);
        }

        tracing::trace!("Published to '{}' ({} subscribers)", topic, delivered);
        delivered
    }

    /// Publishes `signal` on its conventional topic.
    pub fn emit(&self, signal: Signal) -> usize {
        self.publish(signal.topic(), signal)
    }

    /// Runs `handler` for every signal published on `topic`.
    ///
    /// The handler runs on its own task, one signal at a time. Must be called
    /// from within a Tokio runtime.
    pub fn subscribe<F, Fut>(&self, topic: &str, handler: F) -> SubscriptionHandle
    where
        F: Fn(Signal) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let handle = self.registry.register(topic, sender);

        tokio::spawn(async move {
            while let Some(signal) = receiver.recv().await {
                handler(signal).await;
            }
        });

        handle
    }

    /// Queues signals from all `topics` into one receiver.
    ///
    /// The registrations are dropped together with the returned
    /// [`Subscription`].
    pub fn subscribe_channel(&self, topics: &[&str]) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handles = topics
            .iter()
            .map(|topic| self.registry.register(topic, sender.clone()))
            .collect();

        Subscription {
            handles,
            receiver,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Removes a registration. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let removed = self.registry.remove(handle);
        if removed {
            tracing::trace!("Unsubscribed #{} from '{}'", handle.id, handle.topic);
        }
        removed
    }

    /// Number of live registrations on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry
            .topics
            .read()
            .get(topic)
            .map_or(0, |subscribers| {
                subscribers
                    .iter()
                    .filter(|subscriber| !subscriber.sender.is_closed())
                    .count()
            })
    }
}

/// Pull-style subscription to one or more topics.
#[derive(Debug)]
pub struct Subscription {
    handles: Vec<SubscriptionHandle>,
    receiver: mpsc::UnboundedReceiver<Signal>,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Waits for the next signal.
    ///
    /// # Errors
    /// - `BusError::Closed` - Every handle to the bus has been dropped
    pub async fn recv(&mut self) -> Result<Signal, BusError> {
        self.receiver.recv().await.ok_or(BusError::Closed)
    }

    /// Returns an already queued signal without waiting.
    pub fn try_recv(&mut self) -> Option<Signal> {
        self.receiver.try_recv().ok()
    }

    /// Registrations backing this subscription.
    pub fn handles(&self) -> &[SubscriptionHandle] {
        &self.handles
    }

    /// Turns the subscription into a stream that ends when the bus closes.
    pub fn into_stream(self) -> impl Stream<Item = Signal> + Send {
        stream::unfold(self, |mut subscription| async move {
            let signal = subscription.recv().await.ok()?;
            Some((signal, subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            for handle in &self.handles {
                registry.remove(handle);
            }
        }
    }
}
