//! # Message Bus
//!
//! The transport seam (`MessageBus`) and its in-process implementation.

use crate::message::BusMessage;
use crate::subscriber::Subscription;
use crate::topic::{validate_topic_name, TopicFilter};
use crate::{BusError, DEFAULT_CHANNEL_CAPACITY};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Publish/subscribe transport used by requesters and dispatchers.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish a message.
    ///
    /// # Returns
    ///
    /// The number of subscriptions the message was delivered to. Zero is
    /// not an error: nobody was listening.
    async fn publish(&self, message: BusMessage) -> Result<usize, BusError>;

    /// Subscribe to a topic filter (plain or `$share/<group>/<filter>`).
    async fn subscribe(&self, filter: &str) -> Result<Subscription, BusError>;

    /// Total messages published on this bus.
    fn messages_published(&self) -> u64;
}

/// A registered subscriber.
pub(crate) struct SubscriberEntry {
    pub(crate) id: u64,
    pub(crate) filter: TopicFilter,
    pub(crate) sender: mpsc::Sender<BusMessage>,
}

/// Subscriber table shared between the bus and its subscriptions.
#[derive(Default)]
pub(crate) struct Registry {
    next_id: u64,
    pub(crate) entries: Vec<SubscriberEntry>,
    /// Round-robin cursor per shared filter.
    cursors: HashMap<String, usize>,
}

impl Registry {
    /// Pick the deliveries for `topic`: every matching plain subscriber
    /// plus one live member per matching share group.
    fn targets(&mut self, topic: &str) -> Vec<mpsc::Sender<BusMessage>> {
        self.entries.retain(|e| !e.sender.is_closed());

        let mut targets = Vec::new();
        let mut shared: HashMap<&str, Vec<&SubscriberEntry>> = HashMap::new();
        for entry in self.entries.iter().filter(|e| e.filter.matches(topic)) {
            if entry.filter.shared_group().is_some() {
                shared.entry(entry.filter.as_str()).or_default().push(entry);
            } else {
                targets.push(entry.sender.clone());
            }
        }

        for (key, members) in shared {
            let cursor = self.cursors.entry(key.to_string()).or_insert(0);
            let chosen = members[*cursor % members.len()];
            *cursor = cursor.wrapping_add(1);
            trace!(group = key, subscriber = chosen.id, "Shared delivery");
            targets.push(chosen.sender.clone());
        }

        targets
    }
}

/// In-memory implementation of the message bus.
///
/// Every subscription owns a bounded `mpsc` queue; publishing waits for
/// queue space, so a slow subscriber applies backpressure instead of
/// losing messages. Suitable for single-process deployments and tests; a
/// broker-backed implementation would sit behind the same trait.
pub struct InMemoryMessageBus {
    /// Registered subscribers.
    registry: Arc<RwLock<Registry>>,

    /// Total messages published.
    messages_published: AtomicU64,

    /// Per-subscriber queue capacity.
    capacity: usize,
}

impl InMemoryMessageBus {
    /// Create a new in-memory bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with the given per-subscriber capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            messages_published: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Number of registered, not yet dropped, subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .read()
            .map(|r| r.entries.iter().filter(|e| !e.sender.is_closed()).count())
            .unwrap_or(0)
    }

    /// Per-subscriber queue capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn publish(&self, message: BusMessage) -> Result<usize, BusError> {
        validate_topic_name(&message.topic)?;
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let targets = {
            let mut registry = self.registry.write().map_err(|_| BusError::Poisoned)?;
            registry.targets(&message.topic)
        };

        let mut delivered = 0;
        for sender in targets {
            if sender.send(message.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        debug!(topic = %message.topic, receivers = delivered, "Message published");
        Ok(delivered)
    }

    async fn subscribe(&self, filter: &str) -> Result<Subscription, BusError> {
        let filter = TopicFilter::parse(filter)?;
        let (sender, receiver) = mpsc::channel(self.capacity);

        let id = {
            let mut registry = self.registry.write().map_err(|_| BusError::Poisoned)?;
            registry.next_id += 1;
            let id = registry.next_id;
            registry.entries.push(SubscriberEntry {
                id,
                filter: filter.clone(),
                sender,
            });
            id
        };

        debug!(filter = %filter, subscriber = id, "New subscription created");
        Ok(Subscription::new(id, filter, receiver, self.registry.clone()))
    }

    fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}
