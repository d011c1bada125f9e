//! # Subscriptions
//!
//! The receiving side of the bus.

use crate::message::BusMessage;
use crate::publisher::Registry;
use crate::topic::TopicFilter;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The subscription was unregistered or the bus was dropped.
    #[error("Subscription closed")]
    Closed,
}

/// A subscription handle for receiving messages.
///
/// When dropped, the subscription is removed from the bus.
pub struct Subscription {
    /// Registry id of this subscription.
    id: u64,

    /// Filter this subscription was created with.
    filter: TopicFilter,

    /// Per-subscription queue.
    receiver: mpsc::Receiver<BusMessage>,

    /// Reference to the bus registry (for cleanup).
    registry: Arc<RwLock<Registry>>,
}

impl Subscription {
    pub(crate) fn new(
        id: u64,
        filter: TopicFilter,
        receiver: mpsc::Receiver<BusMessage>,
        registry: Arc<RwLock<Registry>>,
    ) -> Self {
        Self {
            id,
            filter,
            receiver,
            registry,
        }
    }

    /// Receive the next message.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next delivered message
    /// - `None` - The subscription was closed
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.receiver.recv().await
    }

    /// Try to receive the next message without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was queued
    /// - `Ok(None)` - Nothing queued right now
    /// - `Err(SubscriptionError::Closed)` - The subscription was closed
    pub fn try_recv(&mut self) -> Result<Option<BusMessage>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &TopicFilter {
        &self.filter
    }

    /// Turn this subscription into a `Stream` of messages.
    #[must_use]
    pub fn into_stream(self) -> MessageStream {
        MessageStream { subscription: self }
    }

    /// Stop accepting new messages. Already queued messages can still be
    /// received.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Ok(mut registry) = self.registry.write() else {
            return;
        };
        registry.entries.retain(|e| e.id != self.id);
        debug!(filter = %self.filter, subscriber = self.id, "Subscription dropped");
    }
}

/// A stream wrapper for subscriptions.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
pub struct MessageStream {
    subscription: Subscription,
}

impl MessageStream {
    /// Get the filter for this stream.
    #[must_use]
    pub fn topic_filter(&self) -> &TopicFilter {
        self.subscription.filter()
    }
}

impl Stream for MessageStream {
    type Item = BusMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.subscription.receiver.poll_recv(cx)
    }
}
