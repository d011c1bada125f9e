//! # Shared Bus - Publish/Subscribe Transport
//!
//! Topic-based message delivery with the per-message metadata that the DCR
//! request/reply layer is built on.
//!
//! ## Delivery Rules
//!
//! - A message goes to every plain subscription whose filter matches.
//! - Each matching `$share/<group>/<filter>` group receives one copy, handed
//!   to its live members in turn.
//! - Correlation data, response topic and user properties travel untouched.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐   subscribe()   ┌──────────────┐
//! │  Requester   │ ────────────▶ │ Message Bus  │ ──────────────▶ │  Dispatcher  │
//! │              │ ◀──────────── │              │ ◀────────────── │  (group)     │
//! └──────────────┘     reply     └──────────────┘     publish()   └──────────────┘
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod message;
pub mod publisher;
pub mod subscriber;
pub mod topic;

use thiserror::Error;

// Re-export main types
pub use message::BusMessage;
pub use publisher::{InMemoryMessageBus, MessageBus};
pub use subscriber::{MessageStream, Subscription, SubscriptionError};
pub use topic::{TopicFilter, SHARED_SUBSCRIPTION_PREFIX};

/// Maximum messages to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Errors from bus operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Topic name cannot be published to.
    #[error("Invalid topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: String },

    /// Subscription filter is malformed.
    #[error("Invalid filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    /// Transport is no longer usable.
    #[error("Bus closed")]
    Closed,

    /// Subscriber registry lock was poisoned.
    #[error("Subscriber registry poisoned")]
    Poisoned,
}
