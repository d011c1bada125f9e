//! Reply listener: one per client, shared by every operation.
//!
//! Drains the client's reply subscriptions and hands each reply to the
//! pending call with the same correlation ID.

use crate::domain::pending::PendingCallStore;
use futures::stream::{select_all, SelectAll, StreamExt};
use shared_bus::{BusMessage, MessageStream};
use shared_types::CorrelationId;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Routes replies from the bus to pending calls.
pub struct ReplyListener {
    pending: Arc<PendingCallStore>,
    replies: SelectAll<MessageStream>,
}

impl ReplyListener {
    pub fn new(pending: Arc<PendingCallStore>, streams: Vec<MessageStream>) -> Self {
        Self {
            pending,
            replies: select_all(streams),
        }
    }

    /// Run the listener loop until shutdown or until every reply
    /// subscription has closed. Calls still pending at exit are dropped so
    /// their callers fail fast instead of waiting out their timers.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Reply listener shutting down");
                        break;
                    }
                }
                next = self.replies.next() => match next {
                    Some(reply) => {
                        self.handle_reply(reply);
                    }
                    None => {
                        warn!("Reply subscriptions closed, stopping listener");
                        break;
                    }
                },
            }
        }

        let abandoned = self.pending.clear();
        if abandoned > 0 {
            info!(abandoned, "Dropped pending calls on listener exit");
        }
    }

    /// Complete the pending call matching this reply, if any.
    ///
    /// Returns whether a caller received it.
    pub fn handle_reply(&self, reply: BusMessage) -> bool {
        let Some(data) = reply.correlation_data.as_deref() else {
            warn!(topic = %reply.topic, "Reply without correlation data dropped");
            return false;
        };

        let correlation_id = match CorrelationId::from_slice(data) {
            Ok(id) => id,
            Err(e) => {
                warn!(topic = %reply.topic, error = %e, "Reply with invalid correlation data dropped");
                return false;
            }
        };

        let topic = reply.topic.clone();
        if self.pending.complete(correlation_id, reply) {
            true
        } else {
            debug!(
                correlation_id = %correlation_id,
                topic = %topic,
                "Late or duplicate reply ignored"
            );
            false
        }
    }
}
