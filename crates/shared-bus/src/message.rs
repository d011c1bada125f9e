//! # Bus Messages
//!
//! A published message: topic, opaque payload and the per-message metadata
//! the RPC layer relies on.

use bytes::Bytes;

/// One message on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Opaque payload bytes.
    pub payload: Bytes,
    /// Opaque correlation data, copied verbatim into replies.
    pub correlation_data: Option<Vec<u8>>,
    /// Topic the sender expects a reply on.
    pub response_topic: Option<String>,
    /// Ordered key/value metadata. Keys may repeat.
    pub user_properties: Vec<(String, String)>,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            correlation_data: None,
            response_topic: None,
            user_properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_correlation_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.correlation_data = Some(data.into());
        self
    }

    #[must_use]
    pub fn with_response_topic(mut self, topic: impl Into<String>) -> Self {
        self.response_topic = Some(topic.into());
        self
    }

    #[must_use]
    pub fn with_user_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_properties.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_user_properties<I>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.user_properties.extend(props);
        self
    }

    /// First value of the user property `key`.
    pub fn user_property(&self, key: &str) -> Option<&str> {
        self.user_properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
