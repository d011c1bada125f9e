//! # Topic Filters
//!
//! Slash-separated topic names and the filters that select them.
//!
//! - `+` matches exactly one level.
//! - `#` matches the remaining levels (including none) and must come last.
//! - `$share/<group>/<filter>` makes the subscription one member of a
//!   competing group: each matching message goes to one member only.
//!
//! Wildcards never match a first level starting with `$`.

use crate::BusError;
use std::fmt;

/// Prefix marking a shared (competing) subscription.
pub const SHARED_SUBSCRIPTION_PREFIX: &str = "$share/";

/// A parsed subscription filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    /// Filter as given, including any `$share/<group>/` prefix.
    raw: String,
    /// Filter levels without the shared prefix.
    levels: Vec<String>,
    /// Group name for shared subscriptions.
    shared_group: Option<String>,
}

impl TopicFilter {
    /// Parse and validate a filter.
    pub fn parse(filter: &str) -> Result<Self, BusError> {
        let invalid = |reason: &str| BusError::InvalidFilter {
            filter: filter.to_string(),
            reason: reason.to_string(),
        };

        let (shared_group, body) = match filter.strip_prefix(SHARED_SUBSCRIPTION_PREFIX) {
            Some(rest) => {
                let (group, body) = rest
                    .split_once('/')
                    .ok_or_else(|| invalid("shared subscription needs a filter"))?;
                if group.is_empty() || group.contains(['+', '#']) {
                    return Err(invalid("invalid share group name"));
                }
                (Some(group.to_string()), body)
            }
            None => (None, filter),
        };

        if body.is_empty() {
            return Err(invalid("empty filter"));
        }

        let levels: Vec<String> = body.split('/').map(str::to_string).collect();
        let last = levels.len() - 1;
        for (i, level) in levels.iter().enumerate() {
            if level.contains('#') && (level != "#" || i != last) {
                return Err(invalid("'#' must be the whole last level"));
            }
            if level.contains('+') && level != "+" {
                return Err(invalid("'+' must be a whole level"));
            }
        }

        Ok(Self {
            raw: filter.to_string(),
            levels,
            shared_group,
        })
    }

    /// Filter string as it was subscribed.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Share group name, if this is a shared subscription.
    pub fn shared_group(&self) -> Option<&str> {
        self.shared_group.as_deref()
    }

    /// Whether `topic` is selected by this filter.
    pub fn matches(&self, topic: &str) -> bool {
        let mut topic_levels = topic.split('/');

        if topic.starts_with('$') {
            match self.levels.first().map(String::as_str) {
                Some("+") | Some("#") => return false,
                _ => {}
            }
        }

        for level in &self.levels {
            match level.as_str() {
                "#" => return true,
                "+" => {
                    if topic_levels.next().is_none() {
                        return false;
                    }
                }
                exact => match topic_levels.next() {
                    Some(t) if t == exact => {}
                    _ => return false,
                },
            }
        }

        topic_levels.next().is_none()
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Validate a topic name used for publishing.
pub fn validate_topic_name(topic: &str) -> Result<(), BusError> {
    if topic.is_empty() {
        return Err(BusError::InvalidTopic {
            topic: topic.to_string(),
            reason: "empty topic".to_string(),
        });
    }
    if topic.contains(['+', '#']) {
        return Err(BusError::InvalidTopic {
            topic: topic.to_string(),
            reason: "wildcards are not allowed in topic names".to_string(),
        });
    }
    Ok(())
}
