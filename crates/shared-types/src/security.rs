//! # Credential Metadata
//!
//! Backend credentials travel as message user properties, never inside a
//! payload. The dispatcher forwards them verbatim to the backend; nothing in
//! this workspace interprets them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// User property carrying the backend username.
pub const USERNAME_PROPERTY: &str = "Username";

/// User property carrying the backend password.
pub const PASSWORD_PROPERTY: &str = "Password";

/// Opaque username/password pair for the simulation backend.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Encode as user properties for a request message.
    pub fn to_properties(&self) -> Vec<(String, String)> {
        vec![
            (USERNAME_PROPERTY.to_string(), self.username.clone()),
            (PASSWORD_PROPERTY.to_string(), self.password.clone()),
        ]
    }

    /// Decode from message user properties.
    ///
    /// Returns `None` unless both properties are present. The first
    /// occurrence of each key wins.
    pub fn from_properties(props: &[(String, String)]) -> Option<Self> {
        let find = |key: &str| {
            props
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        Some(Self {
            username: find(USERNAME_PROPERTY)?,
            password: find(PASSWORD_PROPERTY)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
