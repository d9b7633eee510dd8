use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a checkpoint session.
///
/// Ids are supplied by the outside world (typically embedded in the scanned
/// URL), are case-sensitive, and carry no format guarantees beyond map-key
/// semantics.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new `SessionId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_display() {
        let id = SessionId::new("lab01-morning");
        assert_eq!(id.to_string(), "lab01-morning");
    }

    #[test]
    fn test_session_id_is_case_sensitive() {
        assert_ne!(SessionId::new("Lab01"), SessionId::new("lab01"));
    }

    #[test]
    fn test_session_id_roundtrip() {
        let original = SessionId::new("default");
        let deserialized: SessionId = original.as_str().into();
        assert_eq!(original, deserialized);
    }
}
