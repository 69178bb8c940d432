use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque identifier for a catalog item (movie or show).
///
/// The same id keys an item across the watchlist, watched and favorites lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ContentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_display() {
        let id = ContentId::from("27205");
        assert_eq!(format!("{}", id), "27205");
    }

    #[test]
    fn test_content_id_serializes_as_plain_string() {
        let id = ContentId::new("603");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""603""#);

        let deserialized: ContentId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }
}
