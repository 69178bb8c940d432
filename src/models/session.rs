use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Who the current session belongs to.
///
/// Decides which backing store is authoritative: the remote document for a
/// signed-in user, the on-device copy for a guest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SessionIdentity {
    Authenticated(String),
    Guest,
}

impl SessionIdentity {
    /// Builds an identity from an optional user id
    pub fn from_user_id(user_id: Option<String>) -> Self {
        match user_id {
            Some(id) => SessionIdentity::Authenticated(id),
            None => SessionIdentity::Guest,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            SessionIdentity::Authenticated(id) => Some(id),
            SessionIdentity::Guest => None,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, SessionIdentity::Guest)
    }
}

impl Display for SessionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionIdentity::Authenticated(id) => write!(f, "user:{}", id),
            SessionIdentity::Guest => write!(f, "guest"),
        }
    }
}
