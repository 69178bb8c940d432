mod content;
mod list_state;
mod notice;
mod session;

pub use content::ContentId;
pub use list_state::{IdSet, ListField, ListState, WatchedEntry, WatchedList};
pub use notice::{Notice, Severity};
pub use session::SessionIdentity;

/// A remote document: field name to JSON value
pub type Document = serde_json::Map<String, serde_json::Value>;
