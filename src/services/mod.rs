pub mod list_sync;
pub mod notifications;

pub use list_sync::{Clock, ListSyncStore, SyncStatus};
pub use notifications::{NotificationSink, Toast, ToastQueue};
