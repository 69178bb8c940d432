use std::sync::Arc;

use crate::db::{LocalKeyValueStore, RemoteDocumentStore};
use crate::services::{ListSyncStore, ToastQueue};

/// Shared application state
///
/// The server hosts a single session, so there is exactly one list store.
#[derive(Clone)]
pub struct AppState {
    pub lists: Arc<ListSyncStore>,
    pub toasts: Arc<ToastQueue>,
}

impl AppState {
    /// Wires the list store to its backing stores, reporting into `toasts`
    pub fn new(
        remote: Arc<dyn RemoteDocumentStore>,
        local: Arc<dyn LocalKeyValueStore>,
        toasts: Arc<ToastQueue>,
    ) -> Self {
        let lists = Arc::new(ListSyncStore::new(remote, local, toasts.clone()));
        Self { lists, toasts }
    }
}
