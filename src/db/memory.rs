use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::db::RemoteDocumentStore;
use crate::error::{AppError, AppResult};
use crate::models::Document;

/// Process-local document store.
///
/// Stands in for the remote store when no Redis is configured. It can be
/// switched offline to exercise the degraded paths.
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, Document>>,
    available: AtomicBool,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// When unavailable, every call fails with `RemoteUnavailable`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Current contents of a document, for inspection
    pub async fn document(&self, key: &str) -> Option<Document> {
        self.documents.read().await.get(key).cloned()
    }

    fn ensure_available(&self) -> AppResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::RemoteUnavailable("in-memory store is offline".to_string()))
        }
    }
}

#[async_trait::async_trait]
impl RemoteDocumentStore for InMemoryDocumentStore {
    async fn get_document(&self, key: &str) -> AppResult<Option<Document>> {
        self.ensure_available()?;
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn create_document(&self, key: &str, fields: Document) -> AppResult<()> {
        self.ensure_available()?;
        let mut documents = self.documents.write().await;
        let document = documents.entry(key.to_string()).or_default();
        for (field, value) in fields {
            document.entry(field).or_insert(value);
        }
        Ok(())
    }

    async fn update_fields(&self, key: &str, fields: Document) -> AppResult<()> {
        self.ensure_available()?;
        let mut documents = self.documents.write().await;
        documents.entry(key.to_string()).or_default().extend(fields);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
