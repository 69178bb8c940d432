use crate::{error::AppResult, models::Document};

/// Authoritative store holding one list document per signed-in user.
///
/// Implementations report every failure (network, permission, protocol) as an
/// error; callers treat them all as "remote unavailable".
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    /// Fetches the document stored under `key`, or `None` if it does not exist
    async fn get_document(&self, key: &str) -> AppResult<Option<Document>>;

    /// Creates the document with merge-only semantics.
    ///
    /// Fields that already exist are left untouched, so two concurrent creates
    /// for the same key never clobber each other's data.
    async fn create_document(&self, key: &str, fields: Document) -> AppResult<()>;

    /// Overwrites the given fields, leaving all other fields as they are
    async fn update_fields(&self, key: &str, fields: Document) -> AppResult<()>;

    /// Store name for logging and debugging
    fn name(&self) -> &'static str;
}
