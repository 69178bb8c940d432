use redis::AsyncCommands;
use redis::Client;
use std::collections::HashMap;
use std::fmt::Display;

use crate::db::RemoteDocumentStore;
use crate::error::AppResult;
use crate::models::Document;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    Lists(String),
}

impl Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKey::Lists(user_id) => write!(f, "lists:{}", user_id),
        }
    }
}

/// Creates a Redis client for the list documents
///
/// Connections are multiplexed, so the client is cheap to clone and share.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Remote document store backed by Redis hashes
///
/// Each document is one hash; every hash field holds the JSON encoding of the
/// matching document field. Merge-only creation maps onto `HSETNX`, which
/// gives field-level protection against concurrent creates.
#[derive(Clone)]
pub struct RedisDocumentStore {
    redis_client: Client,
}

impl RedisDocumentStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl RemoteDocumentStore for RedisDocumentStore {
    async fn get_document(&self, key: &str) -> AppResult<Option<Document>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let raw: HashMap<String, String> = conn.hgetall(key).await?;

        tracing::debug!(key = %key, fields = raw.len(), "Fetched list document");

        Ok(decode_fields(raw))
    }

    async fn create_document(&self, key: &str, fields: Document) -> AppResult<()> {
        let encoded = encode_fields(&fields)?;
        if encoded.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (field, value) in &encoded {
            pipe.hset_nx(key, field, value).ignore();
        }

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = pipe.query_async(&mut conn).await?;

        tracing::debug!(key = %key, fields = encoded.len(), "Ensured list document");

        Ok(())
    }

    async fn update_fields(&self, key: &str, fields: Document) -> AppResult<()> {
        let encoded = encode_fields(&fields)?;
        if encoded.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.hset_multiple(key, encoded.as_slice()).await?;

        tracing::debug!(key = %key, fields = encoded.len(), "Updated list document");

        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Serializes each document field to its JSON string
fn encode_fields(fields: &Document) -> AppResult<Vec<(String, String)>> {
    fields
        .iter()
        .map(|(field, value)| Ok((field.clone(), serde_json::to_string(value)?)))
        .collect()
}

/// Rebuilds a document from raw hash fields.
///
/// An empty hash means the document does not exist. Fields that are not valid
/// JSON are dropped so the reader falls back to their empty form.
fn decode_fields(raw: HashMap<String, String>) -> Option<Document> {
    if raw.is_empty() {
        return None;
    }

    let mut document = Document::new();
    for (field, json) in raw {
        match serde_json::from_str(&json) {
            Ok(value) => {
                document.insert(field, value);
            }
            Err(e) => {
                tracing::warn!(field = %field, error = %e, "Skipping undecodable document field");
            }
        }
    }

    Some(document)
}
