pub mod documents;

pub use documents::create_redis_client;
pub use documents::DocumentKey;
pub use documents::RedisDocumentStore;
