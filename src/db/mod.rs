pub mod local;
pub mod memory;
pub mod redis;
pub mod remote;

pub use local::{FileKeyValueStore, InMemoryKeyValueStore, LocalKeyValueStore, LOCAL_LISTS_KEY};
pub use memory::InMemoryDocumentStore;
pub use self::redis::{create_redis_client, DocumentKey, RedisDocumentStore};
pub use remote::RemoteDocumentStore;
