use std::sync::Arc;
use std::time::Duration;

use cinelist_api::{
    api::{create_router, AppState},
    config::Config,
    db::{
        create_redis_client, FileKeyValueStore, InMemoryDocumentStore, RedisDocumentStore,
        RemoteDocumentStore,
    },
    logging,
    models::SessionIdentity,
    services::ToastQueue,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing()?;

    let config = Config::from_env()?;

    let remote: Arc<dyn RemoteDocumentStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisDocumentStore::new(create_redis_client(url)?)),
        None => Arc::new(InMemoryDocumentStore::new()),
    };
    let local = Arc::new(FileKeyValueStore::new(&config.local_store_dir));
    let toasts = Arc::new(ToastQueue::new(
        config.toast_limit,
        Duration::from_secs(config.toast_ttl_secs),
    ));

    tracing::info!(
        remote = remote.name(),
        local_dir = %local.dir().display(),
        "Stores configured"
    );

    // Initialize application state and load the starting session
    let state = AppState::new(remote, local, toasts);
    state
        .lists
        .load(SessionIdentity::from_user_id(config.session_user_id.clone()))
        .await;

    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
