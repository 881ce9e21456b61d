use std::sync::Arc;

use shopfront_infra::config::StoreConfig;
use shopfront_infra::notify::{LoggingNotifier, OrderEventBus, spawn_notification_worker};
use shopfront_infra::services::Services;
use shopfront_infra::store::{InMemoryStore, PostgresStore, Store, StoreResult};

/// Everything the handlers call into.
pub type AppServices = Services;

/// Open the configured store, start the notification worker and wire the
/// services. Must run inside the tokio runtime.
pub async fn build_services(config: &StoreConfig) -> StoreResult<Arc<AppServices>> {
    let store: Arc<dyn Store> = match config {
        StoreConfig::InMemory => {
            tracing::info!("using in-memory store");
            Arc::new(InMemoryStore::new())
        }
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresStore::connect(database_url, *max_connections).await?;
            store.ensure_schema().await?;
            tracing::info!(max_connections, "using postgres store");
            Arc::new(store)
        }
    };

    let bus = Arc::new(OrderEventBus::new());
    // Detached: the worker exits once the bus and its senders are dropped.
    let _worker = spawn_notification_worker(&bus, Arc::new(LoggingNotifier));

    Ok(Arc::new(Services::new(store, bus)))
}
