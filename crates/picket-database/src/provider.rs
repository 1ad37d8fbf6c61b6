//! Store selection from configuration.

use std::sync::Arc;

use tracing::info;

use picket_core::config::{AppConfig, StoreProvider};
use picket_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::memory::MemoryListenerStore;
use crate::repositories::ListenerRepository;
use crate::store::ListenerStore;

/// Build the listener store selected by `store.provider`.
///
/// The PostgreSQL provider connects and runs pending migrations before
/// returning.
pub async fn connect_store(config: &AppConfig) -> AppResult<Arc<dyn ListenerStore>> {
    let store: Arc<dyn ListenerStore> = match config.store.provider {
        StoreProvider::Postgres => {
            info!("Initializing PostgreSQL listener store");
            let db = DatabasePool::connect_and_migrate(&config.database).await?;
            db.health_check().await?;
            Arc::new(ListenerRepository::new(db.pool().clone()))
        }
        StoreProvider::Memory => {
            info!("Initializing in-memory listener store; listeners will not survive a restart");
            Arc::new(MemoryListenerStore::new())
        }
    };

    Ok(store)
}
