//! Bridge between active listener records and the durable store.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use picket_core::result::AppResult;
use picket_database::ListenerStore;
use picket_entity::listener::{
    ActiveListener, ListenerOptions, ListenerRow, NewListenerRow, PersistedOptions,
};

/// Writes, deletes and reads listener rows.
#[derive(Debug, Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn ListenerStore>,
}

impl PersistenceGateway {
    /// Wraps a store backend.
    pub fn new(store: Arc<dyn ListenerStore>) -> Self {
        Self { store }
    }

    /// Records a started listener and returns the stored row.
    ///
    /// Rows left under the same name by an earlier instance are replaced.
    pub async fn record_started(&self, listener: &ActiveListener) -> AppResult<ListenerRow> {
        let options = PersistedOptions::new(listener.options.clone()).to_json()?;
        let row = self
            .store
            .replace(NewListenerRow {
                name: listener.name.clone(),
                module: listener.module.clone(),
                listener_category: listener.category.clone(),
                options,
            })
            .await?;

        info!(listener = %row.name, id = %row.id, "Listener recorded");
        Ok(row)
    }

    /// Deletes every row recorded under `name`.
    pub async fn forget(&self, name: &str) -> AppResult<u64> {
        let deleted = self.store.delete_by_name(name).await?;
        debug!(listener = %name, deleted, "Listener rows deleted");
        Ok(deleted)
    }

    /// All recorded rows, oldest first.
    pub async fn load_all(&self) -> AppResult<Vec<ListenerRow>> {
        self.store.list_all().await
    }

    /// Decodes the option document of a row.
    pub fn decode(row: &ListenerRow) -> AppResult<ListenerOptions> {
        Ok(PersistedOptions::from_json(&row.options)?.options)
    }

    /// Row id for a listener name or id.
    pub async fn resolve_id(&self, name_or_id: &str) -> AppResult<Option<Uuid>> {
        self.store.find_id(name_or_id).await
    }

    /// Listener name for a row id or name.
    pub async fn resolve_name(&self, id_or_name: &str) -> AppResult<Option<String>> {
        self.store.find_name(id_or_name).await
    }

    /// Module recorded for a listener name.
    pub async fn resolve_module(&self, name: &str) -> AppResult<Option<String>> {
        self.store.find_module(name).await
    }

    /// Decoded options recorded for a listener name.
    pub async fn persisted_options(&self, name: &str) -> AppResult<Option<ListenerOptions>> {
        match self.store.find_options(name).await? {
            Some(value) => Ok(Some(PersistedOptions::from_json(&value)?.options)),
            None => Ok(None),
        }
    }
}
