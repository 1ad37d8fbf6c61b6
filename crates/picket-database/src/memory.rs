//! In-memory listener store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use picket_core::result::AppResult;
use picket_entity::listener::{ListenerRow, NewListenerRow};

use crate::store::ListenerStore;

/// Process-local listener store. Rows are kept in insertion order and lost
/// when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryListenerStore {
    rows: Arc<RwLock<Vec<ListenerRow>>>,
}

impl MemoryListenerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with rows, e.g. left behind by an
    /// earlier run.
    pub fn with_rows(rows: Vec<ListenerRow>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
        }
    }

    /// Snapshot of every stored row.
    pub async fn rows(&self) -> Vec<ListenerRow> {
        self.rows.read().await.clone()
    }
}

fn matches_id_or_name(row: &ListenerRow, key: &str) -> bool {
    row.name == key
        || Uuid::parse_str(key)
            .map(|id| id == row.id)
            .unwrap_or(false)
}

#[async_trait]
impl ListenerStore for MemoryListenerStore {
    async fn insert(&self, row: NewListenerRow) -> AppResult<ListenerRow> {
        let row = row.into_row();
        self.rows.write().await.push(row.clone());
        debug!(listener = %row.name, id = %row.id, "Listener row stored in memory");
        Ok(row)
    }

    async fn replace(&self, row: NewListenerRow) -> AppResult<ListenerRow> {
        let row = row.into_row();
        let mut rows = self.rows.write().await;
        rows.retain(|existing| existing.name != row.name);
        rows.push(row.clone());
        debug!(listener = %row.name, id = %row.id, "Listener row replaced in memory");
        Ok(row)
    }

    async fn delete_by_name(&self, name: &str) -> AppResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.name != name);
        Ok((before - rows.len()) as u64)
    }

    async fn list_all(&self) -> AppResult<Vec<ListenerRow>> {
        Ok(self.rows().await)
    }

    async fn find_id(&self, name_or_id: &str) -> AppResult<Option<Uuid>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|row| matches_id_or_name(row, name_or_id))
            .map(|row| row.id))
    }

    async fn find_name(&self, id_or_name: &str) -> AppResult<Option<String>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|row| matches_id_or_name(row, id_or_name))
            .map(|row| row.name.clone()))
    }

    async fn find_module(&self, name: &str) -> AppResult<Option<String>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|row| row.name == name)
            .map(|row| row.module.clone()))
    }

    async fn find_options(&self, name: &str) -> AppResult<Option<serde_json::Value>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|row| row.name == name)
            .map(|row| row.options.clone()))
    }
}
