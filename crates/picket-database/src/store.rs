//! Storage trait for persisted listener rows.

use async_trait::async_trait;
use uuid::Uuid;

use picket_core::result::AppResult;
use picket_entity::listener::{ListenerRow, NewListenerRow};

/// Row-level access to the `listeners` table.
///
/// Implementations perform single-row reads and writes only; callers are
/// responsible for serializing mutations.
#[async_trait]
pub trait ListenerStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a row and return it as stored.
    async fn insert(&self, row: NewListenerRow) -> AppResult<ListenerRow>;

    /// Insert a row in place of every existing row with the same name.
    ///
    /// The delete and the insert take effect together or not at all.
    async fn replace(&self, row: NewListenerRow) -> AppResult<ListenerRow>;

    /// Delete every row with the given name. Returns the number deleted.
    async fn delete_by_name(&self, name: &str) -> AppResult<u64>;

    /// All rows, oldest first.
    async fn list_all(&self) -> AppResult<Vec<ListenerRow>>;

    /// Resolve a listener name or a row id to the row id.
    async fn find_id(&self, name_or_id: &str) -> AppResult<Option<Uuid>>;

    /// Resolve a row id or a listener name to the listener name.
    async fn find_name(&self, id_or_name: &str) -> AppResult<Option<String>>;

    /// Module recorded for a listener name.
    async fn find_module(&self, name: &str) -> AppResult<Option<String>>;

    /// Raw option document recorded for a listener name.
    async fn find_options(&self, name: &str) -> AppResult<Option<serde_json::Value>>;
}
