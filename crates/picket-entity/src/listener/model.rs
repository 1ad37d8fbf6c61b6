//! Persisted listener row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A listener configuration row in the `listeners` table.
///
/// Written when a listener starts, deleted only when it is killed, and
/// replayed at boot to restart it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ListenerRow {
    /// Unique row identifier.
    pub id: Uuid,
    /// Listener instance name.
    pub name: String,
    /// Module (plugin definition) that produced the listener.
    pub module: String,
    /// Listener category reported by the module.
    pub listener_category: String,
    /// Versioned option document, see [`super::PersistedOptions`].
    pub options: serde_json::Value,
    /// When the row was written.
    pub created_at: DateTime<Utc>,
}

/// Values needed to insert a new listener row.
#[derive(Debug, Clone)]
pub struct NewListenerRow {
    /// Listener instance name.
    pub name: String,
    /// Module that produced the listener.
    pub module: String,
    /// Listener category.
    pub listener_category: String,
    /// Encoded option document.
    pub options: serde_json::Value,
}

impl NewListenerRow {
    /// Materialize the row with a fresh identifier and timestamp.
    pub fn into_row(self) -> ListenerRow {
        ListenerRow {
            id: Uuid::now_v7(),
            name: self.name,
            module: self.module,
            listener_category: self.listener_category,
            options: self.options,
            created_at: Utc::now(),
        }
    }
}
