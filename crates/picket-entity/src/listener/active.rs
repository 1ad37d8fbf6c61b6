//! Active listener record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::options::ListenerOptions;

/// A running listener instance tracked in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveListener {
    /// Unique name among active listeners.
    pub name: String,
    /// Module (plugin definition) that owns the instance.
    pub module: String,
    /// Listener category of the module.
    pub category: String,
    /// Option snapshot taken when the listener started.
    pub options: ListenerOptions,
    /// When the listener started.
    pub started_at: DateTime<Utc>,
}

impl ActiveListener {
    /// Create a record from a snapshot of the module's options.
    pub fn new(
        name: impl Into<String>,
        module: impl Into<String>,
        category: impl Into<String>,
        options: ListenerOptions,
    ) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            category: category.into(),
            options,
            started_at: Utc::now(),
        }
    }
}
