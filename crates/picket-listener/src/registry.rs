//! Active listener registry: running instances keyed by unique name.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use picket_core::error::AppError;
use picket_core::result::AppResult;
use picket_entity::listener::ActiveListener;

/// In-memory table of running listeners.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    /// Listener name → active record.
    active: BTreeMap<String, ActiveListener>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a listener with this name is running.
    pub fn contains(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    /// Looks up an active record.
    pub fn get(&self, name: &str) -> Option<&ActiveListener> {
        self.active.get(name)
    }

    /// Registers a started listener. Names must be unique.
    pub fn insert(&mut self, listener: ActiveListener) -> AppResult<()> {
        if self.active.contains_key(&listener.name) {
            return Err(AppError::conflict(format!(
                "Listener '{}' is already active",
                listener.name
            )));
        }

        info!(
            listener = %listener.name,
            module = %listener.module,
            "Listener registered"
        );
        self.active.insert(listener.name.clone(), listener);
        Ok(())
    }

    /// Removes an active record.
    pub fn remove(&mut self, name: &str) -> Option<ActiveListener> {
        let removed = self.active.remove(name);
        if removed.is_some() {
            info!(listener = %name, "Listener unregistered");
        }
        removed
    }

    /// Names of all active listeners.
    pub fn names(&self) -> BTreeSet<String> {
        self.active.keys().cloned().collect()
    }

    /// First free name derived from `base`: `base`, then `base1`, `base2`, ...
    pub fn resolve_name(&self, base: &str) -> String {
        if !self.contains(base) {
            return base.to_string();
        }
        (1u64..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}
