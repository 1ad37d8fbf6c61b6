//! Listener catalog configuration.

use serde::{Deserialize, Serialize};

/// Where listener manifests live and what happens to persisted listeners
/// at boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Root directory scanned for listener manifests.
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Whether to restart persisted listeners on startup.
    #[serde(default = "default_true")]
    pub auto_recover: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            auto_recover: true,
        }
    }
}

fn default_directory() -> String {
    "./listeners".to_string()
}

fn default_true() -> bool {
    true
}
