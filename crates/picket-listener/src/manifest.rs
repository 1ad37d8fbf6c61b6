//! Listener manifest files.
//!
//! A manifest describes one listener module: the implementation `kind`
//! that backs it, its category, and its default option schema.
//!
//! ```toml
//! kind = "tcp"
//! category = "client_server"
//! description = "Plain TCP listener"
//!
//! [options.Name]
//! value = "tcp"
//! required = true
//! description = "Name for the listener."
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use picket_core::error::AppError;
use picket_core::result::AppResult;
use picket_entity::listener::options::MANDATORY;
use picket_entity::listener::{ListenerOptions, OptionValue};

/// Parsed listener manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenerManifest {
    /// Implementation kind, matched against registered factories.
    pub kind: String,
    /// Listener category, e.g. a transport family.
    #[serde(default)]
    pub category: String,
    /// Operator-facing description of the module.
    #[serde(default)]
    pub description: String,
    /// Default option schema.
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
}

impl ListenerManifest {
    /// Parses manifest text.
    pub fn parse(text: &str) -> AppResult<Self> {
        let manifest: Self = toml::from_str(text)
            .map_err(|e| AppError::discovery(format!("Invalid listener manifest: {e}")))?;
        manifest.check()?;
        Ok(manifest)
    }

    /// Reads and parses a manifest file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::discovery(format!("Failed to read manifest '{}': {e}", path.display()))
        })?;
        Self::parse(&text).map_err(|e| {
            AppError::discovery(format!("Manifest '{}': {}", path.display(), e.message))
        })
    }

    /// Default option schema declared by the manifest.
    pub fn default_options(&self) -> ListenerOptions {
        self.options
            .iter()
            .map(|(name, option)| (name.clone(), option.clone()))
            .collect()
    }

    fn check(&self) -> AppResult<()> {
        if self.kind.trim().is_empty() {
            return Err(AppError::discovery("Manifest does not declare a kind"));
        }
        let missing: Vec<&str> = MANDATORY
            .iter()
            .copied()
            .filter(|name| !self.options.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::discovery(format!(
                "Manifest does not declare mandatory options: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}
