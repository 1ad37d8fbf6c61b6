//! Plugin catalog: the set of listener modules loaded at startup.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};
use walkdir::WalkDir;

use picket_core::error::AppError;
use picket_core::result::AppResult;
use picket_entity::listener::ListenerOptions;

use crate::manifest::ListenerManifest;
use crate::plugin::{ListenerFactories, ListenerPlugin, contain_create};

/// File extension of listener manifests.
pub const MANIFEST_EXTENSION: &str = "toml";

/// Stem suffix marking a manifest as a non-instantiable template.
pub const TEMPLATE_SUFFIX: &str = "template";

/// A loaded listener module.
///
/// Identity (`name`, `category`, plugin handle) is fixed after load; option
/// values are edited in place through the option resolver.
#[derive(Debug, Clone)]
pub struct PluginDefinition {
    /// Unique module name.
    pub name: String,
    /// Listener category.
    pub category: String,
    /// Module description.
    pub description: String,
    /// Live option schema.
    pub options: ListenerOptions,
    plugin: Arc<dyn ListenerPlugin>,
}

impl PluginDefinition {
    /// Creates a definition for a compiled-in plugin.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        options: ListenerOptions,
        plugin: Arc<dyn ListenerPlugin>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            description: String::new(),
            options,
            plugin,
        }
    }

    /// Returns the behaviour handle.
    pub fn plugin(&self) -> &Arc<dyn ListenerPlugin> {
        &self.plugin
    }
}

/// Name → definition table built once per process.
#[derive(Debug, Default)]
pub struct PluginCatalog {
    definitions: BTreeMap<String, PluginDefinition>,
    failures: Vec<AppError>,
}

impl PluginCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `root` for listener manifests and instantiates one definition
    /// per manifest.
    ///
    /// A manifest that cannot be loaded is reported and skipped; it is kept
    /// in [`discovery_failures`](Self::discovery_failures). A missing root
    /// fails the whole call.
    pub fn discover(root: &Path, factories: &ListenerFactories) -> AppResult<Self> {
        if !root.is_dir() {
            return Err(AppError::discovery(format!(
                "Listener directory '{}' does not exist",
                root.display()
            )));
        }

        info!(root = %root.display(), kinds = ?factories.kinds(), "Loading listeners");

        let mut catalog = Self::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    catalog.report(AppError::discovery(format!(
                        "Failed to walk listener directory: {e}"
                    )));
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !is_manifest(path) {
                continue;
            }
            if is_template(path) {
                continue;
            }
            let Some(name) = module_name(root, path) else {
                continue;
            };

            match instantiate(&name, path, factories) {
                Ok(definition) => {
                    if let Err(e) = catalog.register(definition) {
                        catalog.report(e);
                    }
                }
                Err(e) => catalog.report(e),
            }
        }

        info!(
            loaded = catalog.len(),
            failed = catalog.failures.len(),
            "Listener modules loaded"
        );
        Ok(catalog)
    }

    /// Adds a definition. Module names must be unique.
    pub fn register(&mut self, definition: PluginDefinition) -> AppResult<()> {
        if self.definitions.contains_key(&definition.name) {
            return Err(AppError::conflict(format!(
                "Listener module '{}' is already loaded",
                definition.name
            )));
        }
        info!(
            module = %definition.name,
            category = %definition.category,
            "Listener module registered"
        );
        self.definitions.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Looks up a definition by module name.
    pub fn get(&self, name: &str) -> Option<&PluginDefinition> {
        self.definitions.get(name)
    }

    /// Looks up a definition for editing.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut PluginDefinition> {
        self.definitions.get_mut(name)
    }

    /// Iterates every definition for editing.
    pub fn definitions_mut(&mut self) -> impl Iterator<Item = &mut PluginDefinition> {
        self.definitions.values_mut()
    }

    /// Loaded module names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }

    /// Number of loaded modules.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no modules are loaded.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Manifests that failed to load during discovery.
    pub fn discovery_failures(&self) -> &[AppError] {
        &self.failures
    }

    fn report(&mut self, err: AppError) {
        error!(error = %err, "Listener module failed to load");
        self.failures.push(err);
    }
}

fn instantiate(
    name: &str,
    path: &Path,
    factories: &ListenerFactories,
) -> AppResult<PluginDefinition> {
    let manifest = ListenerManifest::load(path)?;

    let factory = factories.get(&manifest.kind).ok_or_else(|| {
        AppError::discovery(format!(
            "Listener module '{name}' uses unknown kind '{}'",
            manifest.kind
        ))
    })?;

    let plugin = contain_create(factory, &manifest).map_err(|e| {
        AppError::discovery(format!("Listener module '{name}' failed to initialize: {e}"))
    })?;

    if manifest.category.is_empty() {
        warn!(module = %name, "Listener manifest does not declare a category");
    }

    Ok(PluginDefinition {
        name: name.to_string(),
        category: manifest.category.clone(),
        description: manifest.description.clone(),
        options: manifest.default_options(),
        plugin,
    })
}

fn is_manifest(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(MANIFEST_EXTENSION)
}

fn is_template(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|stem| stem.ends_with(TEMPLATE_SUFFIX))
        .unwrap_or(false)
}

/// Module name of a manifest: its path relative to `root`, without the
/// extension, with components joined by `/`.
fn module_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
