//! Listener plugin contract and the factory table used during discovery.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::error;

use picket_core::error::AppError;
use picket_core::result::AppResult;
use picket_entity::listener::ListenerOptions;

use crate::manifest::ListenerManifest;

/// Trait that every listener implementation must provide.
///
/// A plugin owns whatever background work a running listener needs.
/// `start` should return quickly after spawning that work and `shutdown`
/// should request its termination; the control plane awaits both without
/// a timeout.
#[async_trait]
pub trait ListenerPlugin: Send + Sync + std::fmt::Debug {
    /// Check an option set before a start attempt.
    ///
    /// The default rejects any required option that is empty.
    fn validate_options(&self, options: &ListenerOptions) -> Result<(), String> {
        let missing = options.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("required options not set: {}", missing.join(", ")))
        }
    }

    /// Start a listener instance named `name`.
    ///
    /// `Ok(false)` means the plugin declined without an error.
    async fn start(&self, name: &str, options: &ListenerOptions) -> Result<bool, String>;

    /// Stop the listener instance named `name`.
    async fn shutdown(&self, name: &str);
}

/// Creates plugin instances for one manifest `kind`.
pub trait ListenerFactory: Send + Sync + std::fmt::Debug {
    /// Manifest `kind` this factory handles.
    fn kind(&self) -> &str;

    /// Instantiate a plugin for a parsed manifest.
    fn create(&self, manifest: &ListenerManifest) -> Result<Arc<dyn ListenerPlugin>, String>;
}

/// Factories available to discovery, keyed by kind.
#[derive(Debug, Clone, Default)]
pub struct ListenerFactories {
    factories: BTreeMap<String, Arc<dyn ListenerFactory>>,
}

impl ListenerFactories {
    /// Creates an empty factory table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory. A second factory for the same kind is rejected.
    pub fn register(&mut self, factory: Arc<dyn ListenerFactory>) -> AppResult<()> {
        let kind = factory.kind().to_string();
        if self.factories.contains_key(&kind) {
            return Err(AppError::conflict(format!(
                "Listener kind '{kind}' is already registered"
            )));
        }
        self.factories.insert(kind, factory);
        Ok(())
    }

    /// Looks up the factory for a kind.
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn ListenerFactory>> {
        self.factories.get(kind)
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

/// Run `validate_options`, turning a panic into an error value.
pub(crate) fn contain_validate(
    plugin: &Arc<dyn ListenerPlugin>,
    options: &ListenerOptions,
) -> Result<(), String> {
    std::panic::catch_unwind(AssertUnwindSafe(|| plugin.validate_options(options)))
        .unwrap_or_else(|payload| Err(panic_message(payload)))
}

/// Run a factory's `create`, turning a panic into an error value.
pub(crate) fn contain_create(
    factory: &Arc<dyn ListenerFactory>,
    manifest: &ListenerManifest,
) -> Result<Arc<dyn ListenerPlugin>, String> {
    std::panic::catch_unwind(AssertUnwindSafe(|| factory.create(manifest)))
        .unwrap_or_else(|payload| Err(panic_message(payload)))
}

/// Run `start`, turning a panic into an error value.
pub(crate) async fn contain_start(
    plugin: &Arc<dyn ListenerPlugin>,
    name: &str,
    options: &ListenerOptions,
) -> Result<bool, String> {
    AssertUnwindSafe(plugin.start(name, options))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(panic_message(payload)))
}

/// Run `shutdown`; a panic is logged and otherwise ignored.
pub(crate) async fn contain_shutdown(plugin: &Arc<dyn ListenerPlugin>, name: &str) {
    if let Err(payload) = AssertUnwindSafe(plugin.shutdown(name)).catch_unwind().await {
        error!(
            listener = %name,
            cause = %panic_message(payload),
            "Listener plugin panicked during shutdown"
        );
    }
}
