//! # picket-listener
//!
//! Listener control plane for Picket. Provides:
//!
//! - Manifest-driven discovery of listener modules
//! - Cross-field option resolution (Host, Port, CertPath, StagingKey)
//! - The active listener registry with name collision handling
//! - Start, shutdown, kill and boot-time recovery through one controller

pub mod catalog;
pub mod controller;
pub mod manifest;
pub mod persistence;
pub mod plugin;
pub mod prelude;
pub mod registry;
pub mod resolver;

pub use catalog::{PluginCatalog, PluginDefinition};
pub use controller::{LifecycleController, RecoveryReport};
pub use manifest::ListenerManifest;
pub use persistence::PersistenceGateway;
pub use plugin::{ListenerFactories, ListenerFactory, ListenerPlugin};
pub use registry::ListenerRegistry;
pub use resolver::OptionResolver;
