//! Prelude for listener implementations.

pub use async_trait::async_trait;

pub use picket_entity::listener::{ListenerOptions, OptionValue};

pub use crate::manifest::ListenerManifest;
pub use crate::plugin::{ListenerFactories, ListenerFactory, ListenerPlugin};
