//! Listener entities: option schemas, active records and persisted rows.

pub mod active;
pub mod model;
pub mod options;

pub use active::ActiveListener;
pub use model::{ListenerRow, NewListenerRow};
pub use options::{ListenerOptions, OptionValue, PersistedOptions};
