//! # picket-database
//!
//! Durable storage for listener rows: the [`ListenerStore`] trait, the
//! PostgreSQL repository implementing it, an in-memory implementation, and
//! the provider switch that picks one from configuration.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod provider;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryListenerStore;
pub use provider::connect_store;
pub use repositories::ListenerRepository;
pub use store::ListenerStore;
