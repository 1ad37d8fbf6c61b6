//! Repository implementations backed by PostgreSQL.

pub mod listener;

pub use listener::ListenerRepository;
