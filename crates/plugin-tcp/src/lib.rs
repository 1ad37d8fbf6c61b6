//! Built-in `tcp` listener kind for Picket.
//!
//! A `tcp` listener binds `BindIP:Port` and accepts connections until it is
//! shut down. Connections are closed as soon as they are accepted; protocol
//! handling belongs to a real transport implementation.

pub mod acceptor;
pub mod plugin;

pub use plugin::{TcpListenerFactory, TcpListenerPlugin};

use std::sync::Arc;

use picket_core::result::AppResult;
use picket_listener::ListenerFactories;

/// Factory set containing every listener kind compiled into this crate.
pub fn factories() -> AppResult<ListenerFactories> {
    let mut factories = ListenerFactories::new();
    factories.register(Arc::new(TcpListenerFactory))?;
    Ok(factories)
}
