//! # picket-entity
//!
//! Data shapes shared by the listener control plane and its storage
//! backends.

pub mod listener;
