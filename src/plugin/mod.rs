//! Format-agnostic plugin layer.
//!
//! Classification, the copies solver, the descriptor registry and the
//! instance manager are independent of any plugin ABI; native formats plug
//! in through the [`backend`] traits.

pub mod backend;
pub mod classify;
pub mod copies;
pub mod instance;
pub mod manager;
pub mod types;

pub use backend::{NativeInstance, PluginBackend, PortBuffers};
pub use instance::{InstanceManager, PluginInstance};
pub use manager::PluginRegistry;
pub use types::*;
