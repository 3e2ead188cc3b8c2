//! LV2 Plugin Hosting
//!
//! Discovery and native instances for LV2 plugins, through lilv.
//!
//! ## Architecture
//!
//! - `scanner` - Plugin discovery, turning lilv port lists into classified
//!   descriptors
//! - `host` - The LV2 [`PluginBackend`](crate::plugin::PluginBackend)
//! - `urid` - URID map/unmap and the other host features

pub mod host;
pub mod scanner;
pub mod urid;

pub use host::{Lv2Backend, Lv2Instance};

use crate::plugin::PluginRegistry;

/// Scan the installed plugins into a registry.
pub fn discover() -> PluginRegistry {
    PluginRegistry::new(scanner::scan_plugins())
}
