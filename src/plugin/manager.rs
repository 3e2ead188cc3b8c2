//! The descriptor registry: the catalog of classified plugins.
//!
//! Built once from discovery output and passed by reference (usually as an
//! `Arc`) to everything that needs to look a plugin up.

use std::sync::Arc;

use super::copies;
use super::types::*;

pub struct PluginRegistry {
    /// All discovered plugins, sorted by name.
    plugins: Vec<Arc<PluginDescriptor>>,
}

impl PluginRegistry {
    pub fn new(mut plugins: Vec<PluginDescriptor>) -> Self {
        plugins.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Self {
            plugins: plugins.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn plugins(&self) -> &[Arc<PluginDescriptor>] {
        &self.plugins
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn find(&self, uri: &str) -> Option<&Arc<PluginDescriptor>> {
        self.plugins.iter().find(|p| p.uri == uri)
    }

    /// Plugins that can cover exactly `rack_channels`, with the number of
    /// copies each needs.
    pub fn compatible(&self, rack_channels: usize) -> Vec<(&Arc<PluginDescriptor>, usize)> {
        self.plugins
            .iter()
            .filter(|p| p.is_hostable())
            .filter_map(|p| copies::solve(p.channels, rack_channels).map(|n| (p, n)))
            .collect()
    }
}
