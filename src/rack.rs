//! Racks: ordered chains of bound plugin instances.
//!
//! Insertion order is processing order.  A rack is built for one channel
//! count and never resized; a new channel count means a new rack.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::PlanesMut;
use crate::error::RackError;
use crate::plugin::classify::rescale_for_sample_rate;
use crate::plugin::copies;
use crate::plugin::{InstanceId, InstanceManager, PluginInstance, PluginRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Towards the start of the chain (processed earlier).
    Up,
    /// Towards the end of the chain.
    Down,
}

#[derive(Debug)]
pub struct Rack {
    channels: usize,
    instances: Vec<PluginInstance>,
}

impl Rack {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            instances: Vec::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn instances(&self) -> &[PluginInstance] {
        &self.instances
    }

    pub fn first_mut(&mut self) -> Option<&mut PluginInstance> {
        self.instances.first_mut()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn position(&self, id: InstanceId) -> Option<usize> {
        self.instances.iter().position(|i| i.id == id)
    }

    pub fn append(&mut self, instance: PluginInstance) {
        self.instances.push(instance);
    }

    pub fn remove(&mut self, id: InstanceId) -> Option<PluginInstance> {
        self.position(id).map(|pos| self.instances.remove(pos))
    }

    /// Move an instance one place along the chain.  Returns false if it is
    /// not in the rack or already at that end.
    pub fn move_instance(&mut self, id: InstanceId, direction: MoveDirection) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        match direction {
            MoveDirection::Up if pos > 0 => self.instances.swap(pos, pos - 1),
            MoveDirection::Down if pos + 1 < self.instances.len() => {
                self.instances.swap(pos, pos + 1)
            }
            _ => return false,
        }
        true
    }

    /// Put `new` where `id` was and hand the old instance back.  If `id` is
    /// not in the rack, `new` comes back as the error.
    pub fn replace(
        &mut self,
        id: InstanceId,
        new: PluginInstance,
    ) -> Result<PluginInstance, PluginInstance> {
        match self.position(id) {
            Some(pos) => Ok(std::mem::replace(&mut self.instances[pos], new)),
            None => Err(new),
        }
    }

    /// Run the whole chain over one chunk.  Stops at the first failing
    /// instance.
    pub fn run_chunk(&mut self, planes: &mut PlanesMut<'_>) -> Result<(), RackError> {
        for instance in &mut self.instances {
            instance.run_chunk(planes)?;
        }
        Ok(())
    }

    /// Tear the rack down, releasing every native instance.
    pub fn destroy(self) {
        for instance in self.instances {
            instance.destroy();
        }
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedParameter {
    pub port_index: usize,
    pub value: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedPlugin {
    pub plugin_uri: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub wet_dry_enabled: bool,
    #[serde(default = "default_wetness")]
    pub wetness: f32,
    #[serde(default)]
    pub parameters: Vec<SavedParameter>,
}

fn default_true() -> bool {
    true
}

fn default_wetness() -> f32 {
    1.0
}

/// A saved rack: plugins in processing order with their control values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RackPreset {
    /// Rate the values were saved at.  Sample-rate-relative values are
    /// rescaled when the rack is built at another rate.
    #[serde(default)]
    pub sample_rate: Option<f64>,
    pub plugins: Vec<SavedPlugin>,
}

impl RackPreset {
    pub fn load(path: &Path) -> Result<Self, RackError> {
        let text = std::fs::read_to_string(path).map_err(|source| RackError::Preset {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), RackError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| RackError::Preset {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build a rack for `channels` from this preset.  Plugins that are
    /// unknown or cannot cover the channel count are skipped.
    pub fn build(
        &self,
        registry: &PluginRegistry,
        manager: &InstanceManager,
        channels: usize,
        sample_rate: f64,
    ) -> Rack {
        let mut rack = Rack::new(channels);

        for saved in &self.plugins {
            let Some(desc) = registry.find(&saved.plugin_uri) else {
                log::warn!("Preset plugin not found: {}", saved.plugin_uri);
                continue;
            };
            let Some(n) = copies::solve(desc.channels, channels) else {
                log::warn!(
                    "Preset plugin {} ({} channels) skipped: not compatible with {} channels",
                    desc.uri,
                    desc.channels,
                    channels
                );
                continue;
            };
            let mut instance = match manager.instantiate(desc, n, sample_rate) {
                Ok(instance) => instance,
                Err(e) => {
                    log::warn!("Preset plugin skipped: {}", e);
                    continue;
                }
            };
            for param in &saved.parameters {
                let value = match (self.sample_rate, desc.port(param.port_index)) {
                    (Some(saved_rate), Some(port)) => rescale_for_sample_rate(
                        &port.hints,
                        param.value,
                        saved_rate as f32,
                        sample_rate as f32,
                    ),
                    _ => param.value,
                };
                if !instance.set_control_port(param.port_index, value) {
                    log::warn!(
                        "Preset value for port {} ignored: not a control port of {}",
                        param.port_index,
                        desc.uri
                    );
                }
            }
            instance.enabled = saved.enabled;
            instance.wet_dry_enabled = saved.wet_dry_enabled;
            instance.set_wetness(saved.wetness);
            rack.append(instance);
        }

        rack
    }
}
