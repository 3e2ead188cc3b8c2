//! Slot configuration, animated parameter input and status output.
//!
//! Configuration is read once when a slot binds; parameters are evaluated
//! every block; status values are written after every block and polled by
//! observers on other threads.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde::Deserialize;

use crate::plugin::AtomicF32;

/// Key of the wet/dry parameter.
pub const WETNESS_KEY: &str = "wetness";

/// Key of the status field reporting the number of copies in use.
pub const INSTANCES_KEY: &str = "instances";

pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;

fn default_sample_rate() -> f64 {
    DEFAULT_SAMPLE_RATE
}

/// What a slot binds to.  `resource` wins over `plugin_id` when both are
/// set.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotConfig {
    /// Rack preset file.
    #[serde(default)]
    pub resource: Option<PathBuf>,
    /// Plugin URI.
    #[serde(default)]
    pub plugin_id: Option<String>,
    /// Rate used when the host does not report one.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            resource: None,
            plugin_id: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl SlotConfig {
    pub fn plugin(uri: impl Into<String>) -> Self {
        Self {
            resource: None,
            plugin_id: Some(uri.into()),
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    pub fn preset(path: impl Into<PathBuf>) -> Self {
        Self {
            resource: Some(path.into()),
            plugin_id: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

/// Animated parameter evaluator.
///
/// Returns `None` when nothing drives `key`.  Control ports are keyed by
/// their port index in decimal; wet/dry by [`WETNESS_KEY`].
pub trait ParameterSource {
    fn get(&self, key: &str, position: i64, length: i64) -> Option<f64>;
}

/// Constant parameters, independent of the timeline.
#[derive(Debug, Clone, Default)]
pub struct StaticParameters {
    values: HashMap<String, f64>,
}

impl StaticParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

impl ParameterSource for StaticParameters {
    fn get(&self, key: &str, _position: i64, _length: i64) -> Option<f64> {
        self.values.get(key).copied()
    }
}

/// Status key for one port of one copy, e.g. `"5[1]"`.
pub fn status_key(port_index: usize, copy: usize) -> String {
    format!("{}[{}]", port_index, copy)
}

#[derive(Debug)]
struct StatusSlot {
    port_index: usize,
    copy: usize,
    value: AtomicF32,
}

/// Published status values of one slot.
///
/// The audio thread only stores into existing slots; the layout changes
/// (under the write lock) only when the slot rebinds.
#[derive(Debug, Default)]
pub struct StatusBoard {
    slots: RwLock<Vec<StatusSlot>>,
    instances: AtomicUsize,
}

pub type SharedStatus = Arc<StatusBoard>;

impl StatusBoard {
    pub fn new() -> SharedStatus {
        Arc::new(Self::default())
    }

    /// Lay the board out for `status_ports` x `copies`.
    pub fn rebind(&self, status_ports: &[usize], copies: usize) {
        let mut slots = self.slots.write();
        slots.clear();
        for copy in 0..copies {
            for &port_index in status_ports {
                slots.push(StatusSlot {
                    port_index,
                    copy,
                    value: AtomicF32::new(0.0),
                });
            }
        }
        self.instances.store(copies, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.slots.write().clear();
        self.instances.store(0, Ordering::Relaxed);
    }

    /// Store the status values of one copy, in `status_port_indices` order.
    pub fn publish(&self, copy: usize, values: &[f32]) {
        let slots = self.slots.read();
        let stride = values.len();
        if stride == 0 {
            return;
        }
        if let Some(row) = slots.get(copy * stride..(copy + 1) * stride) {
            for (slot, &value) in row.iter().zip(values) {
                slot.value.store(value);
            }
        }
    }

    pub fn get(&self, port_index: usize, copy: usize) -> Option<f32> {
        self.slots
            .read()
            .iter()
            .find(|s| s.port_index == port_index && s.copy == copy)
            .map(|s| s.value.load())
    }

    pub fn instances(&self) -> usize {
        self.instances.load(Ordering::Relaxed)
    }

    /// Every value keyed as `"<port>[<copy>]"`, plus `instances`.
    pub fn snapshot(&self) -> HashMap<String, f64> {
        let mut out: HashMap<String, f64> = self
            .slots
            .read()
            .iter()
            .map(|s| (status_key(s.port_index, s.copy), s.value.load() as f64))
            .collect();
        out.insert(INSTANCES_KEY.to_string(), self.instances() as f64);
        out
    }
}
