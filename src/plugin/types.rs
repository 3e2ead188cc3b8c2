//! Format-agnostic plugin types shared by the classifier, the registry and
//! the native backends.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Unique identifier for a bound plugin instance inside a rack.
pub type InstanceId = u64;

// ---------------------------------------------------------------------------
// Port kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    Audio,
    Control,
    /// LV2 atom ports (MIDI / atom events).  Recorded, but never part of
    /// the audio or control arithmetic.
    Atom,
    /// Any other port class (CV ports and the like).  A plugin with one of
    /// these cannot be driven by this host.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// Which value a port asks the host to start from.
///
/// Mirrors the LADSPA default selectors, plus an explicit numeric default
/// for formats (LV2) that declare one directly.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DefaultHint {
    #[default]
    None,
    Minimum,
    Low,
    Middle,
    High,
    Maximum,
    Zero,
    One,
    Hundred,
    FourForty,
    Value(f32),
}

/// Range hints declared for a port.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeHints {
    pub lower: Option<f32>,
    pub upper: Option<f32>,
    pub default: DefaultHint,
    pub logarithmic: bool,
    /// Bounds (and the 1/100/440 defaults) are multiples of the sample rate.
    pub sample_rate: bool,
    pub integer: bool,
    pub toggled: bool,
}

// ---------------------------------------------------------------------------
// Raw ports (classifier input)
// ---------------------------------------------------------------------------

/// A port as reported by plugin discovery, before classification.
#[derive(Debug, Clone, Default)]
pub struct RawPort {
    pub symbol: String,
    pub name: String,
    pub is_audio: bool,
    pub is_control: bool,
    pub is_atom: bool,
    pub is_input: bool,
    pub is_output: bool,
    pub hints: RangeHints,
}

impl RawPort {
    pub fn audio_input(name: &str) -> Self {
        Self {
            symbol: name.to_lowercase(),
            name: name.to_string(),
            is_audio: true,
            is_input: true,
            ..Default::default()
        }
    }

    pub fn audio_output(name: &str) -> Self {
        Self {
            symbol: name.to_lowercase(),
            name: name.to_string(),
            is_audio: true,
            is_output: true,
            ..Default::default()
        }
    }

    pub fn control_input(name: &str, hints: RangeHints) -> Self {
        Self {
            symbol: name.to_lowercase(),
            name: name.to_string(),
            is_control: true,
            is_input: true,
            hints,
            ..Default::default()
        }
    }

    pub fn control_output(name: &str, hints: RangeHints) -> Self {
        Self {
            symbol: name.to_lowercase(),
            name: name.to_string(),
            is_control: true,
            is_output: true,
            hints,
            ..Default::default()
        }
    }

    pub fn atom(name: &str, direction: PortDirection) -> Self {
        Self {
            symbol: name.to_lowercase(),
            name: name.to_string(),
            is_atom: true,
            is_input: direction == PortDirection::Input,
            is_output: direction == PortDirection::Output,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Classified descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDescriptor {
    pub index: usize,
    pub symbol: String,
    pub name: String,
    pub kind: PortKind,
    pub direction: PortDirection,
    pub hints: RangeHints,
}

/// One classified plugin.  Built once at discovery time and shared
/// read-only by every instance bound from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Plugin URI.
    pub uri: String,
    pub name: String,
    pub maker: Option<String>,
    pub ports: Vec<PortDescriptor>,
    /// Symmetric audio arity used for channel adaptation.
    pub channels: usize,
    /// Audio ports on the larger side beyond `channels`.
    pub aux_channels: usize,
    pub aux_is_input: bool,
    /// False for pure generators.
    pub has_input: bool,
    pub audio_input_indices: Vec<usize>,
    pub audio_output_indices: Vec<usize>,
    pub aux_port_indices: Vec<usize>,
    /// Host-writable parameters.
    pub control_port_indices: Vec<usize>,
    /// Read-only telemetry written by the plugin.
    pub status_port_indices: Vec<usize>,
    pub atom_port_indices: Vec<usize>,
    pub unsupported_port_indices: Vec<usize>,
}

impl PluginDescriptor {
    pub fn port(&self, index: usize) -> Option<&PortDescriptor> {
        self.ports.get(index)
    }

    pub fn is_producer(&self) -> bool {
        !self.has_input
    }

    /// False when some port needs a connection this host cannot make.
    pub fn is_hostable(&self) -> bool {
        self.unsupported_port_indices.is_empty()
    }

    /// Default value of the `i`-th control port (position in
    /// `control_port_indices`, not the port index).
    pub fn control_default(&self, i: usize, sample_rate: f32) -> f32 {
        self.control_port_indices
            .get(i)
            .and_then(|&index| self.port(index))
            .map(|port| super::classify::default_value(&port.hints, sample_rate))
            .unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Lock-free value slot (written on the audio thread, polled elsewhere)
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(val: f32) -> Self {
        Self(AtomicU32::new(val.to_bits()))
    }
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
    pub fn store(&self, val: f32) {
        self.0.store(val.to_bits(), Ordering::Relaxed);
    }
}
