//! Bound plugin instances: the native copies of one plugin that together
//! cover a rack's channels, plus their control / status memory and wet/dry
//! state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::backend::{NativeInstance, PluginBackend, PortBuffers};
use super::types::*;
use crate::audio::{MAX_CHUNK_SAMPLES, PlanesMut};
use crate::error::RackError;

/// One native copy and the memory it is connected to.
struct CopyHolder {
    native: Box<dyn NativeInstance>,
    control: Vec<f32>,
    status: Vec<f32>,
    aux: Vec<f32>,
}

pub struct PluginInstance {
    pub id: InstanceId,
    descriptor: Arc<PluginDescriptor>,
    holders: Vec<CopyHolder>,
    pub enabled: bool,
    pub wet_dry_enabled: bool,
    /// 1.0 = all wet, 0.0 = all dry, one value per rack channel.
    wet_dry_values: Vec<f32>,
    /// Dry copy of the current chunk, taken before the plugin runs.
    dry: Vec<f32>,
}

impl std::fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInstance")
            .field("id", &self.id)
            .field("uri", &self.descriptor.uri)
            .field("copies", &self.holders.len())
            .field("enabled", &self.enabled)
            .field("wet_dry_enabled", &self.wet_dry_enabled)
            .finish()
    }
}

impl PluginInstance {
    pub fn descriptor(&self) -> &Arc<PluginDescriptor> {
        &self.descriptor
    }

    pub fn copies(&self) -> usize {
        self.holders.len()
    }

    /// Channels covered by all copies together.
    pub fn channels(&self) -> usize {
        self.descriptor.channels * self.holders.len()
    }

    pub fn control_values(&self, copy: usize) -> Option<&[f32]> {
        self.holders.get(copy).map(|h| h.control.as_slice())
    }

    pub fn status_values(&self, copy: usize) -> Option<&[f32]> {
        self.holders.get(copy).map(|h| h.status.as_slice())
    }

    pub fn wet_dry_values(&self) -> &[f32] {
        &self.wet_dry_values
    }

    /// Write the `i`-th control value of every copy.
    pub fn set_control(&mut self, i: usize, value: f32) {
        for holder in &mut self.holders {
            if let Some(slot) = holder.control.get_mut(i) {
                *slot = value;
            }
        }
    }

    /// Set a control by port index.  Returns false if the port is not a
    /// control port of this plugin.
    pub fn set_control_port(&mut self, port_index: usize, value: f32) -> bool {
        match self
            .descriptor
            .control_port_indices
            .iter()
            .position(|&p| p == port_index)
        {
            Some(i) => {
                self.set_control(i, value);
                true
            }
            None => false,
        }
    }

    /// Set the blend of every channel to `wetness`.
    pub fn set_wetness(&mut self, wetness: f32) {
        self.wet_dry_values.fill(wetness);
    }

    /// Run every copy over one chunk.
    ///
    /// `planes` holds one in-place plane per channel.  Copy `c` owns planes
    /// `c * channels..(c + 1) * channels`.  A native failure stops the
    /// chunk; whatever the earlier copies wrote stays.
    pub fn run_chunk(&mut self, planes: &mut PlanesMut<'_>) -> Result<(), RackError> {
        let sample_count = planes.len();
        let offset = planes.offset();
        if !self.enabled || sample_count == 0 {
            return Ok(());
        }

        let width = self.descriptor.channels;
        let blend = self.wet_dry_enabled;

        if blend {
            for c in 0..self.wet_dry_values.len() {
                let Some(plane) = planes.plane(c) else {
                    break;
                };
                let start = c * MAX_CHUNK_SAMPLES;
                self.dry[start..start + sample_count].copy_from_slice(plane);
            }
        }

        for (copy, holder) in self.holders.iter_mut().enumerate() {
            let Some(audio) = planes.sub(copy * width, width) else {
                break;
            };
            let ports = PortBuffers {
                control: &holder.control,
                status: &mut holder.status,
                audio,
                aux: &mut holder.aux,
            };
            holder
                .native
                .run(ports, sample_count)
                .map_err(|reason| RackError::NativeProcess {
                    uri: self.descriptor.uri.clone(),
                    copy,
                    offset,
                    reason,
                })?;
        }

        if blend {
            for (c, &wet) in self.wet_dry_values.iter().enumerate() {
                let Some(plane) = planes.plane_mut(c) else {
                    break;
                };
                let dry = &self.dry[c * MAX_CHUNK_SAMPLES..c * MAX_CHUNK_SAMPLES + sample_count];
                for (out, &d) in plane.iter_mut().zip(dry) {
                    *out = wet * *out + (1.0 - wet) * d;
                }
            }
        }

        Ok(())
    }

    /// Release every native copy and its memory.
    pub fn destroy(self) {
        log::debug!(
            "Destroying instance {} of {} ({} copies)",
            self.id,
            self.descriptor.uri,
            self.holders.len()
        );
        drop(self);
    }
}

/// Creates bound instances through a native backend.
pub struct InstanceManager {
    backend: Arc<dyn PluginBackend>,
    next_id: AtomicU64,
}

impl InstanceManager {
    pub fn new(backend: Arc<dyn PluginBackend>) -> Self {
        Self {
            backend,
            next_id: AtomicU64::new(1),
        }
    }

    /// Create `copies` native copies of `descriptor`.
    ///
    /// Control memory starts at each port's default.  If any copy is
    /// refused, the copies already created are released and the whole
    /// call fails.
    pub fn instantiate(
        &self,
        descriptor: &Arc<PluginDescriptor>,
        copies: usize,
        sample_rate: f64,
    ) -> Result<PluginInstance, RackError> {
        if !descriptor.is_hostable() {
            return Err(RackError::NativeInstantiate {
                uri: descriptor.uri.clone(),
                copy: 0,
                reason: format!(
                    "ports {:?} are neither audio, control nor atom",
                    descriptor.unsupported_port_indices
                ),
            });
        }

        let control_count = descriptor.control_port_indices.len();
        let defaults: Vec<f32> = (0..control_count)
            .map(|i| descriptor.control_default(i, sample_rate as f32))
            .collect();

        let mut holders = Vec::with_capacity(copies);
        for copy in 0..copies {
            let native = match self.backend.instantiate(descriptor, sample_rate) {
                Ok(native) => native,
                Err(err) => {
                    log::error!(
                        "Failed to instantiate copy {} of {}; releasing {} created copies",
                        copy,
                        descriptor.uri,
                        holders.len()
                    );
                    drop(holders);
                    return Err(match err {
                        RackError::NativeInstantiate { uri, reason, .. } => {
                            RackError::NativeInstantiate { uri, copy, reason }
                        }
                        other => other,
                    });
                }
            };
            holders.push(CopyHolder {
                native,
                control: defaults.clone(),
                status: vec![0.0; descriptor.status_port_indices.len()],
                aux: vec![0.0; descriptor.aux_channels * MAX_CHUNK_SAMPLES],
            });
        }

        let rack_channels = descriptor.channels * copies;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        log::debug!(
            "Instantiated {} as instance {}: {} channels x {} copies",
            descriptor.uri,
            id,
            descriptor.channels,
            copies
        );

        Ok(PluginInstance {
            id,
            descriptor: Arc::clone(descriptor),
            holders,
            enabled: false,
            wet_dry_enabled: false,
            wet_dry_values: vec![1.0; rack_channels],
            dry: vec![0.0; rack_channels * MAX_CHUNK_SAMPLES],
        })
    }
}
