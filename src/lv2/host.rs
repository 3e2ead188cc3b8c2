use std::sync::Arc;

use lilv::World;
use lv2_raw::urid::LV2UridMap;

use super::urid::{LV2UridUnmap, UridMapper, bounded_block_length_feature};
use crate::audio::MAX_CHUNK_SAMPLES;
use crate::error::RackError;
use crate::plugin::{
    NativeInstance, PluginBackend, PluginDescriptor, PortBuffers, PortDirection,
};

const ATOM_BUF_SIZE: usize = 65536;
const ATOM_HEADER_SIZE: usize = 16;

/// Write an empty `atom:Sequence` into `buf`.  Output buffers advertise
/// their whole capacity to the plugin; input buffers carry no events.
fn init_atom_sequence(buf: &mut [u8], is_output: bool, sequence_type_urid: u32) {
    if buf.len() < ATOM_HEADER_SIZE {
        return;
    }
    buf.fill(0);

    let size: u32 = if is_output { (buf.len() - 8) as u32 } else { 8 };

    buf[0..4].copy_from_slice(&size.to_ne_bytes());
    buf[4..8].copy_from_slice(&sequence_type_urid.to_ne_bytes());
    buf[8..12].copy_from_slice(&0u32.to_ne_bytes());
    buf[12..16].copy_from_slice(&0u32.to_ne_bytes());
}

struct AtomBuf {
    port_index: usize,
    is_output: bool,
    data: Vec<u8>,
}

/// One activated LV2 plugin instance.
pub struct Lv2Instance {
    // Declared first: dropping it deactivates and frees the plugin before
    // the world and feature structs it points into go away.
    instance: lilv::instance::ActiveInstance,
    _world: World,
    _urid_map: Box<LV2UridMap>,
    _urid_unmap: Box<LV2UridUnmap>,
    _urid_mapper: Arc<UridMapper>,
    audio_input_indices: Vec<usize>,
    audio_output_indices: Vec<usize>,
    aux_port_indices: Vec<usize>,
    control_port_indices: Vec<usize>,
    status_port_indices: Vec<usize>,
    channels: usize,
    atom_bufs: Vec<AtomBuf>,
    atom_sequence_urid: u32,
}

// The instance is only ever driven by the thread that owns its rack; the
// world and feature structs it points into are owned alongside it and
// never shared.
unsafe impl Send for Lv2Instance {}

impl Lv2Instance {
    /// # Safety
    /// Loads and runs foreign plugin code.
    pub unsafe fn new(
        descriptor: &PluginDescriptor,
        sample_rate: f64,
        urid_mapper: &Arc<UridMapper>,
    ) -> Result<Self, String> {
        let world = World::with_load_all();
        let uri_node = world.new_uri(&descriptor.uri);

        let plugin = world
            .plugins()
            .iter()
            .find(|p| p.uri().as_uri() == uri_node.as_uri())
            .ok_or_else(|| "plugin not found in the LV2 world".to_string())?;

        let atom_sequence_urid = urid_mapper.map("http://lv2plug.in/ns/ext/atom#Sequence");

        let mut urid_map = Box::new(urid_mapper.as_lv2_urid_map());
        let mut urid_unmap = Box::new(urid_mapper.as_lv2_urid_unmap());
        let map_feature = unsafe { UridMapper::make_map_feature(&mut *urid_map as *mut _) };
        let unmap_feature = unsafe { UridMapper::make_unmap_feature(&mut *urid_unmap as *mut _) };
        let bounded_feature = bounded_block_length_feature();
        let features = vec![&map_feature, &unmap_feature, &bounded_feature];

        let mut instance = unsafe { plugin.instantiate(sample_rate, features) }
            .ok_or_else(|| "lilv refused to instantiate the plugin".to_string())?;

        let mut atom_bufs: Vec<AtomBuf> = descriptor
            .atom_port_indices
            .iter()
            .map(|&port_index| AtomBuf {
                port_index,
                is_output: descriptor
                    .port(port_index)
                    .is_some_and(|p| p.direction == PortDirection::Output),
                data: vec![0u8; ATOM_BUF_SIZE],
            })
            .collect();

        for ab in atom_bufs.iter_mut() {
            init_atom_sequence(&mut ab.data, ab.is_output, atom_sequence_urid);
            unsafe {
                instance.connect_port_mut(ab.port_index, ab.data.as_mut_ptr());
            }
        }

        let active_instance = unsafe { instance.activate() };

        log::debug!(
            "LV2: Activated {} at {} Hz ({} atom ports)",
            descriptor.uri,
            sample_rate,
            atom_bufs.len()
        );

        Ok(Self {
            instance: active_instance,
            _world: world,
            _urid_map: urid_map,
            _urid_unmap: urid_unmap,
            _urid_mapper: Arc::clone(urid_mapper),
            audio_input_indices: descriptor.audio_input_indices.clone(),
            audio_output_indices: descriptor.audio_output_indices.clone(),
            aux_port_indices: descriptor.aux_port_indices.clone(),
            control_port_indices: descriptor.control_port_indices.clone(),
            status_port_indices: descriptor.status_port_indices.clone(),
            channels: descriptor.channels,
            atom_bufs,
            atom_sequence_urid,
        })
    }
}

impl NativeInstance for Lv2Instance {
    fn run(&mut self, mut ports: PortBuffers<'_>, sample_count: usize) -> Result<(), String> {
        if sample_count > MAX_CHUNK_SAMPLES {
            return Err(format!(
                "{} samples exceeds the block limit of {}",
                sample_count, MAX_CHUNK_SAMPLES
            ));
        }
        if ports.audio.count() < self.channels {
            return Err(format!(
                "expected {} audio planes, got {}",
                self.channels,
                ports.audio.count()
            ));
        }
        if ports.audio.len() < sample_count {
            return Err(format!("audio plane shorter than {} samples", sample_count));
        }

        let instance = self.instance.instance_mut();

        for (&port_idx, value) in self.control_port_indices.iter().zip(ports.control) {
            unsafe {
                instance.connect_port(port_idx, value as *const f32);
            }
        }
        for (&port_idx, value) in self.status_port_indices.iter().zip(ports.status.iter_mut()) {
            unsafe {
                instance.connect_port_mut(port_idx, value as *mut f32);
            }
        }

        // Input and output of a channel share one plane: processing is in
        // place.
        for c in 0..self.channels {
            let Some(plane) = ports.audio.plane_mut(c) else {
                break;
            };
            let ptr = plane.as_mut_ptr();
            if let Some(&port_idx) = self.audio_input_indices.get(c) {
                unsafe {
                    instance.connect_port_mut(port_idx, ptr);
                }
            }
            if let Some(&port_idx) = self.audio_output_indices.get(c) {
                unsafe {
                    instance.connect_port_mut(port_idx, ptr);
                }
            }
        }

        for (&port_idx, plane) in self
            .aux_port_indices
            .iter()
            .zip(ports.aux.chunks_mut(MAX_CHUNK_SAMPLES))
        {
            unsafe {
                instance.connect_port_mut(port_idx, plane.as_mut_ptr());
            }
        }

        for ab in &mut self.atom_bufs {
            init_atom_sequence(&mut ab.data, ab.is_output, self.atom_sequence_urid);
        }

        unsafe {
            self.instance.run(sample_count);
        }

        Ok(())
    }
}

/// Creates LV2 instances through lilv.
pub struct Lv2Backend {
    urid_mapper: Arc<UridMapper>,
}

impl Default for Lv2Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl Lv2Backend {
    pub fn new() -> Self {
        Self {
            urid_mapper: Arc::new(UridMapper::new()),
        }
    }

    pub fn urid_mapper(&self) -> &Arc<UridMapper> {
        &self.urid_mapper
    }
}

impl PluginBackend for Lv2Backend {
    fn instantiate(
        &self,
        descriptor: &PluginDescriptor,
        sample_rate: f64,
    ) -> Result<Box<dyn NativeInstance>, RackError> {
        let instance = unsafe { Lv2Instance::new(descriptor, sample_rate, &self.urid_mapper) }
            .map_err(|reason| {
                log::error!("LV2: Failed to instantiate {}: {}", descriptor.uri, reason);
                RackError::NativeInstantiate {
                    uri: descriptor.uri.clone(),
                    copy: 0,
                    reason,
                }
            })?;
        Ok(Box::new(instance))
    }
}
