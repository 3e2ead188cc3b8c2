//! The seam between the rack and a native plugin ABI.
//!
//! A [`PluginBackend`] creates one native copy of a plugin; a
//! [`NativeInstance`] runs that copy over buffers the rack hands it.  The
//! LV2 backend lives in `crate::lv2::host`.

use super::types::PluginDescriptor;
use crate::audio::PlanesMut;
use crate::error::RackError;

/// Buffers for one run of one copy.
///
/// `audio` holds one in-place plane per channel of the copy: the plugin
/// reads its input from and writes its output to the same samples.
pub struct PortBuffers<'a> {
    /// One value per entry in `control_port_indices`.
    pub control: &'a [f32],
    /// One value per entry in `status_port_indices`.
    pub status: &'a mut [f32],
    pub audio: PlanesMut<'a>,
    /// Silent scratch for aux ports, `aux_channels` planes back to back.
    pub aux: &'a mut [f32],
}

pub trait NativeInstance: Send {
    /// Process `sample_count` samples.  Every audio plane holds at least
    /// that many samples.
    fn run(&mut self, ports: PortBuffers<'_>, sample_count: usize) -> Result<(), String>;
}

pub trait PluginBackend: Send + Sync {
    /// Create and activate one native copy of `descriptor`.
    fn instantiate(
        &self,
        descriptor: &PluginDescriptor,
        sample_rate: f64,
    ) -> Result<Box<dyn NativeInstance>, RackError>;
}
