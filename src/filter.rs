//! Processing slots: one filter or producer unit and the rack behind it.
//!
//! A slot binds lazily on the first block, rebinds whenever the block's
//! channel count or sample rate changes, and falls back to pass-through
//! once binding has failed for the current configuration.

use std::sync::Arc;

use crate::audio::{self, AudioFrame, BlockContext, BufferPool};
use crate::error::RackError;
use crate::plugin::copies;
use crate::plugin::{InstanceManager, PluginRegistry};
use crate::properties::{ParameterSource, SharedStatus, SlotConfig, StatusBoard, WETNESS_KEY};
use crate::rack::{Rack, RackPreset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Processes the audio it is given; supports wet/dry.
    Filter,
    /// Generates audio into a silent frame.
    Producer,
}

/// Externally visible state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
    Uninitialized,
    Initialized,
    Failed,
}

/// Per-block bookkeeping for a slot bound to a single plugin.
struct SingleBinding {
    /// Parameter key of every control port, in `control_port_indices` order.
    control_keys: Vec<String>,
    defaults: Vec<f32>,
}

struct Bound {
    rack: Rack,
    single: Option<SingleBinding>,
}

enum SlotState {
    Uninitialized,
    Initialized(Bound),
    Failed,
}

pub struct FilterSlot {
    kind: SlotKind,
    config: SlotConfig,
    registry: Arc<PluginRegistry>,
    instances: Arc<InstanceManager>,
    state: SlotState,
    /// Channel count and sample rate of the last block.
    last_seen: Option<(usize, f64)>,
    status: SharedStatus,
}

impl FilterSlot {
    pub fn new(
        kind: SlotKind,
        config: SlotConfig,
        registry: Arc<PluginRegistry>,
        instances: Arc<InstanceManager>,
    ) -> Self {
        Self {
            kind,
            config,
            registry,
            instances,
            state: SlotState::Uninitialized,
            last_seen: None,
            status: StatusBoard::new(),
        }
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn config(&self) -> &SlotConfig {
        &self.config
    }

    pub fn phase(&self) -> SlotPhase {
        match self.state {
            SlotState::Uninitialized => SlotPhase::Uninitialized,
            SlotState::Initialized(_) => SlotPhase::Initialized,
            SlotState::Failed => SlotPhase::Failed,
        }
    }

    /// Status values published after every block.
    pub fn status(&self) -> &SharedStatus {
        &self.status
    }

    pub fn rack(&self) -> Option<&Rack> {
        match &self.state {
            SlotState::Initialized(bound) => Some(&bound.rack),
            _ => None,
        }
    }

    /// Structural edits go through here, between blocks.
    pub fn rack_mut(&mut self) -> Option<&mut Rack> {
        match &mut self.state {
            SlotState::Initialized(bound) => Some(&mut bound.rack),
            _ => None,
        }
    }

    /// Drop the rack; the next block binds again.
    pub fn reset(&mut self) {
        if let SlotState::Initialized(bound) =
            std::mem::replace(&mut self.state, SlotState::Uninitialized)
        {
            bound.rack.destroy();
        }
        self.status.clear();
        self.last_seen = None;
    }

    /// Run one block through the slot, in place.
    ///
    /// The frame may come back with more channels than it went in with
    /// when the plugin needed them.  A processing failure leaves the
    /// samples written so far and returns the error; the slot stays bound.
    /// A `sample_rate` of zero means the host did not report one.
    pub fn process(
        &mut self,
        frame: &mut AudioFrame,
        sample_rate: f64,
        ctx: BlockContext,
        params: &dyn ParameterSource,
        pool: &dyn BufferPool,
    ) -> Result<(), RackError> {
        let channels = frame.channels();
        let sample_rate = if sample_rate > 0.0 {
            sample_rate
        } else {
            self.config.sample_rate
        };

        if self.last_seen != Some((channels, sample_rate)) {
            if self.last_seen.is_some() {
                log::info!(
                    "Slot configuration changed to {} channels at {} Hz; rebinding",
                    channels,
                    sample_rate
                );
            }
            self.reset();
            self.last_seen = Some((channels, sample_rate));
        }

        if matches!(self.state, SlotState::Uninitialized) {
            self.state = match self.bind(channels, sample_rate) {
                Ok(bound) => SlotState::Initialized(bound),
                Err(e) => {
                    log::error!("Slot disabled for {} channels: {}", channels, e);
                    SlotState::Failed
                }
            };
        }

        let SlotState::Initialized(bound) = &mut self.state else {
            return Ok(());
        };
        if bound.rack.is_empty() {
            return Ok(());
        }

        if bound.rack.channels() > channels {
            frame.pad_channels(bound.rack.channels(), pool);
        }

        if let Some(single) = &bound.single
            && let Some(instance) = bound.rack.first_mut()
        {
            let controls = single.control_keys.iter().zip(&single.defaults);
            for (i, (key, &default)) in controls.enumerate() {
                let value = params
                    .get(key, ctx.position, ctx.length)
                    .map(|v| v as f32)
                    .unwrap_or(default);
                instance.set_control(i, value);
            }

            let wetness = match self.kind {
                SlotKind::Filter => params.get(WETNESS_KEY, ctx.position, ctx.length),
                SlotKind::Producer => None,
            };
            match wetness {
                Some(w) => {
                    instance.wet_dry_enabled = true;
                    instance.set_wetness(w as f32);
                }
                None => instance.wet_dry_enabled = false,
            }
        }

        for (offset, len) in audio::chunks(frame.samples()) {
            bound.rack.run_chunk(&mut frame.planes_mut(offset, len))?;
        }

        if bound.single.is_some()
            && let Some(instance) = bound.rack.instances().first()
        {
            for copy in 0..instance.copies() {
                if let Some(values) = instance.status_values(copy) {
                    self.status.publish(copy, values);
                }
            }
        }

        Ok(())
    }

    /// Render one block from a producer: a silent frame of `channels` run
    /// through the slot.
    pub fn render(
        &mut self,
        channels: usize,
        samples: usize,
        sample_rate: f64,
        ctx: BlockContext,
        params: &dyn ParameterSource,
        pool: &dyn BufferPool,
    ) -> Result<AudioFrame, RackError> {
        let data = pool.alloc(channels * samples);
        let mut frame = AudioFrame::from_planar(data, channels, samples)
            .unwrap_or_else(|| AudioFrame::new(channels, samples));
        self.process(&mut frame, sample_rate, ctx, params, pool)?;
        Ok(frame)
    }

    fn bind(&self, channels: usize, sample_rate: f64) -> Result<Bound, RackError> {
        if let Some(path) = &self.config.resource {
            let preset = RackPreset::load(path)?;
            let rack = preset.build(&self.registry, &self.instances, channels, sample_rate);
            log::info!(
                "Loaded rack preset {} with {} plugins for {} channels",
                path.display(),
                rack.len(),
                channels
            );
            return Ok(Bound { rack, single: None });
        }

        let Some(uri) = &self.config.plugin_id else {
            log::debug!("Slot has no plugin configured; passing audio through");
            return Ok(Bound {
                rack: Rack::new(channels),
                single: None,
            });
        };
        let desc = self
            .registry
            .find(uri)
            .ok_or_else(|| RackError::DescriptorNotFound { uri: uri.clone() })?;

        let (rack_channels, n) = match copies::solve(desc.channels, channels) {
            Some(n) => (channels, n),
            None => {
                let incompatible = || RackError::ChannelIncompatible {
                    uri: uri.clone(),
                    plugin_channels: desc.channels,
                    requested: channels,
                };
                let adjusted =
                    copies::adjusted_request(desc.channels, channels).ok_or_else(incompatible)?;
                log::warn!(
                    "Not compatible with {} channels. Requesting {} channels instead.",
                    channels,
                    adjusted
                );
                let n = copies::solve(desc.channels, adjusted).ok_or_else(incompatible)?;
                (adjusted, n)
            }
        };

        let mut instance = self.instances.instantiate(desc, n, sample_rate)?;
        instance.enabled = true;

        let single = SingleBinding {
            control_keys: desc
                .control_port_indices
                .iter()
                .map(|index| index.to_string())
                .collect(),
            defaults: instance.control_values(0).map(<[f32]>::to_vec).unwrap_or_default(),
        };

        self.status.rebind(&desc.status_port_indices, n);

        log::info!(
            "Bound {} to {} channels ({} copies)",
            desc.uri,
            rack_channels,
            n
        );

        let mut rack = Rack::new(rack_channels);
        rack.append(instance);
        Ok(Bound {
            rack,
            single: Some(single),
        })
    }
}

impl Drop for FilterSlot {
    fn drop(&mut self) {
        self.reset();
    }
}
