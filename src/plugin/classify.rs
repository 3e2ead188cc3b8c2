//! Port classification.
//!
//! Turns the raw port list reported by discovery into a
//! [`PluginDescriptor`]: audio arity (`channels`), auxiliary audio ports,
//! and the control / status index sets.  Classification is total: any port
//! list yields a descriptor, and a plugin with no audio at all simply ends
//! up with `channels == 0`.  Only ports flagged as control ports become
//! control or status ports; anything else that is neither audio nor atom is
//! recorded as unsupported.

use super::types::*;

pub fn classify(
    uri: impl Into<String>,
    name: impl Into<String>,
    maker: Option<String>,
    raw_ports: Vec<RawPort>,
) -> PluginDescriptor {
    let mut ports = Vec::with_capacity(raw_ports.len());
    let mut audio_inputs = Vec::new();
    let mut audio_outputs = Vec::new();
    let mut control = Vec::new();
    let mut status = Vec::new();
    let mut atoms = Vec::new();
    let mut unsupported = Vec::new();

    for (index, raw) in raw_ports.into_iter().enumerate() {
        let direction = if raw.is_output && !raw.is_input {
            PortDirection::Output
        } else {
            PortDirection::Input
        };

        let kind = if raw.is_audio {
            match direction {
                PortDirection::Input => audio_inputs.push(index),
                PortDirection::Output => audio_outputs.push(index),
            }
            PortKind::Audio
        } else if raw.is_atom {
            atoms.push(index);
            PortKind::Atom
        } else if raw.is_control {
            match direction {
                PortDirection::Input => control.push(index),
                PortDirection::Output => status.push(index),
            }
            PortKind::Control
        } else {
            // CV and other buffer ports: never bound to a scalar slot.
            unsupported.push(index);
            PortKind::Other
        };

        ports.push(PortDescriptor {
            index,
            symbol: raw.symbol,
            name: raw.name,
            kind,
            direction,
            hints: raw.hints,
        });
    }

    let in_count = audio_inputs.len();
    let out_count = audio_outputs.len();
    let mut aux_port_indices = Vec::new();
    let mut aux_is_input = false;

    let (channels, has_input) = if in_count == out_count {
        (in_count, in_count > 0)
    } else if in_count == 0 || out_count == 0 {
        (in_count.max(out_count), in_count > 0)
    } else {
        let channels = in_count.min(out_count);
        aux_is_input = in_count > out_count;
        let larger = if aux_is_input {
            &mut audio_inputs
        } else {
            &mut audio_outputs
        };
        aux_port_indices = larger.split_off(channels);
        (channels, true)
    };

    PluginDescriptor {
        uri: uri.into(),
        name: name.into(),
        maker,
        ports,
        channels,
        aux_channels: aux_port_indices.len(),
        aux_is_input,
        has_input,
        audio_input_indices: audio_inputs,
        audio_output_indices: audio_outputs,
        aux_port_indices,
        control_port_indices: control,
        status_port_indices: status,
        atom_port_indices: atoms,
        unsupported_port_indices: unsupported,
    }
}

/// Starting value for a control port at the given sample rate.
///
/// A declared default wins; otherwise the lower bound, then the upper
/// bound, then zero.  Logarithmic ports keep their lower bound away from
/// zero so the geometric blends stay finite.
pub fn default_value(hints: &RangeHints, sample_rate: f32) -> f32 {
    let scale = if hints.sample_rate { sample_rate } else { 1.0 };
    let (lower, upper) = bounds(hints, sample_rate);

    let blend = |low_weight: f32| -> f32 {
        let lo = lower.unwrap_or(0.0);
        let hi = upper.unwrap_or(lo);
        if hints.logarithmic && hi > 0.0 {
            let lo = lo.max(f32::EPSILON);
            (lo.ln() * low_weight + hi.ln() * (1.0 - low_weight)).exp()
        } else {
            lo * low_weight + hi * (1.0 - low_weight)
        }
    };

    match hints.default {
        DefaultHint::Value(v) => v * scale,
        DefaultHint::Minimum => lower.unwrap_or(0.0),
        DefaultHint::Low => blend(0.75),
        DefaultHint::Middle => blend(0.5),
        DefaultHint::High => blend(0.25),
        DefaultHint::Maximum => upper.unwrap_or(0.0),
        DefaultHint::Zero => 0.0,
        DefaultHint::One => scale,
        DefaultHint::Hundred => 100.0 * scale,
        DefaultHint::FourForty => 440.0 * scale,
        DefaultHint::None => lower.or(upper).unwrap_or(0.0),
    }
}

/// Effective `(lower, upper)` bounds at the given sample rate.  The lower
/// bound of a logarithmic port never reaches zero.
pub fn bounds(hints: &RangeHints, sample_rate: f32) -> (Option<f32>, Option<f32>) {
    let scale = if hints.sample_rate { sample_rate } else { 1.0 };
    let mut lower = hints.lower.map(|v| v * scale);
    let upper = hints.upper.map(|v| v * scale);
    if hints.logarithmic {
        lower = lower.map(|v| v.max(f32::EPSILON));
    }
    (lower, upper)
}

/// Carry a control value across a sample-rate change.  Only
/// sample-rate-relative ports move.
pub fn rescale_for_sample_rate(hints: &RangeHints, value: f32, old_rate: f32, new_rate: f32) -> f32 {
    if hints.sample_rate && old_rate > 0.0 {
        value / old_rate * new_rate
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports(audio_in: usize, audio_out: usize) -> Vec<RawPort> {
        let mut ports = Vec::new();
        for i in 0..audio_in {
            ports.push(RawPort::audio_input(&format!("In {}", i)));
        }
        for i in 0..audio_out {
            ports.push(RawPort::audio_output(&format!("Out {}", i)));
        }
        ports
    }

    #[test]
    fn test_symmetric_plugin() {
        let desc = classify("urn:eq", "EQ", None, ports(2, 2));
        assert_eq!(desc.channels, 2);
        assert_eq!(desc.aux_channels, 0);
        assert!(desc.has_input);
        assert_eq!(desc.audio_input_indices, vec![0, 1]);
        assert_eq!(desc.audio_output_indices, vec![2, 3]);
    }

    #[test]
    fn test_no_audio_plugin() {
        let desc = classify("urn:none", "None", None, Vec::new());
        assert_eq!(desc.channels, 0);
        assert!(!desc.has_input);
    }

    #[test]
    fn test_generator_has_no_input() {
        let desc = classify("urn:osc", "Osc", None, ports(0, 2));
        assert_eq!(desc.channels, 2);
        assert!(!desc.has_input);
        assert!(desc.is_producer());
    }

    #[test]
    fn test_consumer_keeps_input() {
        let desc = classify("urn:meter", "Meter", None, ports(1, 0));
        assert_eq!(desc.channels, 1);
        assert!(desc.has_input);
    }

    #[test]
    fn test_aux_inputs() {
        let desc = classify("urn:sc", "Sidechain", None, ports(3, 1));
        assert_eq!(desc.channels, 1);
        assert_eq!(desc.aux_channels, 2);
        assert!(desc.aux_is_input);
        assert_eq!(desc.audio_input_indices, vec![0]);
        assert_eq!(desc.aux_port_indices, vec![1, 2]);
        assert_eq!(desc.audio_output_indices, vec![3]);
    }

    #[test]
    fn test_aux_outputs() {
        let desc = classify("urn:split", "Split", None, ports(1, 2));
        assert_eq!(desc.channels, 1);
        assert_eq!(desc.aux_channels, 1);
        assert!(!desc.aux_is_input);
        assert_eq!(desc.aux_port_indices, vec![2]);
    }

    #[test]
    fn test_control_and_status_partition() {
        let mut raw = ports(1, 1);
        raw.push(RawPort::control_input("Gain", RangeHints::default()));
        raw.push(RawPort::control_output("Level", RangeHints::default()));
        raw.push(RawPort::atom("Midi", PortDirection::Input));
        let desc = classify("urn:amp", "Amp", Some("Zest".into()), raw);
        assert_eq!(desc.control_port_indices, vec![2]);
        assert_eq!(desc.status_port_indices, vec![3]);
        assert_eq!(desc.atom_port_indices, vec![4]);
        assert_eq!(desc.ports[4].kind, PortKind::Atom);
        assert_eq!(desc.ports[3].direction, PortDirection::Output);
    }

    #[test]
    fn test_every_port_lands_in_one_set() {
        let mut raw = ports(3, 2);
        raw.push(RawPort::control_input("A", RangeHints::default()));
        raw.push(RawPort::control_output("B", RangeHints::default()));
        raw.push(RawPort {
            name: "Mod".into(),
            is_input: true,
            ..Default::default()
        });
        let desc = classify("urn:x", "X", None, raw);
        let mut all: Vec<usize> = desc
            .audio_input_indices
            .iter()
            .chain(&desc.audio_output_indices)
            .chain(&desc.aux_port_indices)
            .chain(&desc.control_port_indices)
            .chain(&desc.status_port_indices)
            .chain(&desc.unsupported_port_indices)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_port_without_control_flag_is_not_a_scalar() {
        let mut raw = ports(1, 1);
        raw.push(RawPort {
            name: "CV In".into(),
            is_input: true,
            ..Default::default()
        });
        raw.push(RawPort {
            name: "CV Out".into(),
            is_output: true,
            ..Default::default()
        });
        let desc = classify("urn:cv", "CV", None, raw);
        assert!(desc.control_port_indices.is_empty());
        assert!(desc.status_port_indices.is_empty());
        assert_eq!(desc.unsupported_port_indices, vec![2, 3]);
        assert_eq!(desc.ports[2].kind, PortKind::Other);
        assert!(!desc.is_hostable());
        assert_eq!(desc.channels, 1);
    }

    #[test]
    fn test_log_blend_without_lower_bound_is_positive() {
        let hints = RangeHints {
            upper: Some(1.0),
            default: DefaultHint::Middle,
            logarithmic: true,
            ..Default::default()
        };
        let middle = default_value(&hints, 48000.0);
        assert!((middle - f32::EPSILON.sqrt()).abs() < 1e-6);

        let high = RangeHints {
            default: DefaultHint::High,
            ..hints
        };
        assert!(default_value(&high, 48000.0) > middle);
    }

    #[test]
    fn test_default_explicit_value() {
        let hints = RangeHints {
            lower: Some(0.0),
            upper: Some(10.0),
            default: DefaultHint::Value(3.0),
            ..Default::default()
        };
        assert_eq!(default_value(&hints, 48000.0), 3.0);
    }

    #[test]
    fn test_default_falls_back_to_bounds() {
        let lower_only = RangeHints {
            lower: Some(-6.0),
            ..Default::default()
        };
        assert_eq!(default_value(&lower_only, 48000.0), -6.0);

        let upper_only = RangeHints {
            upper: Some(12.0),
            ..Default::default()
        };
        assert_eq!(default_value(&upper_only, 48000.0), 12.0);

        assert_eq!(default_value(&RangeHints::default(), 48000.0), 0.0);
    }

    #[test]
    fn test_default_middle_linear_and_log() {
        let linear = RangeHints {
            lower: Some(0.0),
            upper: Some(10.0),
            default: DefaultHint::Middle,
            ..Default::default()
        };
        assert_eq!(default_value(&linear, 48000.0), 5.0);

        let log = RangeHints {
            lower: Some(10.0),
            upper: Some(1000.0),
            default: DefaultHint::Middle,
            logarithmic: true,
            ..Default::default()
        };
        assert!((default_value(&log, 48000.0) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_log_port_lower_bound_kept_off_zero() {
        let hints = RangeHints {
            lower: Some(0.0),
            upper: Some(1.0),
            default: DefaultHint::Minimum,
            logarithmic: true,
            ..Default::default()
        };
        assert_eq!(default_value(&hints, 48000.0), f32::EPSILON);
        let low = RangeHints {
            default: DefaultHint::Low,
            ..hints
        };
        assert!(default_value(&low, 48000.0).is_finite());
    }

    #[test]
    fn test_sample_rate_relative_defaults() {
        let hints = RangeHints {
            lower: Some(0.0),
            upper: Some(0.5),
            default: DefaultHint::Maximum,
            sample_rate: true,
            ..Default::default()
        };
        assert_eq!(default_value(&hints, 48000.0), 24000.0);
        let one = RangeHints {
            default: DefaultHint::One,
            ..hints
        };
        assert_eq!(default_value(&one, 44100.0), 44100.0);
        let a440 = RangeHints {
            default: DefaultHint::FourForty,
            sample_rate: false,
            ..hints
        };
        assert_eq!(default_value(&a440, 44100.0), 440.0);
        let declared = RangeHints {
            default: DefaultHint::Value(0.25),
            ..hints
        };
        assert_eq!(default_value(&declared, 48000.0), 12000.0);
    }

    #[test]
    fn test_rescale_for_sample_rate() {
        let relative = RangeHints {
            sample_rate: true,
            ..Default::default()
        };
        assert_eq!(rescale_for_sample_rate(&relative, 22050.0, 44100.0, 48000.0), 24000.0);
        let absolute = RangeHints::default();
        assert_eq!(rescale_for_sample_rate(&absolute, 0.3, 44100.0, 48000.0), 0.3);
    }
}
