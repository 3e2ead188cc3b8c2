//! Property-based tests for classification, the copies solver and block
//! chunking.

use proptest::prelude::*;
use zestrack::audio::{AudioFrame, HeapPool, MAX_CHUNK_SAMPLES, chunks};
use zestrack::plugin::classify::{classify, default_value};
use zestrack::plugin::copies::{adjusted_request, solve};
use zestrack::plugin::{DefaultHint, PortDirection, RangeHints, RawPort};

/// A port list with the given audio counts plus some control, status and
/// atom ports, shuffled by `order`.
fn port_list(audio_in: usize, audio_out: usize, controls: usize, order: &[u8]) -> Vec<RawPort> {
    let mut ports = Vec::new();
    for _ in 0..audio_in {
        ports.push(RawPort::audio_input("In"));
    }
    for _ in 0..audio_out {
        ports.push(RawPort::audio_output("Out"));
    }
    for _ in 0..controls {
        ports.push(RawPort::control_input("Param", RangeHints::default()));
        ports.push(RawPort::control_output("Meter", RangeHints::default()));
    }
    ports.push(RawPort::atom("Events", PortDirection::Input));

    for (i, &o) in order.iter().enumerate() {
        let len = ports.len();
        ports.swap(i % len, o as usize % len);
    }
    ports
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Equal audio counts give that many channels and no aux ports.
    #[test]
    fn symmetric_plugins_have_no_aux(
        n in 0usize..16,
        controls in 0usize..4,
        order in prop::collection::vec(any::<u8>(), 0..8),
    ) {
        let desc = classify("urn:p", "P", None, port_list(n, n, controls, &order));
        prop_assert_eq!(desc.channels, n);
        prop_assert_eq!(desc.aux_channels, 0);
        prop_assert_eq!(desc.has_input, n > 0);
    }

    /// Channels plus aux always account for the larger audio side.
    #[test]
    fn asymmetric_plugins_split_into_channels_and_aux(
        audio_in in 1usize..12,
        audio_out in 1usize..12,
    ) {
        let desc = classify("urn:p", "P", None, port_list(audio_in, audio_out, 0, &[]));
        prop_assert_eq!(desc.channels, audio_in.min(audio_out));
        prop_assert_eq!(desc.aux_channels, audio_in.abs_diff(audio_out));
        prop_assert_eq!(desc.aux_port_indices.len(), desc.aux_channels);
        prop_assert_eq!(desc.aux_is_input, audio_in > audio_out);
    }

    /// Every port index lands in exactly one set.
    #[test]
    fn ports_are_partitioned(
        audio_in in 0usize..6,
        audio_out in 0usize..6,
        controls in 0usize..4,
        order in prop::collection::vec(any::<u8>(), 0..8),
    ) {
        let desc = classify("urn:p", "P", None, port_list(audio_in, audio_out, controls, &order));
        let mut all: Vec<usize> = desc
            .audio_input_indices
            .iter()
            .chain(&desc.audio_output_indices)
            .chain(&desc.aux_port_indices)
            .chain(&desc.control_port_indices)
            .chain(&desc.status_port_indices)
            .chain(&desc.atom_port_indices)
            .chain(&desc.unsupported_port_indices)
            .copied()
            .collect();
        all.sort_unstable();
        prop_assert_eq!(all, (0..desc.ports.len()).collect::<Vec<_>>());
    }

    /// The solver only ever answers with an exact cover.
    #[test]
    fn solver_is_exact(pc in 0usize..32, rc in 0usize..256) {
        match solve(pc, rc) {
            Some(copies) => {
                prop_assert!(copies > 0);
                prop_assert_eq!(pc * copies, rc);
            }
            None => prop_assert!(pc == 0 || pc > rc || rc % pc != 0),
        }
    }

    #[test]
    fn solver_rejects_wider_plugins(rc in 0usize..64, extra in 1usize..16) {
        prop_assert_eq!(solve(rc + extra, rc), None);
    }

    /// The adjusted request is always solvable and never smaller than the
    /// original.
    #[test]
    fn adjusted_request_is_solvable(pc in 1usize..32, rc in 0usize..256) {
        let adjusted = adjusted_request(pc, rc).unwrap();
        prop_assert!(adjusted >= rc);
        prop_assert!(adjusted < rc.max(1) + pc);
        prop_assert!(solve(pc, adjusted).is_some());
    }

    /// Chunks are contiguous, bounded and cover the block.
    #[test]
    fn chunks_cover_the_block(samples in 0usize..40000) {
        let mut next = 0;
        let mut count = 0;
        for (offset, len) in chunks(samples) {
            prop_assert_eq!(offset, next);
            prop_assert!(len > 0 && len <= MAX_CHUNK_SAMPLES);
            next = offset + len;
            count += 1;
        }
        prop_assert_eq!(next, samples);
        prop_assert_eq!(count, samples.div_ceil(MAX_CHUNK_SAMPLES));
    }

    /// Padding keeps the original planes and silences the new ones.
    #[test]
    fn padding_preserves_low_planes(
        channels in 1usize..6,
        extra in 0usize..6,
        samples in 1usize..256,
    ) {
        let data: Vec<f32> = (0..channels * samples).map(|i| i as f32 + 1.0).collect();
        let mut frame = AudioFrame::from_planar(data.clone(), channels, samples).unwrap();
        frame.pad_channels(channels + extra, &HeapPool);

        prop_assert_eq!(frame.channels(), channels + extra);
        prop_assert_eq!(&frame.data()[..data.len()], &data[..]);
        prop_assert!(frame.data()[data.len()..].iter().all(|&s| s == 0.0));
    }

    /// Defaults stay within declared bounds for every selector.
    #[test]
    fn defaults_stay_in_bounds(
        lower in -1000.0f32..1000.0,
        span in 0.0f32..1000.0,
        selector in 0usize..6,
        logarithmic in any::<bool>(),
    ) {
        let default = [
            DefaultHint::Minimum,
            DefaultHint::Low,
            DefaultHint::Middle,
            DefaultHint::High,
            DefaultHint::Maximum,
            DefaultHint::None,
        ][selector];
        let lower = if logarithmic { lower.abs() + 1.0 } else { lower };
        let upper = lower + span;
        let hints = RangeHints {
            lower: Some(lower),
            upper: Some(upper),
            default,
            logarithmic,
            ..Default::default()
        };
        let value = default_value(&hints, 48000.0);
        let tolerance = 1e-3 * upper.abs().max(1.0);
        prop_assert!(value >= lower - tolerance && value <= upper + tolerance,
            "{} outside [{}, {}]", value, lower, upper);
    }
}
