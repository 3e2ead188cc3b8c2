//! How many parallel copies of a plugin cover a rack's channel count.

/// Number of copies of a `plugin_channels`-wide plugin that cover exactly
/// `rack_channels`.  `None` when no whole number of copies does: partial
/// copies would leave channels unprocessed.
pub fn solve(plugin_channels: usize, rack_channels: usize) -> Option<usize> {
    if plugin_channels == 0 || plugin_channels > rack_channels {
        return None;
    }

    let copies = rack_channels.div_ceil(plugin_channels);
    (plugin_channels * copies == rack_channels).then_some(copies)
}

/// The smallest multiple of `plugin_channels` that is at least
/// `rack_channels`; the channel count to retry with after [`solve`] fails.
pub fn adjusted_request(plugin_channels: usize, rack_channels: usize) -> Option<usize> {
    if plugin_channels == 0 {
        return None;
    }
    Some(rack_channels.div_ceil(plugin_channels).max(1) * plugin_channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_plugin_on_stereo() {
        assert_eq!(solve(1, 2), Some(2));
    }

    #[test]
    fn test_exact_fit() {
        assert_eq!(solve(2, 2), Some(1));
        assert_eq!(solve(2, 6), Some(3));
    }

    #[test]
    fn test_wider_than_rack_is_incompatible() {
        assert_eq!(solve(4, 2), None);
    }

    #[test]
    fn test_partial_copy_is_incompatible() {
        assert_eq!(solve(2, 3), None);
        assert_eq!(solve(3, 4), None);
    }

    #[test]
    fn test_zero_channel_plugin_never_fits() {
        assert_eq!(solve(0, 2), None);
        assert_eq!(adjusted_request(0, 2), None);
    }

    #[test]
    fn test_adjusted_request() {
        assert_eq!(adjusted_request(4, 2), Some(4));
        assert_eq!(solve(4, 4), Some(1));
        assert_eq!(adjusted_request(2, 3), Some(4));
        assert_eq!(adjusted_request(3, 6), Some(6));
        assert_eq!(adjusted_request(2, 0), Some(2));
    }
}
