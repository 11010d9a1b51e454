//! Crate-wide configuration, hoisting the magic numbers named throughout
//! the component design (§4) into overridable defaults.

/// Tunable parameters for the player core.
///
/// Every numeric constant named in the component design lives here so
/// tests and embedders can override it without touching the logic that
/// uses it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerConfig {
    /// Maximum number of frames buffered in a render scheduler before the
    /// oldest is dropped.
    pub frame_queue_bound: usize,
    /// Delay before a decoder re-requests input after `WouldBlock`.
    pub input_retry_delay_us: u64,
    /// Delay before `ScanSources` retries after a transient factory
    /// failure.
    pub scan_sources_retry_delay_ms: u64,
    /// Target size of the passthrough decoder's aggregate staging buffer.
    pub passthrough_aggregate_bytes: usize,
    /// Passthrough backpressure threshold: fetching stops once cached
    /// bytes reach this value.
    pub passthrough_max_cached_bytes: usize,
    /// A video/subtitle frame later than this many microseconds is
    /// dropped rather than rendered.
    pub late_frame_drop_threshold_us: i64,
    /// A video/subtitle frame later than this (negative) threshold is
    /// rendered immediately instead of waited on.
    pub early_frame_wait_threshold_us: i64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            frame_queue_bound: 100,
            input_retry_delay_us: 10_000,
            scan_sources_retry_delay_ms: 1_000,
            passthrough_aggregate_bytes: 24 * 1024,
            passthrough_max_cached_bytes: 200 * 1024,
            late_frame_drop_threshold_us: 40_000,
            early_frame_wait_threshold_us: -5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_component_design() {
        let config = PlayerConfig::default();
        assert_eq!(config.frame_queue_bound, 100);
        assert_eq!(config.passthrough_aggregate_bytes, 24 * 1024);
        assert_eq!(config.passthrough_max_cached_bytes, 200 * 1024);
    }
}
