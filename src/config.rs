//! Compile-time configuration (§6).
//!
//! [`Config`] carries every constant the original fixed with a `#define`;
//! `Config::default()` reproduces the recommended values. `defaults` keeps
//! the same values as bare `const` items for callers that would rather not
//! thread a value through at all.

use core::time::Duration;

/// RSSI reading below which a beacon is treated as too weak to use.
pub const RSSI_THRESHOLD_DEFAULT: i16 = -95;

/// Tunable parameters for one node's ETC stack.
///
/// All durations are nominal; [`Config::beacon_forward_delay`] and the other
/// jittered delays are ranges the caller's RNG is expected to sample from,
/// mirroring `random_rand() % ...` in the original `config.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// RSSI below which a beacon is dropped as too weak.
    pub rssi_threshold: i16,

    /// Controller's tree-rebuild period.
    pub beacon_interval: Duration,
    /// Upper bound of the jitter applied before forwarding a new-best beacon.
    pub beacon_forward_delay_max: Duration,
    /// Upper bound of the jitter applied before re-broadcasting an event.
    pub event_forward_delay_max: Duration,

    /// Lower/upper bounds of the jitter before a sensor dispatches its collect.
    pub collect_start_delay_min: Duration,
    pub collect_start_delay_max: Duration,

    /// How long the controller waits from the first collect of an event
    /// before running its actuation policy over whatever arrived.
    pub controller_collect_wait: Duration,

    /// Suppresses originating a *new* event at the triggering sensor.
    pub suppression_timeout_new: Duration,
    /// Suppresses *propagating* a received event.
    pub suppression_timeout_prop: Duration,
    /// Short delay releasing `suppress_prop` after a command reaches its sensor.
    pub suppression_timeout_end: Duration,

    /// How often a sensor refreshes its locally sensed value.
    pub sensor_update_interval: Duration,

    /// Maximum link-level send attempts before the buffer's "last chance"
    /// round is the only retry left (§5 "Retry policy floor").
    pub max_send: u8,

    /// Frames with `hops >= max_hops` are dropped (loop guard).
    pub max_hops: u8,

    /// Broadcast channel; unicast uses `broadcast_channel + 1`.
    pub broadcast_channel: u16,
}

impl Config {
    pub const fn unicast_channel(&self) -> u16 {
        self.broadcast_channel + 1
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rssi_threshold: RSSI_THRESHOLD_DEFAULT,

            beacon_interval: Duration::from_secs(30),
            beacon_forward_delay_max: Duration::from_secs(1),
            event_forward_delay_max: Duration::from_millis(100),

            collect_start_delay_min: Duration::from_secs(3),
            collect_start_delay_max: Duration::from_secs(5),

            controller_collect_wait: Duration::from_secs(10),

            suppression_timeout_new: Duration::from_secs(12),
            suppression_timeout_prop: Duration::from_millis(11_500),
            suppression_timeout_end: Duration::from_millis(500),

            sensor_update_interval: Duration::from_secs(7),

            max_send: 1,
            max_hops: 8,

            broadcast_channel: 0xAA,
        }
    }
}

/// Zero-cost `const` equivalents of [`Config::default`], for callers that
/// want to skip threading a `Config` value through at all.
pub mod defaults {
    use core::time::Duration;

    pub const RSSI_THRESHOLD: i16 = super::RSSI_THRESHOLD_DEFAULT;
    pub const BEACON_INTERVAL: Duration = Duration::from_secs(30);
    pub const BEACON_FORWARD_DELAY_MAX: Duration = Duration::from_secs(1);
    pub const EVENT_FORWARD_DELAY_MAX: Duration = Duration::from_millis(100);
    pub const COLLECT_START_DELAY_MIN: Duration = Duration::from_secs(3);
    pub const COLLECT_START_DELAY_MAX: Duration = Duration::from_secs(5);
    pub const CONTROLLER_COLLECT_WAIT: Duration = Duration::from_secs(10);
    pub const SUPPRESSION_TIMEOUT_NEW: Duration = Duration::from_secs(12);
    pub const SUPPRESSION_TIMEOUT_PROP: Duration = Duration::from_millis(11_500);
    pub const SUPPRESSION_TIMEOUT_END: Duration = Duration::from_millis(500);
    pub const SENSOR_UPDATE_INTERVAL: Duration = Duration::from_secs(7);
    pub const MAX_SEND: u8 = 1;
    pub const MAX_HOPS: u8 = 8;
    pub const CONTROLLER_MAX_DIFF: u32 = 10_000;
    pub const CONTROLLER_MAX_THRESHOLD: u32 = 50_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppression_prop_is_shorter_than_new() {
        let c = Config::default();
        assert!(c.suppression_timeout_prop < c.suppression_timeout_new);
    }

    #[test]
    fn unicast_channel_is_next_after_broadcast() {
        let c = Config::default();
        assert_eq!(c.unicast_channel(), c.broadcast_channel + 1);
    }
}
