#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! [`EngineConfig`] carries the runtime knobs that are not part of a pacing
//! session: mirror cadence, continuation tick interval, countdown length and
//! the clock's safety bounds.
//!
//! # Environment overrides
//!
//! | Variable | Field | Accepted |
//! |----------|-------|----------|
//! | `CUECARD_MIRROR_HZ` | `mirror_hz` | integer, clamped to 15..=30 |
//! | `CUECARD_CONTINUATION_HZ` | `continuation_interval` | integer 1..=240 |
//! | `CUECARD_COUNTDOWN_SECS` | `countdown_seconds` | integer 0..=60 |
//!
//! Invalid values are logged and ignored.

use std::env;
use std::time::Duration;

use cuecard_core::ClockLimits;

pub const ENV_MIRROR_HZ: &str = "CUECARD_MIRROR_HZ";
pub const ENV_CONTINUATION_HZ: &str = "CUECARD_CONTINUATION_HZ";
pub const ENV_COUNTDOWN_SECS: &str = "CUECARD_COUNTDOWN_SECS";

/// Slowest accepted mirror push rate.
pub const MIN_MIRROR_HZ: u32 = 15;
/// Fastest accepted mirror push rate.
pub const MAX_MIRROR_HZ: u32 = 30;

/// Runtime configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Target mirror push rate; clamped to `15..=30` Hz when used.
    pub mirror_hz: u32,
    /// Fixed interval of the continuation clock. Each tick advances playback
    /// by exactly this much.
    pub continuation_interval: Duration,
    /// Countdown length used by [`Engine::start_countdown`](crate::Engine::start_countdown).
    pub countdown_seconds: i32,
    /// Extra seconds allowed past a configured timer duration.
    pub overtime_guard_seconds: f64,
    /// Elapsed-time ceiling when no timer duration is configured.
    pub unbounded_ceiling_seconds: f64,
    /// Preferred mirror surface width before clamping to the display.
    pub preferred_mirror_width: u32,
    /// Frames buffered by channel-backed surfaces before new ones are dropped.
    pub mirror_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let limits = ClockLimits::default();
        Self {
            mirror_hz: MAX_MIRROR_HZ,
            continuation_interval: Duration::from_secs(1) / 30,
            countdown_seconds: 3,
            overtime_guard_seconds: limits.overtime_guard,
            unbounded_ceiling_seconds: limits.unbounded_ceiling,
            preferred_mirror_width: 360,
            mirror_channel_capacity: 2,
        }
    }
}

impl EngineConfig {
    /// Default config with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Default config with overrides read through `get`.
    #[must_use]
    pub fn from_env_with<F>(mut get: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = get(ENV_MIRROR_HZ) {
            match value.trim().parse::<u32>() {
                Ok(hz) => config.mirror_hz = hz,
                Err(_) => tracing::warn!(var = ENV_MIRROR_HZ, %value, "ignoring invalid value"),
            }
        }

        if let Some(value) = get(ENV_CONTINUATION_HZ) {
            match value.trim().parse::<u32>() {
                Ok(hz @ 1..=240) => config.continuation_interval = Duration::from_secs(1) / hz,
                _ => tracing::warn!(var = ENV_CONTINUATION_HZ, %value, "ignoring invalid value"),
            }
        }

        if let Some(value) = get(ENV_COUNTDOWN_SECS) {
            match value.trim().parse::<i32>() {
                Ok(secs @ 0..=60) => config.countdown_seconds = secs,
                _ => tracing::warn!(var = ENV_COUNTDOWN_SECS, %value, "ignoring invalid value"),
            }
        }

        config
    }

    /// Set the mirror push rate (builder).
    #[must_use]
    pub fn with_mirror_hz(mut self, hz: u32) -> Self {
        self.mirror_hz = hz;
        self
    }

    /// Set the continuation tick interval (builder).
    #[must_use]
    pub fn with_continuation_interval(mut self, interval: Duration) -> Self {
        self.continuation_interval = interval;
        self
    }

    /// Set the countdown length (builder).
    #[must_use]
    pub fn with_countdown_seconds(mut self, seconds: i32) -> Self {
        self.countdown_seconds = seconds;
        self
    }

    /// Set the preferred mirror width (builder).
    #[must_use]
    pub fn with_preferred_mirror_width(mut self, width: u32) -> Self {
        self.preferred_mirror_width = width;
        self
    }

    /// Set the channel surface capacity (builder).
    #[must_use]
    pub fn with_mirror_channel_capacity(mut self, capacity: usize) -> Self {
        self.mirror_channel_capacity = capacity;
        self
    }

    /// Mirror push rate clamped into the accepted range.
    #[must_use]
    pub fn effective_mirror_hz(&self) -> u32 {
        self.mirror_hz.clamp(MIN_MIRROR_HZ, MAX_MIRROR_HZ)
    }

    /// Minimum spacing between two mirror pushes.
    #[must_use]
    pub fn mirror_interval(&self) -> Duration {
        Duration::from_secs(1) / self.effective_mirror_hz()
    }

    /// Continuation interval, never zero.
    #[must_use]
    pub fn effective_continuation_interval(&self) -> Duration {
        if self.continuation_interval.is_zero() {
            Self::default().continuation_interval
        } else {
            self.continuation_interval
        }
    }

    /// Clock bounds for a session with an optional timer duration.
    #[must_use]
    pub fn clock_limits(&self, timer_duration: Option<f64>) -> ClockLimits {
        ClockLimits {
            timer_duration,
            overtime_guard: self.overtime_guard_seconds,
            unbounded_ceiling: self.unbounded_ceiling_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl FnMut(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.effective_mirror_hz(), 30);
        assert_eq!(cfg.countdown_seconds, 3);
        assert_eq!(cfg.preferred_mirror_width, 360);
        assert_eq!(cfg.mirror_channel_capacity, 2);
        assert_eq!(cfg.overtime_guard_seconds, 600.0);
        assert_eq!(cfg.unbounded_ceiling_seconds, 86_400.0);
    }

    #[test]
    fn mirror_hz_is_clamped() {
        assert_eq!(EngineConfig::default().with_mirror_hz(5).effective_mirror_hz(), 15);
        assert_eq!(EngineConfig::default().with_mirror_hz(120).effective_mirror_hz(), 30);
        assert_eq!(
            EngineConfig::default().with_mirror_hz(20).mirror_interval(),
            Duration::from_millis(50)
        );
    }

    #[test]
    fn env_overrides() {
        let cfg = EngineConfig::from_env_with(env_of(&[
            (ENV_MIRROR_HZ, "20"),
            (ENV_CONTINUATION_HZ, "60"),
            (ENV_COUNTDOWN_SECS, "5"),
        ]));
        assert_eq!(cfg.mirror_hz, 20);
        assert_eq!(cfg.continuation_interval, Duration::from_secs(1) / 60);
        assert_eq!(cfg.countdown_seconds, 5);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let cfg = EngineConfig::from_env_with(env_of(&[
            (ENV_MIRROR_HZ, "fast"),
            (ENV_CONTINUATION_HZ, "0"),
            (ENV_COUNTDOWN_SECS, "-3"),
        ]));
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn zero_continuation_interval_falls_back() {
        let cfg = EngineConfig::default().with_continuation_interval(Duration::ZERO);
        assert_eq!(
            cfg.effective_continuation_interval(),
            EngineConfig::default().continuation_interval
        );
    }

    #[test]
    fn clock_limits_carry_bounds() {
        let limits = EngineConfig::default().clock_limits(Some(300.0));
        assert_eq!(limits.effective_max_seconds(), 900.0);
    }
}
