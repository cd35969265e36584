#![forbid(unsafe_code)]

//! Playback clock: elapsed time, play/pause, and the pre-roll countdown.
//!
//! [`PlaybackClock`] is the only owner of mutable playback state. Everyone else
//! reads [`PlaybackState`] snapshots.
//!
//! # State machine
//!
//! ```text
//!   Idle ──start_countdown──▶ CountingDown ──(reaches 0)──▶ Playing ⇄ Paused
//!    ▲                                                         │        │
//!    └──────────────── reset / seek(0) while paused ───────────┴────────┘
//! ```
//!
//! # Invariants
//!
//! 1. `elapsed` is finite and stays in `[0, effective_max_seconds]`.
//! 2. [`PlaybackClock::tick`] never decreases `elapsed`, and a zero delta is a no-op.
//! 3. Only `tick` advances `elapsed` while playing; `seek` is the explicit jump.
//! 4. The countdown emits [`ClockEvent::CountdownFinished`] exactly once per run.
//! 5. Misuse (NaN, negative, infinite inputs) is clamped, never an error.

use serde::Serialize;

/// Slack when comparing accumulated countdown time against whole seconds.
const COUNTDOWN_EPSILON: f64 = 1e-9;

/// Lifecycle phase of the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ClockPhase {
    /// Not started, or rewound to the beginning.
    #[default]
    Idle,
    /// Pre-roll countdown in progress.
    CountingDown,
    /// Elapsed time advances on tick.
    Playing,
    /// Elapsed time frozen.
    Paused,
}

/// Transition notifications produced by the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockEvent {
    /// The countdown reached zero and playback started.
    CountdownFinished,
}

/// Immutable snapshot of playback state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Seconds of playback since the start of the document.
    pub elapsed_seconds: f64,
    /// Whether elapsed time is advancing.
    pub is_playing: bool,
    /// Whether the pre-roll countdown is running.
    pub is_counting_down: bool,
    /// Whole seconds left on the countdown (0 when not counting down).
    pub countdown_remaining: i32,
}

/// Upper bounds for elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockLimits {
    /// Configured talk duration in seconds, if any.
    pub timer_duration: Option<f64>,
    /// Overtime allowed past a configured duration.
    pub overtime_guard: f64,
    /// Ceiling used when no duration is configured.
    pub unbounded_ceiling: f64,
}

impl Default for ClockLimits {
    fn default() -> Self {
        Self {
            timer_duration: None,
            overtime_guard: 600.0,
            unbounded_ceiling: 24.0 * 60.0 * 60.0,
        }
    }
}

impl ClockLimits {
    /// Limits with a configured talk duration.
    #[must_use]
    pub fn with_duration(seconds: f64) -> Self {
        Self {
            timer_duration: Some(seconds),
            ..Self::default()
        }
    }

    /// The configured duration, ignoring non-finite or non-positive values.
    #[must_use]
    pub fn duration(&self) -> Option<f64> {
        self.timer_duration.filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Largest value `elapsed` may take.
    #[must_use]
    pub fn effective_max_seconds(&self) -> f64 {
        let guard = sanitize(self.overtime_guard);
        match self.duration() {
            Some(duration) => duration + guard,
            None => {
                let ceiling = sanitize(self.unbounded_ceiling);
                if ceiling > 0.0 { ceiling } else { guard }
            }
        }
    }
}

/// Replace NaN, infinities, and negatives with zero.
#[inline]
fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// The single writer of playback state.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    phase: ClockPhase,
    elapsed: f64,
    countdown_remaining: i32,
    countdown_accum: f64,
    limits: ClockLimits,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(ClockLimits::default())
    }
}

impl PlaybackClock {
    /// Create an idle clock at zero elapsed time.
    #[must_use]
    pub fn new(limits: ClockLimits) -> Self {
        Self {
            phase: ClockPhase::Idle,
            elapsed: 0.0,
            countdown_remaining: 0,
            countdown_accum: 0.0,
            limits,
        }
    }

    /// Current phase.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    /// Elapsed playback seconds.
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Configured limits.
    #[must_use]
    pub fn limits(&self) -> ClockLimits {
        self.limits
    }

    /// Largest value elapsed time may reach.
    #[must_use]
    pub fn effective_max_seconds(&self) -> f64 {
        self.limits.effective_max_seconds()
    }

    /// Whether elapsed time is advancing.
    #[inline]
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.phase == ClockPhase::Playing
    }

    /// Take a snapshot for readers.
    #[must_use]
    pub fn snapshot(&self) -> PlaybackState {
        PlaybackState {
            elapsed_seconds: self.elapsed,
            is_playing: self.phase == ClockPhase::Playing,
            is_counting_down: self.phase == ClockPhase::CountingDown,
            countdown_remaining: if self.phase == ClockPhase::CountingDown {
                self.countdown_remaining
            } else {
                0
            },
        }
    }

    /// Start (or resume) playback.
    ///
    /// No-op while counting down; the countdown hands over to playback itself.
    /// Returns `true` if the phase changed.
    pub fn play(&mut self) -> bool {
        match self.phase {
            ClockPhase::Idle | ClockPhase::Paused => {
                self.phase = ClockPhase::Playing;
                crate::debug!(elapsed = self.elapsed, "clock playing");
                true
            }
            ClockPhase::Playing | ClockPhase::CountingDown => false,
        }
    }

    /// Freeze playback.
    ///
    /// Pausing during the countdown abandons it. Returns `true` if the phase changed;
    /// a second consecutive call changes nothing.
    pub fn pause(&mut self) -> bool {
        match self.phase {
            ClockPhase::Playing => {
                self.phase = ClockPhase::Paused;
                crate::debug!(elapsed = self.elapsed, "clock paused");
                true
            }
            ClockPhase::CountingDown => {
                self.countdown_remaining = 0;
                self.countdown_accum = 0.0;
                self.phase = self.resting_phase();
                crate::debug!("countdown abandoned");
                true
            }
            ClockPhase::Idle | ClockPhase::Paused => false,
        }
    }

    /// Toggle between playing and paused. Returns `true` if the phase changed.
    pub fn toggle(&mut self) -> bool {
        if self.phase == ClockPhase::Playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Jump to `to_seconds`, clamped to `[0, effective_max_seconds]`.
    ///
    /// NaN is treated as zero. Seeking to zero while not playing returns the
    /// clock to `Idle`.
    pub fn seek(&mut self, to_seconds: f64) {
        let max = self.effective_max_seconds();
        let target = if to_seconds.is_nan() {
            0.0
        } else {
            to_seconds.clamp(0.0, max)
        };
        self.elapsed = target;
        if target == 0.0 && self.phase == ClockPhase::Paused {
            self.phase = ClockPhase::Idle;
        }
        crate::trace!(elapsed = self.elapsed, "clock seek");
    }

    /// Rewind to zero and stop. Cancels any countdown.
    pub fn reset(&mut self) {
        self.phase = ClockPhase::Idle;
        self.elapsed = 0.0;
        self.countdown_remaining = 0;
        self.countdown_accum = 0.0;
    }

    /// Begin the pre-roll countdown from `from_seconds`.
    ///
    /// A non-positive value skips straight to playing and returns the finish event.
    pub fn start_countdown(&mut self, from_seconds: i32) -> Option<ClockEvent> {
        self.countdown_accum = 0.0;
        if from_seconds <= 0 {
            self.countdown_remaining = 0;
            self.phase = ClockPhase::Playing;
            return Some(ClockEvent::CountdownFinished);
        }
        self.countdown_remaining = from_seconds;
        self.phase = ClockPhase::CountingDown;
        crate::debug!(from_seconds, "countdown started");
        None
    }

    /// Advance the clock by `delta_seconds`.
    ///
    /// While counting down, whole seconds are consumed from the countdown; the
    /// transition to playing discards any fractional remainder so playback starts
    /// at exactly the current elapsed time. While playing, elapsed time grows up to
    /// the effective maximum. Otherwise the tick is ignored.
    pub fn tick(&mut self, delta_seconds: f64) -> Option<ClockEvent> {
        let delta = sanitize(delta_seconds);
        match self.phase {
            ClockPhase::CountingDown => {
                self.countdown_accum += delta;
                while self.countdown_remaining > 0 && self.countdown_accum + COUNTDOWN_EPSILON >= 1.0
                {
                    self.countdown_accum -= 1.0;
                    self.countdown_remaining -= 1;
                }
                if self.countdown_remaining == 0 {
                    self.countdown_accum = 0.0;
                    self.phase = ClockPhase::Playing;
                    crate::debug!(elapsed = self.elapsed, "countdown finished");
                    Some(ClockEvent::CountdownFinished)
                } else {
                    None
                }
            }
            ClockPhase::Playing => {
                if delta > 0.0 {
                    self.elapsed = (self.elapsed + delta).min(self.effective_max_seconds());
                }
                None
            }
            ClockPhase::Idle | ClockPhase::Paused => None,
        }
    }

    /// Whole seconds left on the configured duration, if one is set.
    ///
    /// Negative once the talk runs over.
    #[must_use]
    pub fn remaining_seconds(&self) -> Option<i64> {
        self.limits
            .duration()
            .map(|duration| (duration - self.elapsed).ceil() as i64)
    }

    /// Text for the timer readout.
    ///
    /// The countdown shows its remaining whole seconds; with a configured duration
    /// the readout counts down (`-mm:ss` in overtime); otherwise it counts up.
    #[must_use]
    pub fn timer_text(&self) -> String {
        if self.phase == ClockPhase::CountingDown {
            return self.countdown_remaining.to_string();
        }
        match self.remaining_seconds() {
            Some(remaining) if remaining < 0 => format!("-{}", format_clock(-remaining as f64)),
            Some(remaining) => format_clock(remaining as f64),
            None => format_clock(self.elapsed),
        }
    }

    fn resting_phase(&self) -> ClockPhase {
        if self.elapsed > 0.0 {
            ClockPhase::Paused
        } else {
            ClockPhase::Idle
        }
    }
}

/// Fixed-width clock format: `"01:30:15"`, `"00:45"`.
///
/// Fractions are truncated; negative or non-finite input reads as zero.
#[must_use]
pub fn format_clock(seconds: f64) -> String {
    let total_secs = sanitize(seconds).floor() as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}
