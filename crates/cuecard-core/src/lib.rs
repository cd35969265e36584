#![forbid(unsafe_code)]

//! Core: pacing configuration, the playback clock, and easing primitives.
//!
//! This crate has no knowledge of text or surfaces. It owns the two pieces of
//! state every other layer reads:
//!
//! - [`PacingConfig`] - immutable per-session pacing and presentation settings
//! - [`PlaybackClock`] - the single mutable timeline (elapsed time, play/pause,
//!   countdown), observed by everyone else through [`PlaybackState`] snapshots

pub mod animation;
pub mod clock;
pub mod geometry;
pub mod logging;
pub mod pacing;

pub use animation::{HIGHLIGHT_FLOOR_ALPHA, HIGHLIGHT_WINDOW_WORDS, highlight_alpha, smoothstep};
pub use clock::{ClockEvent, ClockLimits, ClockPhase, PlaybackClock, PlaybackState, format_clock};
pub use geometry::Size;
pub use pacing::{AspectRatio, NotePacing, PacingConfig};

#[cfg(feature = "tracing")]
pub use logging::{debug, info, trace, warn};
