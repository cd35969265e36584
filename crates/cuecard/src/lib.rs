#![forbid(unsafe_code)]

//! CueCard public facade crate.
//!
//! Re-exports the engine, the cue text layer, and the pacing core behind one
//! dependency, with a prelude for hosts.
//!
//! # Example
//! ```
//! use cuecard::prelude::*;
//!
//! let mut engine = Engine::headless(EngineConfig::default());
//! engine.configure("Hello world\n\n[time 00:10]\nSecond line here", PacingConfig::new(120), None);
//! engine.start_countdown_from(0)?;
//! engine.tick(5.0);
//!
//! let layout = LayoutMap::estimate(engine.document().unwrap(), 16.0, 480.0);
//! let frame = engine.primary_frame(&layout, 200.0)?;
//! assert_eq!(frame.current_word_index, 1);
//! assert_eq!(frame.timer_text, "00:05");
//! # Ok::<(), cuecard::Error>(())
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use cuecard_core::{
    AspectRatio, ClockEvent, ClockLimits, ClockPhase, NotePacing, PacingConfig, PlaybackClock,
    PlaybackState, Size, format_clock,
};

// --- Text re-exports -------------------------------------------------------

pub use cuecard_text::{
    CueDocument, LayoutMap, PacingSpan, Segment, TimingSummary, TokenKind, TokenView,
    current_word_index, highlight_progress, parse, project_tokens, scroll_speed, scroll_target,
    word_alphas,
};

// --- Runtime re-exports ----------------------------------------------------

pub use cuecard_runtime::{
    Authority, ChannelPlatform, Engine, EngineConfig, EngineError, EngineEvent, IngestError,
    LifecycleState, MirrorEndpoint, MirrorFrame, MirrorIntent, MirrorPlatform, MirrorSurface,
    PrimaryFrame, PushOutcome, SlideNotes, SlideTracker, SurfaceError, SurfaceSpec,
    UnsupportedPlatform,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for CueCard hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Engine lifecycle or mirror failure.
    Engine(EngineError),
    /// Mirror surface failure.
    Surface(SurfaceError),
    /// Slide notes could not be used.
    Ingest(IngestError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(err) => write!(f, "{err}"),
            Self::Surface(err) => write!(f, "{err}"),
            Self::Ingest(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            Self::Surface(err) => Some(err),
            Self::Ingest(err) => Some(err),
        }
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl From<SurfaceError> for Error {
    fn from(err: SurfaceError) -> Self {
        Self::Surface(err)
    }
}

impl From<IngestError> for Error {
    fn from(err: IngestError) -> Self {
        Self::Ingest(err)
    }
}

/// Standard result type for CueCard APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Logging --------------------------------------------------------------

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG`.
///
/// For hosts that do not install their own. Defaults to `info` when
/// `RUST_LOG` is unset; a second call is a no-op.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(feature = "tracing-json")]
pub use cuecard_core::logging::init_json_logging;

/// Load a slide's notes into `engine`.
///
/// Leaves the current session untouched when the slide has no notes.
pub fn load_slide(
    engine: &mut Engine,
    tracker: &mut SlideTracker,
    slide: SlideNotes,
    pacing: PacingConfig,
    timer_duration: Option<f64>,
) -> Result<()> {
    let update = tracker.observe(slide);
    let text = update.text()?;
    engine.configure(text, pacing, timer_duration);
    Ok(())
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        AspectRatio, ChannelPlatform, CueDocument, Engine, EngineConfig, EngineEvent, Error,
        LayoutMap, LifecycleState, MirrorFrame, MirrorIntent, NotePacing, PacingConfig,
        PlaybackState, Result, Size, SlideNotes, SlideTracker,
    };

    pub use crate::{core, runtime, text};
}

pub use cuecard_core as core;
pub use cuecard_runtime as runtime;
pub use cuecard_text as text;
