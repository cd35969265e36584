#![forbid(unsafe_code)]

//! CueCard Runtime
//!
//! Ties the pacing core and the cue text layer into a playback session with an
//! optional mirror surface.
//!
//! # Key Components
//!
//! - [`Engine`] - lifecycle state machine owning the document, clock, and mirror
//! - [`SharedClock`] - the playback clock behind a single-writer [`Authority`] token
//! - [`MirrorSynchronizer`] - rate-limited, non-blocking pushes of [`MirrorFrame`]s
//! - [`ContinuationClock`] - keeps playback advancing while the host is suspended
//! - [`Ticker`] - fixed-interval background tick source
//! - [`SlideTracker`] - note-extraction ingest with per-slide caching
//!
//! # Threads
//!
//! Everything runs on the host's thread while the host is in the foreground.
//! While it is suspended with the mirror open, an intent relay thread applies
//! mirror controls, and a ticker thread advances playback whenever it is
//! playing or counting down. Pausing, resuming the host, and cleanup all join
//! the threads they stop before returning.

pub mod config;
pub mod continuation;
pub mod debug_trace;
pub mod error;
pub mod ingest;
pub mod intent;
pub mod lifecycle;
pub mod mirror;
pub mod shared_clock;
pub mod subscription;

pub use config::EngineConfig;
pub use continuation::ContinuationClock;
pub use error::{EngineError, EngineResult, SurfaceError};
pub use ingest::{IngestError, SlideNotes, SlideTracker, SlideUpdate};
pub use intent::{IntentSender, MirrorIntent};
pub use lifecycle::{Engine, EngineEvent, LifecycleState, PrimaryFrame};
pub use mirror::{
    ChannelPlatform, LiveSurfaces, MirrorEndpoint, MirrorFrame, MirrorPlatform, MirrorStats,
    MirrorSurface, MirrorSynchronizer, PushOutcome, SurfaceSpec, UnsupportedPlatform,
};
pub use shared_clock::{Authority, SharedClock, TickOutcome};
pub use subscription::{RunningTicker, StopSignal, SubId, Ticker};
