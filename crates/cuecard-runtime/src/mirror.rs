#![forbid(unsafe_code)]

//! Mirror surface synchronization.
//!
//! The mirror is a secondary, independently rendered view (a floating
//! picture-in-picture window, for example) that shows the same playback as the
//! host surface. The only data crossing into it is an immutable
//! [`MirrorFrame`] per push.
//!
//! # Push discipline
//!
//! [`MirrorSynchronizer::push_frame`] never blocks its caller:
//! - pushes closer together than the configured interval are throttled
//! - a surface that is busy (or locked by a concurrent cleanup) drops the frame
//! - nothing is ever queued inside the synchronizer
//!
//! [`MirrorSynchronizer::cleanup`] always releases the surface. It waits for an
//! in-flight push to finish, then closes the surface, so a push racing with
//! cleanup either lands before the close or is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use cuecard_core::{PacingConfig, PlaybackClock, Size};
use cuecard_text::{CueDocument, current_word_index, highlight_progress};
use parking_lot::Mutex;
use serde::Serialize;
use web_time::Instant;

use crate::error::{EngineError, SurfaceError};
use crate::intent::IntentSender;

/// Render-state snapshot pushed to the mirror.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorFrame {
    /// Timer readout (`"02:15"`, `"-00:10"`, or the countdown digit).
    pub timer_text: String,
    /// Whole seconds left on the configured duration, if any.
    pub remaining_seconds: Option<i64>,
    /// Word being read.
    pub current_word_index: usize,
    /// Continuous highlight cursor; negative infinity before playback starts.
    pub highlight_progress: f64,
    /// Whether time is advancing.
    pub is_playing: bool,
    /// Whether the countdown is running.
    pub is_counting_down: bool,
}

impl MirrorFrame {
    /// Capture a frame from the current clock.
    #[must_use]
    pub fn capture(doc: &CueDocument, pacing: &PacingConfig, clock: &PlaybackClock) -> Self {
        let state = clock.snapshot();
        Self {
            timer_text: clock.timer_text(),
            remaining_seconds: clock.remaining_seconds(),
            current_word_index: current_word_index(doc, state.elapsed_seconds, pacing),
            highlight_progress: highlight_progress(doc, &state, pacing),
            is_playing: state.is_playing,
            is_counting_down: state.is_counting_down,
        }
    }

    /// JSON encoding for surfaces in another process.
    ///
    /// A non-finite `highlightProgress` encodes as `null`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Everything a platform needs to create a mirror surface.
#[derive(Debug, Clone)]
pub struct SurfaceSpec {
    /// Surface size: the configured aspect ratio fitted to the display.
    pub size: Size,
    /// Session pacing, for rendering the document on the mirror side.
    pub pacing: PacingConfig,
    /// The session document.
    pub document: Arc<CueDocument>,
    /// Configured talk duration, if any.
    pub timer_duration: Option<f64>,
    /// Dark palette.
    pub dark_mode: bool,
    /// Channel for the surface's controls.
    pub intents: IntentSender,
}

/// A secondary rendering surface.
pub trait MirrorSurface: Send {
    /// Show a frame. Must not block; return [`SurfaceError::Busy`] instead.
    fn present(&mut self, frame: &MirrorFrame) -> Result<(), SurfaceError>;

    /// Release the surface. Called exactly once.
    fn close(&mut self);
}

/// Platform support for mirror surfaces.
pub trait MirrorPlatform: Send {
    /// Whether this platform can show a mirror at all.
    fn supports_mirror(&self) -> bool;

    /// Bounds the surface must fit inside.
    fn display_bounds(&self) -> Size;

    /// Create a surface.
    fn open_surface(&mut self, spec: &SurfaceSpec) -> Result<Box<dyn MirrorSurface>, SurfaceError>;
}

/// What happened to a pushed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushOutcome {
    /// The surface accepted the frame.
    Presented,
    /// Too soon after the previous push; skipped.
    Throttled,
    /// The surface was busy or went away; discarded.
    Dropped,
    /// No surface is open.
    Inactive,
}

/// Push counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MirrorStats {
    /// Frames the surface accepted.
    pub presented: u64,
    /// Frames skipped by the rate limit.
    pub throttled: u64,
    /// Frames discarded because the surface was busy or went away.
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    presented: AtomicU64,
    throttled: AtomicU64,
    dropped: AtomicU64,
}

/// Scheduling jitter tolerated by the rate limiter.
const RATE_SLACK: Duration = Duration::from_millis(2);

/// Owns the mirror surface and rate-limits pushes to it.
///
/// Shared between the engine and the continuation clock thread.
pub struct MirrorSynchronizer {
    surface: Mutex<Option<Box<dyn MirrorSurface>>>,
    last_push: Mutex<Option<Instant>>,
    min_interval: Duration,
    preferred_width: u32,
    intents: IntentSender,
    closed_by_surface: AtomicBool,
    counters: Counters,
}

impl MirrorSynchronizer {
    /// A synchronizer with no surface.
    #[must_use]
    pub fn new(min_interval: Duration, preferred_width: u32, intents: IntentSender) -> Self {
        Self {
            surface: Mutex::new(None),
            last_push: Mutex::new(None),
            min_interval,
            preferred_width,
            intents,
            closed_by_surface: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Create the mirror surface for a session, replacing any existing one.
    ///
    /// The surface is sized from the pacing aspect ratio, clamped to the
    /// platform's display bounds.
    pub fn configure(
        &self,
        platform: &mut dyn MirrorPlatform,
        document: Arc<CueDocument>,
        pacing: PacingConfig,
        timer_duration: Option<f64>,
        dark_mode: bool,
    ) -> Result<Size, EngineError> {
        if !platform.supports_mirror() {
            return Err(EngineError::MirrorUnsupported);
        }
        self.cleanup();

        let size = pacing
            .aspect_ratio
            .fit(self.preferred_width, platform.display_bounds());
        let spec = SurfaceSpec {
            size,
            pacing,
            document,
            timer_duration,
            dark_mode,
            intents: self.intents.clone(),
        };
        let surface = platform.open_surface(&spec)?;

        *self.surface.lock() = Some(surface);
        *self.last_push.lock() = None;
        self.closed_by_surface.store(false, Ordering::Release);
        tracing::info!(width = size.width, height = size.height, dark_mode, "mirror surface opened");
        Ok(size)
    }

    /// Whether a surface is open.
    pub fn is_active(&self) -> bool {
        self.surface.lock().is_some()
    }

    /// Push a frame, rate-limited against the wall clock.
    pub fn push_frame(&self, frame: &MirrorFrame) -> PushOutcome {
        self.push_frame_at(frame, Instant::now())
    }

    /// Push a frame as of `now`.
    pub fn push_frame_at(&self, frame: &MirrorFrame, now: Instant) -> PushOutcome {
        let Some(mut last) = self.last_push.try_lock() else {
            return self.drop_frame();
        };
        if let Some(prev) = *last {
            if now.saturating_duration_since(prev) + RATE_SLACK < self.min_interval {
                self.counters.throttled.fetch_add(1, Ordering::Relaxed);
                return PushOutcome::Throttled;
            }
        }
        let outcome = self.present(frame);
        if outcome == PushOutcome::Presented {
            *last = Some(now);
        }
        outcome
    }

    /// Push a frame immediately, ignoring the rate limit.
    ///
    /// Used after state changes (play, pause, seek) so the mirror reflects them
    /// without waiting for the next tick.
    pub fn force_push(&self, frame: &MirrorFrame) -> PushOutcome {
        let outcome = self.present(frame);
        if outcome == PushOutcome::Presented {
            if let Some(mut last) = self.last_push.try_lock() {
                *last = Some(Instant::now());
            }
        }
        outcome
    }

    fn present(&self, frame: &MirrorFrame) -> PushOutcome {
        let Some(mut slot) = self.surface.try_lock() else {
            return self.drop_frame();
        };
        let Some(surface) = slot.as_mut() else {
            return PushOutcome::Inactive;
        };
        match surface.present(frame) {
            Ok(()) => {
                self.counters.presented.fetch_add(1, Ordering::Relaxed);
                PushOutcome::Presented
            }
            Err(SurfaceError::Busy) => self.drop_frame(),
            Err(err) => {
                tracing::info!(error = %err, "mirror surface went away");
                if let Some(mut gone) = slot.take() {
                    gone.close();
                }
                self.closed_by_surface.store(true, Ordering::Release);
                self.drop_frame()
            }
        }
    }

    fn drop_frame(&self) -> PushOutcome {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        crate::debug_trace!("mirror frame dropped");
        PushOutcome::Dropped
    }

    /// Whether the surface closed itself since the last call.
    pub fn take_closed(&self) -> bool {
        self.closed_by_surface.swap(false, Ordering::AcqRel)
    }

    /// Release the surface. Idempotent; returns whether one was open.
    pub fn cleanup(&self) -> bool {
        let surface = self.surface.lock().take();
        match surface {
            Some(mut s) => {
                s.close();
                tracing::info!("mirror surface closed");
                true
            }
            None => false,
        }
    }

    /// Push counters since creation.
    pub fn stats(&self) -> MirrorStats {
        MirrorStats {
            presented: self.counters.presented.load(Ordering::Relaxed),
            throttled: self.counters.throttled.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for MirrorSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorSynchronizer")
            .field("min_interval", &self.min_interval)
            .field("preferred_width", &self.preferred_width)
            .field("stats", &self.stats())
            .finish()
    }
}

// --- Built-in platforms ---

/// A platform without mirror support.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedPlatform;

impl MirrorPlatform for UnsupportedPlatform {
    fn supports_mirror(&self) -> bool {
        false
    }

    fn display_bounds(&self) -> Size {
        Size::default()
    }

    fn open_surface(&mut self, _spec: &SurfaceSpec) -> Result<Box<dyn MirrorSurface>, SurfaceError> {
        Err(SurfaceError::Denied("mirror not supported".into()))
    }
}

/// Number of channel surfaces currently open.
#[derive(Debug, Clone, Default)]
pub struct LiveSurfaces(Arc<AtomicUsize>);

impl LiveSurfaces {
    /// Current count.
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

/// The receiving side of a channel surface, held by whatever renders the mirror.
#[derive(Debug)]
pub struct MirrorEndpoint {
    /// Size the surface was created with.
    pub size: Size,
    /// Dark palette requested.
    pub dark_mode: bool,
    /// Frames, oldest first. Bounded; full means new frames are dropped.
    pub frames: mpsc::Receiver<MirrorFrame>,
    /// Controls back to the engine.
    pub intents: IntentSender,
    open: Arc<AtomicBool>,
}

impl MirrorEndpoint {
    /// Whether the engine still holds the surface open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Drain buffered frames and return the newest.
    pub fn latest(&self) -> Option<MirrorFrame> {
        self.frames.try_iter().last()
    }
}

/// Message-passing platform: each surface is a bounded channel of frames.
///
/// Opened surfaces are announced as [`MirrorEndpoint`]s on the receiver
/// returned by [`ChannelPlatform::new`]. Dropping an endpoint closes the
/// surface from the mirror side.
#[derive(Debug)]
pub struct ChannelPlatform {
    display: Size,
    capacity: usize,
    deny: Option<String>,
    live: LiveSurfaces,
    endpoints: mpsc::Sender<MirrorEndpoint>,
}

impl ChannelPlatform {
    /// A platform with the given display bounds and per-surface buffer.
    #[must_use]
    pub fn new(display: Size, capacity: usize) -> (Self, mpsc::Receiver<MirrorEndpoint>) {
        let (endpoints, rx) = mpsc::channel();
        let platform = Self {
            display,
            capacity: capacity.max(1),
            deny: None,
            live: LiveSurfaces::default(),
            endpoints,
        };
        (platform, rx)
    }

    /// Refuse every surface request with `reason` (builder).
    #[must_use]
    pub fn denying(mut self, reason: impl Into<String>) -> Self {
        self.deny = Some(reason.into());
        self
    }

    /// Live surface counter.
    pub fn live_surfaces(&self) -> LiveSurfaces {
        self.live.clone()
    }
}

impl MirrorPlatform for ChannelPlatform {
    fn supports_mirror(&self) -> bool {
        true
    }

    fn display_bounds(&self) -> Size {
        self.display
    }

    fn open_surface(&mut self, spec: &SurfaceSpec) -> Result<Box<dyn MirrorSurface>, SurfaceError> {
        if let Some(reason) = &self.deny {
            return Err(SurfaceError::Denied(reason.clone()));
        }
        let (tx, frames) = mpsc::sync_channel(self.capacity);
        let open = Arc::new(AtomicBool::new(true));
        let endpoint = MirrorEndpoint {
            size: spec.size,
            dark_mode: spec.dark_mode,
            frames,
            intents: spec.intents.clone(),
            open: open.clone(),
        };
        if self.endpoints.send(endpoint).is_err() {
            return Err(SurfaceError::Denied("no mirror host listening".into()));
        }
        self.live.0.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(ChannelSurface {
            tx,
            open,
            live: self.live.clone(),
        }))
    }
}

struct ChannelSurface {
    tx: mpsc::SyncSender<MirrorFrame>,
    open: Arc<AtomicBool>,
    live: LiveSurfaces,
}

impl MirrorSurface for ChannelSurface {
    fn present(&mut self, frame: &MirrorFrame) -> Result<(), SurfaceError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(SurfaceError::Closed);
        }
        match self.tx.try_send(frame.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::TrySendError::Full(_)) => Err(SurfaceError::Busy),
            Err(mpsc::TrySendError::Disconnected(_)) => Err(SurfaceError::Closed),
        }
    }

    fn close(&mut self) {
        if self.open.swap(false, Ordering::AcqRel) {
            self.live.0.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Drop for ChannelSurface {
    fn drop(&mut self) {
        self.close();
    }
}
