#![forbid(unsafe_code)]

//! The lifecycle state machine and the engine that owns a playback session.
//!
//! # States
//!
//! ```text
//! Unconfigured ──configure──▶ Configured ──start_countdown──▶ CountingDown ──▶ Playing ⇄ Paused
//!       ▲                                                                        │
//!       └───────────────────────────────── cleanup ──────────────────────────────┘
//! ```
//!
//! `MirrorActive` is orthogonal: it can be entered and left in any configured
//! state. Re-configuring performs a full [`Engine::cleanup`] first.
//!
//! # Clock authority
//!
//! The host calls [`Engine::tick`] from its own frame scheduling. When the host
//! reports [`Engine::host_suspended`] while the mirror is active, the token
//! moves to the continuation side, which ticks a [`ContinuationClock`] thread
//! whenever playback is advancing. [`Engine::host_resumed`] joins it before
//! handing the token back, so the host resumes from exactly the elapsed time the
//! continuation clock reached.
//!
//! # Intents
//!
//! Mirror controls never mutate playback directly. They queue [`MirrorIntent`]s.
//! The host applies them by calling [`Engine::pump`] from its main loop; while
//! it is suspended, a relay thread applies them as they arrive and reports them
//! through the next `pump`.

use std::sync::Arc;
use std::sync::mpsc;

use cuecard_core::{ClockEvent, ClockLimits, ClockPhase, PacingConfig, PlaybackState, Size};
use cuecard_text::{
    CueDocument, LayoutMap, TokenView, current_word_index, highlight_progress, parse,
    project_tokens, scroll_target,
};
use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::continuation::{ContinuationClock, Suspension};
use crate::error::{EngineError, EngineResult};
use crate::intent::{Inbox, IntentSender, MirrorIntent, intent_channel};
use crate::mirror::{
    MirrorFrame, MirrorPlatform, MirrorStats, MirrorSynchronizer, PushOutcome, UnsupportedPlatform,
};
use crate::shared_clock::{Authority, ClockCommand, SharedClock, TickOutcome};

/// Coarse lifecycle state, derived from the session and the clock phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No document loaded.
    Unconfigured,
    /// Document loaded, playback not started (or rewound).
    Configured,
    /// Pre-roll countdown running.
    CountingDown,
    /// Playback advancing.
    Playing,
    /// Playback frozen.
    Paused,
}

/// Notifications returned by [`Engine::pump`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The countdown finished on the continuation clock.
    CountdownFinished,
    /// A mirror intent was applied, by `pump` or by the relay while suspended.
    IntentApplied(MirrorIntent),
    /// The mirror asked to return to the host surface; the mirror is closed.
    ExpandToHost,
    /// The mirror surface closed, by the user or the platform.
    MirrorClosed,
    /// The platform could not provide a mirror surface. Reported once per session.
    SurfaceFailed(String),
}

/// Per-frame projection for the host surface.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryFrame<'a> {
    /// Display tokens with highlight alpha.
    pub tokens: Vec<TokenView<'a>>,
    /// Timer readout.
    pub timer_text: String,
    /// Vertical scroll offset.
    pub scroll_offset: f32,
    /// Word being read.
    pub current_word_index: usize,
    /// Lifecycle state when the frame was taken.
    pub state: LifecycleState,
}

#[derive(Debug)]
struct Session {
    document: Arc<CueDocument>,
    pacing: PacingConfig,
    timer_duration: Option<f64>,
    surface_failure_reported: bool,
}

/// Owns a playback session: document, clock, mirror, and tick sources.
pub struct Engine {
    config: EngineConfig,
    platform: Box<dyn MirrorPlatform>,
    session: Option<Session>,
    clock: Arc<SharedClock>,
    mirror: Arc<MirrorSynchronizer>,
    suspension: Option<Suspension>,
    host_suspended: bool,
    intents_tx: IntentSender,
    inbox: Arc<Mutex<mpsc::Receiver<Inbox>>>,
    events_tx: mpsc::Sender<EngineEvent>,
    events_rx: mpsc::Receiver<EngineEvent>,
}

impl Engine {
    /// Create an unconfigured engine on `platform`.
    pub fn new(config: EngineConfig, platform: impl MirrorPlatform + 'static) -> Self {
        let (intents_tx, inbox) = intent_channel();
        let (events_tx, events_rx) = mpsc::channel();
        let mirror = MirrorSynchronizer::new(
            config.mirror_interval(),
            config.preferred_mirror_width,
            intents_tx.clone(),
        );
        Self {
            clock: Arc::new(SharedClock::new(config.clock_limits(None))),
            config,
            platform: Box::new(platform),
            session: None,
            mirror: Arc::new(mirror),
            suspension: None,
            host_suspended: false,
            intents_tx,
            inbox: Arc::new(Mutex::new(inbox)),
            events_tx,
            events_rx,
        }
    }

    /// An engine without mirror support.
    pub fn headless(config: EngineConfig) -> Self {
        Self::new(config, UnsupportedPlatform)
    }

    // --- Session ---

    /// Load a document and start a fresh session.
    ///
    /// Any previous session is cleaned up first: its mirror surface is closed
    /// and its continuation clock joined.
    pub fn configure(&mut self, raw: &str, pacing: PacingConfig, timer_duration: Option<f64>) {
        self.cleanup();
        let document = Arc::new(parse(raw, &pacing));
        self.clock = Arc::new(SharedClock::new(self.config.clock_limits(timer_duration)));
        tracing::info!(
            total_words = document.total_words(),
            timed = document.has_time_markers(),
            ?timer_duration,
            "engine configured"
        );
        self.session = Some(Session {
            document,
            pacing,
            timer_duration,
            surface_failure_reported: false,
        });
    }

    /// Tear down the session. Idempotent.
    ///
    /// Stops the continuation clock and intent relay (joining their threads),
    /// closes the mirror surface, and returns to `Unconfigured`.
    pub fn cleanup(&mut self) {
        let had_ticker = self.stop_continuation();
        let had_surface = self.mirror.cleanup();
        let had_session = self.session.take().is_some();
        self.clock = Arc::new(SharedClock::new(self.config.clock_limits(None)));
        self.host_suspended = false;
        if let Some(inbox) = self.inbox.try_lock() {
            while inbox.try_recv().is_ok() {}
        }
        while self.events_rx.try_recv().is_ok() {}
        if had_ticker || had_surface || had_session {
            tracing::info!(had_ticker, had_surface, "engine cleaned up");
        }
    }

    // --- Playback commands ---

    /// Start the countdown with the configured length.
    pub fn start_countdown(&mut self) -> EngineResult<()> {
        self.start_countdown_from(self.config.countdown_seconds)
    }

    /// Start the countdown from `seconds`. Zero or less starts playing at once.
    pub fn start_countdown_from(&mut self, seconds: i32) -> EngineResult<()> {
        self.session()?;
        self.run(ClockCommand::Countdown(seconds));
        Ok(())
    }

    /// Start or resume playback. Returns whether the state changed.
    pub fn play(&mut self) -> EngineResult<bool> {
        self.session()?;
        Ok(self.run(ClockCommand::Play))
    }

    /// Pause playback, abandoning a running countdown. Returns whether the state changed.
    ///
    /// While the host is suspended this also joins the continuation clock
    /// before returning.
    pub fn pause(&mut self) -> EngineResult<bool> {
        self.session()?;
        Ok(self.run(ClockCommand::Pause))
    }

    /// Toggle play/pause. During the countdown this pauses.
    pub fn toggle(&mut self) -> EngineResult<bool> {
        self.session()?;
        Ok(self.run(ClockCommand::Toggle))
    }

    /// Rewind to the start and run the countdown again.
    pub fn restart(&mut self) -> EngineResult<()> {
        self.session()?;
        self.run(ClockCommand::Restart(self.config.countdown_seconds));
        Ok(())
    }

    /// Jump to `seconds` (clamped).
    pub fn seek(&mut self, seconds: f64) -> EngineResult<()> {
        self.session()?;
        self.run(ClockCommand::Seek(seconds));
        Ok(())
    }

    /// Advance playback from the host's frame scheduling.
    ///
    /// Ignored while the continuation clock holds the token.
    pub fn tick(&mut self, delta_seconds: f64) -> Option<ClockEvent> {
        if self.session.is_none() {
            return None;
        }
        match self.clock.tick_as(Authority::Primary, delta_seconds) {
            TickOutcome::Applied(event) => {
                if event.is_some() {
                    self.sync_mirror();
                } else if self.mirror.is_active() {
                    if let Ok(frame) = self.mirror_frame() {
                        self.mirror.push_frame(&frame);
                    }
                }
                event
            }
            TickOutcome::NotHolder => None,
        }
    }

    fn run(&self, command: ClockCommand) -> bool {
        let changed = self.clock.apply(command);
        if changed {
            tracing::debug!(?command, state = ?self.state(), "playback command");
            if let Some(suspension) = &self.suspension {
                suspension.reconcile();
            }
            self.sync_mirror();
        }
        changed
    }

    // --- Mirror ---

    /// Open the mirror surface.
    ///
    /// Fails with [`EngineError::MirrorUnsupported`] when the platform has no
    /// mirror support, leaving the engine unchanged. A platform refusal is
    /// logged and reported as an event once per session; the host surface keeps
    /// working either way.
    pub fn enter_mirror(&mut self) -> EngineResult<Size> {
        let session = self.session()?;
        let document = session.document.clone();
        let pacing = session.pacing;
        let duration = session.timer_duration;
        if !self.platform.supports_mirror() {
            return Err(EngineError::MirrorUnsupported);
        }
        self.stop_continuation();

        let opened = self.mirror.configure(
            self.platform.as_mut(),
            document,
            pacing,
            duration,
            pacing.dark_mode,
        );
        let size = match opened {
            Ok(size) => size,
            Err(err) => {
                self.report_surface_failure(&err);
                return Err(err);
            }
        };
        self.sync_mirror();
        if self.host_suspended {
            self.start_continuation();
        }
        Ok(size)
    }

    /// Close the mirror surface. Returns whether one was open.
    pub fn exit_mirror(&mut self) -> bool {
        self.stop_continuation();
        self.mirror.cleanup()
    }

    /// Whether the mirror surface is open.
    pub fn is_mirror_active(&self) -> bool {
        self.mirror.is_active()
    }

    /// Push the current frame to the mirror, ignoring the rate limit.
    pub fn sync_mirror(&self) -> PushOutcome {
        match self.mirror_frame() {
            Ok(frame) => self.mirror.force_push(&frame),
            Err(_) => PushOutcome::Inactive,
        }
    }

    /// Frame for the mirror as of now.
    pub fn mirror_frame(&self) -> EngineResult<MirrorFrame> {
        let session = self.session()?;
        Ok(self
            .clock
            .read(|c| MirrorFrame::capture(&session.document, &session.pacing, c)))
    }

    fn report_surface_failure(&mut self, err: &EngineError) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.surface_failure_reported {
            tracing::debug!(error = %err, "mirror surface unavailable (already reported)");
            return;
        }
        session.surface_failure_reported = true;
        tracing::warn!(error = %err, "mirror surface unavailable; continuing on host surface");
        let _ = self.events_tx.send(EngineEvent::SurfaceFailed(err.to_string()));
    }

    // --- Host lifecycle ---

    /// The host surface stopped receiving frames.
    ///
    /// With the mirror active, the continuation clock takes over ticking.
    pub fn host_suspended(&mut self) {
        self.host_suspended = true;
        if self.mirror.is_active() {
            self.start_continuation();
        }
    }

    /// The host surface is receiving frames again.
    ///
    /// Returns after the continuation clock has stopped; the host's next
    /// [`Engine::tick`] continues from where it left off.
    pub fn host_resumed(&mut self) {
        self.host_suspended = false;
        self.stop_continuation();
    }

    /// Whether the host is suspended.
    pub fn is_host_suspended(&self) -> bool {
        self.host_suspended
    }

    fn start_continuation(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if self.suspension.is_some() {
            return;
        }
        let source = ContinuationClock::new(
            self.clock.clone(),
            self.mirror.clone(),
            session.document.clone(),
            session.pacing,
            self.config.effective_continuation_interval(),
            self.events_tx.clone(),
        );
        self.clock.transfer(Authority::Continuation);
        self.suspension = Some(Suspension::start(
            source,
            self.config.countdown_seconds,
            self.inbox.clone(),
            self.intents_tx.clone(),
        ));
        tracing::info!("continuation took over from host");
    }

    fn stop_continuation(&mut self) -> bool {
        let Some(suspension) = self.suspension.take() else {
            return false;
        };
        suspension.stop();
        self.clock.transfer(Authority::Primary);
        tracing::info!(elapsed = self.clock.snapshot().elapsed_seconds, "continuation handed back");
        true
    }

    /// Whether a continuation clock thread is ticking.
    ///
    /// `false` while suspended but paused: the tick thread only runs while
    /// playback is advancing.
    pub fn continuation_running(&self) -> bool {
        self.suspension.as_ref().is_some_and(Suspension::is_ticking)
    }

    // --- Intents ---

    /// Apply queued mirror intents and collect notifications.
    ///
    /// Call from the host's main loop.
    pub fn pump(&mut self) -> Vec<EngineEvent> {
        let mut events: Vec<EngineEvent> = self.events_rx.try_iter().collect();

        if self.mirror.take_closed() {
            self.stop_continuation();
            events.push(EngineEvent::MirrorClosed);
        }

        // Held by the relay while the host is suspended.
        let intents: Vec<MirrorIntent> = match self.inbox.try_lock() {
            Some(inbox) => inbox.try_iter().filter_map(Inbox::intent).collect(),
            None => Vec::new(),
        };
        for intent in intents {
            if let Some(event) = self.apply_intent(intent) {
                events.push(event);
            }
        }
        events
    }

    fn apply_intent(&mut self, intent: MirrorIntent) -> Option<EngineEvent> {
        if self.session.is_none() {
            tracing::debug!(?intent, "intent ignored: not configured");
            return None;
        }
        tracing::debug!(?intent, "applying mirror intent");
        match ClockCommand::from_intent(intent, self.config.countdown_seconds) {
            Some(command) => {
                self.run(command);
                Some(EngineEvent::IntentApplied(intent))
            }
            None if intent == MirrorIntent::ExpandToHost => {
                self.exit_mirror();
                Some(EngineEvent::ExpandToHost)
            }
            None => self.exit_mirror().then_some(EngineEvent::MirrorClosed),
        }
    }

    /// Sender for mirror controls, for hosts that render the mirror themselves.
    pub fn intent_sender(&self) -> IntentSender {
        self.intents_tx.clone()
    }

    // --- Reads ---

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        if self.session.is_none() {
            return LifecycleState::Unconfigured;
        }
        match self.clock.read(|c| c.phase()) {
            ClockPhase::Idle => LifecycleState::Configured,
            ClockPhase::CountingDown => LifecycleState::CountingDown,
            ClockPhase::Playing => LifecycleState::Playing,
            ClockPhase::Paused => LifecycleState::Paused,
        }
    }

    /// Playback snapshot.
    pub fn playback(&self) -> PlaybackState {
        self.clock.snapshot()
    }

    /// Timer readout.
    pub fn timer_text(&self) -> String {
        self.clock.read(|c| c.timer_text())
    }

    /// Clock bounds of the current session.
    pub fn clock_limits(&self) -> ClockLimits {
        self.clock.read(|c| c.limits())
    }

    /// Current clock authority.
    pub fn authority(&self) -> Authority {
        self.clock.authority()
    }

    /// The loaded document.
    pub fn document(&self) -> Option<&Arc<CueDocument>> {
        self.session.as_ref().map(|s| &s.document)
    }

    /// Session pacing.
    pub fn pacing(&self) -> Option<&PacingConfig> {
        self.session.as_ref().map(|s| &s.pacing)
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mirror push counters.
    pub fn mirror_stats(&self) -> MirrorStats {
        self.mirror.stats()
    }

    /// Projection for the host surface.
    pub fn primary_frame(
        &self,
        layout: &LayoutMap,
        viewport_height: f32,
    ) -> EngineResult<PrimaryFrame<'_>> {
        let session = self.session()?;
        let doc = session.document.as_ref();
        let (state, timer_text) = self.clock.read(|c| (c.snapshot(), c.timer_text()));
        let index = current_word_index(doc, state.elapsed_seconds, &session.pacing);
        let progress = highlight_progress(doc, &state, &session.pacing);
        Ok(PrimaryFrame {
            tokens: project_tokens(doc, progress),
            timer_text,
            scroll_offset: scroll_target(layout, index, viewport_height),
            current_word_index: index,
            state: self.state(),
        })
    }

    fn session(&self) -> EngineResult<&Session> {
        self.session.as_ref().ok_or(EngineError::NotConfigured)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state())
            .field("mirror_active", &self.is_mirror_active())
            .field("host_suspended", &self.host_suspended)
            .field("authority", &self.authority())
            .finish()
    }
}
