#![forbid(unsafe_code)]

//! Continuation clock: keeps playback advancing while the host is suspended.
//!
//! When the host surface stops receiving frames (backgrounded, minimized,
//! screen off) the mirror may still be visible. A [`Suspension`] takes the
//! [`Authority`] token for that stretch and runs two threads:
//!
//! 1. An intent relay that blocks on the intent channel and applies each
//!    [`MirrorIntent`] under the clock lock, the same way [`Engine::pump`] would
//! 2. A [`ContinuationClock`] ticker, running only while the clock is playing or
//!    counting down. Pausing joins it; resuming starts a new one
//!
//! Each tick advances playback by exactly one interval, independent of the
//! wall time between wakeups, so `n` ticks always add `n * interval` seconds.
//! A close or expand intent ends both threads and closes the mirror surface.
//!
//! [`Engine::pump`]: crate::Engine::pump

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use cuecard_core::{ClockEvent, PacingConfig};
use cuecard_text::CueDocument;
use parking_lot::Mutex;

use crate::intent::{Inbox, IntentSender, MirrorIntent};
use crate::lifecycle::EngineEvent;
use crate::mirror::{MirrorFrame, MirrorSynchronizer, PushOutcome};
use crate::shared_clock::{Authority, ClockCommand, SharedClock, TickOutcome};
use crate::subscription::{RunningTicker, Ticker};

/// Ticker id for continuation clocks.
const CONTINUATION_TICKER_ID: u64 = 0x434F_4E54;

/// A tick source that drives playback and the mirror while the host is away.
#[derive(Clone)]
pub struct ContinuationClock {
    clock: Arc<SharedClock>,
    mirror: Arc<MirrorSynchronizer>,
    document: Arc<CueDocument>,
    pacing: PacingConfig,
    interval: Duration,
    events: mpsc::Sender<EngineEvent>,
}

impl ContinuationClock {
    pub(crate) fn new(
        clock: Arc<SharedClock>,
        mirror: Arc<MirrorSynchronizer>,
        document: Arc<CueDocument>,
        pacing: PacingConfig,
        interval: Duration,
        events: mpsc::Sender<EngineEvent>,
    ) -> Self {
        Self {
            clock,
            mirror,
            document,
            pacing,
            interval,
            events,
        }
    }

    /// Fixed tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one tick: advance the clock and push a frame.
    ///
    /// Returns `None` once the token has moved elsewhere.
    pub fn tick_once(&self) -> Option<PushOutcome> {
        let dt = self.interval.as_secs_f64();
        match self.clock.tick_as(Authority::Continuation, dt) {
            TickOutcome::NotHolder => return None,
            TickOutcome::Applied(Some(ClockEvent::CountdownFinished)) => {
                let _ = self.events.send(EngineEvent::CountdownFinished);
            }
            TickOutcome::Applied(None) => {}
        }
        Some(self.mirror.push_frame(&self.frame()))
    }

    fn frame(&self) -> MirrorFrame {
        self.clock
            .read(|clock| MirrorFrame::capture(&self.document, &self.pacing, clock))
    }

    /// Spawn the tick thread.
    ///
    /// The thread exits on its own if it finds it no longer holds the token, or
    /// once the mirror surface is gone.
    pub fn start(self) -> RunningTicker {
        tracing::debug!(interval_us = self.interval.as_micros() as u64, "continuation clock starting");
        Ticker::with_id(CONTINUATION_TICKER_ID, self.interval).start(move |n| {
            match self.tick_once() {
                Some(PushOutcome::Inactive) => {
                    tracing::debug!(ticks = n, "continuation clock lost its mirror");
                    ControlFlow::Break(())
                }
                Some(outcome) => {
                    crate::debug_trace!("continuation tick {}: {:?}", n, outcome);
                    ControlFlow::Continue(())
                }
                None => {
                    tracing::debug!(ticks = n, "continuation clock lost authority");
                    ControlFlow::Break(())
                }
            }
        })
    }
}

impl std::fmt::Debug for ContinuationClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinuationClock")
            .field("interval", &self.interval)
            .field("authority", &self.clock.authority())
            .finish()
    }
}

/// State shared by the relay thread and the engine during a suspension.
struct Takeover {
    source: ContinuationClock,
    countdown_seconds: i32,
    ticker: Mutex<Option<RunningTicker>>,
}

impl Takeover {
    /// Start the ticker while the clock advances and the mirror is up; join it
    /// otherwise.
    fn reconcile(&self) {
        let mut ticker = self.ticker.lock();
        let wanted = self.source.mirror.is_active() && self.source.clock.is_advancing();
        let running = ticker.as_ref().is_some_and(RunningTicker::is_running);
        if wanted && !running {
            if let Some(finished) = ticker.take() {
                finished.stop();
            }
            *ticker = Some(self.source.clone().start());
            tracing::info!("continuation clock started");
        } else if !wanted && let Some(live) = ticker.take() {
            live.stop();
            tracing::info!(
                elapsed = self.source.clock.snapshot().elapsed_seconds,
                "continuation clock stopped"
            );
        }
    }

    fn halt_ticker(&self) -> bool {
        let stopped = self.ticker.lock().take();
        stopped.map(RunningTicker::stop).is_some()
    }

    fn is_ticking(&self) -> bool {
        self.ticker.lock().as_ref().is_some_and(RunningTicker::is_running)
    }

    fn apply(&self, intent: MirrorIntent) -> ControlFlow<()> {
        tracing::debug!(?intent, "applying mirror intent on the relay");
        let Some(command) = ClockCommand::from_intent(intent, self.countdown_seconds) else {
            self.halt_ticker();
            let closed = self.source.mirror.cleanup();
            let event = match intent {
                MirrorIntent::ExpandToHost => Some(EngineEvent::ExpandToHost),
                _ => closed.then_some(EngineEvent::MirrorClosed),
            };
            if let Some(event) = event {
                let _ = self.source.events.send(event);
            }
            return ControlFlow::Break(());
        };
        self.source.clock.apply(command);
        self.reconcile();
        self.source.mirror.force_push(&self.source.frame());
        let _ = self.source.events.send(EngineEvent::IntentApplied(intent));
        ControlFlow::Continue(())
    }
}

fn relay(takeover: &Takeover, inbox: &Mutex<mpsc::Receiver<Inbox>>, stop: &AtomicBool) {
    let rx = inbox.lock();
    while let Ok(message) = rx.recv() {
        match message {
            Inbox::Intent(intent) => {
                if takeover.apply(intent).is_break() {
                    break;
                }
            }
            Inbox::Wake if stop.load(Ordering::Acquire) => break,
            Inbox::Wake => {}
        }
    }
    tracing::debug!("intent relay finished");
}

/// Owns the threads that stand in for the host while it is suspended.
///
/// Dropping it stops the relay and the ticker and joins both.
pub(crate) struct Suspension {
    takeover: Arc<Takeover>,
    stop: Arc<AtomicBool>,
    wake: IntentSender,
    relay: Option<thread::JoinHandle<()>>,
}

impl Suspension {
    /// Spawn the relay over `inbox` and start ticking if playback is advancing.
    ///
    /// The caller must already have moved the token to
    /// [`Authority::Continuation`].
    pub(crate) fn start(
        source: ContinuationClock,
        countdown_seconds: i32,
        inbox: Arc<Mutex<mpsc::Receiver<Inbox>>>,
        wake: IntentSender,
    ) -> Self {
        let takeover = Arc::new(Takeover {
            source,
            countdown_seconds,
            ticker: Mutex::new(None),
        });
        let stop = Arc::new(AtomicBool::new(false));
        let spawned = {
            let takeover = takeover.clone();
            let stop = stop.clone();
            thread::Builder::new()
                .name("cuecard-intent-relay".into())
                .spawn(move || relay(&takeover, &inbox, &stop))
        };
        let relay = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(error = %err, "intent relay spawn failed; intents wait for pump");
                None
            }
        };
        takeover.reconcile();
        Self {
            takeover,
            stop,
            wake,
            relay,
        }
    }

    /// Bring the ticker in line with the clock phase after a host command.
    pub(crate) fn reconcile(&self) {
        self.takeover.reconcile();
    }

    /// Whether the continuation ticker thread is running.
    pub(crate) fn is_ticking(&self) -> bool {
        self.takeover.is_ticking()
    }

    /// Stop the relay and the ticker, joining both.
    pub(crate) fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.relay.take() {
            self.wake.wake();
            if handle.join().is_err() {
                tracing::warn!("intent relay panicked");
            }
        }
        self.takeover.halt_ticker();
    }
}

impl Drop for Suspension {
    fn drop(&mut self) {
        self.halt();
    }
}

impl std::fmt::Debug for Suspension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suspension")
            .field("ticking", &self.is_ticking())
            .field("relay", &self.relay.as_ref().is_some_and(|h| !h.is_finished()))
            .finish()
    }
}
