#![forbid(unsafe_code)]

//! Fixed-interval tick sources on background threads.
//!
//! A [`Ticker`] runs a callback every `interval` on its own thread until the
//! callback asks to stop or the owner stops it. Stopping is synchronous:
//! [`RunningTicker::stop`] returns only after the thread has exited, so no tick
//! can fire after the caller considers the source halted.
//!
//! # How it works
//!
//! 1. The owner calls [`Ticker::start`] and keeps the returned handle
//! 2. The thread waits on a [`StopSignal`] with the interval as timeout
//! 3. Each timeout runs the callback once; a set signal ends the loop
//! 4. `stop()` (or dropping the handle) sets the signal and joins

use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use web_time::Instant;

/// A unique identifier for a tick source.
pub type SubId = u64;

/// Signal for stopping a tick source.
///
/// The owner sets it through the paired [`StopTrigger`]; the worker checks it
/// between ticks and while waiting.
#[derive(Clone)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    /// Create a new stop signal pair (signal, trigger).
    pub(crate) fn new() -> (Self, StopTrigger) {
        let inner = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = Self {
            inner: inner.clone(),
        };
        (signal, StopTrigger { inner })
    }

    /// Check if the stop signal has been triggered.
    pub fn is_stopped(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock()
    }

    /// Wait for either the stop signal or a timeout.
    ///
    /// Returns `true` if stopped, `false` if timed out.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock();
        if *stopped {
            return true;
        }
        let deadline = Instant::now() + duration;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return *stopped;
            }
            let result = cvar.wait_for(&mut stopped, remaining);
            if *stopped {
                return true;
            }
            if result.timed_out() {
                return false;
            }
        }
    }
}

/// Trigger to stop a tick source from the owner side.
pub(crate) struct StopTrigger {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopTrigger {
    /// Signal the tick source to stop.
    pub(crate) fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock() = true;
        cvar.notify_all();
    }
}

/// A tick source that fires a callback at a fixed interval.
pub struct Ticker {
    id: SubId,
    interval: Duration,
}

impl Ticker {
    /// Create a ticker with a stable ID derived from the interval.
    pub fn new(interval: Duration) -> Self {
        let id = interval.as_nanos() as u64 ^ 0x5449_434B;
        Self { id, interval }
    }

    /// Create a ticker with an explicit ID.
    pub fn with_id(id: SubId, interval: Duration) -> Self {
        Self { id, interval }
    }

    /// Ticker ID.
    #[inline]
    pub fn id(&self) -> SubId {
        self.id
    }

    /// Tick interval.
    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the tick thread.
    ///
    /// `on_tick` receives the 1-based tick count. Returning
    /// `ControlFlow::Break(())` ends the thread.
    pub fn start<F>(self, mut on_tick: F) -> RunningTicker
    where
        F: FnMut(u64) -> ControlFlow<()> + Send + 'static,
    {
        let (signal, trigger) = StopSignal::new();
        let Self { id, interval } = self;

        crate::debug_trace!("starting ticker: id={}, interval={:?}", id, interval);
        tracing::debug!(sub_id = id, interval_us = interval.as_micros() as u64, "Starting ticker");

        let thread = thread::Builder::new()
            .name(format!("cuecard-ticker-{id:x}"))
            .spawn(move || {
                let mut tick_count: u64 = 0;
                loop {
                    if signal.wait_timeout(interval) {
                        crate::debug_trace!("ticker stopped: id={}, sent {} ticks", id, tick_count);
                        break;
                    }
                    tick_count += 1;
                    if on_tick(tick_count).is_break() {
                        crate::debug_trace!("ticker finished: id={}, sent {} ticks", id, tick_count);
                        break;
                    }
                }
            });

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(sub_id = id, error = %err, "ticker thread spawn failed");
                None
            }
        };

        RunningTicker {
            id,
            trigger,
            thread,
        }
    }
}

/// A running ticker handle.
///
/// Dropping the handle stops and joins the thread.
pub struct RunningTicker {
    id: SubId,
    trigger: StopTrigger,
    thread: Option<thread::JoinHandle<()>>,
}

impl RunningTicker {
    /// Ticker ID.
    #[inline]
    pub fn id(&self) -> SubId {
        self.id
    }

    /// Whether the tick thread is still running.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the ticker and join its thread.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.trigger.stop();
        if let Some(handle) = self.thread.take() {
            tracing::debug!(sub_id = self.id, "Stopping ticker");
            if handle.join().is_err() {
                tracing::warn!(sub_id = self.id, "ticker thread panicked");
            }
        }
    }
}

impl Drop for RunningTicker {
    fn drop(&mut self) {
        self.halt();
    }
}

impl std::fmt::Debug for RunningTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningTicker")
            .field("id", &self.id)
            .field("running", &self.is_running())
            .finish()
    }
}
