#![forbid(unsafe_code)]

//! The playback clock behind a single-writer token.
//!
//! Two tick sources exist over a session's life: the host's own scheduling
//! (primary) and the mirror's continuation clock. Only the holder of the
//! [`Authority`] token may advance time. The token is a single atomic value;
//! transferring it is one store performed by the lifecycle, never a race
//! settled by timestamps.

use std::sync::atomic::{AtomicU8, Ordering};

use cuecard_core::{ClockEvent, ClockLimits, ClockPhase, PlaybackClock, PlaybackState};
use parking_lot::Mutex;

use crate::intent::MirrorIntent;

/// Which tick source may advance playback time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Authority {
    /// The host surface's scheduling.
    Primary = 0,
    /// The mirror's continuation clock, while the host is suspended.
    Continuation = 1,
}

impl Authority {
    fn from_u8(v: u8) -> Self {
        if v == Authority::Continuation as u8 {
            Authority::Continuation
        } else {
            Authority::Primary
        }
    }
}

/// Result of a tick attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick was applied; carries any transition it caused.
    Applied(Option<ClockEvent>),
    /// The caller does not hold the token; nothing changed.
    NotHolder,
}

/// A playback command, from the host API or a mirror intent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ClockCommand {
    Play,
    /// Pauses; abandons a running countdown.
    Pause,
    /// Pauses during the countdown, otherwise flips play/pause.
    Toggle,
    Countdown(i32),
    /// Rewind to zero, then count down from the given seconds.
    Restart(i32),
    Seek(f64),
}

impl ClockCommand {
    /// The playback command behind `intent`.
    ///
    /// `None` for intents that act on the mirror surface instead.
    pub(crate) fn from_intent(intent: MirrorIntent, countdown_seconds: i32) -> Option<Self> {
        match intent {
            MirrorIntent::TogglePlayPause => Some(Self::Toggle),
            MirrorIntent::Pause => Some(Self::Pause),
            MirrorIntent::Resume => Some(Self::Play),
            MirrorIntent::Restart => Some(Self::Restart(countdown_seconds)),
            MirrorIntent::ExpandToHost | MirrorIntent::Close => None,
        }
    }

    fn apply_to(self, clock: &mut PlaybackClock) -> bool {
        match self {
            Self::Play => clock.play(),
            Self::Pause => clock.pause(),
            Self::Toggle if clock.phase() == ClockPhase::CountingDown => clock.pause(),
            Self::Toggle => clock.toggle(),
            Self::Countdown(seconds) => {
                clock.start_countdown(seconds);
                true
            }
            Self::Restart(seconds) => {
                clock.reset();
                clock.start_countdown(seconds);
                true
            }
            Self::Seek(to) => {
                clock.seek(to);
                true
            }
        }
    }
}

/// A [`PlaybackClock`] shared between tick sources.
#[derive(Debug)]
pub struct SharedClock {
    clock: Mutex<PlaybackClock>,
    authority: AtomicU8,
}

impl SharedClock {
    /// A new idle clock with the primary holding the token.
    #[must_use]
    pub fn new(limits: ClockLimits) -> Self {
        Self {
            clock: Mutex::new(PlaybackClock::new(limits)),
            authority: AtomicU8::new(Authority::Primary as u8),
        }
    }

    /// Current token holder.
    #[inline]
    pub fn authority(&self) -> Authority {
        Authority::from_u8(self.authority.load(Ordering::Acquire))
    }

    /// Hand the token to `to`.
    pub(crate) fn transfer(&self, to: Authority) {
        let from = Authority::from_u8(self.authority.swap(to as u8, Ordering::AcqRel));
        if from != to {
            tracing::debug!(?from, ?to, "clock authority transferred");
        }
    }

    /// Advance time on behalf of `holder`.
    ///
    /// The token is checked under the clock lock, so a tick that loses the
    /// token mid-flight is rejected rather than applied late.
    pub fn tick_as(&self, holder: Authority, delta_seconds: f64) -> TickOutcome {
        let mut clock = self.clock.lock();
        if self.authority() != holder {
            tracing::trace!(?holder, "tick rejected: not token holder");
            return TickOutcome::NotHolder;
        }
        TickOutcome::Applied(clock.tick(delta_seconds))
    }

    /// Run a lifecycle command against the clock.
    pub(crate) fn command<R>(&self, f: impl FnOnce(&mut PlaybackClock) -> R) -> R {
        f(&mut *self.clock.lock())
    }

    /// Apply `command` under the clock lock. Returns whether it changed anything.
    pub(crate) fn apply(&self, command: ClockCommand) -> bool {
        self.command(|c| command.apply_to(c))
    }

    /// Whether the phase is one a tick source must drive.
    pub fn is_advancing(&self) -> bool {
        self.read(|c| matches!(c.phase(), ClockPhase::Playing | ClockPhase::CountingDown))
    }

    /// Read the clock without mutating it.
    pub fn read<R>(&self, f: impl FnOnce(&PlaybackClock) -> R) -> R {
        f(&*self.clock.lock())
    }

    /// Snapshot for readers.
    pub fn snapshot(&self) -> PlaybackState {
        self.read(PlaybackClock::snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing() -> SharedClock {
        let clock = SharedClock::new(ClockLimits::default());
        clock.command(|c| c.play());
        clock
    }

    #[test]
    fn primary_holds_token_initially() {
        let clock = SharedClock::new(ClockLimits::default());
        assert_eq!(clock.authority(), Authority::Primary);
    }

    #[test]
    fn non_holder_tick_is_rejected() {
        let clock = playing();
        assert_eq!(
            clock.tick_as(Authority::Continuation, 1.0),
            TickOutcome::NotHolder
        );
        assert_eq!(clock.snapshot().elapsed_seconds, 0.0);

        assert_eq!(clock.tick_as(Authority::Primary, 1.0), TickOutcome::Applied(None));
        assert_eq!(clock.snapshot().elapsed_seconds, 1.0);
    }

    #[test]
    fn transfer_switches_writer() {
        let clock = playing();
        clock.transfer(Authority::Continuation);
        assert_eq!(clock.tick_as(Authority::Primary, 1.0), TickOutcome::NotHolder);
        assert_eq!(
            clock.tick_as(Authority::Continuation, 0.5),
            TickOutcome::Applied(None)
        );
        clock.transfer(Authority::Primary);
        assert_eq!(clock.tick_as(Authority::Primary, 0.5), TickOutcome::Applied(None));
        assert_eq!(clock.snapshot().elapsed_seconds, 1.0);
    }

    #[test]
    fn commands_follow_mirror_intents() {
        let clock = SharedClock::new(ClockLimits::default());
        let command = |intent| ClockCommand::from_intent(intent, 2);
        assert_eq!(command(MirrorIntent::Close), None);
        assert_eq!(command(MirrorIntent::ExpandToHost), None);

        assert!(clock.apply(ClockCommand::Countdown(2)));
        assert!(clock.is_advancing());
        assert!(clock.apply(command(MirrorIntent::TogglePlayPause).unwrap()));
        assert_eq!(clock.read(|c| c.phase()), ClockPhase::Idle);
        assert!(!clock.is_advancing());

        assert!(clock.apply(command(MirrorIntent::Resume).unwrap()));
        clock.tick_as(Authority::Primary, 4.0);
        assert!(clock.apply(command(MirrorIntent::Pause).unwrap()));
        assert!(!clock.apply(command(MirrorIntent::Pause).unwrap()));
        assert_eq!(clock.read(|c| c.phase()), ClockPhase::Paused);

        assert!(clock.apply(command(MirrorIntent::Restart).unwrap()));
        assert_eq!(clock.read(|c| c.phase()), ClockPhase::CountingDown);
        assert_eq!(clock.snapshot().elapsed_seconds, 0.0);
    }

    #[test]
    fn countdown_event_reaches_tick_caller() {
        let clock = SharedClock::new(ClockLimits::default());
        clock.command(|c| c.start_countdown(1));
        assert_eq!(
            clock.tick_as(Authority::Primary, 1.0),
            TickOutcome::Applied(Some(ClockEvent::CountdownFinished))
        );
        assert!(clock.snapshot().is_playing);
    }
}
