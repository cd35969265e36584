#![forbid(unsafe_code)]

//! User actions originating on the mirror surface.
//!
//! The mirror never touches playback state itself. Its controls send a
//! [`MirrorIntent`] back to the engine. While the host runs, intents are applied
//! on the next [`Engine::pump`](crate::Engine::pump); while it is suspended the
//! continuation relay applies them as they arrive.

use std::sync::mpsc;

/// An action requested from the mirror surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirrorIntent {
    /// Toggle between playing and paused.
    TogglePlayPause,
    /// Pause playback (no-op when already paused).
    Pause,
    /// Resume playback (no-op when already playing).
    Resume,
    /// Rewind to the start and run the countdown again.
    Restart,
    /// Return to the host surface and close the mirror.
    ExpandToHost,
    /// The user closed the mirror surface.
    Close,
}

/// A message on the intent channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Inbox {
    Intent(MirrorIntent),
    /// Unblocks a waiting relay so it can check whether it should exit.
    Wake,
}

impl Inbox {
    pub(crate) fn intent(self) -> Option<MirrorIntent> {
        match self {
            Inbox::Intent(intent) => Some(intent),
            Inbox::Wake => None,
        }
    }
}

/// Cloneable sending half handed to mirror surfaces.
#[derive(Debug, Clone)]
pub struct IntentSender {
    tx: mpsc::Sender<Inbox>,
}

impl IntentSender {
    /// Relay an intent to the engine.
    ///
    /// Returns `false` if the engine is gone.
    pub fn send(&self, intent: MirrorIntent) -> bool {
        let sent = self.tx.send(Inbox::Intent(intent)).is_ok();
        if !sent {
            tracing::trace!(?intent, "intent dropped: engine gone");
        }
        sent
    }

    pub(crate) fn wake(&self) -> bool {
        self.tx.send(Inbox::Wake).is_ok()
    }
}

/// Create an intent channel.
pub(crate) fn intent_channel() -> (IntentSender, mpsc::Receiver<Inbox>) {
    let (tx, rx) = mpsc::channel();
    (IntentSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_arrive_in_order() {
        let (tx, rx) = intent_channel();
        let other = tx.clone();
        assert!(tx.send(MirrorIntent::Pause));
        assert!(other.wake());
        assert!(other.send(MirrorIntent::Restart));
        assert_eq!(
            rx.try_iter().filter_map(Inbox::intent).collect::<Vec<_>>(),
            vec![MirrorIntent::Pause, MirrorIntent::Restart]
        );
    }

    #[test]
    fn send_after_receiver_dropped_reports_failure() {
        let (tx, rx) = intent_channel();
        drop(rx);
        assert!(!tx.send(MirrorIntent::TogglePlayPause));
        assert!(!tx.wake());
    }
}
