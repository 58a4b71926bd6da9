//! Hand-off of the final subject and body from the editor.
//!
//! The editor only reports its live text at specific moments, typically when
//! the compose screen is torn down. A screen shown in between may report text
//! that is already obsolete when the user comes back and keeps typing. Every
//! (re)start of observation therefore bumps a generation, each captured value
//! is stamped with the generation current when it was sent, and receivers
//! only accept values of the generation they wait for.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Subject and body reported by the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedText {
    /// Subject field content.
    pub subject: String,
    /// Editable body content.
    pub body: String,
    /// Generation current when the text was sent.
    pub generation: u64,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    latest: Option<CapturedText>,
}

impl Slot {
    /// Take the buffered value if it belongs to `generation`, dropping it if
    /// it is older.
    fn take_for(&mut self, generation: u64) -> Option<CapturedText> {
        match &self.latest {
            Some(text) if text.generation == generation => self.latest.take(),
            Some(text) if text.generation < generation => {
                tracing::debug!(stale = text.generation, generation, "Discarding stale capture");
                self.latest = None;
                None
            }
            _ => None,
        }
    }
}

/// Single-slot, generation-stamped mailbox between the editor and the
/// save pipeline.
///
/// A new [`send`](Self::send) overwrites a value nobody has read yet.
#[derive(Debug, Default)]
pub struct CaptureChannel {
    slot: Mutex<Slot>,
    notify: Notify,
}

impl CaptureChannel {
    /// Create a channel at generation 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.slot().generation
    }

    /// Start observing again and return the new generation.
    ///
    /// Waiters of older generations given to [`receive_for`](Self::receive_for)
    /// are released with `None`.
    pub fn start_generation(&self) -> u64 {
        let generation = {
            let mut slot = self.slot();
            slot.generation += 1;
            slot.generation
        };
        self.notify.notify_waiters();
        generation
    }

    /// Report the editor's text, stamped with the current generation.
    pub fn send(&self, subject: impl Into<String>, body: impl Into<String>) {
        {
            let mut slot = self.slot();
            let generation = slot.generation;
            slot.latest = Some(CapturedText {
                subject: subject.into(),
                body: body.into(),
                generation,
            });
        }
        self.notify.notify_waiters();
    }

    /// Wait for text of the current generation.
    ///
    /// If the generation moves on while waiting, the wait follows it. Stale
    /// values are discarded silently.
    pub async fn receive(&self) -> CapturedText {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut slot = self.slot();
                let generation = slot.generation;
                if let Some(text) = slot.take_for(generation) {
                    return text;
                }
            }

            notified.await;
        }
    }

    /// Wait for text of `generation`.
    ///
    /// Returns `None` once a newer generation has started: the caller's
    /// session was superseded.
    pub async fn receive_for(&self, generation: u64) -> Option<CapturedText> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut slot = self.slot();
                if slot.generation > generation {
                    return None;
                }
                if let Some(text) = slot.take_for(generation) {
                    return Some(text);
                }
            }

            notified.await;
        }
    }
}
