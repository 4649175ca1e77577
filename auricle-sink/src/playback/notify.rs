//! Transport command slot between stream callbacks and the writer
//!
//! A single-value mailbox with overwrite semantics: rapid play/pause
//! flapping collapses to the most recent command, which is the only
//! one worth acting on. The writer blocks on `wait` while idle, with
//! no timeout; everything else it does is bounded, and `request_stop`
//! is what breaks it out of the idle wait at teardown.

use auricle_common::events::TransportState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

pub struct StateNotifier {
    /// Latest undelivered transport command, if any.
    slot: Mutex<Option<TransportState>>,

    /// Condition variable for waking the writer
    condvar: Condvar,

    /// Stop flag for shutdown
    stop_flag: AtomicBool,
}

impl StateNotifier {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            condvar: Condvar::new(),
            stop_flag: AtomicBool::new(false),
        }
    }

    /// Post a transport command, replacing any command not yet taken.
    pub fn send(&self, state: TransportState) {
        let mut slot = self.slot.lock().unwrap();
        *slot = Some(state);
        drop(slot);

        self.condvar.notify_one();
    }

    /// Take the pending command without blocking.
    pub fn take(&self) -> Option<TransportState> {
        self.slot.lock().unwrap().take()
    }

    /// Block until a command arrives or stop is requested.
    ///
    /// Returns `None` only at shutdown.
    pub fn wait(&self) -> Option<TransportState> {
        let mut slot = self.slot.lock().unwrap();
        loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                return None;
            }
            if let Some(state) = slot.take() {
                return Some(state);
            }
            slot = self.condvar.wait(slot).unwrap();
        }
    }

    /// Wake the writer out of any wait and make `wait` return `None`
    /// from now on.
    pub fn request_stop(&self) {
        // Store under the slot lock so the flag cannot slip between a
        // waiter's check and its park; the notify then always lands
        let slot = self.slot.lock().unwrap();
        self.stop_flag.store(true, Ordering::Relaxed);
        drop(slot);

        self.condvar.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }
}

impl Default for StateNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_send_overwrites_pending_command() {
        let notifier = StateNotifier::new();
        notifier.send(TransportState::Active);
        notifier.send(TransportState::Suspended);

        assert_eq!(notifier.take(), Some(TransportState::Suspended));
        assert_eq!(notifier.take(), None);
    }

    #[test]
    fn test_wait_returns_sent_command() {
        let notifier = StateNotifier::new();
        notifier.send(TransportState::Active);
        assert_eq!(notifier.wait(), Some(TransportState::Active));
    }

    #[test]
    fn test_wait_blocks_until_send() {
        let notifier = Arc::new(StateNotifier::new());

        let waiter = {
            let notifier = Arc::clone(&notifier);
            thread::spawn(move || notifier.wait())
        };

        thread::sleep(Duration::from_millis(5));
        notifier.send(TransportState::Active);
        assert_eq!(waiter.join().unwrap(), Some(TransportState::Active));
    }

    #[test]
    fn test_stop_wakes_blocked_waiter() {
        let notifier = Arc::new(StateNotifier::new());

        let waiter = {
            let notifier = Arc::clone(&notifier);
            thread::spawn(move || notifier.wait())
        };

        thread::sleep(Duration::from_millis(5));
        notifier.request_stop();
        assert_eq!(waiter.join().unwrap(), None);
        assert!(notifier.is_stopped());
    }

    #[test]
    fn test_wait_after_stop_returns_none_despite_command() {
        let notifier = StateNotifier::new();
        notifier.send(TransportState::Active);
        notifier.request_stop();
        assert_eq!(notifier.wait(), None);
    }
}
