//! Deadline timer for search time management.
//!
//! The timer owns the wall-clock deadline on its own thread and trips the
//! shared cancellation token once it elapses. The searcher never blocks on
//! it; it just polls the token.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::sync::CancelToken;

/// A timer that cancels a [`CancelToken`] when a deadline is reached.
pub struct DeadlineTimer {
    handle: Option<JoinHandle<()>>,
    token: CancelToken,
}

impl DeadlineTimer {
    /// Start a timer that cancels the token after `duration`.
    ///
    /// A zero duration trips the token immediately and returns `None`; the
    /// fallback move path still runs, so an expired clock never produces a
    /// null move.
    #[must_use]
    pub fn start(duration: Duration, token: CancelToken) -> Option<Self> {
        if duration.is_zero() {
            token.cancel();
            return None;
        }

        let timer_token = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(duration);
            timer_token.cancel();
        });

        Some(DeadlineTimer {
            handle: Some(handle),
            token,
        })
    }

    /// Check whether the deadline has elapsed.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the timer thread to finish.
    pub fn wait(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        // The thread finishes on its own; joining here would block the
        // search completion path for the remainder of the deadline.
    }
}
