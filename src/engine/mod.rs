//! Engine controller.
//!
//! Owns the game position and the searcher, and wires one search at a time
//! onto its own thread: a fresh cancellation token per job, a deadline
//! timer on a second thread, and a completion callback carrying the chosen
//! move back to the front end.

pub mod time;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info};
use parking_lot::Mutex;

use crate::error::CacheConfigError;
use crate::eval::evaluate;
use crate::position::Position;
use crate::search::{ProgressCallback, SearchOutcome, SearchSettings, Searcher};
use crate::sync::CancelToken;
use crate::timer::DeadlineTimer;
use time::TimeControl;

/// Default transposition cache size in MiB.
pub const DEFAULT_CACHE_MB: usize = 64;

/// One in-flight search: its cancellation token and thread handle.
struct SearchJob {
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

impl SearchJob {
    fn stop_and_wait(self) {
        self.cancel.cancel();
        let _ = self.handle.join();
    }

    fn signal_stop(&self) {
        self.cancel.cancel();
    }
}

pub struct Engine {
    position: Position,
    searcher: Arc<Mutex<Searcher>>,
    current_job: Option<SearchJob>,
    progress: Option<ProgressCallback>,
}

impl Engine {
    /// Create an engine with a transposition cache of `cache_mb` mebibytes.
    pub fn new(cache_mb: usize) -> Result<Self, CacheConfigError> {
        Ok(Engine {
            position: Position::startpos(),
            searcher: Arc::new(Mutex::new(Searcher::new(cache_mb)?)),
            current_job: None,
            progress: None,
        })
    }

    #[must_use]
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Replace the game position, stopping any search against the old one.
    pub fn set_position(&mut self, position: Position) {
        self.stop_search();
        self.position = position;
    }

    /// New-game notification: reset the board and clear everything the
    /// searcher learned from the previous game before the next search.
    pub fn new_game(&mut self) {
        self.stop_search();
        self.position = Position::startpos();
        self.searcher.lock().reset_for_new_game();
        info!("new game");
    }

    /// Stop the current search and wait for its thread to finish.
    pub fn stop_search(&mut self) {
        if let Some(job) = self.current_job.take() {
            job.stop_and_wait();
        }
    }

    /// Request a stop without waiting; the search thread still reports its
    /// result through the completion callback.
    pub fn signal_stop(&self) {
        if let Some(job) = &self.current_job {
            job.signal_stop();
        }
    }

    /// Set the callback invoked with each completed iteration's progress.
    pub fn set_progress_callback(&mut self, callback: Option<ProgressCallback>) {
        self.progress = callback;
    }

    /// Resize the transposition cache.
    pub fn resize_cache(&mut self, cache_mb: usize) -> Result<(), CacheConfigError> {
        self.stop_search();
        self.searcher.lock().resize_cache(cache_mb)
    }

    /// Static evaluation of the current position, mover's perspective.
    #[must_use]
    pub fn evaluate_position(&self) -> i32 {
        evaluate(self.position.board())
    }

    /// Start a search under `control`, optionally depth-capped, reporting
    /// the outcome to `on_complete` from the search thread.
    pub fn start_search<F>(&mut self, control: TimeControl, max_depth: Option<u32>, on_complete: F)
    where
        F: FnOnce(SearchOutcome) + Send + 'static,
    {
        self.stop_search();

        let cancel = CancelToken::new();
        self.searcher.lock().set_cancel_token(cancel.clone());

        let think_ms = control.think_time_ms(self.position.side_to_move());
        if let Some(ms) = think_ms {
            debug!("allocated {ms}ms for this move");
            let _timer = DeadlineTimer::start(Duration::from_millis(ms), cancel.clone());
        }

        let settings = SearchSettings {
            max_depth,
            progress: self.progress.clone(),
        };
        let mut search_position = self.position.clone();
        let searcher = Arc::clone(&self.searcher);

        let handle = thread::Builder::new()
            .name("search".to_string())
            .spawn(move || {
                let outcome = searcher.lock().search(&mut search_position, &settings);
                on_complete(outcome);
            })
            .expect("failed to spawn search thread");

        self.current_job = Some(SearchJob { cancel, handle });
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop_search();
    }
}
