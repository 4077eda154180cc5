//! Time-bounded best-first game-tree search.
//!
//! Implements:
//! - Iterative deepening with per-iteration progress reporting
//! - Negamax alpha-beta with mate-distance pruning (fail-hard)
//! - Check and seventh-rank-pawn extensions under a shared budget
//! - A reduced-depth, zero-width probe for late quiet moves
//! - Quiescence search at the horizon
//! - Move ordering (hash move, captures, promotions, killers, history)
//! - Transposition cache with mate-distance correction
//! - Cooperative cancellation polled at every node

pub mod constants;

mod iterative;
mod negamax;
mod quiescence;

use std::sync::Arc;

use chess::ChessMove;

use crate::error::CacheConfigError;
use crate::ordering::MoveOrderer;
use crate::position::Position;
use crate::sync::CancelToken;
use crate::tt::TranspositionCache;

pub use constants::{is_mate_score, INFINITY, MATE_SCORE, MAX_DEPTH};

/// Counters tracked during one search call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchStats {
    pub nodes: u64,
    pub cutoffs: u64,
}

/// Progress record produced once per completed iteration.
#[derive(Debug, Clone, Copy)]
pub struct SearchProgress {
    /// Depth the completed iteration searched to.
    pub depth: u32,
    /// Score from the mover's perspective, in centipawns.
    pub score: i32,
    /// Signed full moves to mate, when the score encodes one.
    pub mate_in: Option<i32>,
    pub nodes: u64,
    pub time_ms: u64,
    pub nps: u64,
    pub best_move: ChessMove,
}

/// Callback invoked with each iteration's progress record.
pub type ProgressCallback = Arc<dyn Fn(&SearchProgress) + Send + Sync>;

/// Settings for one search call.
#[derive(Clone, Default)]
pub struct SearchSettings {
    /// Cap on iterative deepening; `None` searches to [`MAX_DEPTH`].
    pub max_depth: Option<u32>,
    /// Optional per-iteration progress callback.
    pub progress: Option<ProgressCallback>,
}

impl SearchSettings {
    /// Depth-limited settings, used for fixed-depth analysis and tests.
    #[must_use]
    pub fn depth(max_depth: u32) -> Self {
        SearchSettings {
            max_depth: Some(max_depth),
            progress: None,
        }
    }
}

/// Result of one search call.
#[derive(Debug, Clone, Copy)]
pub struct SearchOutcome {
    /// The chosen move; `None` only when the position has no legal moves.
    pub best_move: Option<ChessMove>,
    /// Score of the chosen move from the mover's perspective.
    pub score: i32,
    /// Deepest fully completed iteration.
    pub depth: u32,
    pub nodes: u64,
    /// Whether the search was cut short by cancellation.
    pub cancelled: bool,
}

/// The search orchestrator: owns the move orderer, the transposition cache,
/// and the per-search bookkeeping. One search runs at a time per instance.
pub struct Searcher {
    pub(crate) cache: TranspositionCache,
    pub(crate) orderer: MoveOrderer,
    pub(crate) cancel: CancelToken,
    pub(crate) stats: SearchStats,

    /// Best fully validated result so far (previous completed iteration).
    pub(crate) best_move: Option<ChessMove>,
    pub(crate) best_score: i32,
    /// Best result of the iteration in flight.
    pub(crate) iteration_move: Option<ChessMove>,
    pub(crate) iteration_score: i32,
    /// Whether the in-flight iteration finished at least one root move.
    pub(crate) searched_one_root_move: bool,
    pub(crate) completed_depth: u32,
}

impl Searcher {
    /// Create a searcher with a transposition cache of `cache_mb` mebibytes.
    pub fn new(cache_mb: usize) -> Result<Self, CacheConfigError> {
        Ok(Searcher {
            cache: TranspositionCache::new(cache_mb)?,
            orderer: MoveOrderer::new(),
            cancel: CancelToken::new(),
            stats: SearchStats::default(),
            best_move: None,
            best_score: 0,
            iteration_move: None,
            iteration_score: 0,
            searched_one_root_move: false,
            completed_depth: 0,
        })
    }

    /// The cancellation token this searcher polls.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Install a fresh cancellation token (one per search job).
    pub fn set_cancel_token(&mut self, token: CancelToken) {
        self.cancel = token;
    }

    /// Replace the transposition cache with one of the given size.
    pub fn resize_cache(&mut self, cache_mb: usize) -> Result<(), CacheConfigError> {
        self.cache = TranspositionCache::new(cache_mb)?;
        Ok(())
    }

    /// Enable or disable the transposition cache.
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache.set_enabled(enabled);
    }

    /// New-game notification: drop everything learned from the old game.
    pub fn reset_for_new_game(&mut self) {
        self.cache.clear();
        self.orderer.clear_killers();
    }

    #[must_use]
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Run a search on `position` until the depth cap or cancellation.
    ///
    /// Always yields a legal move when one exists: if cancellation lands
    /// before any iteration completes, the fallback is the first move of
    /// the ordered root move list.
    pub fn search(&mut self, position: &mut Position, settings: &SearchSettings) -> SearchOutcome {
        let entry_ply = position.ply();

        self.stats = SearchStats::default();
        self.best_move = None;
        self.best_score = 0;
        self.iteration_move = None;
        self.iteration_score = 0;
        self.searched_one_root_move = false;
        self.completed_depth = 0;
        self.orderer.clear_history();
        self.orderer.clear_killers();

        self.run_iterative_deepening(position, settings);

        if self.best_move.is_none() {
            let mut moves = position.legal_moves();
            self.orderer
                .order_moves(None, position.board(), &mut moves, false, 0);
            self.best_move = moves.first().copied();
        }

        debug_assert_eq!(
            position.ply(),
            entry_ply,
            "search must leave the position exactly as it found it"
        );

        SearchOutcome {
            best_move: self.best_move,
            score: self.best_score,
            depth: self.completed_depth,
            nodes: self.stats.nodes,
            cancelled: self.cancel.is_cancelled(),
        }
    }
}
