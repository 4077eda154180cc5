//! Iterative deepening driver.

use std::time::Instant;

use log::debug;

use super::constants::{is_mate_score, plies_to_mate, INFINITY, MAX_DEPTH};
use super::{SearchProgress, SearchSettings, Searcher};
use crate::position::Position;

impl Searcher {
    /// Deepen one ply at a time until the cap, a proven mate within the
    /// searched depth, or cancellation.
    ///
    /// A cancelled iteration's result is kept only if at least one root
    /// move was fully evaluated; otherwise the previous completed
    /// iteration's result stands.
    pub(crate) fn run_iterative_deepening(
        &mut self,
        position: &mut Position,
        settings: &SearchSettings,
    ) {
        let max_depth = settings.max_depth.unwrap_or(MAX_DEPTH).min(MAX_DEPTH);
        let start = Instant::now();

        for depth in 1..=max_depth {
            self.searched_one_root_move = false;
            self.negamax(position, depth, 0, -INFINITY, INFINITY, 0);

            if self.cancel.is_cancelled() {
                if self.searched_one_root_move {
                    self.best_move = self.iteration_move;
                    self.best_score = self.iteration_score;
                    debug!("using partial result from cancelled depth {depth}");
                }
                break;
            }

            self.completed_depth = depth;
            self.best_move = self.iteration_move;
            self.best_score = self.iteration_score;

            if let Some(best_move) = self.best_move {
                self.report_iteration(depth, best_move, start, settings);
            }

            self.iteration_move = None;
            self.iteration_score = -INFINITY;

            if is_mate_score(self.best_score) && plies_to_mate(self.best_score) <= depth as i32 {
                debug!("mate within depth {depth}, stopping early");
                break;
            }
        }
    }

    fn report_iteration(
        &self,
        depth: u32,
        best_move: chess::ChessMove,
        start: Instant,
        settings: &SearchSettings,
    ) {
        let time_ms = start.elapsed().as_millis() as u64;
        let nps = self.stats.nodes * 1000 / time_ms.max(1);
        let mate_in = if is_mate_score(self.best_score) {
            let moves = (plies_to_mate(self.best_score) + 1) / 2;
            Some(moves * self.best_score.signum())
        } else {
            None
        };

        let progress = SearchProgress {
            depth,
            score: self.best_score,
            mate_in,
            nodes: self.stats.nodes,
            time_ms,
            nps,
            best_move,
        };
        debug!(
            "depth {} score {} nodes {} time {}ms",
            depth, self.best_score, self.stats.nodes, time_ms
        );
        if let Some(callback) = &settings.progress {
            callback(&progress);
        }
    }
}
