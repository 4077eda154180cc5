//! The alpha-beta recursion.

use chess::Piece;

use super::constants::{MATE_SCORE, MAX_EXTENSIONS};
use super::Searcher;
use crate::position::Position;
use crate::tt::BoundType;

impl Searcher {
    /// Negamax with a fail-hard [alpha, beta] window; all scores are from
    /// the mover's perspective.
    ///
    /// `extensions_used` is the extension budget already spent on this
    /// path; it caps at [`MAX_EXTENSIONS`] so forcing sequences cannot
    /// extend without bound.
    pub(crate) fn negamax(
        &mut self,
        position: &mut Position,
        depth_remaining: u32,
        ply_from_root: u32,
        mut alpha: i32,
        mut beta: i32,
        extensions_used: u32,
    ) -> i32 {
        self.stats.nodes += 1;
        if self.cancel.is_cancelled() {
            return 0;
        }

        if ply_from_root > 0 {
            if position.is_repetition() {
                return 0;
            }

            // Mate-distance pruning: a mate from here can be no closer
            // than ply_from_root, which bounds the reachable window.
            alpha = alpha.max(-MATE_SCORE + ply_from_root as i32);
            beta = beta.min(MATE_SCORE - ply_from_root as i32);
            if alpha >= beta {
                return alpha;
            }
        }

        let key = position.key();
        if let Some(score) = self
            .cache
            .lookup(key, depth_remaining, ply_from_root, alpha, beta)
        {
            if ply_from_root == 0 {
                self.iteration_move = self.cache.stored_move(key);
                self.iteration_score = score;
            }
            return score;
        }

        if depth_remaining == 0 {
            return self.quiescence(position, alpha, beta);
        }

        let mut moves = position.legal_moves();
        if moves.is_empty() {
            if position.in_check() {
                return -(MATE_SCORE - ply_from_root as i32);
            }
            return 0;
        }

        let hash_move = if ply_from_root == 0 {
            self.best_move
        } else {
            self.cache.stored_move(key)
        };
        self.orderer.order_moves(
            hash_move,
            position.board(),
            &mut moves,
            false,
            ply_from_root as usize,
        );

        let mut bound = BoundType::UpperBound;
        let mut best_move_here = None;

        for (index, &mv) in moves.iter().enumerate() {
            let is_capture = position.is_capture(mv);
            let score;
            {
                let mut next = position.apply(mv);

                let mut extension = 0u32;
                if extensions_used < MAX_EXTENSIONS {
                    if next.in_check() {
                        extension = 1;
                    } else if next.board().piece_on(mv.get_dest()) == Some(Piece::Pawn) {
                        let rank = mv.get_dest().get_rank().to_index();
                        if rank == 1 || rank == 6 {
                            extension = 1;
                        }
                    }
                }

                // Late quiet moves get a reduced-depth, zero-width probe
                // first; only a score above alpha earns the full search.
                let mut value = 0;
                let mut needs_full_search = true;
                if extension == 0 && depth_remaining >= 3 && index >= 3 && !is_capture {
                    value = -self.negamax(
                        &mut next,
                        depth_remaining - 2,
                        ply_from_root + 1,
                        -alpha - 1,
                        -alpha,
                        extensions_used,
                    );
                    needs_full_search = value > alpha;
                }

                if needs_full_search {
                    value = -self.negamax(
                        &mut next,
                        depth_remaining - 1 + extension,
                        ply_from_root + 1,
                        -beta,
                        -alpha,
                        extensions_used + extension,
                    );
                }
                score = value;
            }

            if self.cancel.is_cancelled() {
                return 0;
            }

            if score >= beta {
                self.cache.store(
                    key,
                    depth_remaining,
                    ply_from_root,
                    beta,
                    BoundType::LowerBound,
                    Some(mv),
                );
                if !is_capture {
                    self.orderer.add_killer(ply_from_root as usize, mv);
                    self.orderer
                        .bump_history(position.side_to_move(), mv, depth_remaining);
                }
                self.stats.cutoffs += 1;
                return beta;
            }

            if score > alpha {
                bound = BoundType::Exact;
                best_move_here = Some(mv);
                alpha = score;

                if ply_from_root == 0 {
                    self.iteration_move = Some(mv);
                    self.iteration_score = score;
                    self.searched_one_root_move = true;
                }
            }
        }

        self.cache.store(
            key,
            depth_remaining,
            ply_from_root,
            alpha,
            bound,
            best_move_here,
        );
        alpha
    }
}
