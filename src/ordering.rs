//! Move ordering for the alpha-beta search.
//!
//! Assigns every legal move a priority score and sorts descending. The
//! bands never overlap: hash move, then winning captures, then quiet
//! promotions, then killers, then losing captures, then the rest. Within a
//! band, captures are ranked by material delta and quiet moves by
//! piece-square gain, attack safety, and accumulated history.
//!
//! The orderer owns the learned state that persists across a search: two
//! killer slots per ply and a (side, from, to) history table bumped by
//! depth² whenever a quiet move refutes a branch.

use chess::{
    get_bishop_moves, get_king_moves, get_knight_moves, get_pawn_attacks, get_rook_moves,
    BitBoard, Board, ChessMove, Color, Piece, EMPTY,
};

use crate::eval::psqt::{midgame_value, piece_value};

/// Killer slots are tracked for plies below this horizon.
pub const MAX_KILLER_PLY: usize = 32;

const MILLION: i32 = 1_000_000;
const HASH_MOVE_SCORE: i32 = 100 * MILLION;
const WINNING_CAPTURE_BIAS: i32 = 8 * MILLION;
const PROMOTE_BIAS: i32 = 6 * MILLION;
const KILLER_BIAS: i32 = 4 * MILLION;
const LOSING_CAPTURE_BIAS: i32 = 2 * MILLION;

const PAWN_ATTACK_PENALTY: i32 = 50;
const PIECE_ATTACK_PENALTY: i32 = 25;

/// Two remembered refutation moves for one ply.
#[derive(Clone, Copy, Default)]
pub struct KillerSlots {
    slot_a: Option<ChessMove>,
    slot_b: Option<ChessMove>,
}

impl KillerSlots {
    /// Insert as slot A, demoting the old slot A, unless already in slot A.
    pub fn add(&mut self, mv: ChessMove) {
        if self.slot_a != Some(mv) {
            self.slot_b = self.slot_a;
            self.slot_a = Some(mv);
        }
    }

    /// Whether the move matches either slot.
    #[must_use]
    pub fn matches(&self, mv: ChessMove) -> bool {
        self.slot_a == Some(mv) || self.slot_b == Some(mv)
    }
}

pub struct MoveOrderer {
    killers: [KillerSlots; MAX_KILLER_PLY],
    /// (side, from, to) -> accumulated cutoff weight. Uncapped; ordering
    /// relies on relative magnitude only.
    history: Box<[[[i32; 64]; 64]; 2]>,
}

impl Default for MoveOrderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveOrderer {
    #[must_use]
    pub fn new() -> Self {
        MoveOrderer {
            killers: [KillerSlots::default(); MAX_KILLER_PLY],
            history: Box::new([[[0; 64]; 64]; 2]),
        }
    }

    pub fn clear_killers(&mut self) {
        self.killers = [KillerSlots::default(); MAX_KILLER_PLY];
    }

    pub fn clear_history(&mut self) {
        *self.history = [[[0; 64]; 64]; 2];
    }

    /// Remember a quiet move that caused a beta cutoff at `ply`.
    pub fn add_killer(&mut self, ply: usize, mv: ChessMove) {
        if ply < MAX_KILLER_PLY {
            self.killers[ply].add(mv);
        }
    }

    #[must_use]
    pub fn is_killer(&self, ply: usize, mv: ChessMove) -> bool {
        ply < MAX_KILLER_PLY && self.killers[ply].matches(mv)
    }

    /// Credit a quiet cutoff move with depth² history weight.
    pub fn bump_history(&mut self, side: Color, mv: ChessMove, depth: u32) {
        let weight = (depth * depth) as i32;
        self.history[side.to_index()][mv.get_source().to_index()][mv.get_dest().to_index()] +=
            weight;
    }

    /// Sort `moves` in place by descending priority. Ties keep their
    /// original order, so identical inputs always produce identical output.
    pub fn order_moves(
        &self,
        hash_move: Option<ChessMove>,
        board: &Board,
        moves: &mut Vec<ChessMove>,
        in_quiescence: bool,
        ply: usize,
    ) {
        let side = board.side_to_move();
        let opponent = !side;
        let occupied = *board.combined();
        let them = *board.color_combined(opponent);

        let mut opp_pawn_attacks = EMPTY;
        for sq in *board.pieces(Piece::Pawn) & them {
            opp_pawn_attacks |= get_pawn_attacks(sq, opponent, !EMPTY);
        }
        let mut opp_piece_attacks = EMPTY;
        for sq in *board.pieces(Piece::Knight) & them {
            opp_piece_attacks |= get_knight_moves(sq);
        }
        for sq in (*board.pieces(Piece::Bishop) | *board.pieces(Piece::Queen)) & them {
            opp_piece_attacks |= get_bishop_moves(sq, occupied);
        }
        for sq in (*board.pieces(Piece::Rook) | *board.pieces(Piece::Queen)) & them {
            opp_piece_attacks |= get_rook_moves(sq, occupied);
        }
        opp_piece_attacks |= get_king_moves(board.king_square(opponent));
        let opp_attacks = opp_pawn_attacks | opp_piece_attacks;

        let mut scored: Vec<(i32, ChessMove)> = moves
            .iter()
            .map(|&mv| {
                (
                    self.score_move(
                        mv,
                        hash_move,
                        board,
                        side,
                        opp_pawn_attacks,
                        opp_piece_attacks,
                        opp_attacks,
                        in_quiescence,
                        ply,
                    ),
                    mv,
                )
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        moves.clear();
        moves.extend(scored.into_iter().map(|(_, mv)| mv));
    }

    #[allow(clippy::too_many_arguments)]
    fn score_move(
        &self,
        mv: ChessMove,
        hash_move: Option<ChessMove>,
        board: &Board,
        side: Color,
        opp_pawn_attacks: BitBoard,
        opp_piece_attacks: BitBoard,
        opp_attacks: BitBoard,
        in_quiescence: bool,
        ply: usize,
    ) -> i32 {
        if hash_move == Some(mv) {
            return HASH_MOVE_SCORE;
        }

        let from = mv.get_source();
        let to = mv.get_dest();
        let Some(mover) = board.piece_on(from) else {
            return 0;
        };
        let captured = captured_piece(board, mv, mover);
        let to_mask = BitBoard::from_square(to);

        let mut score = 0;

        if let Some(victim) = captured {
            let delta = piece_value(victim) - piece_value(mover);
            let defended = opp_attacks & to_mask != EMPTY;
            score += if defended && delta < 0 {
                LOSING_CAPTURE_BIAS + delta
            } else {
                WINNING_CAPTURE_BIAS + delta
            };
        }

        if mover == Piece::Pawn {
            if mv.get_promotion().is_some() && captured.is_none() {
                score += PROMOTE_BIAS;
            }
        } else if mover != Piece::King {
            score += midgame_value(mover, to, side) - midgame_value(mover, from, side);
            if opp_pawn_attacks & to_mask != EMPTY {
                score -= PAWN_ATTACK_PENALTY;
            } else if opp_piece_attacks & to_mask != EMPTY {
                score -= PIECE_ATTACK_PENALTY;
            }
        }

        if captured.is_none() {
            if !in_quiescence && self.is_killer(ply, mv) {
                score += KILLER_BIAS;
            }
            score += self.history[side.to_index()][from.to_index()][to.to_index()];
        }

        score
    }
}

fn captured_piece(board: &Board, mv: ChessMove, mover: Piece) -> Option<Piece> {
    if let Some(piece) = board.piece_on(mv.get_dest()) {
        return Some(piece);
    }
    // En passant: a pawn stepping diagonally onto an empty square.
    if mover == Piece::Pawn && mv.get_source().get_file() != mv.get_dest().get_file() {
        return Some(Piece::Pawn);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    fn ordered(pos: &Position, orderer: &MoveOrderer, hash_move: Option<ChessMove>) -> Vec<ChessMove> {
        let mut moves = pos.legal_moves();
        orderer.order_moves(hash_move, pos.board(), &mut moves, false, 0);
        moves
    }

    #[test]
    fn test_killer_rotation() {
        let mut slots = KillerSlots::default();
        let pos = Position::startpos();
        let m1 = pos.parse_move("e2e4").unwrap();
        let m2 = pos.parse_move("d2d4").unwrap();

        slots.add(m1);
        slots.add(m2);
        assert_eq!(slots.slot_a, Some(m2));
        assert_eq!(slots.slot_b, Some(m1));

        // Re-adding slot A is a no-op.
        slots.add(m2);
        assert_eq!(slots.slot_a, Some(m2));
        assert_eq!(slots.slot_b, Some(m1));

        assert!(slots.matches(m1));
        assert!(slots.matches(m2));
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let pos = Position::startpos();
        let orderer = MoveOrderer::new();
        let first = ordered(&pos, &orderer, None);
        let second = ordered(&pos, &orderer, None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_hash_move_sorts_first() {
        let pos = Position::startpos();
        let orderer = MoveOrderer::new();
        let hash_move = pos.parse_move("a2a3").unwrap();
        let moves = ordered(&pos, &orderer, Some(hash_move));
        assert_eq!(moves[0], hash_move);
    }

    #[test]
    fn test_winning_capture_before_losing_capture() {
        // dxe5 wins a bishop for a pawn; Rxd6 loses a rook for a pawn.
        let pos = Position::from_fen("k7/8/3p4/4b3/3P4/8/8/K2R4 w - - 0 1").unwrap();
        let orderer = MoveOrderer::new();
        let moves = ordered(&pos, &orderer, None);
        let winning = pos.parse_move("d4e5").unwrap();
        let losing = pos.parse_move("d1d6").unwrap();
        let win_idx = moves.iter().position(|&m| m == winning).unwrap();
        let lose_idx = moves.iter().position(|&m| m == losing).unwrap();
        assert!(win_idx < lose_idx);
    }

    #[test]
    fn test_quiet_promotion_before_quiet_moves() {
        let pos = Position::from_fen("k7/4P3/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let orderer = MoveOrderer::new();
        let moves = ordered(&pos, &orderer, None);
        assert!(moves[0].get_promotion().is_some());
    }

    #[test]
    fn test_killer_sorts_above_other_quiets() {
        let pos = Position::startpos();
        let mut orderer = MoveOrderer::new();
        let killer = pos.parse_move("a2a3").unwrap();
        orderer.add_killer(0, killer);
        let moves = ordered(&pos, &orderer, None);
        assert_eq!(moves[0], killer);
    }

    #[test]
    fn test_history_breaks_quiet_ties() {
        let pos = Position::startpos();
        let mut orderer = MoveOrderer::new();
        let favored = pos.parse_move("h2h3").unwrap();
        orderer.bump_history(chess::Color::White, favored, 10);
        let moves = ordered(&pos, &orderer, None);
        assert_eq!(moves[0], favored);
    }

    #[test]
    fn test_killers_ignored_in_quiescence() {
        let pos = Position::startpos();
        let mut orderer = MoveOrderer::new();
        let killer = pos.parse_move("a2a3").unwrap();
        orderer.add_killer(0, killer);

        let mut moves = pos.legal_moves();
        orderer.order_moves(None, pos.board(), &mut moves, true, 0);
        // Without the killer bonus the move keeps its plain quiet score and
        // cannot outrank the knight developments.
        assert_ne!(moves[0], killer);
    }
}
