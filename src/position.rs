//! Position wrapper with strictly paired apply/undo.
//!
//! The search mutates the position in place, one move at a time, and every
//! applied move must be retracted before the enclosing call returns. That
//! pairing is enforced with [`AppliedMove`], a guard whose drop performs the
//! undo, so early exits (including cancellation) can never leave the board
//! mutated.
//!
//! Board state, legal move generation and the 64-bit zobrist key come from
//! the `chess` crate; this type adds the undo stack, repetition bookkeeping
//! and the parsing/formatting surface the front end needs.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use chess::{Board, ChessMove, Color, File, MoveGen, Piece, Rank, Square};

use crate::error::{FenError, MoveError};

/// A game position plus the line of moves applied to reach it.
#[derive(Clone)]
pub struct Position {
    /// Board after each applied move; the last entry is current.
    boards: Vec<Board>,
    /// Zobrist key per board, kept alongside for repetition scans.
    keys: Vec<u64>,
}

impl Position {
    /// The standard starting position.
    #[must_use]
    pub fn startpos() -> Self {
        Self::from_board(Board::default())
    }

    /// Build a position from a FEN string.
    ///
    /// Accepts 4- or 6-field FEN; the move counters are irrelevant to search
    /// and default when omitted.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields = fen.split_whitespace().count();
        let padded;
        let full = if fields == 4 {
            padded = format!("{fen} 0 1");
            padded.as_str()
        } else {
            fen
        };
        let board = Board::from_str(full).map_err(|_| FenError::Invalid {
            fen: fen.to_string(),
        })?;
        Ok(Self::from_board(board))
    }

    fn from_board(board: Board) -> Self {
        Position {
            keys: vec![board.get_hash()],
            boards: vec![board],
        }
    }

    /// The current board.
    #[inline]
    #[must_use]
    pub fn board(&self) -> &Board {
        self.boards.last().expect("position stack is never empty")
    }

    /// The current zobrist key.
    #[inline]
    #[must_use]
    pub fn key(&self) -> u64 {
        *self.keys.last().expect("position stack is never empty")
    }

    /// The side to move.
    #[inline]
    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.board().side_to_move()
    }

    /// Whether the side to move is in check.
    #[inline]
    #[must_use]
    pub fn in_check(&self) -> bool {
        self.board().checkers().popcnt() > 0
    }

    /// Number of moves applied since this position was constructed.
    #[inline]
    #[must_use]
    pub fn ply(&self) -> usize {
        self.boards.len() - 1
    }

    /// All legal moves in the current position.
    #[must_use]
    pub fn legal_moves(&self) -> Vec<ChessMove> {
        MoveGen::new_legal(self.board()).collect()
    }

    /// Whether `mv` captures anything, en passant included.
    #[must_use]
    pub fn is_capture(&self, mv: ChessMove) -> bool {
        let board = self.board();
        if board.piece_on(mv.get_dest()).is_some() {
            return true;
        }
        // A pawn changing file onto an empty square is an en passant capture.
        board.piece_on(mv.get_source()) == Some(Piece::Pawn)
            && mv.get_source().get_file() != mv.get_dest().get_file()
    }

    /// The piece type `mv` captures, if any.
    #[must_use]
    pub fn captured_piece(&self, mv: ChessMove) -> Option<Piece> {
        let board = self.board();
        if let Some(piece) = board.piece_on(mv.get_dest()) {
            return Some(piece);
        }
        if board.piece_on(mv.get_source()) == Some(Piece::Pawn)
            && mv.get_source().get_file() != mv.get_dest().get_file()
        {
            return Some(Piece::Pawn);
        }
        None
    }

    /// Whether the current position has occurred three times on the line
    /// leading here (game history plus search path).
    #[must_use]
    pub fn is_repetition(&self) -> bool {
        let current = self.key();
        self.keys.iter().filter(|&&k| k == current).count() >= 3
    }

    /// Apply a legal move for the duration of the returned guard.
    ///
    /// The undo runs when the guard drops. Callers hand the guard to the
    /// recursive search (it derefs to `Position`) and let scope end retract
    /// the move on every exit path.
    pub fn apply(&mut self, mv: ChessMove) -> AppliedMove<'_> {
        debug_assert!(self.board().legal(mv), "apply() requires a legal move");
        self.push(mv);
        AppliedMove { position: self }
    }

    /// Permanently play a move, failing on illegal input without mutating
    /// the position.
    pub fn play(&mut self, mv: ChessMove) -> Result<(), MoveError> {
        if !self.board().legal(mv) {
            return Err(MoveError::Illegal {
                notation: move_to_uci(mv),
            });
        }
        self.push(mv);
        Ok(())
    }

    /// Parse a move in coordinate notation (e.g. "e2e4", "e7e8q") and check
    /// it is legal here.
    pub fn parse_move(&self, notation: &str) -> Result<ChessMove, MoveError> {
        let chars: Vec<char> = notation.chars().collect();
        if chars.len() < 4 || chars.len() > 5 {
            return Err(MoveError::InvalidLength { len: chars.len() });
        }

        let from = square_from_chars(chars[0], chars[1]).ok_or_else(|| {
            MoveError::InvalidSquare {
                notation: notation.to_string(),
            }
        })?;
        let to = square_from_chars(chars[2], chars[3]).ok_or_else(|| {
            MoveError::InvalidSquare {
                notation: notation.to_string(),
            }
        })?;

        let promotion = match chars.get(4) {
            None => None,
            Some('q') => Some(Piece::Queen),
            Some('r') => Some(Piece::Rook),
            Some('b') => Some(Piece::Bishop),
            Some('n') => Some(Piece::Knight),
            Some(&c) => return Err(MoveError::InvalidPromotion { char: c }),
        };

        let mv = ChessMove::new(from, to, promotion);
        if self.board().legal(mv) {
            Ok(mv)
        } else {
            Err(MoveError::Illegal {
                notation: notation.to_string(),
            })
        }
    }

    fn push(&mut self, mv: ChessMove) {
        let next = self.board().make_move_new(mv);
        self.keys.push(next.get_hash());
        self.boards.push(next);
    }

    fn pop(&mut self) {
        debug_assert!(self.boards.len() > 1, "undo without a matching apply");
        self.boards.pop();
        self.keys.pop();
    }
}

/// Guard for a move applied with [`Position::apply`]; dropping it undoes
/// the move.
pub struct AppliedMove<'a> {
    position: &'a mut Position,
}

impl Deref for AppliedMove<'_> {
    type Target = Position;

    fn deref(&self) -> &Position {
        self.position
    }
}

impl DerefMut for AppliedMove<'_> {
    fn deref_mut(&mut self) -> &mut Position {
        self.position
    }
}

impl Drop for AppliedMove<'_> {
    fn drop(&mut self) {
        self.position.pop();
    }
}

/// Format a move in coordinate notation ("e2e4", "e7e8q").
#[must_use]
pub fn move_to_uci(mv: ChessMove) -> String {
    let mut out = String::with_capacity(5);
    push_square(&mut out, mv.get_source());
    push_square(&mut out, mv.get_dest());
    match mv.get_promotion() {
        Some(Piece::Queen) => out.push('q'),
        Some(Piece::Rook) => out.push('r'),
        Some(Piece::Bishop) => out.push('b'),
        Some(Piece::Knight) => out.push('n'),
        _ => {}
    }
    out
}

fn push_square(out: &mut String, sq: Square) {
    out.push((b'a' + sq.get_file().to_index() as u8) as char);
    out.push((b'1' + sq.get_rank().to_index() as u8) as char);
}

fn square_from_chars(file: char, rank: char) -> Option<Square> {
    if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
        return None;
    }
    let file_idx = file as usize - 'a' as usize;
    let rank_idx = rank as usize - '1' as usize;
    Some(Square::make_square(
        Rank::from_index(rank_idx),
        File::from_index(file_idx),
    ))
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let board = self.board();
        for rank in (0..8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8 {
                let sq = Square::make_square(Rank::from_index(rank), File::from_index(file));
                let symbol = match (board.piece_on(sq), board.color_on(sq)) {
                    (Some(piece), Some(color)) => piece_char(piece, color),
                    _ => '.',
                };
                write!(f, "{symbol} ")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "  a b c d e f g h")?;
        write!(
            f,
            "{} to move",
            match self.side_to_move() {
                Color::White => "White",
                Color::Black => "Black",
            }
        )
    }
}

fn piece_char(piece: Piece, color: Color) -> char {
    let c = match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    };
    match color {
        Color::White => c.to_ascii_uppercase(),
        Color::Black => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_startpos_basics() {
        let pos = Position::startpos();
        assert_eq!(pos.side_to_move(), Color::White);
        assert!(!pos.in_check());
        assert_eq!(pos.legal_moves().len(), 20);
        assert_eq!(pos.ply(), 0);
    }

    #[test]
    fn test_apply_then_drop_restores() {
        let mut pos = Position::startpos();
        let key = pos.key();
        let mv = pos.parse_move("e2e4").unwrap();
        {
            let applied = pos.apply(mv);
            assert_eq!(applied.side_to_move(), Color::Black);
            assert_ne!(applied.key(), key);
        }
        assert_eq!(pos.key(), key);
        assert_eq!(pos.side_to_move(), Color::White);
        assert_eq!(pos.ply(), 0);
    }

    #[test]
    fn test_play_illegal_move_leaves_position_untouched() {
        let mut pos = Position::startpos();
        let key = pos.key();
        let mv = ChessMove::new(
            square_from_chars('e', '2').unwrap(),
            square_from_chars('e', '5').unwrap(),
            None,
        );
        assert!(matches!(pos.play(mv), Err(MoveError::Illegal { .. })));
        assert_eq!(pos.key(), key);
    }

    #[test]
    fn test_parse_move_errors() {
        let pos = Position::startpos();
        assert!(matches!(
            pos.parse_move("e2"),
            Err(MoveError::InvalidLength { len: 2 })
        ));
        assert!(matches!(
            pos.parse_move("z9z9"),
            Err(MoveError::InvalidSquare { .. })
        ));
        assert!(matches!(
            pos.parse_move("e2e4x"),
            Err(MoveError::InvalidPromotion { char: 'x' })
        ));
    }

    #[test]
    fn test_move_formatting_round_trip() {
        let pos = Position::startpos();
        let mv = pos.parse_move("g1f3").unwrap();
        assert_eq!(move_to_uci(mv), "g1f3");
    }

    #[test]
    fn test_en_passant_is_capture() {
        let pos =
            Position::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
                .unwrap();
        let mv = pos.parse_move("e5f6").unwrap();
        assert!(pos.is_capture(mv));
        assert_eq!(pos.captured_piece(mv), Some(Piece::Pawn));
    }

    #[test]
    fn test_repetition_detection() {
        let mut pos = Position::startpos();
        assert!(!pos.is_repetition());
        for mv in ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"] {
            let parsed = pos.parse_move(mv).unwrap();
            pos.play(parsed).unwrap();
        }
        assert!(pos.is_repetition());
    }

    #[test]
    fn test_four_field_fen_accepted() {
        let pos = Position::from_fen("6k1/5ppp/8/8/8/8/8/4Q2K w - -").unwrap();
        assert_eq!(pos.side_to_move(), Color::White);
    }

    fn walk(pos: &mut Position, seeds: &[usize]) {
        let Some((&seed, rest)) = seeds.split_first() else {
            return;
        };
        let moves = pos.legal_moves();
        if moves.is_empty() {
            return;
        }
        let mut applied = pos.apply(moves[seed % moves.len()]);
        walk(&mut applied, rest);
    }

    proptest! {
        /// Any sequence of applies, however deep, fully unwinds.
        #[test]
        fn apply_undo_symmetry(seeds in proptest::collection::vec(0usize..256, 1..16)) {
            let mut pos = Position::startpos();
            let key = pos.key();
            let side = pos.side_to_move();

            walk(&mut pos, &seeds);

            prop_assert_eq!(pos.ply(), 0);
            prop_assert_eq!(pos.key(), key);
            prop_assert_eq!(pos.side_to_move(), side);
        }
    }
}
