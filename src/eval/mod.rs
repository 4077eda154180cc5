//! Static position evaluation.
//!
//! Scores a quiet position from the perspective of the side to move:
//! positive means the mover stands better. The score is composed of
//! material, piece-square placement blended toward endgame tables as the
//! opponent's material comes off, a mop-up term for won endgames, pawn
//! structure, and a king pawn-shield / open-file safety term.

pub mod psqt;

use chess::{BitBoard, Board, Color, File, Piece, Rank, Square, ALL_SQUARES, EMPTY};
use once_cell::sync::Lazy;

use psqt::{
    table_value, BISHOPS, BISHOP_VALUE, KING, KING_END, KNIGHTS, KNIGHT_VALUE, PAWNS, PAWNS_END,
    PAWN_VALUE, QUEENS, QUEEN_VALUE, ROOKS, ROOK_VALUE,
};

/// Passed pawn bonus indexed by squares left to promotion.
const PASSED_PAWN_BONUSES: [i32; 7] = [0, 120, 80, 50, 30, 15, 15];

/// Isolated pawn penalty indexed by how many pawns are isolated.
const ISOLATED_PAWN_PENALTY_BY_COUNT: [i32; 9] = [0, -10, -25, -50, -75, -75, -75, -75, -75];

/// Per-slot penalty for a missing shield pawn; squared once summed.
const SHIELD_SCORES: [i32; 6] = [4, 7, 4, 3, 6, 3];

/// Endgame transition weights per piece type; a full complement of minor and
/// major pieces sums to `ENDGAME_START_WEIGHT`.
const QUEEN_ENDGAME_WEIGHT: i32 = 45;
const ROOK_ENDGAME_WEIGHT: i32 = 20;
const BISHOP_ENDGAME_WEIGHT: i32 = 10;
const KNIGHT_ENDGAME_WEIGHT: i32 = 10;
const ENDGAME_START_WEIGHT: i32 = 2 * ROOK_ENDGAME_WEIGHT
    + 2 * BISHOP_ENDGAME_WEIGHT
    + 2 * KNIGHT_ENDGAME_WEIGHT
    + QUEEN_ENDGAME_WEIGHT;

/// The two shield rows in front of each king square, per color, in slot
/// order (near row first, left to right).
static SHIELD_SQUARES: Lazy<[[Vec<Square>; 64]; 2]> = Lazy::new(|| {
    std::array::from_fn(|color_idx| {
        std::array::from_fn(|sq_idx| {
            let sq = ALL_SQUARES[sq_idx];
            let rank = sq.get_rank().to_index() as i32;
            let file = sq.get_file().to_index() as i32;
            let dir: i32 = if color_idx == Color::White.to_index() { 1 } else { -1 };
            let mut squares = Vec::with_capacity(6);
            for row in 1..=2 {
                let r = rank + dir * row;
                if !(0..8).contains(&r) {
                    continue;
                }
                for offset in -1..=1 {
                    let f = file + offset;
                    if (0..8).contains(&f) {
                        squares.push(Square::make_square(
                            Rank::from_index(r as usize),
                            File::from_index(f as usize),
                        ));
                    }
                }
            }
            squares
        })
    })
});

/// Material census for one side, with the endgame transition weight derived
/// from the non-pawn material still on the board (0 = opening, 1 = endgame).
pub(crate) struct MaterialInfo {
    pub rooks: i32,
    pub queens: i32,
    pub material_score: i32,
    pub endgame_t: f32,
}

impl MaterialInfo {
    pub(crate) fn gather(board: &Board, color: Color) -> Self {
        let ours = *board.color_combined(color);
        let pawns = (*board.pieces(Piece::Pawn) & ours).popcnt() as i32;
        let knights = (*board.pieces(Piece::Knight) & ours).popcnt() as i32;
        let bishops = (*board.pieces(Piece::Bishop) & ours).popcnt() as i32;
        let rooks = (*board.pieces(Piece::Rook) & ours).popcnt() as i32;
        let queens = (*board.pieces(Piece::Queen) & ours).popcnt() as i32;

        let material_score = pawns * PAWN_VALUE
            + knights * KNIGHT_VALUE
            + bishops * BISHOP_VALUE
            + rooks * ROOK_VALUE
            + queens * QUEEN_VALUE;

        let weight_sum = queens * QUEEN_ENDGAME_WEIGHT
            + rooks * ROOK_ENDGAME_WEIGHT
            + bishops * BISHOP_ENDGAME_WEIGHT
            + knights * KNIGHT_ENDGAME_WEIGHT;
        let endgame_t = 1.0 - (weight_sum as f32 / ENDGAME_START_WEIGHT as f32).min(1.0);

        MaterialInfo {
            rooks,
            queens,
            material_score,
            endgame_t,
        }
    }
}

/// Evaluate `board` from the mover's perspective.
#[must_use]
pub fn evaluate(board: &Board) -> i32 {
    let white = MaterialInfo::gather(board, Color::White);
    let black = MaterialInfo::gather(board, Color::Black);

    let white_pst = piece_square_score(board, Color::White, black.endgame_t);
    let black_pst = piece_square_score(board, Color::Black, white.endgame_t);

    let white_total = white.material_score
        + white_pst
        + mop_up(board, Color::White, &white, &black)
        + pawn_structure(board, Color::White)
        + king_pawn_shield(board, Color::White, &black, black_pst);
    let black_total = black.material_score
        + black_pst
        + mop_up(board, Color::Black, &black, &white)
        + pawn_structure(board, Color::Black)
        + king_pawn_shield(board, Color::Black, &white, white_pst);

    let score = white_total - black_total;
    match board.side_to_move() {
        Color::White => score,
        Color::Black => -score,
    }
}

fn side_pieces(board: &Board, piece: Piece, color: Color) -> BitBoard {
    *board.pieces(piece) & *board.color_combined(color)
}

fn blend(early: i32, end: i32, t: f32) -> i32 {
    (early as f32 * (1.0 - t) + end as f32 * t) as i32
}

/// Piece-square score for one side; the pawn and king tables are blended by
/// how far the opponent has entered the endgame.
pub(crate) fn piece_square_score(board: &Board, color: Color, enemy_endgame_t: f32) -> i32 {
    let mut score = 0;
    for (piece, table) in [
        (Piece::Knight, &KNIGHTS),
        (Piece::Bishop, &BISHOPS),
        (Piece::Rook, &ROOKS),
        (Piece::Queen, &QUEENS),
    ] {
        for sq in side_pieces(board, piece, color) {
            score += table_value(table, sq, color);
        }
    }

    let mut pawns_early = 0;
    let mut pawns_end = 0;
    for sq in side_pieces(board, Piece::Pawn, color) {
        pawns_early += table_value(&PAWNS, sq, color);
        pawns_end += table_value(&PAWNS_END, sq, color);
    }
    score += blend(pawns_early, pawns_end, enemy_endgame_t);

    let king_sq = board.king_square(color);
    score += blend(
        table_value(&KING, king_sq, color),
        table_value(&KING_END, king_sq, color),
        enemy_endgame_t,
    );

    score
}

fn chebyshev(a: Square, b: Square) -> i32 {
    let file_dist =
        (a.get_file().to_index() as i32 - b.get_file().to_index() as i32).abs();
    let rank_dist =
        (a.get_rank().to_index() as i32 - b.get_rank().to_index() as i32).abs();
    file_dist.max(rank_dist)
}

fn center_distance(sq: Square) -> i32 {
    let file = sq.get_file().to_index() as i32;
    let rank = sq.get_rank().to_index() as i32;
    let file_dist = (3 - file).max(file - 4).max(0);
    let rank_dist = (3 - rank).max(rank - 4).max(0);
    file_dist.max(rank_dist)
}

/// Reward marching the king at the enemy king and boxing it toward the edge,
/// but only once clearly ahead and with the opponent into the endgame.
pub(crate) fn mop_up(
    board: &Board,
    color: Color,
    friendly: &MaterialInfo,
    enemy: &MaterialInfo,
) -> i32 {
    if friendly.material_score > enemy.material_score + 2 * PAWN_VALUE && enemy.endgame_t > 0.0 {
        let my_king = board.king_square(color);
        let enemy_king = board.king_square(!color);
        let mut score = (14 - chebyshev(my_king, enemy_king)) * 4;
        score += center_distance(enemy_king) * 10;
        (score as f32 * enemy.endgame_t) as i32
    } else {
        0
    }
}

fn pawn_file_mask(pawns: BitBoard) -> u8 {
    let mut mask = 0u8;
    for sq in pawns {
        mask |= 1 << sq.get_file().to_index();
    }
    mask
}

/// Passed pawn bonus and isolated pawn penalty for one side.
pub(crate) fn pawn_structure(board: &Board, color: Color) -> i32 {
    let my_pawns = side_pieces(board, Piece::Pawn, color);
    let their_pawns = side_pieces(board, Piece::Pawn, !color);

    let their_squares: Vec<(i32, i32)> = their_pawns
        .map(|sq| {
            (
                sq.get_file().to_index() as i32,
                sq.get_rank().to_index() as i32,
            )
        })
        .collect();
    let my_files = pawn_file_mask(my_pawns);

    let mut score = 0;
    let mut isolated = 0usize;
    for sq in my_pawns {
        let file = sq.get_file().to_index() as i32;
        let rank = sq.get_rank().to_index() as i32;

        let passed = their_squares.iter().all(|&(tf, tr)| {
            (tf - file).abs() > 1
                || match color {
                    Color::White => tr <= rank,
                    Color::Black => tr >= rank,
                }
        });
        if passed {
            let relative_rank = match color {
                Color::White => rank,
                Color::Black => 7 - rank,
            };
            score += PASSED_PAWN_BONUSES[(7 - relative_rank) as usize];
        }

        let has_neighbor = (file > 0 && my_files & (1 << (file - 1)) != 0)
            || (file < 7 && my_files & (1 << (file + 1)) != 0);
        if !has_neighbor {
            isolated += 1;
        }
    }

    score + ISOLATED_PAWN_PENALTY_BY_COUNT[isolated.min(8)]
}

/// King safety for one side: missing shield pawns in front of a castled
/// king, an uncastled king scaled by enemy development, and open files next
/// to the king when the opponent has heavy pieces to use them. The whole
/// term fades as the opponent enters the endgame, faster without a queen.
pub(crate) fn king_pawn_shield(
    board: &Board,
    color: Color,
    enemy: &MaterialInfo,
    enemy_pst_score: i32,
) -> i32 {
    if enemy.endgame_t >= 1.0 {
        return 0;
    }

    let king_sq = board.king_square(color);
    let king_file = king_sq.get_file().to_index() as i32;
    let my_pawns = side_pieces(board, Piece::Pawn, color);
    let their_pawns = side_pieces(board, Piece::Pawn, !color);

    let mut shield_penalty = 0i32;
    let mut uncastled_penalty = 0.0f32;

    if king_file <= 2 || king_file >= 5 {
        let squares = &SHIELD_SQUARES[color.to_index()][king_sq.to_index()];
        for i in 0..squares.len() / 2 {
            if my_pawns & BitBoard::from_square(squares[i]) == EMPTY {
                if i + 3 < squares.len()
                    && my_pawns & BitBoard::from_square(squares[i + 3]) != EMPTY
                    && i + 3 < SHIELD_SCORES.len()
                {
                    shield_penalty += SHIELD_SCORES[i + 3];
                } else {
                    shield_penalty += SHIELD_SCORES[i];
                }
            }
        }
        shield_penalty *= shield_penalty;
    } else {
        let development = ((enemy_pst_score as f32 + 10.0) / 130.0).clamp(0.0, 1.0);
        uncastled_penalty = 50.0 * development;
    }

    let mut open_file_penalty = 0i32;
    if enemy.rooks > 1 || (enemy.rooks == 1 && enemy.queens > 0) {
        let my_files = pawn_file_mask(my_pawns);
        let their_files = pawn_file_mask(their_pawns);
        let clamped = king_file.clamp(1, 6);
        for file in clamped..=clamped + 1 {
            let is_king_file = file == king_file;
            if their_files & (1 << file) == 0 {
                open_file_penalty += if is_king_file { 25 } else { 15 };
                if my_files & (1 << file) == 0 {
                    open_file_penalty += if is_king_file { 15 } else { 10 };
                }
            }
        }
    }

    let mut weight = 1.0 - enemy.endgame_t;
    if enemy.queens == 0 {
        weight *= 0.6;
    }

    -((((shield_penalty + open_file_penalty) as f32 + uncastled_penalty) * weight) as i32)
}
