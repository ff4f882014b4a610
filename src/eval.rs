use crate::bitboard::{adjacent_files_mask, file_mask, file_of, rank_of, Bitboard};
use crate::movegen::is_passed_pawn;
use crate::psqt::{s, score_eg, score_mg, Score};
use crate::state::{
    piece_colour, Board, BISHOP, BLACK, KNIGHT, PAWN, QUEEN, ROOK, WHITE,
};
use crate::tt::PawnKingTable;

// Coefficients are tunable; only their sign and rough scale matter here.
const TEMPO: i32 = 20;

const BISHOP_PAIR: Score = s(25, 62);

const PAWN_ISOLATED: Score = s(-11, -13);
const PAWN_STACKED: Score = s(-8, -19);

#[rustfmt::skip]
const PASSED_PAWN_RANK: [Score; 8] = [
    s(0, 0), s(-8, 8), s(-6, 12), s(-4, 33),
    s(18, 56), s(49, 98), s(112, 145), s(0, 0),
];

const PHASE_TOTAL: i32 = 24;

/// Static evaluation from the side to move's point of view. Material and
/// piece placement come from the incrementally maintained accumulator;
/// pawn structure goes through the thread's pawn-king cache.
pub fn evaluate(board: &Board, pk_table: &mut PawnKingTable) -> i32 {
    let mut eval = board.psqt_mat;

    if (board.pieces[BISHOP] & board.colours[WHITE]).several() {
        eval = eval.wrapping_add(BISHOP_PAIR);
    }
    if (board.pieces[BISHOP] & board.colours[BLACK]).several() {
        eval = eval.wrapping_sub(BISHOP_PAIR);
    }

    let (pk_eval, passed) = match pk_table.get(board.pk_hash) {
        Some(entry) => (entry.eval, entry.passed),
        None => {
            let (pk_eval, passed) = evaluate_pawn_structure(board);
            pk_table.store(board.pk_hash, passed, pk_eval);
            (pk_eval, passed)
        }
    };
    eval = eval.wrapping_add(pk_eval);

    // Passed-pawn advancement sits outside the cache
    let mut passers = passed;
    while !passers.is_empty() {
        let sq = passers.poplsb();
        let colour = piece_colour(board.squares[sq as usize]);
        let rank = if colour == WHITE {
            rank_of(sq)
        } else {
            7 - rank_of(sq)
        };
        let bonus = PASSED_PAWN_RANK[rank as usize];
        if colour == WHITE {
            eval = eval.wrapping_add(bonus);
        } else {
            eval = eval.wrapping_sub(bonus);
        }
    }

    let phase = game_phase(board);
    let mg = score_mg(eval);
    let eg = score_eg(eval);
    let interpolated = (mg * phase + eg * (PHASE_TOTAL - phase)) / PHASE_TOTAL;

    let value = if board.side_to_move == WHITE {
        interpolated
    } else {
        -interpolated
    };
    value + TEMPO
}

/// Isolated and stacked penalties plus the passed-pawn set, white positive,
/// keyed by the pawn-king hash.
fn evaluate_pawn_structure(board: &Board) -> (Score, Bitboard) {
    let mut eval: Score = 0;
    let mut passed = Bitboard::EMPTY;

    for colour in [WHITE, BLACK] {
        let our_pawns = board.pieces[PAWN] & board.colours[colour];
        let mut pawns = our_pawns;

        while !pawns.is_empty() {
            let sq = pawns.poplsb();
            let file = file_of(sq);

            let mut term: Score = 0;
            if (adjacent_files_mask(file) & our_pawns).is_empty() {
                term = term.wrapping_add(PAWN_ISOLATED);
            }
            if (file_mask(file) & our_pawns).several() {
                term = term.wrapping_add(PAWN_STACKED);
            }
            if is_passed_pawn(board, colour, sq) {
                passed.set_bit(sq);
            }

            if colour == WHITE {
                eval = eval.wrapping_add(term);
            } else {
                eval = eval.wrapping_sub(term);
            }
        }
    }

    (eval, passed)
}

fn game_phase(board: &Board) -> i32 {
    let minors = (board.pieces[KNIGHT] | board.pieces[BISHOP]).count() as i32;
    let rooks = board.pieces[ROOK].count() as i32;
    let queens = board.pieces[QUEEN].count() as i32;
    (minors + 2 * rooks + 4 * queens).min(PHASE_TOTAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_tables;
    use crate::state::START_FEN;

    #[test]
    fn test_startpos_is_balanced() {
        init_tables();
        let board = Board::from_fen(START_FEN).unwrap();
        let mut pk = PawnKingTable::new();
        let value = evaluate(&board, &mut pk);
        // Symmetric position: only the tempo term remains
        assert_eq!(value, TEMPO);
    }

    #[test]
    fn test_eval_flips_with_side_to_move() {
        init_tables();
        let mut pk = PawnKingTable::new();
        let white =
            evaluate(&Board::from_fen("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").unwrap(), &mut pk);
        let black =
            evaluate(&Board::from_fen("4k3/8/8/8/8/8/4P3/4K3 b - - 0 1").unwrap(), &mut pk);
        assert_eq!(white - TEMPO, -(black - TEMPO));
        assert!(white > 0, "the side up a pawn should be ahead");
    }

    #[test]
    fn test_pawn_cache_agrees_with_fresh_compute() {
        init_tables();
        let board =
            Board::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
        let mut pk = PawnKingTable::new();
        let cold = evaluate(&board, &mut pk);
        let warm = evaluate(&board, &mut pk);
        assert_eq!(cold, warm);
    }

    #[test]
    fn test_passed_pawn_detected() {
        init_tables();
        let board = Board::from_fen("4k3/8/8/3P4/8/8/8/4K3 w - - 0 1").unwrap();
        let (_, passed) = evaluate_pawn_structure(&board);
        assert!(passed.get_bit(35));
    }
}
