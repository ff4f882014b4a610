use std::time::Instant;

use crate::movegen::{self, MoveList};
use crate::moves::Undo;
use crate::state::Board;

/// Legal move count to `depth` via apply/revert over pseudo-legal
/// generation.
pub fn perft(board: &mut Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut list = MoveList::new();
    movegen::generate_all(board, &mut list);

    let mut nodes = 0;
    for i in 0..list.count {
        let mv = list.moves[i];
        let mut undo = Undo::default();
        if board.apply(mv, &mut undo) {
            nodes += perft(board, depth - 1);
            board.revert(mv, &undo);
        }
    }
    nodes
}

/// Per-root-move breakdown, handy when a count disagrees.
pub fn perft_divide(board: &mut Board, depth: u32) {
    let mut list = MoveList::new();
    movegen::generate_all(board, &mut list);

    let mut total = 0;
    for i in 0..list.count {
        let mv = list.moves[i];
        let mut undo = Undo::default();
        if board.apply(mv, &mut undo) {
            let nodes = perft(board, depth - 1);
            board.revert(mv, &undo);
            println!("{}: {}", mv.to_uci(board.chess960), nodes);
            total += nodes;
        }
    }
    println!("Total: {}", total);
}

pub fn run_perft_suite() {
    let positions: [(&str, &str, &[u64]); 5] = [
        (
            "Start Position",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            &[1, 20, 400, 8902, 197281, 4865609],
        ),
        (
            "Kiwipete",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            &[1, 48, 2039, 97862, 4085603],
        ),
        (
            "Rook Endgame",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            &[1, 14, 191, 2812, 43238, 674624],
        ),
        (
            "Promotions",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            &[1, 6, 264, 9467, 422333],
        ),
        (
            "Near-Mate Tactics",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            &[1, 44, 1486, 62379, 2103487],
        ),
    ];

    let mut total_nodes = 0u64;
    let mut total_ms = 0u128;

    for (name, fen, expected) in positions {
        let mut board = Board::from_fen(fen).expect("suite FEN parses");
        let depth = expected.len() as u32 - 1;

        let start = Instant::now();
        let nodes = perft(&mut board, depth);
        let elapsed = start.elapsed().as_millis();

        total_nodes += nodes;
        total_ms += elapsed;

        let verdict = if nodes == expected[depth as usize] {
            "ok"
        } else {
            "FAIL"
        };
        println!(
            "{:18} depth {}  nodes {:>12}  time {:>6}ms  {}",
            name, depth, nodes, elapsed, verdict
        );

        if nodes != expected[depth as usize] {
            println!("expected {}", expected[depth as usize]);
            perft_divide(&mut board, depth);
        }
    }

    println!("total nodes {}", total_nodes);
    if total_ms > 0 {
        println!("nps {}", total_nodes as u128 * 1000 / total_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_tables;
    use crate::state::START_FEN;

    #[test]
    fn test_perft_startpos_shallow() {
        init_tables();
        let mut board = Board::from_fen(START_FEN).unwrap();
        assert_eq!(perft(&mut board, 1), 20);
        assert_eq!(perft(&mut board, 2), 400);
        assert_eq!(perft(&mut board, 3), 8902);
        assert_eq!(perft(&mut board, 4), 197281);
    }

    #[test]
    fn test_perft_kiwipete() {
        init_tables();
        let mut board = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&mut board, 1), 48);
        assert_eq!(perft(&mut board, 2), 2039);
        assert_eq!(perft(&mut board, 3), 97862);
    }

    #[test]
    fn test_perft_en_passant_and_promotions() {
        init_tables();
        let mut board = Board::from_fen(
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&mut board, 1), 6);
        assert_eq!(perft(&mut board, 2), 264);
        assert_eq!(perft(&mut board, 3), 9467);
    }

    #[test]
    fn test_perft_castling_heavy() {
        init_tables();
        let mut board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        assert_eq!(perft(&mut board, 1), 26);
    }

    #[test]
    fn test_perft_leaves_board_untouched() {
        init_tables();
        let mut board = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        let original = board.clone();
        perft(&mut board, 3);
        assert_eq!(board, original);
    }
}
