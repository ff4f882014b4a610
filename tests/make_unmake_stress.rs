use rand::Rng;

use ember::movegen::{self, MoveList};
use ember::moves::Undo;
use ember::state::{Board, START_FEN};

/// Random walk from the start position. Every move, legal or not, must
/// revert to a bit-identical board, and the incremental hashes must keep
/// agreeing with a full reconstruction.
#[test]
fn random_walk_apply_revert_roundtrip() {
    ember::init_tables();

    let mut board = Board::from_fen(START_FEN).unwrap();
    let mut rng = rand::rng();

    for _ in 0..5000 {
        let mut list = MoveList::new();
        movegen::generate_all(&board, &mut list);
        if list.count == 0 {
            board = Board::from_fen(START_FEN).unwrap();
            continue;
        }

        let mv = list.moves[rng.random_range(0..list.count)];
        let original = board.clone();

        let mut undo = Undo::default();
        let legal = board.apply(mv, &mut undo);

        if legal {
            assert_eq!(board.hash, board.compute_hash(), "hash drift after {:?}", mv);
            assert_eq!(
                board.pk_hash,
                board.compute_pk_hash(),
                "pawn-king hash drift after {:?}",
                mv
            );
            assert_eq!(
                board.psqt_mat,
                board.compute_psqt_mat(),
                "psqt accumulator drift after {:?}",
                mv
            );
            assert_eq!(board.num_moves, original.num_moves + 1);

            board.revert(mv, &undo);
        }

        assert_eq!(board, original, "apply/revert not the identity for {:?}", mv);
        assert_eq!(board.hash, original.hash);
        assert_eq!(board.num_moves, original.num_moves);

        // Walk on with the move when it was legal
        if legal {
            let mut undo = Undo::default();
            board.apply(mv, &mut undo);
            if board.fifty_move_rule > 100 || board.num_moves > 400 {
                board = Board::from_fen(START_FEN).unwrap();
            }
        }
    }
}

/// Bitboard and mailbox views stay consistent across the walk.
#[test]
fn random_walk_board_invariants() {
    ember::init_tables();

    let mut board = Board::from_fen(START_FEN).unwrap();
    let mut rng = rand::rng();

    for _ in 0..2000 {
        let mut list = MoveList::new();
        movegen::generate_all(&board, &mut list);
        if list.count == 0 {
            board = Board::from_fen(START_FEN).unwrap();
            continue;
        }

        let mv = list.moves[rng.random_range(0..list.count)];
        let mut undo = Undo::default();
        if !board.apply(mv, &mut undo) {
            continue;
        }

        // Piece masks partition the occupancy
        let mut union = 0u64;
        for kind in 0..6 {
            union |= board.pieces[kind].0;
        }
        assert_eq!(union, board.occupied().0);
        assert_eq!(board.colours[0].0 & board.colours[1].0, 0);

        // The mailbox mirrors the bitboards square by square
        for sq in 0..64u8 {
            let piece = board.squares[sq as usize];
            assert_eq!(piece != ember::state::EMPTY, board.occupied().get_bit(sq));
        }

        // One king each
        assert_eq!((board.pieces[5] & board.colours[0]).count(), 1);
        assert_eq!((board.pieces[5] & board.colours[1]).count(), 1);

        if board.num_moves > 400 {
            board = Board::from_fen(START_FEN).unwrap();
        }
    }
}
