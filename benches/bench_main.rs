use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use ember::parameters::SearchParameters;
use ember::perft::perft;
use ember::search::Limits;
use ember::state::{Board, START_FEN};
use ember::thread::ThreadPool;
use ember::tt::TranspositionTable;

fn bench_perft(c: &mut Criterion) {
    ember::init_tables();
    let board = Board::from_fen(START_FEN).unwrap();

    c.bench_function("perft_4_startpos", |b| {
        b.iter(|| {
            let mut board = board.clone();
            assert_eq!(perft(&mut board, 4), 197281);
        })
    });
}

fn bench_search(c: &mut Criterion) {
    ember::init_tables();
    let board = Board::from_fen(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    )
    .unwrap();
    let params = SearchParameters::default();

    c.bench_function("search_depth_8_kiwipete", |b| {
        b.iter(|| {
            let tt = Arc::new(TranspositionTable::new(16));
            let mut pool = ThreadPool::new(tt, 1);
            let stop = Arc::new(AtomicBool::new(false));
            let report = pool.go(&board, Limits::Depth(8), &params, 0, stop, false);
            assert!(!report.best_move.is_none());
        })
    });
}

criterion_group!(benches, bench_perft, bench_search);
criterion_main!(benches);
