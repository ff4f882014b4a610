pub mod bitboard;
pub mod eval;
pub mod history;
pub mod logging;
pub mod movegen;
pub mod moves;
pub mod parameters;
pub mod perft;
pub mod picker;
pub mod psqt;
pub mod search;
pub mod state;
pub mod thread;
pub mod time;
pub mod tt;
pub mod uci;
pub mod zobrist;

use std::env;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// One-time setup of every global table. Idempotent, so tests call it
/// freely.
pub fn init_tables() {
    zobrist::init_zobrist();
    bitboard::init_attack_tables();
    psqt::init_psqt();
}

const BENCH_POSITIONS: [&str; 4] = [
    state::START_FEN,
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
];

const BENCH_DEPTH: i32 = 11;

fn run_bench() {
    let tt = Arc::new(tt::TranspositionTable::new(16));
    let mut pool = thread::ThreadPool::new(tt, 1);
    let params = parameters::SearchParameters::default();

    let start = std::time::Instant::now();
    let mut nodes = 0u64;

    for (i, fen) in BENCH_POSITIONS.iter().enumerate() {
        let board = state::Board::from_fen(fen).expect("bench FEN parses");
        println!("position #{}: {}", i + 1, fen);

        let stop = Arc::new(AtomicBool::new(false));
        let report = pool.go(
            &board,
            search::Limits::Depth(BENCH_DEPTH),
            &params,
            0,
            stop,
            true,
        );
        nodes += report.nodes;
        pool.reset();
    }

    let ms = start.elapsed().as_millis().max(1);
    println!("------------------------");
    println!("time  : {}ms", ms);
    println!("nodes : {}", nodes);
    println!("nps   : {}", nodes as u128 * 1000 / ms);
}

pub fn run_cli() {
    logging::init_logging();
    init_tables();

    let args: Vec<String> = env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "perft" => {
                perft::run_perft_suite();
                return;
            }
            "bench" => {
                run_bench();
                return;
            }
            other => {
                eprintln!("unknown argument '{}', expected 'perft' or 'bench'", other);
                return;
            }
        }
    }

    // UCI mode on a thread with a deep stack for the recursive search
    let builder = std::thread::Builder::new()
        .name("uci_thread".into())
        .stack_size(32 * 1024 * 1024);

    let handle = builder
        .spawn(|| {
            uci::uci_loop();
        })
        .expect("spawning the UCI thread");

    handle.join().expect("joining the UCI thread");
}
