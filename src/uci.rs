use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::movegen::{self, MoveList};
use crate::moves::{Move, Undo};
use crate::parameters::SearchParameters;
use crate::search::Limits;
use crate::state::{Board, START_FEN, WHITE};
use crate::thread::ThreadPool;
use crate::tt::TranspositionTable;

const NAME: &str = concat!("Ember ", env!("CARGO_PKG_VERSION"));
const AUTHOR: &str = "the Ember authors";

struct Options {
    hash_mb: usize,
    threads: usize,
    move_overhead: u64,
    chess960: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            hash_mb: 64,
            threads: 1,
            move_overhead: 25,
            chess960: false,
        }
    }
}

pub fn uci_loop() {
    let mut options = Options::default();
    let mut params = SearchParameters::default();

    let tt = Arc::new(TranspositionTable::new(options.hash_mb));
    let pool = Arc::new(Mutex::new(ThreadPool::new(tt, options.threads)));

    let mut board = Board::from_fen(START_FEN).expect("start position parses");
    let stop = Arc::new(AtomicBool::new(false));
    let mut search_thread: Option<thread::JoinHandle<()>> = None;

    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        match stdin.lock().read_line(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts[0] {
            "uci" => {
                println!("id name {}", NAME);
                println!("id author {}", AUTHOR);
                println!("option name Hash type spin default 64 min 1 max 65536");
                println!("option name Threads type spin default 1 min 1 max 256");
                println!("option name MoveOverhead type spin default 25 min 0 max 10000");
                println!("option name UCI_Chess960 type check default false");
                println!("uciok");
            }

            "isready" => println!("readyok"),

            "ucinewgame" => {
                halt_search(&stop, &mut search_thread);
                pool.lock().unwrap().reset();
            }

            "position" => {
                halt_search(&stop, &mut search_thread);
                match parse_position(&parts, options.chess960) {
                    Ok(new_board) => board = new_board,
                    Err(err) => {
                        log::warn!("rejected position command: {}", err);
                        println!("info string invalid position: {}", err);
                    }
                }
            }

            "go" => {
                halt_search(&stop, &mut search_thread);
                stop.store(false, Ordering::Relaxed);

                let limits = parse_go(&parts, board.side_to_move);
                let pool = pool.clone();
                let stop = stop.clone();
                let board = board.clone();
                let params = params.clone();
                let overhead = options.move_overhead;

                search_thread = Some(thread::spawn(move || {
                    let report = pool.lock().unwrap().go(
                        &board, limits, &params, overhead, stop, true,
                    );
                    let chess960 = board.chess960;
                    if report.ponder_move.is_none() {
                        println!("bestmove {}", report.best_move.to_uci(chess960));
                    } else {
                        println!(
                            "bestmove {} ponder {}",
                            report.best_move.to_uci(chess960),
                            report.ponder_move.to_uci(chess960)
                        );
                    }
                }));
            }

            "stop" => halt_search(&stop, &mut search_thread),

            "setoption" => {
                halt_search(&stop, &mut search_thread);
                if let Some((name, value)) = parse_setoption(&parts) {
                    match name.as_str() {
                        "hash" => {
                            if let Ok(mb) = value.parse::<usize>() {
                                options.hash_mb = mb.max(1);
                                pool.lock().unwrap().tt =
                                    Arc::new(TranspositionTable::new(options.hash_mb));
                            }
                        }
                        "threads" => {
                            if let Ok(n) = value.parse::<usize>() {
                                options.threads = n.max(1);
                                pool.lock().unwrap().set_threads(options.threads);
                            }
                        }
                        "moveoverhead" => {
                            if let Ok(ms) = value.parse::<u64>() {
                                options.move_overhead = ms;
                            }
                        }
                        "uci_chess960" => {
                            options.chess960 = value == "true";
                            board.chess960 = board.chess960 || options.chess960;
                        }
                        "searchparams" => {
                            match SearchParameters::load_from_json(&value) {
                                Ok(loaded) => params = loaded,
                                Err(err) => log::warn!("failed to load parameters: {}", err),
                            }
                        }
                        _ => log::info!("ignoring unknown option '{}'", name),
                    }
                }
            }

            "quit" => {
                halt_search(&stop, &mut search_thread);
                break;
            }

            _ => log::info!("ignoring unknown command '{}'", parts[0]),
        }
    }
}

/// `setoption name <Name ...> [value <Value ...>]`. Names are folded to
/// lower case; values keep their spelling (they may be paths).
fn parse_setoption(parts: &[&str]) -> Option<(String, String)> {
    let mut name = String::new();
    let mut value = String::new();
    let mut in_value = false;

    for part in &parts[1..] {
        match *part {
            "name" => in_value = false,
            "value" => in_value = true,
            token => {
                let current = if in_value { &mut value } else { &mut name };
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(token);
            }
        }
    }

    if name.is_empty() {
        None
    } else {
        Some((name.to_lowercase(), value))
    }
}

fn halt_search(stop: &Arc<AtomicBool>, search_thread: &mut Option<thread::JoinHandle<()>>) {
    stop.store(true, Ordering::Relaxed);
    if let Some(handle) = search_thread.take() {
        let _ = handle.join();
    }
}

fn parse_position(parts: &[&str], chess960: bool) -> Result<Board, String> {
    let mut move_index = 0;

    let mut board = if parts.get(1) == Some(&"startpos") {
        if parts.get(2) == Some(&"moves") {
            move_index = 3;
        }
        Board::from_fen(START_FEN)?
    } else if parts.get(1) == Some(&"fen") {
        let mut fen = String::new();
        let mut i = 2;
        while i < parts.len() && parts[i] != "moves" {
            fen.push_str(parts[i]);
            fen.push(' ');
            i += 1;
        }
        if i < parts.len() {
            move_index = i + 1;
        }
        Board::from_fen(fen.trim())?
    } else {
        return Err("expected 'startpos' or 'fen'".into());
    };

    board.chess960 = board.chess960 || chess960;

    if move_index > 0 {
        for text in &parts[move_index..] {
            let mv = parse_move(&board, text).ok_or_else(|| format!("bad move '{}'", text))?;
            let mut undo = Undo::default();
            if !board.apply(mv, &mut undo) {
                return Err(format!("illegal move '{}'", text));
            }
        }
    }

    Ok(board)
}

/// Match against generated moves; both castle notations are accepted
/// regardless of the Chess960 setting.
pub fn parse_move(board: &Board, text: &str) -> Option<Move> {
    let mut list = MoveList::new();
    movegen::generate_all(board, &mut list);

    for i in 0..list.count {
        let mv = list.moves[i];
        if mv.to_uci(false) == text || mv.to_uci(true) == text {
            return Some(mv);
        }
    }
    None
}

fn parse_go(parts: &[&str], side: usize) -> Limits {
    let mut depth: Option<i32> = None;
    let mut movetime: Option<u64> = None;
    let mut nodes: Option<u64> = None;
    let mut wtime: Option<u64> = None;
    let mut btime: Option<u64> = None;
    let mut winc: u64 = 0;
    let mut binc: u64 = 0;
    let mut moves_to_go: Option<u32> = None;
    let mut infinite = false;

    let mut i = 1;
    while i < parts.len() {
        let value = parts.get(i + 1).copied().unwrap_or("");
        match parts[i] {
            "depth" => {
                depth = value.parse().ok();
                i += 1;
            }
            "movetime" => {
                movetime = value.parse().ok();
                i += 1;
            }
            "nodes" => {
                nodes = value.parse().ok();
                i += 1;
            }
            "wtime" => {
                wtime = value.parse().ok();
                i += 1;
            }
            "btime" => {
                btime = value.parse().ok();
                i += 1;
            }
            "winc" => {
                winc = value.parse().unwrap_or(0);
                i += 1;
            }
            "binc" => {
                binc = value.parse().unwrap_or(0);
                i += 1;
            }
            "movestogo" => {
                moves_to_go = value.parse().ok();
                i += 1;
            }
            "infinite" => infinite = true,
            _ => {}
        }
        i += 1;
    }

    if infinite {
        Limits::Infinite
    } else if let Some(d) = depth {
        Limits::Depth(d)
    } else if let Some(ms) = movetime {
        Limits::MoveTime(ms)
    } else if let Some(n) = nodes {
        Limits::Nodes(n)
    } else if wtime.is_some() || btime.is_some() {
        let (time, inc) = if side == WHITE {
            (wtime.unwrap_or(0), winc)
        } else {
            (btime.unwrap_or(0), binc)
        };
        Limits::SelfClock {
            time,
            inc,
            moves_to_go,
        }
    } else {
        Limits::Infinite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_tables;
    use crate::state::BLACK;

    #[test]
    fn test_parse_position_with_moves() {
        init_tables();
        let parts: Vec<&str> = "position startpos moves e2e4 e7e5 g1f3"
            .split_whitespace()
            .collect();
        let board = parse_position(&parts, false).unwrap();
        assert_eq!(board.side_to_move, BLACK);
        assert_eq!(board.full_move_counter, 1);
        assert!(board.num_moves == 3);
    }

    #[test]
    fn test_parse_position_rejects_illegal() {
        init_tables();
        let parts: Vec<&str> = "position startpos moves e2e5".split_whitespace().collect();
        assert!(parse_position(&parts, false).is_err());
    }

    #[test]
    fn test_parse_castle_both_notations() {
        init_tables();
        let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let standard = parse_move(&board, "e1g1").unwrap();
        let frc = parse_move(&board, "e1h1").unwrap();
        assert_eq!(standard, frc);
        assert_eq!(standard.kind(), Move::CASTLE);
    }

    #[test]
    fn test_parse_go_limits() {
        match parse_go(&["go", "depth", "9"], WHITE) {
            Limits::Depth(9) => {}
            other => panic!("expected depth limit, got {:?}", other),
        }
        match parse_go(&["go", "movetime", "1500"], WHITE) {
            Limits::MoveTime(1500) => {}
            other => panic!("expected movetime limit, got {:?}", other),
        }
        match parse_go(
            &["go", "wtime", "60000", "btime", "50000", "binc", "900"],
            BLACK,
        ) {
            Limits::SelfClock {
                time: 50000,
                inc: 900,
                moves_to_go: None,
            } => {}
            other => panic!("expected self clock, got {:?}", other),
        }
        match parse_go(&["go"], WHITE) {
            Limits::Infinite => {}
            other => panic!("expected infinite, got {:?}", other),
        }
    }
}
