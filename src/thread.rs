use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::history::{HistoryTable, KillerTable};
use crate::movegen::{self, MoveList};
use crate::moves::{Move, Undo};
use crate::parameters::SearchParameters;
use crate::search::{self, Limits, SearchThread};
use crate::state::Board;
use crate::time::TimeManager;
use crate::tt::{PawnKingTable, TranspositionTable};

pub const ABORT_NONE: u8 = 0;
pub const ABORT_DEPTH: u8 = 1;
pub const ABORT_ALL: u8 = 2;

/// Tables a worker keeps between searches: move ordering state and the
/// pawn-king cache. Thread-owned to avoid any sharing on the hot path.
pub struct WorkerTables {
    pub history: HistoryTable,
    pub killers: KillerTable,
    pub pk_table: PawnKingTable,
}

impl WorkerTables {
    fn new() -> Self {
        Self {
            history: HistoryTable::new(),
            killers: KillerTable::new(),
            pk_table: PawnKingTable::new(),
        }
    }

    fn reset(&mut self) {
        self.history.clear();
        self.killers.clear();
        self.pk_table.clear();
    }
}

/// State every searcher can see: abort words, published depths and node
/// counts, and the wall-clock budget.
pub struct SharedState {
    pub abort: Vec<AtomicU8>,
    pub depths: Mutex<Vec<i32>>,
    pub node_counts: Vec<AtomicU64>,
    pub time: TimeManager,
    pub stop: Arc<AtomicBool>,
    pub num_threads: usize,
}

impl SharedState {
    fn new(num_threads: usize, time: TimeManager, stop: Arc<AtomicBool>) -> Self {
        Self {
            abort: (0..num_threads).map(|_| AtomicU8::new(ABORT_NONE)).collect(),
            depths: Mutex::new(vec![0; num_threads]),
            node_counts: (0..num_threads).map(|_| AtomicU64::new(0)).collect(),
            time,
            stop,
            num_threads,
        }
    }

    pub fn abort_all(&self) {
        for word in &self.abort {
            word.store(ABORT_ALL, Ordering::Relaxed);
        }
    }

    pub fn total_nodes(&self) -> u64 {
        self.node_counts
            .iter()
            .map(|n| n.load(Ordering::Relaxed))
            .sum()
    }
}

pub struct SearchReport {
    pub best_move: Move,
    pub ponder_move: Move,
    pub value: i32,
    pub nodes: u64,
    pub depth: i32,
}

/// Owns the worker tables and runs one Lazy SMP search per `go`. Workers
/// share the transposition table and the abort words; everything else is
/// copied or thread-local.
pub struct ThreadPool {
    pub tt: Arc<TranspositionTable>,
    workers: Vec<WorkerTables>,
}

impl ThreadPool {
    pub fn new(tt: Arc<TranspositionTable>, num_threads: usize) -> Self {
        let mut workers = Vec::new();
        workers.resize_with(num_threads.max(1), WorkerTables::new);
        Self { tt, workers }
    }

    pub fn set_threads(&mut self, num_threads: usize) {
        self.workers.clear();
        self.workers.resize_with(num_threads.max(1), WorkerTables::new);
    }

    pub fn num_threads(&self) -> usize {
        self.workers.len()
    }

    /// Fresh game: wipe the shared table and every worker's private state.
    pub fn reset(&mut self) {
        self.tt.clear();
        for worker in &mut self.workers {
            worker.reset();
        }
    }

    pub fn go(
        &mut self,
        board: &Board,
        limits: Limits,
        params: &SearchParameters,
        overhead: u64,
        stop: Arc<AtomicBool>,
        report: bool,
    ) -> SearchReport {
        self.tt.new_search();

        let num_threads = self.workers.len();
        let shared = SharedState::new(num_threads, TimeManager::new(&limits, overhead), stop);
        let tt = self.tt.clone();

        let mut results: Vec<Option<SearchReport>> = Vec::new();
        results.resize_with(num_threads, || None);

        thread::scope(|scope| {
            let shared = &shared;
            let tt = &tt;
            let mut handles = Vec::new();

            for (index, (worker, slot)) in self
                .workers
                .iter_mut()
                .zip(results.iter_mut())
                .enumerate()
            {
                let board = board.clone();
                let params = params.clone();

                handles.push(scope.spawn(move || {
                    let mut thread = SearchThread::new(
                        index,
                        board,
                        worker,
                        tt,
                        shared,
                        limits,
                        params,
                        report && index == 0,
                    );
                    search::iterative_deepening(&mut thread);
                    *slot = Some(SearchReport {
                        best_move: thread.best_move,
                        ponder_move: thread.ponder_move,
                        value: thread.scores[thread.completed as usize],
                        nodes: thread.nodes,
                        depth: thread.completed,
                    });
                }));
            }

            for handle in handles {
                let _ = handle.join();
            }
        });

        let total_nodes = shared.total_nodes();
        let mut main = results[0].take().unwrap_or(SearchReport {
            best_move: Move::NONE,
            ponder_move: Move::NONE,
            value: 0,
            nodes: 0,
            depth: 0,
        });
        main.nodes = total_nodes;

        // An immediate abort can leave no completed depth behind; answer
        // with any legal move rather than nothing
        if main.best_move.is_none() {
            main.best_move = first_legal_move(board);
        }

        main
    }
}

fn first_legal_move(board: &Board) -> Move {
    let mut probe = board.clone();
    let mut list = MoveList::new();
    movegen::generate_all(&probe, &mut list);

    for i in 0..list.count {
        let mut undo = Undo::default();
        if probe.apply(list.moves[i], &mut undo) {
            probe.revert(list.moves[i], &undo);
            return list.moves[i];
        }
    }
    Move::NONE
}
