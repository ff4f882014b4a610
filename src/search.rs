use std::sync::atomic::Ordering;

use crate::eval;
use crate::moves::{Move, Undo};
use crate::parameters::SearchParameters;
use crate::picker::MovePicker;
use crate::psqt::SEE_PIECE_VALUES;
use crate::state::{piece_kind, Board, EMPTY};
use crate::thread::{SharedState, WorkerTables, ABORT_ALL, ABORT_DEPTH, ABORT_NONE};
use crate::tt::{
    value_from_tt, value_to_tt, TranspositionTable, BOUND_ALL, BOUND_CUT, BOUND_PV,
};
use crate::movegen;

pub const MAX_PLY: usize = 128;
pub const INFINITY: i32 = 32500;
pub const MATE: i32 = 31000;
pub const MATE_IN_MAX: i32 = MATE - MAX_PLY as i32;

#[derive(Clone, Copy, Debug)]
pub enum Limits {
    Infinite,
    Depth(i32),
    MoveTime(u64),
    SelfClock {
        time: u64,
        inc: u64,
        moves_to_go: Option<u32>,
    },
    Nodes(u64),
}

#[derive(Clone, Copy)]
pub struct PvLine {
    pub moves: [Move; MAX_PLY],
    pub len: usize,
}

impl PvLine {
    pub fn new() -> Self {
        Self {
            moves: [Move::NONE; MAX_PLY],
            len: 0,
        }
    }

    fn update(&mut self, mv: Move, child: &PvLine) {
        self.moves[0] = mv;
        let n = child.len.min(MAX_PLY - 1);
        self.moves[1..1 + n].copy_from_slice(&child.moves[..n]);
        self.len = n + 1;
    }
}

impl Default for PvLine {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one searcher owns: its board copy, its tables, and its
/// counters. The transposition table and the shared pool state are the
/// only cross-thread structures it touches.
pub struct SearchThread<'a> {
    pub index: usize,
    pub board: Board,
    pub tables: &'a mut WorkerTables,
    pub tt: &'a TranspositionTable,
    pub shared: &'a SharedState,
    pub limits: Limits,
    pub params: SearchParameters,
    pub nodes: u64,
    pub seldepth: i32,
    pub stopped: bool,
    pub move_stack: [Move; MAX_PLY + 1],
    pub pv: PvLine,
    pub best_move: Move,
    pub ponder_move: Move,
    pub scores: [i32; MAX_PLY + 1],
    pub depth_times: [u64; MAX_PLY + 1],
    pub completed: i32,
    pub report: bool,
}

impl<'a> SearchThread<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: usize,
        board: Board,
        tables: &'a mut WorkerTables,
        tt: &'a TranspositionTable,
        shared: &'a SharedState,
        limits: Limits,
        params: SearchParameters,
        report: bool,
    ) -> Self {
        Self {
            index,
            board,
            tables,
            tt,
            shared,
            limits,
            params,
            nodes: 0,
            seldepth: 0,
            stopped: false,
            move_stack: [Move::NONE; MAX_PLY + 1],
            pv: PvLine::new(),
            best_move: Move::NONE,
            ponder_move: Move::NONE,
            scores: [0; MAX_PLY + 1],
            depth_times: [0; MAX_PLY + 1],
            completed: 0,
            report,
        }
    }

    #[inline(always)]
    fn main_thread(&self) -> bool {
        self.index == 0
    }
}

/// The per-worker deepening loop: pick a target depth (helpers skew past
/// depths half the pool already reached), run the aspiration window, and
/// coordinate the abort protocol.
pub fn iterative_deepening(thread: &mut SearchThread) {
    let depth_limit = match thread.limits {
        Limits::Depth(d) => d.clamp(1, MAX_PLY as i32 - 1),
        _ => MAX_PLY as i32 - 1,
    };

    let mut depth = 0;
    let mut retry = false;

    loop {
        if !retry {
            depth += 1;

            if !thread.main_thread() && thread.shared.num_threads > 1 {
                let mut depths = thread.shared.depths.lock().unwrap();
                loop {
                    let at_depth = depths
                        .iter()
                        .enumerate()
                        .filter(|&(i, &d)| i != thread.index && d >= depth)
                        .count();
                    if 2 * at_depth < thread.shared.num_threads {
                        break;
                    }
                    depth += 1;
                }
                depths[thread.index] = depth;
            } else {
                thread.shared.depths.lock().unwrap()[thread.index] = depth;
            }
        }
        retry = false;

        if depth > depth_limit {
            break;
        }

        thread.seldepth = 0;
        let value = aspiration_window(thread, depth);

        let abort = thread.shared.abort[thread.index].load(Ordering::Relaxed);
        if abort == ABORT_ALL {
            break;
        }
        if abort == ABORT_DEPTH {
            thread.shared.abort[thread.index].store(ABORT_NONE, Ordering::Relaxed);
            thread.stopped = false;
            retry = true;
            continue;
        }
        if thread.stopped {
            break;
        }

        // Depth completed
        thread.scores[depth as usize] = value;
        thread.depth_times[depth as usize] = thread.shared.time.elapsed();
        thread.completed = depth;
        thread.shared.node_counts[thread.index].store(thread.nodes, Ordering::Relaxed);

        if thread.pv.len > 0 {
            let previous_best = thread.best_move;
            thread.best_move = thread.pv.moves[0];
            thread.ponder_move = if thread.pv.len > 1 {
                thread.pv.moves[1]
            } else {
                Move::NONE
            };

            if thread.main_thread() {
                if thread.report {
                    report_depth(thread, value, depth);
                }

                if thread.shared.time.self_timed && depth > 4 {
                    if value + 8 <= thread.scores[depth as usize - 1] {
                        thread.shared.time.scale_ideal(110);
                    }
                    if thread.best_move != previous_best {
                        thread.shared.time.scale_ideal(135);
                    }
                }
            }
        }

        if thread.main_thread() && should_finish(thread, depth, depth_limit) {
            thread.shared.abort_all();
            break;
        }

        // Peers still at or below this depth move on to the next one
        {
            let depths = thread.shared.depths.lock().unwrap();
            for (i, &d) in depths.iter().enumerate() {
                if i != thread.index && d <= depth {
                    thread.shared.abort[i].store(ABORT_DEPTH, Ordering::Relaxed);
                }
            }
        }
    }

    thread.shared.node_counts[thread.index].store(thread.nodes, Ordering::Relaxed);
}

/// Narrow window sized from the recent score drift, doubling on failure
/// up to a cap, then a full-width retry. Mate scores always use the full
/// window.
fn aspiration_window(thread: &mut SearchThread, depth: i32) -> i32 {
    let mut alpha = -INFINITY;
    let mut beta = INFINITY;
    let mut margin = 0;

    let last = thread.scores[(depth as usize).saturating_sub(1)];
    if depth > 4 && last.abs() < MATE_IN_MAX {
        let scores = &thread.scores;
        let d1 = (scores[depth as usize - 1] - scores[depth as usize - 2]).abs();
        let d2 = (scores[depth as usize - 2] - scores[depth as usize - 3]).abs();
        let d3 = (scores[depth as usize - 3] - scores[depth as usize - 4]).abs();

        margin = (16 * d1 / 10).max(2 * d2).max(4 * d3 / 5).max(1);
        margin = margin.min(thread.params.aspiration_max_margin);
        alpha = last - margin;
        beta = last + margin;
    }

    loop {
        let mut pv = PvLine::new();
        let value = search(thread, &mut pv, alpha, beta, depth, 0);
        if thread.stopped {
            return value;
        }

        if value.abs() >= MATE_IN_MAX && (value <= alpha || value >= beta) {
            alpha = -INFINITY;
            beta = INFINITY;
            continue;
        }

        if value <= alpha {
            if margin >= thread.params.aspiration_max_margin {
                alpha = -INFINITY;
            } else {
                margin = (margin * 2).min(thread.params.aspiration_max_margin);
                alpha = last - margin;
            }
        } else if value >= beta {
            if margin >= thread.params.aspiration_max_margin {
                beta = INFINITY;
            } else {
                margin = (margin * 2).min(thread.params.aspiration_max_margin);
                beta = last + margin;
            }
        } else {
            thread.pv = pv;
            return value;
        }
    }
}

fn should_finish(thread: &SearchThread, depth: i32, depth_limit: i32) -> bool {
    if depth >= depth_limit {
        return true;
    }

    let time = &thread.shared.time;
    match thread.limits {
        Limits::MoveTime(_) => time.hard_expired(),
        Limits::SelfClock { .. } => {
            if time.hard_expired() || time.ideal_expired() {
                return true;
            }

            // Cheaper to stop now than to start a depth that will not finish
            let d = depth as usize;
            if d >= 2 {
                let last = (thread.depth_times[d] - thread.depth_times[d - 1]) as f64;
                let prev = if d >= 3 {
                    (thread.depth_times[d - 1] - thread.depth_times[d - 2]) as f64
                } else {
                    0.0
                };
                let growth = if prev > 0.0 { last / prev } else { 2.0 };
                let projected = time.elapsed() as f64 + last * (growth + 0.25);
                if projected > time.max_usage as f64 {
                    return true;
                }
            }
            false
        }
        _ => false,
    }
}

pub fn format_score(value: i32) -> String {
    if value >= MATE_IN_MAX {
        format!("mate {}", (MATE - value + 1) / 2)
    } else if value <= -MATE_IN_MAX {
        format!("mate -{}", (MATE + value + 1) / 2)
    } else {
        format!("cp {}", value)
    }
}

fn report_depth(thread: &SearchThread, value: i32, depth: i32) {
    let elapsed = thread.shared.time.elapsed();
    let nodes = thread.shared.total_nodes();
    let nps = nodes * 1000 / elapsed.max(1);

    let mut pv = String::new();
    for i in 0..thread.pv.len {
        if i > 0 {
            pv.push(' ');
        }
        pv.push_str(&thread.pv.moves[i].to_uci(thread.board.chess960));
    }

    println!(
        "info depth {} seldepth {} score {} nodes {} nps {} hashfull {} time {} pv {}",
        depth,
        thread.seldepth,
        format_score(value),
        nodes,
        nps,
        thread.tt.hashfull(),
        elapsed,
        pv
    );
}

fn check_limits(thread: &mut SearchThread) {
    if thread.nodes & 8191 == 0 {
        thread.shared.node_counts[thread.index].store(thread.nodes, Ordering::Relaxed);

        if thread.shared.stop.load(Ordering::Relaxed) {
            thread.shared.abort_all();
        }

        match thread.limits {
            Limits::MoveTime(_) | Limits::SelfClock { .. } => {
                if thread.shared.time.hard_expired() {
                    thread.shared.abort_all();
                }
            }
            Limits::Nodes(limit) => {
                if thread.shared.total_nodes() >= limit {
                    thread.shared.abort_all();
                }
            }
            _ => {}
        }
    }

    if thread.shared.abort[thread.index].load(Ordering::Relaxed) != ABORT_NONE {
        thread.stopped = true;
    }
}

#[inline(always)]
fn static_eval(thread: &mut SearchThread) -> i32 {
    eval::evaluate(&thread.board, &mut thread.tables.pk_table)
}

/// Negamax with alpha-beta and the pruning stack. `height` is the ply
/// distance from the root, `depth` the remaining nominal depth.
pub fn search(
    thread: &mut SearchThread,
    pv: &mut PvLine,
    mut alpha: i32,
    mut beta: i32,
    mut depth: i32,
    height: i32,
) -> i32 {
    let pv_node = beta != alpha + 1;
    let root = height == 0;
    pv.len = 0;

    check_limits(thread);
    if thread.stopped {
        return 0;
    }

    if height >= MAX_PLY as i32 {
        return static_eval(thread);
    }

    if !root {
        if thread.board.is_drawn(height) {
            return 0;
        }

        // No line from here can be better than mating now, or worse than
        // being mated now
        alpha = alpha.max(-MATE + height);
        beta = beta.min(MATE - height - 1);
        if alpha >= beta {
            return alpha;
        }
    }

    let in_check = thread.board.in_check();

    if depth <= 0 && !in_check {
        return qsearch(thread, pv, alpha, beta, height);
    }
    depth = depth.max(0);

    thread.nodes += 1;
    if height > thread.seldepth {
        thread.seldepth = height;
    }

    // TT probe; bounds only narrow the window at non-PV nodes
    let mut tt_move = Move::NONE;
    let mut tt_tactical = false;
    if let Some(entry) = thread.tt.get(thread.board.hash) {
        tt_move = entry.best_move;
        tt_tactical = !tt_move.is_none() && thread.board.is_tactical(tt_move);

        if !pv_node && entry.depth >= depth {
            let value = value_from_tt(entry.value, height);
            match entry.bound {
                BOUND_PV => return value,
                BOUND_CUT => alpha = alpha.max(value),
                _ => beta = beta.min(value),
            }
            if alpha >= beta {
                return value;
            }
        }
    }

    let eval = if in_check { -INFINITY } else { static_eval(thread) };
    let futility_margin = eval + depth * thread.params.futility_margin;

    if !pv_node && !in_check && !root {
        // Razoring: hopeless static eval drops shallow nodes into qsearch
        if depth <= thread.params.razor_depth
            && eval + thread.params.razor_margins[depth as usize] < alpha
        {
            if depth <= 1 {
                return qsearch(thread, pv, alpha, beta, height);
            }
            let mut scratch = PvLine::new();
            let value = qsearch(thread, &mut scratch, alpha - 1, alpha, height);
            if thread.stopped {
                return 0;
            }
            if value < alpha {
                return value;
            }
        }

        // Reverse futility: a static eval this far above beta at shallow
        // depth will not come back down
        if depth <= thread.params.beta_pruning_depth
            && thread.board.has_non_pawn_material()
            && eval - depth * thread.params.futility_margin > beta
        {
            return eval - depth * thread.params.futility_margin;
        }

        // Null move: hand over the move and still beat beta
        if depth >= thread.params.null_move_depth
            && eval >= beta
            && thread.board.has_non_pawn_material()
            && thread.move_stack[height as usize - 1] != Move::NULL
        {
            let r = (4 + depth / 6 + (eval - beta + 200) / 400).min(7);

            let mut undo = Undo::default();
            thread.move_stack[height as usize] = Move::NULL;
            thread.board.apply_null(&mut undo);
            let mut lpv = PvLine::new();
            let value = -search(thread, &mut lpv, -beta, -beta + 1, depth - r, height + 1);
            thread.board.revert_null(&undo);

            if thread.stopped {
                return 0;
            }
            if value >= beta {
                return if value >= MATE_IN_MAX { beta } else { value };
            }
        }
    }

    // Internal iterative deepening seeds a missing hash move at PV nodes
    if pv_node && tt_move.is_none() && depth >= thread.params.iid_depth {
        let mut lpv = PvLine::new();
        search(thread, &mut lpv, alpha, beta, depth - 2, height);
        if thread.stopped {
            return 0;
        }
        if let Some(entry) = thread.tt.get(thread.board.hash) {
            tt_move = entry.best_move;
            tt_tactical = !tt_move.is_none() && thread.board.is_tactical(tt_move);
        }
    }

    if in_check && ((pv_node && !root) || depth <= thread.params.check_extension_depth) {
        depth += 1;
    }

    let old_alpha = alpha;
    let mut best = -INFINITY;
    let mut best_move = Move::NONE;
    let mut played = 0;
    let mut quiets_tried = [Move::NONE; 64];
    let mut quiets_count = 0usize;

    let killers = thread.tables.killers.get(height);
    let mut picker = MovePicker::new(tt_move, killers);

    while let Some(mv) = picker.next(&thread.board, &thread.tables.history) {
        let is_quiet = !thread.board.is_tactical(mv);
        let hist = thread.tables.history.get(&thread.board, mv);

        // Futility: quiet moves cannot rescue an eval this far under alpha
        if !pv_node
            && !in_check
            && is_quiet
            && played >= 1
            && depth <= thread.params.futility_depth
            && futility_margin <= alpha
        {
            continue;
        }

        let mut undo = Undo::default();
        if !thread.board.apply(mv, &mut undo) {
            continue;
        }

        // Late-move pruning: enough quiets tried at low depth, and this
        // one does not even give check
        let gives_check = thread.board.in_check();
        if !pv_node
            && !in_check
            && is_quiet
            && played >= 1
            && depth <= thread.params.lmp_depth
            && quiets_count as i32 > thread.params.lmp_counts[depth as usize]
            && !gives_check
        {
            thread.board.revert(mv, &undo);
            continue;
        }

        played += 1;
        thread.move_stack[height as usize] = mv;
        if is_quiet && quiets_count < quiets_tried.len() {
            quiets_tried[quiets_count] = mv;
            quiets_count += 1;
        }

        // Late-move reductions for quiet moves ordered far down the list
        let r = if played >= 4 && depth >= 3 && is_quiet {
            let r = 2
                + (played - 4) / 8
                + (depth - 4) / 6
                + 2 * i32::from(!pv_node)
                + i32::from(tt_tactical && best_move == tt_move)
                - hist / 24;
            r.clamp(1, depth - 1)
        } else {
            1
        };

        let mut lpv = PvLine::new();
        let mut value;
        if played == 1 || !pv_node {
            value = -search(thread, &mut lpv, -beta, -alpha, depth - r, height + 1);
            if value > alpha && r > 1 {
                value = -search(thread, &mut lpv, -beta, -alpha, depth - 1, height + 1);
            }
        } else {
            value = -search(thread, &mut lpv, -alpha - 1, -alpha, depth - r, height + 1);
            if value > alpha {
                value = -search(thread, &mut lpv, -beta, -alpha, depth - 1, height + 1);
            }
        }

        thread.board.revert(mv, &undo);
        if thread.stopped {
            return 0;
        }

        if value > best {
            best = value;
            best_move = mv;

            if value > alpha {
                alpha = value;
                if pv_node {
                    pv.update(mv, &lpv);
                }
                if root {
                    thread.best_move = mv;
                }

                if alpha >= beta {
                    if is_quiet {
                        thread.tables.killers.insert(height, mv);
                    }
                    break;
                }
            }
        }
    }

    if played == 0 {
        return if in_check { -MATE + height } else { 0 };
    }

    // A quiet cutoff rewards the cause and punishes the quiets tried
    // before it
    if best >= beta && !thread.board.is_tactical(best_move) {
        let bonus = depth * depth;
        for &quiet in quiets_tried.iter().take(quiets_count) {
            let delta = if quiet == best_move { bonus } else { -bonus };
            thread.tables.history.update(&thread.board, quiet, delta);
        }
    }

    let bound = if best >= beta {
        BOUND_CUT
    } else if best > old_alpha {
        BOUND_PV
    } else {
        BOUND_ALL
    };
    thread
        .tt
        .store(thread.board.hash, value_to_tt(best, height), best_move, depth, bound);

    best
}

/// Tactical horizon resolution: stand pat, then captures and promotions
/// only.
pub fn qsearch(
    thread: &mut SearchThread,
    pv: &mut PvLine,
    mut alpha: i32,
    beta: i32,
    height: i32,
) -> i32 {
    pv.len = 0;

    check_limits(thread);
    if thread.stopped {
        return 0;
    }

    if height >= MAX_PLY as i32 {
        return static_eval(thread);
    }

    thread.nodes += 1;
    if height > thread.seldepth {
        thread.seldepth = height;
    }

    if thread.board.is_drawn(height) {
        return 0;
    }

    let eval = static_eval(thread);
    let mut best = eval;
    if best > alpha {
        alpha = best;
        if alpha >= beta {
            return eval;
        }
    }

    // Delta pruning: even the best plausible gain cannot reach alpha
    if eval + thread.board.best_case_value() < alpha {
        return eval;
    }

    let mut picker = MovePicker::new_noisy();
    while let Some(mv) = picker.next(&thread.board, &thread.tables.history) {
        if capture_obviously_loses(&thread.board, mv) {
            continue;
        }

        let mut undo = Undo::default();
        if !thread.board.apply(mv, &mut undo) {
            continue;
        }
        thread.move_stack[height as usize] = mv;

        let mut lpv = PvLine::new();
        let value = -qsearch(thread, &mut lpv, -beta, -alpha, height + 1);
        thread.board.revert(mv, &undo);

        if thread.stopped {
            return 0;
        }

        if value > best {
            best = value;
            if value > alpha {
                alpha = value;
                pv.update(mv, &lpv);
                if alpha >= beta {
                    break;
                }
            }
        }
    }

    best
}

/// One-ply exchange sniff: capturing a weaker, defended piece with no
/// second attacker of our own is not worth a node.
fn capture_obviously_loses(board: &Board, mv: Move) -> bool {
    if mv.kind() != Move::NORMAL {
        return false;
    }
    let target = board.squares[mv.target() as usize];
    if target == EMPTY {
        return false;
    }

    let victim = SEE_PIECE_VALUES[piece_kind(target)];
    let attacker = SEE_PIECE_VALUES[piece_kind(board.squares[mv.source() as usize])];
    if victim >= attacker {
        return false;
    }

    let from_bit = 1u64 << mv.source();
    let occ = crate::bitboard::Bitboard(board.occupied().0 & !from_bit);
    let all = movegen::attackers_to(board, mv.target(), occ);

    let defenders = all & board.colours[1 - board.side_to_move];
    if defenders.is_empty() {
        return false;
    }

    let supporters =
        crate::bitboard::Bitboard(all.0 & board.colours[board.side_to_move].0 & !from_bit);
    supporters.is_empty()
}
