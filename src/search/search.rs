//! Iterative-deepening negamax with alpha-beta pruning, aspiration
//! windows, and principal-variation extraction.

use crate::board::Board;
use crate::board::piece::Side;
use crate::moves::execute::{make_move, unmake_move};
use crate::moves::movegen::generate_legal_moves;
use crate::moves::types::Move;
use crate::search::eval::{EVAL_DRAW, EVAL_WIN, MAX_LINE_LEN, evaluate};
use crate::search::tt::{ASPIRATION_WINDOW, Flag, LookupResult, TranspositionTable};
use arrayvec::ArrayVec;
use std::time::{Duration, Instant};

/// Upper bound on magnitude used for the open alpha-beta window; kept well
/// clear of `EVAL_WIN` so mate scores never saturate against it.
const INF: i32 = EVAL_WIN + MAX_LINE_LEN + 1;

pub const MAX_PV_LEN: usize = MAX_LINE_LEN as usize;
pub type Pv = ArrayVec<Move, MAX_PV_LEN>;

/// Counters for how often the aspiration window in [`search_fixed_depth`]
/// fails low or high and has to re-search with a widened window. Compiled
/// out entirely (zero runtime cost) unless the `aspiration_stats` feature
/// is enabled.
#[cfg(feature = "aspiration_stats")]
pub mod stats {
    use std::sync::atomic::{AtomicU32, Ordering};

    pub static FAIL_LOW: AtomicU32 = AtomicU32::new(0);
    pub static FAIL_HIGH: AtomicU32 = AtomicU32::new(0);
    pub static DOUBLE_WIDEN: AtomicU32 = AtomicU32::new(0);

    pub(super) fn record_fail_low() {
        FAIL_LOW.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_fail_high() {
        FAIL_HIGH.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_double_widen() {
        DOUBLE_WIDEN.fetch_add(1, Ordering::Relaxed);
    }
}

/// An aborted search vs. a completed evaluation, realized as a sum type
/// rather than a reserved sentinel integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    Aborted,
    Value(i32),
}

/// Tracks the wall-clock budget for one `Engine::search` session. `abort`
/// forces the next node-entry time check to report `SearchResult::Aborted`
/// by zeroing the remaining budget, matching `search_abort()`.
pub struct Deadline {
    start: Instant,
    allotted: Duration,
    any_iteration_completed: bool,
}

impl Deadline {
    pub fn new(allotted: Duration) -> Self {
        Deadline {
            start: Instant::now(),
            allotted,
            any_iteration_completed: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn exceeded(&self) -> bool {
        self.start.elapsed() > self.allotted
    }

    /// True once overrun *and* at least one depth has fully completed —
    /// the first completed depth is never truncated.
    fn should_abort(&self) -> bool {
        self.any_iteration_completed && self.exceeded()
    }

    pub fn mark_iteration_completed(&mut self) {
        self.any_iteration_completed = true;
    }

    pub fn abort(&mut self) {
        self.allotted = Duration::ZERO;
    }
}

/// Outcome of one `search_fixed_depth` call.
pub enum IterationOutcome {
    Aborted,
    Completed { pv: Pv, value: i32 },
}

/// Runs iterative deepening's per-iteration body: aspiration-window
/// estimate, negamax at `depth`, fail-low/fail-high re-search, and PV
/// extension via the TT.
pub fn search_fixed_depth(
    board: &mut Board,
    tt: &mut TranspositionTable,
    move_stack: &mut Vec<Move>,
    depth: u8,
    prev_pv: &Pv,
    deadline: &Deadline,
) -> IterationOutcome {
    let mut alpha = -INF;
    let mut beta = INF;

    if depth > 1 && prev_pv.len() as u8 + 1 >= depth {
        if let Some(estimate) = estimate_from_pv(board, tt, move_stack, prev_pv, depth, deadline) {
            alpha = estimate - ASPIRATION_WINDOW;
            beta = estimate + ASPIRATION_WINDOW;
        }
    }

    let mut pv = Pv::new();
    let mut value = match alphabeta(board, tt, move_stack, depth, alpha, beta, 0, deadline, &mut pv) {
        SearchResult::Aborted => return IterationOutcome::Aborted,
        SearchResult::Value(v) => v,
    };

    if value <= alpha {
        #[cfg(feature = "aspiration_stats")]
        stats::record_fail_low();
        pv.clear();
        value = match alphabeta(board, tt, move_stack, depth, -INF, alpha, 0, deadline, &mut pv) {
            SearchResult::Aborted => return IterationOutcome::Aborted,
            SearchResult::Value(v) => v,
        };
        if value == alpha {
            #[cfg(feature = "aspiration_stats")]
            stats::record_double_widen();
            pv.clear();
            value = match alphabeta(board, tt, move_stack, depth, -INF, INF, 0, deadline, &mut pv) {
                SearchResult::Aborted => return IterationOutcome::Aborted,
                SearchResult::Value(v) => v,
            };
        }
    } else if value >= beta {
        #[cfg(feature = "aspiration_stats")]
        stats::record_fail_high();
        pv.clear();
        value = match alphabeta(board, tt, move_stack, depth, beta, INF, 0, deadline, &mut pv) {
            SearchResult::Aborted => return IterationOutcome::Aborted,
            SearchResult::Value(v) => v,
        };
        if value == beta {
            #[cfg(feature = "aspiration_stats")]
            stats::record_double_widen();
            pv.clear();
            value = match alphabeta(board, tt, move_stack, depth, -INF, INF, 0, deadline, &mut pv) {
                SearchResult::Aborted => return IterationOutcome::Aborted,
                SearchResult::Value(v) => v,
            };
        }
    }

    extend_pv_from_tt(board, tt, &mut pv, depth);

    IterationOutcome::Completed { pv, value }
}

/// Walks `prev_pv` for `depth - 1` plies and runs a 1-ply search at the
/// resulting leaf to estimate this iteration's value, for the aspiration
/// window. Returns `None` if the PV desyncs from the current position
/// (a stored move no longer has a piece at its `from` square) or the
/// probe itself aborts.
fn estimate_from_pv(
    board: &mut Board,
    tt: &mut TranspositionTable,
    move_stack: &mut Vec<Move>,
    prev_pv: &Pv,
    depth: u8,
    deadline: &Deadline,
) -> Option<i32> {
    let steps = (depth - 1) as usize;
    let mut played = ArrayVec::<crate::moves::types::PlayedMove, MAX_PV_LEN>::new();

    for &mv in prev_pv.iter().take(steps) {
        match make_move(board, mv) {
            Some(p) => played.push(p),
            None => {
                for p in played.drain(..).rev() {
                    unmake_move(board, p);
                }
                return None;
            }
        }
    }

    let mut leaf_pv = Pv::new();
    let leaf_result = alphabeta(board, tt, move_stack, 1, -INF, INF, 0, deadline, &mut leaf_pv);

    for p in played.drain(..).rev() {
        unmake_move(board, p);
    }
    board.update_move_sets();

    match leaf_result {
        SearchResult::Value(v) => Some(if depth % 2 == 0 { -v } else { v }),
        SearchResult::Aborted => None,
    }
}

/// Extends `pv` past the moves actually produced by `alphabeta` using
/// exact TT entries along the line, stopping once the TT no longer has a
/// sufficiently deep exact entry or `MAX_LINE_LEN` is hit.
fn extend_pv_from_tt(board: &mut Board, tt: &TranspositionTable, pv: &mut Pv, iteration_depth: u8) {
    let mut played = ArrayVec::<crate::moves::types::PlayedMove, MAX_PV_LEN>::new();

    for &mv in pv.iter() {
        match make_move(board, mv) {
            Some(p) => played.push(p),
            None => break,
        }
    }

    while pv.len() < MAX_PV_LEN {
        let needed = iteration_depth as i32 - pv.len() as i32;
        if needed < 0 {
            break;
        }
        let Some(mv) = tt.peek_exact(board.key, needed as u16) else {
            break;
        };
        match make_move(board, mv) {
            Some(p) => {
                pv.push(mv);
                played.push(p);
            }
            None => break,
        }
    }

    for p in played.drain(..).rev() {
        unmake_move(board, p);
    }
    board.update_move_sets();
}

/// Negamax alpha-beta search. `root_dist` counts plies below the current
/// iteration's root; `depth` is plies remaining to search.
#[allow(clippy::too_many_arguments)]
pub fn alphabeta(
    board: &mut Board,
    tt: &mut TranspositionTable,
    move_stack: &mut Vec<Move>,
    depth: u8,
    mut alpha: i32,
    beta: i32,
    root_dist: u32,
    deadline: &Deadline,
    pv_out: &mut Pv,
) -> SearchResult {
    if deadline.should_abort() {
        return SearchResult::Aborted;
    }

    if board.is_lost(board.side_to_move) {
        return SearchResult::Value(-EVAL_WIN + root_dist as i32);
    }

    if tt.gh_match(board.key, root_dist) {
        let sign = if root_dist % 2 == 0 { 1 } else { -1 };
        return SearchResult::Value(EVAL_DRAW * sign);
    }

    let (lookup, hint) = tt.lookup(board.key, depth as u16, alpha, beta, root_dist);
    if let LookupResult::Value(v) = lookup {
        if let Some(mv) = hint {
            pv_out.clear();
            let _ = pv_out.try_push(mv);
        }
        return SearchResult::Value(v);
    }

    if depth == 0 {
        let value = evaluate(board);
        tt.store(board.key, 0, Flag::Static, value, Move::default(), board.ply, root_dist);
        return SearchResult::Value(value);
    }

    tt.gh_store(board.key);

    let start = move_stack.len();
    generate_legal_moves(board, move_stack);
    let end = move_stack.len();

    if let Some(hint_mv) = hint {
        if let Some(hint_pos) = move_stack[start..end].iter().position(|&m| m == hint_mv) {
            move_stack.swap(start, start + hint_pos);
        }
    }

    if start == end {
        // No legal move for the side to move in this position; fall back
        // to a static read rather than looping forever with an empty move
        // list (rare — Barca pieces are seldom fully boxed in).
        let value = evaluate(board);
        tt.gh_remove(board.key);
        return SearchResult::Value(value);
    }

    let mut best_move: Option<Move> = None;

    let mut i = start;
    while i < end {
        let mv = move_stack[i];
        i += 1;

        let Some(played) = make_move(board, mv) else {
            continue;
        };

        let mut child_pv = Pv::new();
        let child_result = alphabeta(board, tt, move_stack, depth - 1, -beta, -alpha, root_dist + 1, deadline, &mut child_pv);

        move_stack.truncate(end);
        unmake_move(board, played);

        match child_result {
            SearchResult::Aborted => {
                tt.gh_remove(board.key);
                return SearchResult::Aborted;
            }
            SearchResult::Value(v) => {
                let value = -v;
                if value >= beta {
                    tt.store(board.key, depth as u16, Flag::Beta, beta, mv, board.ply, root_dist);
                    tt.gh_remove(board.key);
                    return SearchResult::Value(beta);
                }
                if value > alpha {
                    alpha = value;
                    best_move = Some(mv);
                    pv_out.clear();
                    let _ = pv_out.try_push(mv);
                    for &m in child_pv.iter() {
                        if pv_out.try_push(m).is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    let flag = if best_move.is_some() { Flag::Exact } else { Flag::Alpha };
    tt.store(board.key, depth as u16, flag, alpha, best_move.unwrap_or_default(), board.ply, root_dist);
    tt.gh_remove(board.key);
    SearchResult::Value(alpha)
}

pub fn eval_from_white_pov(board: &Board, value_from_mover_pov: i32) -> i32 {
    if board.side_to_move == Side::Black { -value_from_mover_pov } else { value_from_mover_pov }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::search::tt::TranspositionTable;

    #[test]
    fn one_ply_search_from_start_returns_a_reasonable_move_and_eval() {
        let mut board = Board::new();
        let mut tt = TranspositionTable::new(1).unwrap();
        let mut move_stack = Vec::with_capacity(crate::moves::types::MOVE_LIST_ALLOC);
        let deadline = Deadline::new(Duration::from_secs(3600));

        let outcome = search_fixed_depth(&mut board, &mut tt, &mut move_stack, 1, &Pv::new(), &deadline);
        match outcome {
            IterationOutcome::Completed { pv, value } => {
                assert!(!pv.is_empty());
                assert!(value >= EVAL_DRAW);
                assert!(value < EVAL_WIN - MAX_LINE_LEN);
            }
            IterationOutcome::Aborted => panic!("depth-1 search should not abort with an hour-long budget"),
        }
    }

    #[test]
    fn aborted_search_reports_aborted_once_time_is_exceeded_after_progress() {
        let mut deadline = Deadline::new(Duration::ZERO);
        deadline.mark_iteration_completed();
        assert!(deadline.should_abort());
    }

    #[test]
    fn fresh_deadline_never_aborts_before_any_iteration_completes() {
        let deadline = Deadline::new(Duration::ZERO);
        assert!(!deadline.should_abort());
    }
}
