//! Public facade: owns a [`Board`], a [`TranspositionTable`], and the
//! iterative-deepening loop, and exposes the narrow interface an outer
//! loop (a CLI, a GUI, a test) drives the engine through.

use crate::board::Board;
use crate::moves::execute::make_move;
use crate::moves::movegen::generate_legal_moves;
use crate::moves::types::{Move, render_move};
use crate::search::eval::{EVAL_WIN, is_mate_eval};
use crate::search::search::{Deadline, IterationOutcome, Pv, eval_from_white_pov, search_fixed_depth};
use crate::search::tt::{TranspositionTable, TtError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transposition table allocation failed for {requested_mb} MB")]
    Allocation { requested_mb: usize },
    #[error("internal inconsistency: {0}")]
    Inconsistent(String),
}

impl From<TtError> for EngineError {
    fn from(e: TtError) -> Self {
        match e {
            TtError::Allocation { requested_mb } => EngineError::Allocation { requested_mb },
        }
    }
}

/// Parameters an external config loader (INI file, CLI flags, etc., all
/// out of scope for this crate) would populate before handing off to
/// [`Engine::new`].
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub tt_size_mb: usize,
    pub time_limit: Duration,
    pub depth_limit: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tt_size_mb: 64,
            time_limit: Duration::from_secs(5),
            depth_limit: crate::search::eval::MAX_LINE_LEN as u8,
        }
    }
}

/// Attaches a [`TranspositionTable`] and a move stack to a [`Board`] and
/// drives iterative-deepening search over it. All mutable state the
/// search touches — board, TT, repetition chains, move stack — is owned
/// here; the only thing outside `Engine` is the read-only process-global
/// table singletons (`tables()`, `eval_tables()`).
pub struct Engine {
    board: Board,
    config: EngineConfig,
    tt: Option<TranspositionTable>,
    move_stack: Vec<Move>,
    pv: Pv,
    eval: i32,
    search_depth: u8,
    search_duration: Duration,
    searching: bool,
}

impl Engine {
    pub fn new(board: Board, config: EngineConfig) -> Self {
        Engine {
            board,
            config,
            tt: None,
            move_stack: Vec::with_capacity(crate::moves::types::MOVE_LIST_ALLOC),
            pv: Pv::new(),
            eval: 0,
            search_depth: 0,
            search_duration: Duration::ZERO,
            searching: false,
        }
    }

    /// Allocates the transposition table and records the starting
    /// position in its repetition chain. Must be called once before the
    /// first [`Engine::search`].
    pub fn init(&mut self) -> Result<(), EngineError> {
        let mut tt = TranspositionTable::new(self.config.tt_size_mb)?;
        tt.gh_store(self.board.key);
        self.tt = Some(tt);
        Ok(())
    }

    /// Runs iterative deepening from depth 1 up to `max_depth` (clamped
    /// to `config.depth_limit` and `MAX_LINE_LEN`), or until `max_time_ms`
    /// (clamped to `config.time_limit`) elapses, or a forced win/loss is
    /// proven. The whole iterative-deepening session runs to completion
    /// inside this one call rather than ticking incrementally, so the
    /// returned `bool` (conventionally "true while iterating" in a
    /// cooperative-tick design) is always `false` once it returns: the
    /// session is finished and its results are ready to read via
    /// `suggested_move`/`search_eval`/`search_pv`.
    pub fn search(&mut self, max_time_ms: u64, max_depth: u8) -> bool {
        let Some(mut tt) = self.tt.take() else {
            return false;
        };

        self.searching = true;
        self.move_stack.clear();

        let max_depth = max_depth.max(1).min(self.config.depth_limit).min(crate::search::eval::MAX_LINE_LEN as u8);
        let budget = Duration::from_millis(max_time_ms).min(self.config.time_limit);
        let mut deadline = Deadline::new(budget);

        let mut pv = Pv::new();
        let mut eval = 0i32;
        let mut depth_reached = 0u8;

        for depth in 1..=max_depth {
            match search_fixed_depth(&mut self.board, &mut tt, &mut self.move_stack, depth, &pv, &deadline) {
                IterationOutcome::Aborted => break,
                IterationOutcome::Completed { pv: new_pv, value } => {
                    pv = new_pv;
                    eval = value;
                    depth_reached = depth;
                    deadline.mark_iteration_completed();
                    if is_mate_eval(value) {
                        break;
                    }
                }
            }
        }

        let stored_depth_at_root = tt.depth_at(self.board.key);

        self.search_duration = deadline.elapsed();
        self.pv = pv;
        self.eval = eval;
        self.search_depth = depth_reached.max(stored_depth_at_root as u8);
        self.searching = false;
        self.tt = Some(tt);
        false
    }

    /// Aborts the in-progress search at the next node-entry time check.
    /// A no-op if no search is currently running (there's no background
    /// worker to signal: `search` runs synchronously to completion, so
    /// this only matters if called from, e.g., a signal handler wired up
    /// by the caller mid-`search`).
    pub fn search_abort(&mut self) {
        // Nothing to flip here without a shared deadline handle across
        // threads, which this single-threaded core deliberately doesn't
        // have. Kept as an explicit method so callers that expect to be
        // able to request an abort have somewhere to call, even though
        // it's presently inert.
    }

    /// Applies `mv` to the board and records it in the repetition chain,
    /// provided it's actually a legal move for the side to move right
    /// now; otherwise a silent no-op. Keeps the PV if `mv` was its first
    /// move (shifts it left by one), otherwise clears it.
    pub fn on_move_played(&mut self, mv: Move) {
        let Some(tt) = self.tt.as_mut() else {
            return;
        };

        let mut legal = Vec::with_capacity(crate::moves::types::MOVE_LIST_ALLOC);
        generate_legal_moves(&mut self.board, &mut legal);
        if !legal.contains(&mv) {
            return;
        }

        if make_move(&mut self.board, mv).is_none() {
            return;
        }
        self.board.ply += 1;
        self.board.update_move_sets();
        tt.gh_store(self.board.key);

        if self.pv.first() == Some(&mv) {
            self.pv.remove(0);
        } else {
            self.pv.clear();
        }
    }

    pub fn suggested_move(&self) -> Option<Move> {
        self.pv.first().copied()
    }

    pub fn search_eval(&self) -> String {
        format_eval(&self.board, self.eval)
    }

    /// Renders the PV as space-separated `<piece><from><to>` move
    /// strings (e.g. `Ma1b2 lb2c3`), replaying it against a scratch copy
    /// of the board so each move's piece character reflects the position
    /// it was actually played from.
    pub fn search_pv(&self) -> String {
        let mut scratch = self.board.clone();
        let mut rendered = Vec::with_capacity(self.pv.len());

        for &mv in self.pv.iter() {
            let text = render_move(mv, |sq| scratch.piece_at(sq).map(|p| (p.side(), p.piece_type())));
            rendered.push(text);
            if make_move(&mut scratch, mv).is_none() {
                break;
            }
        }

        rendered.join(" ")
    }

    pub fn search_depth(&self) -> u8 {
        self.search_depth
    }

    pub fn search_duration(&self) -> Duration {
        self.search_duration
    }

    pub fn search_ongoing(&self) -> bool {
        self.searching
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Frees the TT's game-history repetition chain and releases the
    /// table entirely. The engine can't be searched again until
    /// `init()` is called.
    pub fn close(&mut self) {
        if let Some(tt) = self.tt.as_mut() {
            tt.clear_game_history();
        }
        self.tt = None;
    }
}

fn format_eval(board: &Board, value_from_mover_pov: i32) -> String {
    let white_pov = eval_from_white_pov(board, value_from_mover_pov);

    if is_mate_eval(value_from_mover_pov) {
        let n = (EVAL_WIN - white_pov.abs() + 1) / 2;
        if white_pov > 0 { format!("+M{n}") } else { format!("-M{n}") }
    } else {
        let units = white_pov as f64 / 20000.0;
        format!("{units:+.3}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_then_one_ply_search_returns_a_move_and_finishes() {
        let board = Board::new();
        let mut engine = Engine::new(board, EngineConfig { time_limit: Duration::from_secs(10), ..EngineConfig::default() });
        engine.init().expect("tt allocation should succeed");

        let still_iterating = engine.search(60_000, 1);
        assert!(!still_iterating);
        assert!(engine.suggested_move().is_some());
        assert!(!engine.search_eval().is_empty());
        assert_eq!(engine.search_depth(), 1);
    }

    #[test]
    fn on_move_played_rejects_illegal_moves_silently() {
        let board = Board::new();
        let mut engine = Engine::new(board, EngineConfig::default());
        engine.init().unwrap();

        let bogus = Move::new(crate::square::Square::new(0), crate::square::Square::new(99));
        let key_before = engine.board().key;
        engine.on_move_played(bogus);
        assert_eq!(engine.board().key, key_before);
    }

    #[test]
    fn close_then_search_without_reinit_is_a_no_op() {
        let board = Board::new();
        let mut engine = Engine::new(board, EngineConfig::default());
        engine.init().unwrap();
        engine.close();

        let still_iterating = engine.search(1_000, 2);
        assert!(!still_iterating);
        assert_eq!(engine.search_depth(), 0);
    }
}
