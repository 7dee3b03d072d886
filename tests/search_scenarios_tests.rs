//! End-to-end search scenarios driven through the `Engine` facade.

use barca::board::Board;
use barca::board::piece::Side;
use barca::engine::{Engine, EngineConfig};
use barca::search::eval::{EVAL_DRAW, EVAL_WIN, MAX_LINE_LEN};
use std::time::Duration;

fn engine_with(board: Board, time_limit: Duration, depth_limit: u8) -> Engine {
    let config = EngineConfig { time_limit, depth_limit, ..EngineConfig::default() };
    let mut engine = Engine::new(board, config);
    engine.init().expect("transposition table allocation must succeed in tests");
    engine
}

#[test]
fn default_start_one_ply_search_returns_a_sane_move_and_eval() {
    let mut engine = engine_with(Board::new(), Duration::from_secs(10), 1);
    engine.search(10_000, 1);

    assert!(engine.suggested_move().is_some());
    assert_eq!(engine.search_depth(), 1);
    assert!(!engine.search_pv().is_empty());
}

#[test]
fn white_already_on_two_watering_holes_finds_the_move_onto_the_third() {
    // Three White pieces already circle the board's four watering holes
    // (d4, g4, d7) with a fourth White piece one step from the last
    // watering hole (g7); White to move should find the win in one ply.
    let position = "\
. . . . e e . . . .
. . . l m m l . . .
. . . . . . . . . .
. . . L . . L . . .
. . . . . . . . . .
. . . . . . . . . .
. . . . M . . . . .
. . . . . . . . . .
. . . . . M . . . .
. . . . E E . . . .";
    let board = Board::from_string(position);
    assert_eq!(board.side_to_move, Side::White);

    let mut engine = engine_with(board, Duration::from_secs(10), 2);
    engine.search(10_000, 2);

    let eval = engine.search_eval();
    assert!(eval.starts_with("+M"), "expected a White mate string, got {eval}");
}

#[test]
fn eval_string_is_a_signed_three_decimal_number_for_a_non_mate_position() {
    let mut engine = engine_with(Board::new(), Duration::from_secs(10), 2);
    engine.search(10_000, 2);

    let eval = engine.search_eval();
    assert!(eval.starts_with('+') || eval.starts_with('-'));
    assert!(!eval.contains('M'), "symmetric opening at depth 2 should not already be a mate score: {eval}");
    let digits_after_dot = eval.split('.').nth(1).expect("non-mate eval must contain a decimal point");
    assert_eq!(digits_after_dot.len(), 3);

    assert!(engine.search_depth() >= 1);
    assert!(engine.search_depth() <= 2);
    let _ = (EVAL_DRAW, EVAL_WIN, MAX_LINE_LEN);
}
