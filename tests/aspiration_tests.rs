//! Aspiration-window search: the narrow first-guess window around a
//! previous iteration's PV estimate, widened on fail-low/fail-high.

use barca::board::Board;
use barca::moves::types::{Move, MOVE_LIST_ALLOC};
use barca::search::search::{Deadline, IterationOutcome, Pv, search_fixed_depth};
use barca::search::tt::{ASPIRATION_WINDOW, TranspositionTable};
use std::time::Duration;

#[test]
fn aspiration_window_constant_matches_the_documented_width() {
    assert_eq!(ASPIRATION_WINDOW, 5000);
}

#[test]
fn second_iteration_uses_the_first_iterations_pv_as_its_estimate_seed() {
    let mut board = Board::new();
    let mut tt = TranspositionTable::new(1).unwrap();
    let mut move_stack = Vec::with_capacity(MOVE_LIST_ALLOC);
    let deadline = Deadline::new(Duration::from_secs(30));

    let first = search_fixed_depth(&mut board, &mut tt, &mut move_stack, 1, &Pv::new(), &deadline);
    let IterationOutcome::Completed { pv: first_pv, .. } = first else {
        panic!("depth-1 search should not abort with a 30s budget");
    };
    assert!(!first_pv.is_empty());

    let second = search_fixed_depth(&mut board, &mut tt, &mut move_stack, 2, &first_pv, &deadline);
    match second {
        IterationOutcome::Completed { pv, value } => {
            assert!(!pv.is_empty());
            assert!(value.abs() < 1_000_000);
        }
        IterationOutcome::Aborted => panic!("depth-2 search should not abort with a 30s budget"),
    }
}

#[test]
fn iterative_deepening_values_stay_sane_across_several_depths_from_the_symmetric_opening() {
    let mut board = Board::new();
    let mut tt = TranspositionTable::new(1).unwrap();
    let mut move_stack = Vec::with_capacity(MOVE_LIST_ALLOC);
    let deadline = Deadline::new(Duration::from_secs(60));
    let mut pv = Pv::new();

    for depth in 1..=3u8 {
        match search_fixed_depth(&mut board, &mut tt, &mut move_stack, depth, &pv, &deadline) {
            IterationOutcome::Completed { pv: new_pv, value } => {
                assert!(value > -1_000_000 && value < 1_000_000);
                pv = new_pv;
            }
            IterationOutcome::Aborted => panic!("a 60s budget should cover depth {depth} from the opening"),
        }
    }
    let _: Option<Move> = pv.first().copied();
}
