//! Zobrist invariance and make/unmake invertibility across longer random
//! sequences than the inline unit tests in `moves::execute` exercise.

use barca::board::Board;
use barca::moves::execute::{make_move, unmake_move};
use barca::moves::movegen::generate_legal_moves;
use barca::moves::types::Move;
use barca::tables::tables;

fn lcg(state: &mut u64) -> u32 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (*state >> 33) as u32
}

#[test]
fn zobrist_key_equals_xor_of_placed_piece_keys() {
    let board = Board::new();
    let t = tables();
    let mut expected = 0u128;
    for p in board.pieces() {
        expected ^= t.zobrist[p.herd.index()][p.scalar.scalar() as usize];
    }
    // side_to_move is White at the default start, so no side_toggle term.
    assert_eq!(expected, board.key);
}

#[test]
fn fifty_random_make_unmake_pairs_restore_the_original_key_and_board() {
    let mut board = Board::new();
    let original_key = board.key;
    let original_repr = format!("{board}");

    let mut state = 0x9E3779B97F4A7C15u64;
    let mut stack = Vec::new();

    for _ in 0..50 {
        let mut moves: Vec<Move> = Vec::with_capacity(256);
        generate_legal_moves(&mut board, &mut moves);
        if moves.is_empty() {
            break;
        }
        let mv = moves[lcg(&mut state) as usize % moves.len()];
        stack.push(make_move(&mut board, mv).expect("generated move always has a piece at from"));
    }

    while let Some(played) = stack.pop() {
        unmake_move(&mut board, played);
    }

    assert_eq!(board.key, original_key);
    assert_eq!(format!("{board}"), original_repr);
    board.validate().expect("board must validate after full unwind");
}

#[test]
fn single_make_then_unmake_is_exactly_invertible_from_every_opening_move() {
    let mut board = Board::new();
    let mut moves: Vec<Move> = Vec::with_capacity(64);
    generate_legal_moves(&mut board, &mut moves);

    for mv in moves {
        let key_before = board.key;
        let repr_before = format!("{board}");
        let played = make_move(&mut board, mv).unwrap();
        assert_ne!(board.key, key_before, "a real relocation must change the key");
        unmake_move(&mut board, played);
        assert_eq!(board.key, key_before);
        assert_eq!(format!("{board}"), repr_before);
    }
}
