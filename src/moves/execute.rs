//! Make/unmake moves on a [`Board`] during search.
//!
//! Barca moves never capture or promote, so undoing one is just replaying
//! [`Board::move_piece`] back to the original square: occupancy, zobrist
//! and threat updates are all self-inverse (XOR) or recomputed fresh from
//! the piece's (now-restored) position, and `side_to_move` flips back on
//! the second call. No separate undo-stack payload is needed beyond which
//! piece moved and where it came from.

use crate::board::Board;
use crate::moves::types::{Move, PlayedMove};

/// Applies `mv` to `board`, returning the record needed to [`unmake_move`]
/// it. Returns `None` if there is no piece on `mv.from()` — the caller
/// (search) only ever plays moves it just generated, so this should never
/// happen there, but callers driven by external move strings must check
/// for `None` and treat it as a no-op.
pub fn make_move(board: &mut Board, mv: Move) -> Option<PlayedMove> {
    let piece = board.piece_id_at(mv.from())?;
    board.move_piece(piece, mv.to());
    #[cfg(debug_assertions)]
    board.assert_hash();
    Some(PlayedMove { piece, mv })
}

/// Undoes a move previously applied by [`make_move`]. Must be paired
/// strictly with its `make_move` call around any intervening recursion —
/// the incremental sight/threat/zobrist state assumes moves unwind in
/// exact reverse order.
pub fn unmake_move(board: &mut Board, played: PlayedMove) {
    board.move_piece(played.piece, played.mv.from());
    #[cfg(debug_assertions)]
    board.assert_hash();
}
