//! Staged legal move generation: watering holes first, then threatening
//! moves, then watering-hole-line moves, then everything else.

use crate::bitboard::Bitboard;
use crate::board::Board;
use crate::board::piece::{PieceType, Side};
use crate::moves::types::{Move, MoveBuffer};
use crate::search::eval::{EvalTables, eval_tables};
use crate::square::Square;

/// Generates every legal move for the side to move into `move_list`, in
/// staged priority order, biasing the move-ordering seen by the search.
/// Refreshes move sets via [`Board::quick_move_sets`] first — the
/// "quick" refresh may leave some non-mover pieces stale, but only the
/// mover's pieces are read here.
pub fn generate_legal_moves(board: &mut Board, move_list: &mut impl MoveBuffer) {
    board.quick_move_sets();

    let mover = board.side_to_move;
    let forced_only = board.is_side_forced;
    let tables = eval_tables();

    // Per-piece (from-square, piece-type, scares-herd-map, remaining move
    // bitboard), narrowed stage by stage as bits are claimed. Kept outside
    // `Board` so staging never needs to write back through a piece-mutation
    // path that only exists for this purpose.
    let mut remaining: Vec<(Square, PieceType, Bitboard, Bitboard)> = board
        .pieces()
        .iter()
        .filter(|p| p.side() == mover)
        .filter(|p| !forced_only || p.forced)
        .map(|p| {
            let scares_map = board.threat_map(p.herd.scares());
            (p.scalar, p.piece_type(), scares_map, p.move_bb)
        })
        .collect();

    for stage in 0..4 {
        for (from, piece_type, scares_map, bb) in remaining.iter_mut() {
            if bb.is_empty() {
                continue;
            }

            let stage_mask = match stage {
                0 => board.watering_holes,
                1 => *scares_map,
                2 => wh_line_mask(tables, *piece_type),
                _ => Bitboard::FULL,
            };

            let staged = *bb & stage_mask;
            if staged.is_empty() {
                continue;
            }

            *bb &= !staged;
            serialize(*from, staged, mover, move_list);
        }
    }
}

fn wh_line_mask(tables: &EvalTables, piece_type: PieceType) -> Bitboard {
    match piece_type {
        PieceType::Mouse => tables.wh_row_col,
        PieceType::Lion => tables.wh_diag[2],
        PieceType::Elephant => tables.wh_all_lines,
    }
}

/// Scans `targets` toward the board edge the mover is advancing to: White
/// scans low-to-high (toward Black's side), Black scans high-to-low. This
/// tends to surface the more promising half of the board earlier in each
/// stage, improving alpha-beta cutoffs the way scan direction does in
/// `add_legal_moves`.
fn serialize(from: Square, mut targets: Bitboard, mover: Side, move_list: &mut impl MoveBuffer) {
    while let Some(scalar) = pick_next(&mut targets, mover) {
        move_list.push(Move::new(from, Square::new(scalar)));
    }
}

fn pick_next(targets: &mut Bitboard, mover: Side) -> Option<u8> {
    let bit = match mover {
        Side::White => targets.scan_forward(),
        Side::Black => targets.scan_reverse(),
    }?;
    targets.clear(Square::new(bit));
    Some(bit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrayvec::ArrayVec;

    #[test]
    fn opening_position_generates_moves_for_every_mover_piece() {
        let mut board = Board::new();
        let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
        generate_legal_moves(&mut board, &mut moves);
        assert!(!moves.is_empty());
        for mv in &moves {
            let piece = board.piece_at(mv.from());
            assert!(piece.is_some());
            assert_eq!(piece.unwrap().side(), Side::White);
        }
    }

    #[test]
    fn forced_side_only_generates_moves_from_forced_pieces() {
        let mut board = Board::new();
        if board.is_side_forced {
            let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
            generate_legal_moves(&mut board, &mut moves);
            for mv in &moves {
                let piece = board.piece_at(mv.from()).unwrap();
                assert!(piece.forced);
            }
        }
    }
}
