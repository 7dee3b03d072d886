//! The Barca board: twelve pieces, a pointer-board, occupancy bitboards,
//! per-herd threat maps, and the incremental update sequence that keeps
//! sight/threat/zobrist state in sync as pieces move.

pub mod piece;

use crate::bitboard::Bitboard;
use crate::square::{BOARD_SIZE, NUM_SQUARES, Square};
use crate::tables::tables;
use piece::{Herd, NUM_HERDS, Piece, PieceId, PieceType, Side};
use std::fmt;

/// Recognized board characters in herd order, followed by the empty-square
/// marker: White Mouse/Lion/Elephant, Black Mouse/Lion/Elephant, then `.`.
const BOARD_CHARS: &str = "MLEmle.";

pub const DEFAULT_START_POS: &str = "\
. . . . e e . . . .
. . . l m m l . . .
. . . . . . . . . .
. . . . . . . . . .
. . . . . . . . . .
. . . . . . . . . .
. . . . . . . . . .
. . . . . . . . . .
. . . L M M L . . .
. . . . E E . . . .";

pub const WATERING_HOLES_STR: &str = "\
. . . . . . . . . .
. . . . . . . . . .
. . . . . . . . . .
. . . 1 . . 1 . . .
. . . . . . . . . .
. . . . . . . . . .
. . . 1 . . 1 . . .
. . . . . . . . . .
. . . . . . . . . .
. . . . . . . . . .";

pub const NUM_PIECES: usize = 12;
const NUM_WH_TO_WIN: u32 = 3;

#[derive(Debug, Clone)]
pub struct Board {
    pieces: Vec<Piece>,
    square_piece: [Option<PieceId>; NUM_SQUARES],
    occ_side: [Bitboard; 2],
    occ_all: Bitboard,
    threat_map: [Bitboard; NUM_HERDS],
    /// The two piece ids belonging to each herd, filled once by
    /// [`Board::index_herds`]; a flat lookup instead of per-piece
    /// sibling/scares/scaredBy back-pointers.
    herd_members: [[PieceId; 2]; NUM_HERDS],
    pub side_to_move: Side,
    pub key: u128,
    pub is_side_forced: bool,
    pub watering_holes: Bitboard,
    /// Number of moves actually played in the game so far. Only touched by
    /// the engine layer's `on_move_played`, never by `move_piece` itself,
    /// since the same board is reused to make/unmake hypothetical moves
    /// during search.
    pub ply: u32,
}

impl Board {
    pub fn new() -> Self {
        Self::from_string(DEFAULT_START_POS)
    }

    /// Parses a human-readable grid of `BOARD_CHARS`, row 10 first, matching
    /// [`crate::bitboard::Bitboard::from_string`]'s square convention.
    pub fn from_string(s: &str) -> Self {
        let mut pieces = Vec::with_capacity(NUM_PIECES);
        let mut len = 0usize;

        for c in s.chars() {
            if len >= NUM_SQUARES {
                break;
            }
            let Some(herd_idx) = BOARD_CHARS.find(c) else {
                continue;
            };

            if herd_idx >= NUM_HERDS {
                // '.', an empty square: just advances the cursor.
                len += 1;
                continue;
            }

            let row_from_top = len / BOARD_SIZE;
            let col = len % BOARD_SIZE;
            let row = (BOARD_SIZE - 1 - row_from_top) as u8;
            let scalar = Square::from_row_col(row, col as u8);

            let side = if herd_idx < 3 { Side::White } else { Side::Black };
            let piece_type = match herd_idx % 3 {
                0 => PieceType::Mouse,
                1 => PieceType::Lion,
                _ => PieceType::Elephant,
            };
            pieces.push(Piece::new(Herd::new(side, piece_type), scalar));
            len += 1;
        }

        let mut board = Board {
            pieces,
            square_piece: [None; NUM_SQUARES],
            occ_side: [Bitboard::EMPTY; 2],
            occ_all: Bitboard::EMPTY,
            threat_map: [Bitboard::EMPTY; NUM_HERDS],
            herd_members: [[0; 2]; NUM_HERDS],
            side_to_move: Side::White,
            key: 0,
            is_side_forced: false,
            watering_holes: Bitboard::from_string(WATERING_HOLES_STR),
            ply: 0,
        };
        board.init();
        board
    }

    fn init(&mut self) {
        self.index_herds();
        self.set_up_pieces();
        self.key = self.compute_zobrist_full();
        self.update_move_sets();
    }

    fn index_herds(&mut self) {
        let mut next = [0usize; NUM_HERDS];
        for (id, p) in self.pieces.iter().enumerate() {
            let h = p.herd.index();
            self.herd_members[h][next[h]] = id as PieceId;
            next[h] += 1;
        }
    }

    /// Places every piece via [`Board::move_piece`] onto its own square:
    /// it's the cheapest way to derive occupancy, adjacency and threat
    /// state from scratch
    /// without a second, separate initialization path. Twelve pieces means
    /// `side_to_move` flips an even number of times and ends back where it
    /// started; the zobrist churn this causes is discarded by the full
    /// recompute that follows in [`Board::init`].
    fn set_up_pieces(&mut self) {
        self.square_piece = [None; NUM_SQUARES];
        self.occ_all = Bitboard::EMPTY;
        self.occ_side = [Bitboard::EMPTY; 2];

        for id in 0..self.pieces.len() as PieceId {
            let scalar = self.pieces[id as usize].scalar;
            self.move_piece(id, scalar);
        }
    }

    fn compute_zobrist_full(&self) -> u128 {
        let t = tables();
        let mut key = 0u128;
        for p in &self.pieces {
            key ^= t.zobrist[p.herd.index()][p.scalar.scalar() as usize];
        }
        if self.side_to_move == Side::Black {
            key ^= t.side_toggle;
        }
        key
    }

    pub fn piece(&self, id: PieceId) -> &Piece {
        &self.pieces[id as usize]
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece_at(&self, sq: Square) -> Option<&Piece> {
        self.square_piece[sq.scalar() as usize].map(|id| &self.pieces[id as usize])
    }

    /// Id of the piece on `sq`, if any. Used by make/unmake to recover
    /// which piece a [`crate::moves::types::Move`] moves, since the move
    /// itself only carries `from`/`to` squares.
    pub fn piece_id_at(&self, sq: Square) -> Option<PieceId> {
        self.square_piece[sq.scalar() as usize]
    }

    pub fn occupancy(&self) -> Bitboard {
        self.occ_all
    }

    pub fn occupancy_of(&self, side: Side) -> Bitboard {
        self.occ_side[side as usize]
    }

    pub fn threat_map(&self, herd: Herd) -> Bitboard {
        self.threat_map[herd.index()]
    }

    pub fn herd_members(&self, herd: Herd) -> [PieceId; 2] {
        self.herd_members[herd.index()]
    }

    /// Relocates piece `id` to `dest`, carrying the zobrist key, occupancy,
    /// sight-dirty flags and threat maps along with it, then flips the side
    /// to move.
    pub fn move_piece(&mut self, id: PieceId, dest: Square) {
        let idx = id as usize;
        let old_scalar = self.pieces[idx].scalar;
        let side = self.pieces[idx].side();

        self.square_piece[old_scalar.scalar() as usize] = None;

        self.update_zobrist_key(id, dest);

        let old_pos = self.pieces[idx].pos;
        self.occ_all ^= old_pos;
        self.occ_side[side as usize] ^= old_pos;

        self.schedule_sight_updates(old_scalar);

        self.pieces[idx].relocate(dest);

        self.square_piece[dest.scalar() as usize] = Some(id);
        let new_pos = self.pieces[idx].pos;
        self.occ_all |= new_pos;
        self.occ_side[side as usize] |= new_pos;

        self.schedule_sight_updates(dest);

        self.update_threats(id);

        self.side_to_move = !self.side_to_move;

        #[cfg(all(debug_assertions, feature = "paranoid_hash"))]
        {
            let full = self.compute_zobrist_full();
            if full != self.key {
                eprintln!("paranoid_hash: incremental key 0x{:032x} != full recompute 0x{:032x} (diff 0x{:032x})", self.key, full, self.key ^ full);
            }
        }
    }

    /// Panics with a diagnostic board dump if the incrementally maintained
    /// zobrist key has drifted from a full recompute. Compiled only in
    /// debug builds — release builds don't pay for this check, matching
    /// the teacher crate's own `assert_hash` convention. Deliberately not
    /// called from inside `move_piece` itself: `set_up_pieces` drives
    /// `move_piece` with a from-square-equals-to-square no-op relocation
    /// per piece before `key` is seeded by `compute_zobrist_full`, during
    /// which the incremental key is transiently meaningless. Called
    /// instead from the higher-level `moves::execute` make/unmake wrappers,
    /// which only ever run after a board is fully initialized.
    #[cfg(debug_assertions)]
    pub fn assert_hash(&self) {
        let full = self.compute_zobrist_full();
        debug_assert_eq!(
            self.key, full,
            "zobrist key mismatch: incremental 0x{:032x} != recomputed 0x{:032x}\n{self}",
            self.key, full
        );
    }

    fn update_zobrist_key(&mut self, id: PieceId, dest: Square) {
        let t = tables();
        let p = &self.pieces[id as usize];
        let herd_idx = p.herd.index();
        self.key ^= t.zobrist[herd_idx][p.scalar.scalar() as usize];
        self.key ^= t.zobrist[herd_idx][dest.scalar() as usize];
        self.key ^= t.side_toggle;
    }

    /// Marks every piece sharing a row/file (rook-movers) or diagonal
    /// (bishop-movers) with `square` as needing a fresh sight computation.
    /// Called once with the vacated square and once with the destination
    /// square; since the mover shares its own square with itself trivially,
    /// both calls also dirty the mover — no separate step is needed for
    /// that.
    fn schedule_sight_updates(&mut self, square: Square) {
        for q in self.pieces.iter_mut() {
            let pt = q.piece_type();
            if pt.moves_like_rook() && (q.scalar.row() == square.row() || q.scalar.col() == square.col()) {
                q.sight_dirty = true;
            }
            if pt.moves_like_bishop()
                && (q.scalar.diag() == square.diag() || q.scalar.antidiag() == square.antidiag())
            {
                q.sight_dirty = true;
            }
        }
    }

    /// Recomputes `id`'s sight bitboard from current occupancy. Rook-like
    /// sight comes from the row/file sight tables; bishop-like sight reuses
    /// the same `row_sight` table keyed by the diagonal's collapsed
    /// occupancy and the piece's column — there is no separate diagonal
    /// sight table.
    fn update_piece_sight(&mut self, id: PieceId) {
        let t = tables();
        let idx = id as usize;
        let scalar = self.pieces[idx].scalar;
        let pt = self.pieces[idx].piece_type();
        let k = scalar.scalar() as usize;
        let mut sight = Bitboard::EMPTY;

        if pt.moves_like_rook() {
            let row_occ = (self.occ_all & t.row_mask[k]).collapse_to_row();
            let file_occ = (self.occ_all & t.file_mask[k]).collapse_to_file().file_to_row();
            let row_idx = row_occ.raw() as usize;
            let file_idx = file_occ.raw() as usize;
            sight |= t.row_sight[row_idx][k % BOARD_SIZE] & t.row_mask[k];
            sight |= t.file_sight[file_idx][k / BOARD_SIZE] & t.file_mask[k];
        }

        if pt.moves_like_bishop() {
            let diag_occ = (self.occ_all & t.diag_mask[k]).collapse_to_row();
            let antidiag_occ = (self.occ_all & t.antidiag_mask[k]).collapse_to_row();
            let diag_idx = diag_occ.raw() as usize;
            let antidiag_idx = antidiag_occ.raw() as usize;
            sight |= t.row_sight[diag_idx][k % BOARD_SIZE] & t.diag_mask[k];
            sight |= t.row_sight[antidiag_idx][k % BOARD_SIZE] & t.antidiag_mask[k];
        }

        self.pieces[idx].sight = sight;
        self.pieces[idx].sight_dirty = false;
    }

    /// Refreshes `id`'s legal-move bitboard from its sight. A threatened
    /// piece with no safe escape keeps its full, unfiltered sight rather
    /// than being left with an empty move set — `forced` only becomes true
    /// when a safe square actually survives the filter.
    fn update_piece_moves(&mut self, id: PieceId) {
        let idx = id as usize;
        if self.pieces[idx].sight_dirty {
            self.update_piece_sight(id);
        }

        let herd = self.pieces[idx].herd;
        let scared_by_map = self.threat_map[herd.scared_by().index()];
        let threatened = self.pieces[idx].threatened;
        let sight = self.pieces[idx].sight;

        let (move_bb, forced) = if threatened {
            let safe = sight & !scared_by_map;
            if !safe.is_empty() {
                (safe, true)
            } else {
                (sight, false)
            }
        } else {
            (sight & !scared_by_map, false)
        };

        let p = &mut self.pieces[idx];
        p.move_bb = move_bb;
        p.forced = forced;
    }

    fn refresh_threatened(&mut self, id: PieceId) {
        let idx = id as usize;
        let scalar = self.pieces[idx].scalar;
        let herd = self.pieces[idx].herd;
        let scared_by_map = self.threat_map[herd.scared_by().index()];
        self.pieces[idx].threatened = scared_by_map.contains(scalar);
    }

    /// Rebuilds `id`'s adjacency and its herd's threat map, then refreshes
    /// `threatened` for `id` and for both pieces of the herd `id` preys on
    /// (their threatened status may have just changed).
    fn update_threats(&mut self, id: PieceId) {
        let idx = id as usize;
        let scalar = self.pieces[idx].scalar;
        let herd = self.pieces[idx].herd;
        let adjacency = tables().adjacency[scalar.scalar() as usize];
        self.pieces[idx].adjacency = adjacency;

        let siblings = self.herd_members[herd.index()];
        let mut herd_map = Bitboard::EMPTY;
        for &member in siblings.iter() {
            herd_map |= self.pieces[member as usize].adjacency;
        }
        self.threat_map[herd.index()] = herd_map;

        self.refresh_threatened(id);

        for &prey_id in self.herd_members[herd.scares().index()].iter() {
            self.refresh_threatened(prey_id);
        }
    }

    /// Full recompute of sight, move sets and `forced` for every piece on
    /// the board, both sides. Used after `init()` and whenever a quick
    /// incremental pass isn't safe to rely on. Clears the opposing side's
    /// move sets (only the side to move may have legal moves), and — when
    /// any own piece is forced — clears every non-forced own piece's move
    /// set too, per the forced-move rule.
    pub fn update_move_sets(&mut self) {
        for id in 0..self.pieces.len() as PieceId {
            self.update_piece_moves(id);
        }

        let mover = self.side_to_move;
        self.is_side_forced = self.pieces.iter().any(|p| p.side() == mover && p.forced);
        let forced = self.is_side_forced;

        for p in self.pieces.iter_mut() {
            if p.side() != mover {
                p.move_bb = Bitboard::EMPTY;
            } else if forced && !p.forced {
                p.move_bb = Bitboard::EMPTY;
            }
        }
    }

    /// Refreshes only the side to move's pieces, and — once it's known the
    /// side is forced — skips recomputation for pieces that aren't
    /// themselves threatened, since a forced move must come from a
    /// threatened piece.
    pub fn quick_move_sets(&mut self) {
        let mover = self.side_to_move;
        let mut forced = false;
        for id in 0..self.pieces.len() as PieceId {
            let idx = id as usize;
            if self.pieces[idx].side() != mover {
                continue;
            }
            if forced && !self.pieces[idx].threatened {
                continue;
            }
            self.update_piece_moves(id);
            if self.pieces[idx].forced {
                forced = true;
            }
        }
        self.is_side_forced = forced;
    }

    /// True when `side` has lost: the opponent occupies at least
    /// `NUM_WH_TO_WIN` watering holes.
    pub fn is_lost(&self, side: Side) -> bool {
        (self.occ_side[side.opposite() as usize] & self.watering_holes).popcount() >= NUM_WH_TO_WIN
    }

    /// Debug-only consistency check: occupancy, pointer-board and threat
    /// maps are all recomputed from piece state and compared against what's
    /// cached.
    pub fn validate(&self) -> Result<(), String> {
        let mut occ_all = Bitboard::EMPTY;
        let mut occ_side = [Bitboard::EMPTY; 2];
        let mut square_piece = [None; NUM_SQUARES];

        for (id, p) in self.pieces.iter().enumerate() {
            if square_piece[p.scalar.scalar() as usize].is_some() {
                return Err(format!("two pieces on the same square {}\n{self}", p.scalar));
            }
            square_piece[p.scalar.scalar() as usize] = Some(id as PieceId);
            occ_all |= p.pos;
            occ_side[p.side() as usize] |= p.pos;
        }

        if occ_all != self.occ_all {
            return Err(format!(
                "occupancy mismatch: cached {:x} computed {:x}\n{self}",
                self.occ_all.raw(),
                occ_all.raw()
            ));
        }
        if occ_side != self.occ_side {
            return Err(format!("per-side occupancy mismatch\n{self}"));
        }
        if square_piece != self.square_piece {
            return Err(format!("pointer-board mismatch\n{self}"));
        }

        let expected_key = self.compute_zobrist_full();
        if expected_key != self.key {
            return Err(format!(
                "zobrist key mismatch: cached {:x} computed {:x}\n{self}",
                self.key, expected_key
            ));
        }

        Ok(())
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl std::str::FromStr for Board {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Board::from_string(s))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row_from_top in 0..BOARD_SIZE {
            let row = (BOARD_SIZE - 1 - row_from_top) as u8;
            for col in 0..BOARD_SIZE as u8 {
                let sq = Square::from_row_col(row, col);
                let ch = match self.piece_at(sq) {
                    Some(p) => p.piece_type().board_char(p.side()),
                    None => '.',
                };
                if self.watering_holes.contains(sq) {
                    write!(f, "({ch})")?;
                } else {
                    write!(f, " {ch} ")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_position_has_twelve_pieces_and_is_consistent() {
        let board = Board::new();
        assert_eq!(board.pieces().len(), NUM_PIECES);
        board.validate().expect("freshly built board must validate");
    }

    #[test]
    fn default_position_is_symmetric_by_side() {
        let board = Board::new();
        assert_eq!(board.occupancy_of(Side::White).popcount(), 6);
        assert_eq!(board.occupancy_of(Side::Black).popcount(), 6);
    }

    #[test]
    fn watering_holes_match_literal_layout() {
        let board = Board::new();
        assert_eq!(board.watering_holes.popcount(), 4);
    }

    #[test]
    fn move_piece_updates_pointer_board_and_flips_side() {
        let mut board = Board::new();
        let mover = board.side_to_move;
        let piece_id = board
            .pieces()
            .iter()
            .position(|p| p.side() == mover)
            .unwrap() as PieceId;
        let from = board.piece(piece_id).scalar;
        let dest = Square::from_row_col(4, 4);

        board.move_piece(piece_id, dest);

        assert_eq!(board.piece(piece_id).scalar, dest);
        assert!(board.piece_at(from).is_none());
        assert_eq!(board.side_to_move, mover.opposite());
        board.validate().expect("board must stay consistent after a move");
    }

    #[test]
    fn no_side_is_forced_from_the_opening_position() {
        let board = Board::new();
        assert!(!board.is_side_forced);
    }
}
