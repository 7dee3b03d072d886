//! Transposition table and the unified repetition-chain arena.
//!
//! The table is a flat, power-of-two-sized array of [`TTEntry`] indexed by
//! the low bits of the full 100-bit Zobrist key. A second, parallel array
//! of per-bucket chain heads indexes into a flat arena of [`GhNode`]s — the
//! "game-history" mechanism that backs draw-by-repetition detection. One
//! arena serves both the played-game history and the current search path:
//! there is no separate in-search repetition mechanism.

use crate::moves::types::Move;
use crate::search::eval::{EVAL_WIN, MAX_LINE_LEN};
use thiserror::Error;

pub const ASPIRATION_WINDOW: i32 = 5000;

#[derive(Debug, Error)]
pub enum TtError {
    #[error("transposition table allocation failed for {requested_mb} MB")]
    Allocation { requested_mb: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Empty,
    Exact,
    Static,
    Alpha,
    Beta,
}

#[derive(Debug, Clone, Copy)]
struct TTEntry {
    key: u128,
    depth: u16,
    flag: Flag,
    value: i32,
    mv: Move,
    found_at: u32,
}

impl TTEntry {
    fn empty() -> TTEntry {
        TTEntry {
            key: 0,
            depth: 0,
            flag: Flag::Empty,
            value: 0,
            mv: Move::default(),
            found_at: 0,
        }
    }
}

/// What a [`TranspositionTable::lookup`] tells the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    Unknown,
    Value(i32),
}

#[derive(Debug, Clone, Copy)]
struct GhNode {
    key: u128,
    next: Option<u32>,
}

pub struct TranspositionTable {
    entries: Vec<TTEntry>,
    mask: usize,
    chain_heads: Vec<Option<u32>>,
    chain_arena: Vec<GhNode>,
}

impl TranspositionTable {
    /// Allocates a table sized to hold roughly `size_mb` megabytes of
    /// entries, rounded up to the next power of two.
    pub fn new(size_mb: usize) -> Result<Self, TtError> {
        let entry_bytes = std::mem::size_of::<TTEntry>().max(1);
        let requested_entries = (size_mb.max(1) * 1024 * 1024) / entry_bytes;
        let len = requested_entries.max(1).next_power_of_two();

        if len == 0 || len > isize::MAX as usize / entry_bytes {
            return Err(TtError::Allocation { requested_mb: size_mb });
        }

        Ok(TranspositionTable {
            entries: vec![TTEntry::empty(); len],
            mask: len - 1,
            chain_heads: vec![None; len],
            chain_arena: Vec::new(),
        })
    }

    #[inline]
    fn index(&self, key: u128) -> usize {
        (key as usize) & self.mask
    }

    /// Stores a search result for `key`, applying the replacement policy
    /// and mate-distance adjustment. `game_ply` is the number of moves
    /// played so far in the real game (`Board::ply`) — deliberately not
    /// `root_dist`, which only counts plies within this search.
    pub fn store(&mut self, key: u128, depth: u16, flag: Flag, value: i32, mv: Move, game_ply: u32, root_dist: u32) {
        let idx = self.index(key);
        let existing = self.entries[idx];

        if existing.flag == Flag::Exact && flag != Flag::Exact {
            return;
        }
        if existing.flag != Flag::Empty
            && existing.depth as u64 + existing.found_at as u64 >= depth as u64 + game_ply as u64
        {
            return;
        }

        let adjusted = adjust_for_store(value, root_dist);
        self.entries[idx] = TTEntry {
            key,
            depth,
            flag,
            value: adjusted,
            mv,
            found_at: game_ply,
        };
    }

    /// Looks up `key` at `depth`. On a non-returning path (depth too
    /// shallow, or an Alpha/Beta bound that doesn't cut), returns the
    /// stored move as a move-ordering hint alongside `Unknown`, without
    /// threading a mutable move-list reference through a pure lookup.
    pub fn lookup(&self, key: u128, depth: u16, alpha: i32, beta: i32, root_dist: u32) -> (LookupResult, Option<Move>) {
        let idx = self.index(key);
        let entry = self.entries[idx];

        if entry.flag == Flag::Empty || entry.key != key {
            return (LookupResult::Unknown, None);
        }

        if entry.depth >= depth {
            match entry.flag {
                Flag::Exact => {
                    return (LookupResult::Value(adjust_for_lookup(entry.value, root_dist)), Some(entry.mv));
                }
                Flag::Static => {
                    return (LookupResult::Value(entry.value), None);
                }
                Flag::Alpha => {
                    if entry.value <= alpha {
                        return (LookupResult::Value(alpha), None);
                    }
                }
                Flag::Beta => {
                    if entry.value >= beta {
                        return (LookupResult::Value(beta), None);
                    }
                }
                Flag::Empty => unreachable!(),
            }
        }

        let hint = matches!(entry.flag, Flag::Exact | Flag::Beta).then_some(entry.mv);
        (LookupResult::Unknown, hint)
    }

    /// Stored move of an `Exact` entry matching `key` at depth at least
    /// `min_depth`, used to extend a principal variation past the nodes
    /// actually visited this iteration.
    pub fn peek_exact(&self, key: u128, min_depth: u16) -> Option<Move> {
        let entry = self.entries[self.index(key)];
        if entry.flag == Flag::Exact && entry.key == key && entry.depth >= min_depth {
            Some(entry.mv)
        } else {
            None
        }
    }

    /// Depth of the entry currently stored for `key`, or 0 if absent —
    /// used by the search to report `searchDepth = max(depth, storedDepthAtRoot)`.
    pub fn depth_at(&self, key: u128) -> u16 {
        let entry = self.entries[self.index(key)];
        if entry.key == key { entry.depth } else { 0 }
    }

    /// Appends `key` to the tail of its bucket's repetition chain.
    pub fn gh_store(&mut self, key: u128) {
        let idx = self.index(key);
        let node_idx = self.chain_arena.len() as u32;
        self.chain_arena.push(GhNode { key, next: None });

        match self.chain_heads[idx] {
            None => self.chain_heads[idx] = Some(node_idx),
            Some(head) => {
                let mut cur = head;
                while let Some(next) = self.chain_arena[cur as usize].next {
                    cur = next;
                }
                self.chain_arena[cur as usize].next = Some(node_idx);
            }
        }
    }

    /// Removes the first node matching `key` from its bucket's chain.
    pub fn gh_remove(&mut self, key: u128) {
        let idx = self.index(key);
        let mut prev: Option<u32> = None;
        let mut cur = self.chain_heads[idx];

        while let Some(node_idx) = cur {
            if self.chain_arena[node_idx as usize].key == key {
                let next = self.chain_arena[node_idx as usize].next;
                match prev {
                    Some(p) => self.chain_arena[p as usize].next = next,
                    None => self.chain_heads[idx] = next,
                }
                return;
            }
            prev = cur;
            cur = self.chain_arena[node_idx as usize].next;
        }
    }

    /// True if any node in `key`'s bucket chain carries the same full key.
    /// Always false at `root_dist == 0` so the position a search starts
    /// from is never reported as a repetition of itself.
    pub fn gh_match(&self, key: u128, root_dist: u32) -> bool {
        if root_dist == 0 {
            return false;
        }
        let idx = self.index(key);
        let mut cur = self.chain_heads[idx];
        while let Some(node_idx) = cur {
            if self.chain_arena[node_idx as usize].key == key {
                return true;
            }
            cur = self.chain_arena[node_idx as usize].next;
        }
        false
    }

    /// Frees every repetition-chain node (game history and any leftover
    /// in-search nodes alike) and their bucket heads. Does not reallocate
    /// the TT entries themselves.
    pub fn clear_game_history(&mut self) {
        self.chain_arena.clear();
        self.chain_heads.iter_mut().for_each(|h| *h = None);
    }
}

fn adjust_for_store(value: i32, root_dist: u32) -> i32 {
    if value > EVAL_WIN - MAX_LINE_LEN {
        value + root_dist as i32
    } else if value < -EVAL_WIN + MAX_LINE_LEN {
        value - root_dist as i32
    } else {
        value
    }
}

fn adjust_for_lookup(value: i32, root_dist: u32) -> i32 {
    if value > EVAL_WIN - MAX_LINE_LEN {
        value - root_dist as i32
    } else if value < -EVAL_WIN + MAX_LINE_LEN {
        value + root_dist as i32
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::Square;

    fn mv(from: u8, to: u8) -> Move {
        Move::new(Square::new(from), Square::new(to))
    }

    #[test]
    fn store_then_lookup_round_trips_exact_value_and_move() {
        let mut tt = TranspositionTable::new(1).unwrap();
        let key = 0xABCDEFu128;
        tt.store(key, 8, Flag::Exact, 1234, mv(0, 1), 0, 0);

        let (result, hint) = tt.lookup(key, 8, -100_000, 100_000, 0);
        assert_eq!(result, LookupResult::Value(1234));
        assert_eq!(hint, Some(mv(0, 1)));
    }

    #[test]
    fn exact_entry_is_never_overwritten_by_a_non_exact_store() {
        let mut tt = TranspositionTable::new(1).unwrap();
        let key = 42u128;
        tt.store(key, 4, Flag::Exact, 100, mv(0, 1), 0, 0);
        tt.store(key, 10, Flag::Beta, 999, mv(2, 3), 5, 0);

        let (result, _) = tt.lookup(key, 4, -100_000, 100_000, 0);
        assert_eq!(result, LookupResult::Value(100));
    }

    #[test]
    fn gh_match_is_false_at_root_even_when_key_is_present() {
        let mut tt = TranspositionTable::new(1).unwrap();
        let key = 7u128;
        tt.gh_store(key);
        assert!(!tt.gh_match(key, 0));
        assert!(tt.gh_match(key, 1));
    }

    #[test]
    fn gh_remove_drops_one_occurrence_and_leaves_the_other_matchable() {
        let mut tt = TranspositionTable::new(1).unwrap();
        let key = 1u128;
        tt.gh_store(key);
        tt.gh_store(key);
        tt.gh_remove(key);
        assert!(tt.gh_match(key, 3));
        tt.gh_remove(key);
        assert!(!tt.gh_match(key, 3));
    }

    #[test]
    fn mate_scores_round_trip_through_store_and_lookup_at_max_root_dist() {
        let mut tt = TranspositionTable::new(1).unwrap();
        let key = 99u128;
        let root_dist = MAX_LINE_LEN as u32;
        let raw_mate_value = -EVAL_WIN + root_dist as i32;

        tt.store(key, 2, Flag::Exact, raw_mate_value, mv(4, 5), 0, root_dist);
        let (result, _) = tt.lookup(key, 2, -2_000_000, 2_000_000, root_dist);
        assert_eq!(result, LookupResult::Value(raw_mate_value));
    }
}
