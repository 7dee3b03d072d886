//! Precomputed, process-global lookup tables: line masks, the adjacency
//! table, sight tables for slider attack generation, and the Zobrist key
//! table. Built once behind a [`once_cell::sync::OnceCell`] and treated as
//! immutable for the remainder of the process.

use crate::bitboard::Bitboard;
use crate::square::{BOARD_SIZE, NUM_SQUARES, Square};
use once_cell::sync::OnceCell;
use rand::{RngCore, SeedableRng, rngs::StdRng};

pub const NUM_HERDS: usize = 6;
/// Occupancy of a single line (row or file), projected to 10 bits.
pub const OCC_SIZE: usize = 1 << BOARD_SIZE;

pub struct Tables {
    pub row_mask: [Bitboard; NUM_SQUARES],
    pub file_mask: [Bitboard; NUM_SQUARES],
    pub diag_mask: [Bitboard; NUM_SQUARES],
    pub antidiag_mask: [Bitboard; NUM_SQUARES],
    pub adjacency: [Bitboard; NUM_SQUARES],
    /// Indexed `[line_occupancy][position_on_line]`; already stretched into
    /// every row, ready to be masked against `row_mask[pos]`.
    pub row_sight: Vec<[Bitboard; BOARD_SIZE]>,
    /// Indexed `[line_occupancy][position_on_line]`; already stretched into
    /// every file, ready to be masked against `file_mask[pos]`.
    pub file_sight: Vec<[Bitboard; BOARD_SIZE]>,
    pub zobrist: [[u128; NUM_SQUARES]; NUM_HERDS],
    pub side_toggle: u128,
}

static TABLES: OnceCell<Tables> = OnceCell::new();

pub fn tables() -> &'static Tables {
    TABLES.get_or_init(Tables::build)
}

impl Tables {
    fn build() -> Tables {
        let (row_mask, file_mask) = gen_rook_masks();
        let (diag_mask, antidiag_mask) = gen_bishop_masks();
        let adjacency = gen_adjacency_table();
        let (row_sight, file_sight) = gen_sight_tables();
        let (zobrist, side_toggle) = gen_zobrist_table();

        Tables {
            row_mask,
            file_mask,
            diag_mask,
            antidiag_mask,
            adjacency,
            row_sight,
            file_sight,
            zobrist,
            side_toggle,
        }
    }
}

fn gen_rook_masks() -> ([Bitboard; NUM_SQUARES], [Bitboard; NUM_SQUARES]) {
    let mut row_mask = [Bitboard::EMPTY; NUM_SQUARES];
    let mut file_mask = [Bitboard::EMPTY; NUM_SQUARES];

    for r in 0..BOARD_SIZE {
        let row = Bitboard::ROW_1 << (r * BOARD_SIZE) as u32;
        for c in 0..BOARD_SIZE {
            row_mask[r * BOARD_SIZE + c] = row;
        }
    }

    for c in 0..BOARD_SIZE {
        let file = Bitboard::file_a() << c as u32;
        for r in 0..BOARD_SIZE {
            file_mask[r * BOARD_SIZE + c] = file;
        }
    }

    (row_mask, file_mask)
}

/// Traces the perimeter of each diagonal/antidiagonal on an empty board:
/// start at the edge square for diagonal/antidiagonal index `i`, then walk
/// by +11 (resp. +9) scalar steps until the far edge is hit.
fn gen_bishop_masks() -> ([Bitboard; NUM_SQUARES], [Bitboard; NUM_SQUARES]) {
    let n_lines = BOARD_SIZE * 2 - 1;
    let mut diags = vec![Bitboard::EMPTY; n_lines];
    let mut antidiags = vec![Bitboard::EMPTY; n_lines];

    for i in 0..n_lines {
        let mut n = if i < BOARD_SIZE {
            (BOARD_SIZE - i - 1) * BOARD_SIZE
        } else {
            i - BOARD_SIZE + 1
        };
        diags[i].set(Square::new(n as u8));
        while n < BOARD_SIZE * (BOARD_SIZE - 1) && n % BOARD_SIZE != BOARD_SIZE - 1 {
            n += BOARD_SIZE + 1;
            diags[i].set(Square::new(n as u8));
        }

        let mut n = if i < BOARD_SIZE {
            i
        } else {
            (i - BOARD_SIZE + 1) * BOARD_SIZE + BOARD_SIZE - 1
        };
        antidiags[i].set(Square::new(n as u8));
        while n < BOARD_SIZE * (BOARD_SIZE - 1) && n % BOARD_SIZE != 0 {
            n += BOARD_SIZE - 1;
            antidiags[i].set(Square::new(n as u8));
        }
    }

    let mut diag_mask = [Bitboard::EMPTY; NUM_SQUARES];
    let mut antidiag_mask = [Bitboard::EMPTY; NUM_SQUARES];

    for i in 0..NUM_SQUARES {
        let x = i % BOARD_SIZE;
        let y = i / BOARD_SIZE;
        diag_mask[i] = diags[x + BOARD_SIZE - 1 - y];
        antidiag_mask[i] = antidiags[x + y];
    }

    (diag_mask, antidiag_mask)
}

fn gen_adjacency_table() -> [Bitboard; NUM_SQUARES] {
    let mut adjacency = [Bitboard::EMPTY; NUM_SQUARES];

    for i in 0..NUM_SQUARES {
        let x = i % BOARD_SIZE;
        let y = i / BOARD_SIZE;
        let mut b = Bitboard::EMPTY;

        if y > 0 && x > 0 {
            b.set(Square::new((i - BOARD_SIZE - 1) as u8)); // NW
        }
        if y > 0 {
            b.set(Square::new((i - BOARD_SIZE) as u8)); // N
        }
        if y > 0 && x < BOARD_SIZE - 1 {
            b.set(Square::new((i - BOARD_SIZE + 1) as u8)); // NE
        }
        if x > 0 {
            b.set(Square::new((i - 1) as u8)); // W
        }
        if x < BOARD_SIZE - 1 {
            b.set(Square::new((i + 1) as u8)); // E
        }
        if y < BOARD_SIZE - 1 && x > 0 {
            b.set(Square::new((i + BOARD_SIZE - 1) as u8)); // SW
        }
        if y < BOARD_SIZE - 1 {
            b.set(Square::new((i + BOARD_SIZE) as u8)); // S
        }
        if y < BOARD_SIZE - 1 && x < BOARD_SIZE - 1 {
            b.set(Square::new((i + BOARD_SIZE + 1) as u8)); // SE
        }

        adjacency[i] = b;
    }

    adjacency
}

/// For every 10-bit line occupancy and every occupied position on that
/// line, the squares reachable from `pos` stopping at (but excluding) the
/// nearest occupied square in each direction, stretched across the whole
/// board so a later AND with the line's full mask selects just that line.
fn gen_sight_tables() -> (Vec<[Bitboard; BOARD_SIZE]>, Vec<[Bitboard; BOARD_SIZE]>) {
    let mut row_sight = vec![[Bitboard::EMPTY; BOARD_SIZE]; OCC_SIZE];
    let mut file_sight = vec![[Bitboard::EMPTY; BOARD_SIZE]; OCC_SIZE];

    for occ in 0..OCC_SIZE {
        for i in 0..BOARD_SIZE {
            if occ & (1 << i) == 0 {
                continue;
            }

            let mut row_line = Bitboard::EMPTY;
            let mut file_line = Bitboard::EMPTY;

            let mut r = i as isize - 1;
            while r >= 0 {
                if occ & (1 << r) != 0 {
                    break;
                }
                row_line.set(Square::new(r as u8));
                file_line.set(Square::new((r as usize * BOARD_SIZE) as u8));
                r -= 1;
            }

            let mut r = i + 1;
            while r < BOARD_SIZE {
                if occ & (1 << r) != 0 {
                    break;
                }
                row_line.set(Square::new(r as u8));
                file_line.set(Square::new((r * BOARD_SIZE) as u8));
                r += 1;
            }

            row_sight[occ][i] = row_line.stretch_row();
            file_sight[occ][i] = file_line.stretch_file();
        }
    }

    (row_sight, file_sight)
}

fn make_zobrist_rng() -> StdRng {
    #[cfg(feature = "deterministic_zobrist")]
    {
        const ZOBRIST_SEED: u64 = 0xB4_B4_A3_31_6B_2D_9D_57;
        StdRng::seed_from_u64(ZOBRIST_SEED)
    }
    #[cfg(not(feature = "deterministic_zobrist"))]
    {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        StdRng::from_seed(seed)
    }
}

/// 100-bit non-zero random value, avoiding a degenerate all-zero key.
fn random_key(rng: &mut StdRng) -> u128 {
    loop {
        let hi = rng.next_u64() as u128;
        let lo = rng.next_u64() as u128;
        let v = ((hi << 64) | lo) & Bitboard::FULL.raw();
        if v != 0 {
            return v;
        }
    }
}

fn gen_zobrist_table() -> ([[u128; NUM_SQUARES]; NUM_HERDS], u128) {
    let mut rng = make_zobrist_rng();
    let mut zobrist = [[0u128; NUM_SQUARES]; NUM_HERDS];

    for herd in zobrist.iter_mut() {
        for sq in herd.iter_mut() {
            *sq = random_key(&mut rng);
        }
    }

    let side_toggle = random_key(&mut rng);
    (zobrist, side_toggle)
}
