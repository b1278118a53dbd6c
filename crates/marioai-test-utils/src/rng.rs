//! Deterministic RNG utilities for reproducible tests.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Generate a deterministic scene-sized vector of cell codes from `codes`.
///
/// Useful for building varied but reproducible level scenes.
pub fn deterministic_cells(codes: &[i32], seed: u64) -> Vec<i32> {
    use rand::seq::SliceRandom;
    let mut rng = seeded_rng(seed);
    (0..marioai_core::scene::SCENE_CELLS)
        .map(|_| codes.choose(&mut rng).copied().unwrap_or_default())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
