//! The 22x22 level scene centred on the player, plus the cell codebook.
//!
//! Cells hold the raw codes sent by the simulator. Bit-packed snapshots only
//! carry occupancy (0/1); full observations carry the semantic codes listed
//! in [`ObjectClass`].

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Width and height of the level scene.
pub const SCENE_SIZE: usize = 22;

/// Total number of cells in a scene.
pub const SCENE_CELLS: usize = SCENE_SIZE * SCENE_SIZE;

/// Row/column of the player within the scene.
pub const PLAYER_CELL: usize = 11;

/// Code for cells the simulator did not describe.
pub const UNKNOWN_CELL: i32 = 2;

/// Raw code for ground tiles.
pub const GROUND_CELL: i32 = -10;

/// Raw code for soft (jump-through) terrain.
pub const SOFT_CELL: i32 = -11;

/// Raw code for the fireball projectile.
pub const PROJECTILE_CELL: i32 = 25;

// ---------------------------------------------------------------------------
// ObjectClass
// ---------------------------------------------------------------------------

/// Classes of scene objects the proximity features look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectClass {
    Soft,
    Hard,
    Enemy,
    Brick,
    Projectile,
}

/// Number of object classes.
pub const OBJECT_CLASS_COUNT: usize = 5;

impl ObjectClass {
    /// Every class, in feature order.
    pub const ALL: [Self; OBJECT_CLASS_COUNT] = [
        Self::Soft,
        Self::Hard,
        Self::Enemy,
        Self::Brick,
        Self::Projectile,
    ];

    /// Raw cell codes belonging to this class.
    #[must_use]
    pub const fn codes(self) -> &'static [i32] {
        match self {
            Self::Soft => &[SOFT_CELL],
            Self::Hard => &[20, GROUND_CELL],
            Self::Enemy => &[2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 13, 14, 15],
            Self::Brick => &[16, 21],
            Self::Projectile => &[PROJECTILE_CELL],
        }
    }

    /// Whether `code` belongs to this class.
    #[must_use]
    pub fn contains(self, code: i32) -> bool {
        self.codes().contains(&code)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
            Self::Enemy => "enemy",
            Self::Brick => "brick",
            Self::Projectile => "projectile",
        }
    }

    /// Position of this class in [`ObjectClass::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// LevelScene
// ---------------------------------------------------------------------------

/// Fixed 22x22 grid of cell codes, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelScene {
    cells: [[i32; SCENE_SIZE]; SCENE_SIZE],
}

impl LevelScene {
    /// Scene with every cell set to `value`.
    #[must_use]
    pub const fn filled(value: i32) -> Self {
        Self {
            cells: [[value; SCENE_SIZE]; SCENE_SIZE],
        }
    }

    /// Scene with every cell set to [`UNKNOWN_CELL`].
    #[must_use]
    pub const fn unknown() -> Self {
        Self::filled(UNKNOWN_CELL)
    }

    #[must_use]
    pub const fn zeros() -> Self {
        Self::filled(0)
    }

    /// Build a scene from 484 row-major values.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SceneSizeMismatch`] if `values` does not hold
    /// exactly [`SCENE_CELLS`] entries.
    pub fn from_row_major(values: &[i32]) -> Result<Self, ValidationError> {
        if values.len() != SCENE_CELLS {
            return Err(ValidationError::SceneSizeMismatch {
                expected: SCENE_CELLS,
                got: values.len(),
            });
        }
        let mut scene = Self::zeros();
        for (i, value) in values.iter().enumerate() {
            scene.cells[i / SCENE_SIZE][i % SCENE_SIZE] = *value;
        }
        Ok(scene)
    }

    /// Cell at `(row, col)`. Panics when out of range.
    #[must_use]
    pub const fn get(&self, row: usize, col: usize) -> i32 {
        self.cells[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: i32) {
        self.cells[row][col] = value;
    }

    #[must_use]
    pub const fn row(&self, row: usize) -> &[i32; SCENE_SIZE] {
        &self.cells[row]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[i32; SCENE_SIZE]> {
        self.cells.iter()
    }

    /// Row-major iterator over every cell.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.cells.iter().flat_map(|row| row.iter().copied())
    }

    /// Row-major copy of the cells.
    #[must_use]
    pub fn to_vec(&self) -> Vec<i32> {
        self.iter().collect()
    }

    #[must_use]
    pub fn count_nonzero(&self) -> usize {
        self.iter().filter(|&c| c != 0).count()
    }

    /// Remap raw codes to the dense 0..=26 range used by learning code.
    ///
    /// `25 -> 22`, `-11 -> 23`, `-10 -> 24`, `42 -> 25`, and the player cell
    /// becomes `26`. Other codes are left untouched.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        for row in &mut out.cells {
            for cell in row.iter_mut() {
                *cell = match *cell {
                    PROJECTILE_CELL => 22,
                    SOFT_CELL => 23,
                    GROUND_CELL => 24,
                    42 => 25,
                    other => other,
                };
            }
        }
        out.cells[PLAYER_CELL][PLAYER_CELL] = 26;
        out
    }
}

impl Default for LevelScene {
    fn default() -> Self {
        Self::unknown()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unknown_sentinel() {
        let scene = LevelScene::default();
        assert!(scene.iter().all(|c| c == UNKNOWN_CELL));
        assert_eq!(scene.iter().count(), SCENE_CELLS);
    }

    #[test]
    fn from_row_major_fills_rows_first() {
        let values: Vec<i32> = (0..SCENE_CELLS as i32).collect();
        let scene = LevelScene::from_row_major(&values).unwrap();
        assert_eq!(scene.get(0, 0), 0);
        assert_eq!(scene.get(0, 21), 21);
        assert_eq!(scene.get(1, 0), 22);
        assert_eq!(scene.get(21, 21), 483);
        assert_eq!(scene.to_vec(), values);
    }

    #[test]
    fn from_row_major_rejects_wrong_size() {
        let err = LevelScene::from_row_major(&[0; 10]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::SceneSizeMismatch {
                expected: SCENE_CELLS,
                got: 10
            }
        );
    }

    #[test]
    fn count_nonzero() {
        let mut scene = LevelScene::zeros();
        assert_eq!(scene.count_nonzero(), 0);
        scene.set(3, 4, 1);
        scene.set(21, 0, -10);
        assert_eq!(scene.count_nonzero(), 2);
    }

    #[test]
    fn normalized_remaps_codes() {
        let mut scene = LevelScene::zeros();
        scene.set(0, 0, PROJECTILE_CELL);
        scene.set(0, 1, SOFT_CELL);
        scene.set(0, 2, GROUND_CELL);
        scene.set(0, 3, 42);
        scene.set(0, 4, 16);
        let norm = scene.normalized();
        assert_eq!(norm.get(0, 0), 22);
        assert_eq!(norm.get(0, 1), 23);
        assert_eq!(norm.get(0, 2), 24);
        assert_eq!(norm.get(0, 3), 25);
        assert_eq!(norm.get(0, 4), 16);
        assert_eq!(norm.get(PLAYER_CELL, PLAYER_CELL), 26);
        assert!(norm.iter().all(|c| (0..=26).contains(&c)));
    }

    #[test]
    fn object_class_membership() {
        assert!(ObjectClass::Hard.contains(GROUND_CELL));
        assert!(ObjectClass::Soft.contains(SOFT_CELL));
        assert!(ObjectClass::Enemy.contains(12));
        assert!(!ObjectClass::Enemy.contains(11));
        assert!(ObjectClass::Brick.contains(21));
        assert!(ObjectClass::Projectile.contains(25));
    }

    #[test]
    fn object_class_index_matches_all_order() {
        for (i, class) in ObjectClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i);
        }
        assert_eq!(ObjectClass::Projectile.name(), "projectile");
        assert_eq!(ObjectClass::Projectile.index(), OBJECT_CLASS_COUNT - 1);
    }
}
