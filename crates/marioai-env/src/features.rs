//! Discrete features derived from the scene around the player.

use marioai_core::config::TaskConfig;
use marioai_core::scene::{LevelScene, ObjectClass, GROUND_CELL, SCENE_SIZE};
use marioai_core::state::SceneFeatures;

/// Ground row assumed while the player stands on the ground.
pub const GROUNDED_ROW: usize = 12;

/// Ground row assumed when no ground cell is visible in the window.
pub const FALLBACK_GROUND_ROW: usize = 10;

/// Rows above the player scanned by the proximity features.
const NEAR_ROWS: usize = 3;

/// Compute every feature for `scene`.
#[must_use]
pub fn extract(scene: &LevelScene, on_ground: bool, config: &TaskConfig) -> SceneFeatures {
    let ground_row = ground_row(scene, on_ground, config);
    let near = (1..=config.max_dist)
        .map(|dist| ObjectClass::ALL.map(|class| is_near(scene, class, dist, config)))
        .collect();
    let hole_ahead = (1..=config.max_dist)
        .map(|dist| hole_ahead(scene, ground_row, dist, config))
        .collect();
    SceneFeatures {
        ground_row,
        near,
        hole_ahead,
    }
}

/// Row of the ground line below the player.
///
/// When airborne, the window spanning rows `player_pos - window_size..` and
/// columns `player_pos - window_size..player_pos + window_size` is scanned
/// row by row for a ground cell.
#[must_use]
pub fn ground_row(scene: &LevelScene, on_ground: bool, config: &TaskConfig) -> usize {
    if on_ground {
        return GROUNDED_ROW;
    }
    let start = config.player_pos.saturating_sub(config.window_size);
    let end = (config.player_pos + config.window_size).min(SCENE_SIZE);
    (start..SCENE_SIZE)
        .find(|&row| scene.row(row)[start..end].contains(&GROUND_CELL))
        .unwrap_or(FALLBACK_GROUND_ROW)
}

/// Whether a cell of `class` occupies one of the three rows above the
/// player, `dist` columns ahead.
#[must_use]
pub fn is_near(scene: &LevelScene, class: ObjectClass, dist: usize, config: &TaskConfig) -> bool {
    let col = look_ahead_col(dist, config);
    (1..=NEAR_ROWS).any(|i| class.contains(scene.get(config.player_pos.saturating_sub(i), col)))
}

/// Whether the column `dist` cells ahead is empty from `ground_row` down.
#[must_use]
pub fn hole_ahead(scene: &LevelScene, ground_row: usize, dist: usize, config: &TaskConfig) -> bool {
    let col = look_ahead_col(dist, config);
    (ground_row..SCENE_SIZE).all(|row| scene.get(row, col) == 0)
}

const fn look_ahead_col(dist: usize, config: &TaskConfig) -> usize {
    let col = config.player_pos + dist;
    if col < SCENE_SIZE {
        col
    } else {
        SCENE_SIZE - 1
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
