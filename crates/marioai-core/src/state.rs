//! Task-level view of the latest frame, as handed to agents.

use serde::{Deserialize, Serialize};

use crate::scene::{LevelScene, ObjectClass, OBJECT_CLASS_COUNT};

// ---------------------------------------------------------------------------
// SceneFeatures
// ---------------------------------------------------------------------------

/// Discrete features derived from the scene around the player.
///
/// Index `d - 1` of each vector holds the feature for the column `d` cells
/// ahead of the player. Equality and hashing are structural, so the value
/// can key tabular learners directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SceneFeatures {
    /// Row treated as the ground line below the player.
    pub ground_row: usize,
    /// `near[d - 1][class.index()]`: an object of `class` sits in the three
    /// rows above the player, `d` columns ahead.
    pub near: Vec<[bool; OBJECT_CLASS_COUNT]>,
    /// `hole_ahead[d - 1]`: every cell from the ground row down is empty.
    pub hole_ahead: Vec<bool>,
}

impl SceneFeatures {
    /// Largest distance covered by these features.
    #[must_use]
    pub fn max_dist(&self) -> usize {
        self.near.len()
    }

    /// Whether an object of `class` is `dist` cells ahead. `false` for a
    /// distance outside `1..=max_dist`.
    #[must_use]
    pub fn is_near(&self, class: ObjectClass, dist: usize) -> bool {
        dist.checked_sub(1)
            .and_then(|i| self.near.get(i))
            .is_some_and(|row| row[class.index()])
    }

    /// Whether the column `dist` cells ahead has no floor.
    #[must_use]
    pub fn has_hole(&self, dist: usize) -> bool {
        dist.checked_sub(1)
            .and_then(|i| self.hole_ahead.get(i))
            .copied()
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// EpisodeState
// ---------------------------------------------------------------------------

/// Structured state built from one decoded frame.
///
/// Terminal states (built from the fitness frame) carry no scene, position,
/// or features, and report `episode_over`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EpisodeState {
    pub episode_over: bool,
    pub can_jump: bool,
    pub on_ground: bool,
    pub mario_position: Option<(f64, f64)>,
    pub enemy_positions: Vec<f64>,
    pub level_scene: Option<LevelScene>,
    pub features: Option<SceneFeatures>,
}

impl EpisodeState {
    /// The state reported once the fitness frame has arrived.
    #[must_use]
    pub fn terminal() -> Self {
        Self {
            episode_over: true,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
