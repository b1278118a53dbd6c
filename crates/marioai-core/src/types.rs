use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::scene::LevelScene;

// ---------------------------------------------------------------------------
// ActionVector
// ---------------------------------------------------------------------------

/// Number of flags in an action.
pub const ACTION_FLAGS: usize = 5;

pub const BACKWARD: usize = 0;
pub const FORWARD: usize = 1;
pub const CROUCH: usize = 2;
pub const JUMP: usize = 3;
pub const SPEED: usize = 4;

/// Five binary button flags: `[backward, forward, crouch, jump, speed/bomb]`.
///
/// The flags are stored unchecked so that agents can hand back anything;
/// [`validate`](Self::validate) (and the wire encoder) reject values outside
/// `{0, 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ActionVector([u8; ACTION_FLAGS]);

impl ActionVector {
    /// All buttons released.
    pub const NOOP: Self = Self([0; ACTION_FLAGS]);

    #[must_use]
    pub const fn new(flags: [u8; ACTION_FLAGS]) -> Self {
        Self(flags)
    }

    #[must_use]
    pub const fn from_bools(flags: [bool; ACTION_FLAGS]) -> Self {
        Self([
            flags[0] as u8,
            flags[1] as u8,
            flags[2] as u8,
            flags[3] as u8,
            flags[4] as u8,
        ])
    }

    #[must_use]
    pub const fn flags(&self) -> [u8; ACTION_FLAGS] {
        self.0
    }

    /// Check that every flag is 0 or 1.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidActionEncoding`] for the first
    /// offending flag.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.0.iter().enumerate().find(|(_, v)| **v > 1) {
            Some((index, value)) => Err(ValidationError::InvalidActionEncoding {
                index,
                value: *value,
            }),
            None => Ok(()),
        }
    }

    #[must_use]
    pub const fn is_pressed(&self, flag: usize) -> bool {
        self.0[flag] != 0
    }

    #[must_use]
    pub const fn backward(&self) -> bool {
        self.is_pressed(BACKWARD)
    }

    #[must_use]
    pub const fn forward(&self) -> bool {
        self.is_pressed(FORWARD)
    }

    #[must_use]
    pub const fn crouch(&self) -> bool {
        self.is_pressed(CROUCH)
    }

    #[must_use]
    pub const fn jump(&self) -> bool {
        self.is_pressed(JUMP)
    }

    #[must_use]
    pub const fn speed(&self) -> bool {
        self.is_pressed(SPEED)
    }
}

impl From<[u8; ACTION_FLAGS]> for ActionVector {
    fn from(flags: [u8; ACTION_FLAGS]) -> Self {
        Self(flags)
    }
}

impl fmt::Display for ActionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for flag in self.0 {
            write!(f, "{flag}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Action pool
// ---------------------------------------------------------------------------

/// The 14 canonical button combinations.
pub const ACTION_POOL: [ActionVector; 14] = [
    ActionVector::new([0, 0, 0, 0, 0]), // do nothing
    ActionVector::new([0, 0, 0, 1, 0]), // jump
    ActionVector::new([0, 0, 0, 0, 1]), // bombs
    ActionVector::new([0, 0, 1, 0, 0]), // crouch
    ActionVector::new([0, 0, 1, 0, 1]), // crouch and bombs
    ActionVector::new([0, 0, 0, 1, 1]), // jump and speed
    ActionVector::new([0, 1, 0, 0, 0]), // forward
    ActionVector::new([0, 1, 0, 0, 1]), // forward and speed
    ActionVector::new([0, 1, 0, 1, 0]), // jump forward
    ActionVector::new([0, 1, 0, 1, 1]), // jump forward and speed
    ActionVector::new([1, 0, 0, 0, 0]), // backward
    ActionVector::new([1, 0, 0, 0, 1]), // backward and speed
    ActionVector::new([1, 0, 0, 1, 0]), // jump backward
    ActionVector::new([1, 0, 0, 1, 1]), // jump backward and speed
];

/// Canonical actions that are legal given whether the player may jump.
#[must_use]
pub fn legal_actions(can_jump: bool) -> Vec<ActionVector> {
    ACTION_POOL
        .iter()
        .filter(|a| can_jump || !a.jump())
        .copied()
        .collect()
}

// ---------------------------------------------------------------------------
// Fitness
// ---------------------------------------------------------------------------

/// End-of-episode summary sent by the simulator; also the per-step reward
/// record (all zero until the episode ends).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Fitness {
    pub status: i32,
    pub distance: f64,
    pub time_left: i32,
    pub mario_mode: i32,
    pub coins: i32,
}

impl Fitness {
    /// Number of fields on the wire.
    pub const FIELDS: usize = 5;

    /// Status value reported when the level was completed.
    pub const STATUS_WIN: i32 = 1;

    #[must_use]
    pub const fn is_win(&self) -> bool {
        self.status == Self::STATUS_WIN
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One decoded unit of simulator-to-client data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Bit-packed occupancy snapshot.
    TerrainSnapshot {
        can_jump: bool,
        on_ground: bool,
        scene: LevelScene,
    },
    /// Textual full observation.
    FullObservation {
        can_jump: bool,
        on_ground: bool,
        mario_position: (f64, f64),
        enemy_positions: Vec<f64>,
        scene: LevelScene,
    },
    /// End-of-episode fitness record.
    EpisodeResult(Fitness),
}

impl Frame {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::EpisodeResult(_))
    }

    #[must_use]
    pub const fn scene(&self) -> Option<&LevelScene> {
        match self {
            Self::TerrainSnapshot { scene, .. } | Self::FullObservation { scene, .. } => {
                Some(scene)
            }
            Self::EpisodeResult(_) => None,
        }
    }

    #[must_use]
    pub const fn fitness(&self) -> Option<&Fitness> {
        match self {
            Self::EpisodeResult(fitness) => Some(fitness),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
