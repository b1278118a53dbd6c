//! Data model, configuration, and the agent trait shared by the MarioAI
//! client crates.
//!
//! - [`scene`]: the 22x22 [`LevelScene`](scene::LevelScene) and cell codebook
//! - [`types`]: [`ActionVector`](types::ActionVector), the canonical action
//!   pool, [`Fitness`](types::Fitness), and decoded [`Frame`](types::Frame)s
//! - [`state`]: the [`EpisodeState`](state::EpisodeState) handed to agents
//! - [`config`]: TOML-backed [`HarnessConfig`](config::HarnessConfig)
//! - [`traits`]: the [`Agent`](traits::Agent) capability interface

pub mod config;
pub mod error;
pub mod scene;
pub mod state;
pub mod traits;
pub mod types;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        config::{
            CodecConfig, ExperimentConfig, HarnessConfig, ResetConfig, SessionConfig,
            SimulatorConfig, TaskConfig,
        },
        error::{ConfigError, ValidationError},
        scene::{
            LevelScene, ObjectClass, OBJECT_CLASS_COUNT, PLAYER_CELL, SCENE_CELLS, SCENE_SIZE,
        },
        state::{EpisodeState, SceneFeatures},
        traits::Agent,
        types::{legal_actions, ActionVector, Fitness, Frame, ACTION_POOL},
    };
}
