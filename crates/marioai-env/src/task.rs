//! Episode state machine on top of the [`Environment`].
//!
//! A [`Task`] turns decoded frames into [`EpisodeState`]s for agents, tracks
//! the reward and sample count of the running episode, and filters the
//! action pool by what the player may currently do.

use marioai_core::config::{HarnessConfig, ResetConfig, TaskConfig};
use marioai_core::state::EpisodeState;
use marioai_core::types::{legal_actions, ActionVector, Fitness, Frame};
use marioai_gym::transport::{Connection, TcpSession};
use marioai_gym::{EnvError, Environment};
use tracing::{debug, info};

use crate::features;

// ---------------------------------------------------------------------------
// TaskPhase
// ---------------------------------------------------------------------------

/// Lifecycle of one episode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TaskPhase {
    /// Before the first reset.
    #[default]
    Idle,
    /// Reset sent, waiting for the fitness frame.
    Active,
    /// Fitness frame received.
    Finished,
}

impl TaskPhase {
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }

    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Episode bookkeeping around one environment.
#[derive(Debug)]
pub struct Task<C: Connection = TcpSession> {
    env: Environment<C>,
    config: TaskConfig,
    phase: TaskPhase,
    state: EpisodeState,
    reward: Fitness,
    status: i32,
    cum_reward: f64,
    samples: u32,
}

impl Task<TcpSession> {
    /// Launch and connect an environment from `config`.
    ///
    /// # Errors
    ///
    /// See [`Environment::launch`].
    pub fn launch(config: &HarnessConfig) -> Result<Self, EnvError> {
        Self::new(Environment::launch(config)?, config.task)
    }
}

impl<C: Connection> Task<C> {
    /// Wrap a connected environment.
    ///
    /// # Errors
    ///
    /// [`EnvError::Config`] if `config` places the player or the feature
    /// window outside the scene.
    pub fn new(env: Environment<C>, config: TaskConfig) -> Result<Self, EnvError> {
        config.validate()?;
        Ok(Self {
            env,
            config,
            phase: TaskPhase::Idle,
            state: EpisodeState::default(),
            reward: Fitness::default(),
            status: 0,
            cum_reward: 0.0,
            samples: 0,
        })
    }

    /// Start a new episode.
    ///
    /// Sends the reset command and clears the reward, sample count, and
    /// finished flag.
    ///
    /// # Errors
    ///
    /// See [`Environment::reset`].
    pub fn reset(&mut self, config: &ResetConfig) -> Result<(), EnvError> {
        self.env.reset(config)?;
        self.phase = TaskPhase::Active;
        self.state = EpisodeState::default();
        self.reward = Fitness::default();
        self.status = 0;
        self.cum_reward = 0.0;
        self.samples = 0;
        Ok(())
    }

    /// Receive the next frame and return the state built from it.
    ///
    /// The fitness frame finishes the episode: it becomes the reward and the
    /// returned state is terminal.
    ///
    /// # Errors
    ///
    /// - [`EnvError::StreamClosed`] if the simulator ended the session
    /// - any receive or decode error from the environment
    pub fn get_sensors(&mut self) -> Result<&EpisodeState, EnvError> {
        let frame = self.env.get_sensors()?.ok_or(EnvError::StreamClosed)?;
        self.state = match frame {
            Frame::EpisodeResult(fitness) => {
                self.reward = fitness;
                self.status = fitness.status;
                self.phase = TaskPhase::Finished;
                info!(
                    status = fitness.status,
                    distance = fitness.distance,
                    samples = self.samples,
                    "episode finished"
                );
                EpisodeState::terminal()
            }
            Frame::TerrainSnapshot {
                can_jump,
                on_ground,
                scene,
            } => self.live_state(can_jump, on_ground, None, Vec::new(), scene),
            Frame::FullObservation {
                can_jump,
                on_ground,
                mario_position,
                enemy_positions,
                scene,
            } => self.live_state(
                can_jump,
                on_ground,
                Some(mario_position),
                enemy_positions,
                scene,
            ),
        };
        Ok(&self.state)
    }

    fn live_state(
        &self,
        can_jump: bool,
        on_ground: bool,
        mario_position: Option<(f64, f64)>,
        enemy_positions: Vec<f64>,
        scene: marioai_core::scene::LevelScene,
    ) -> EpisodeState {
        let features = features::extract(&scene, on_ground, &self.config);
        EpisodeState {
            episode_over: false,
            can_jump,
            on_ground,
            mario_position,
            enemy_positions,
            level_scene: Some(scene),
            features: Some(features),
        }
    }

    /// Send an action. Does nothing once the episode is finished.
    ///
    /// # Errors
    ///
    /// See [`Environment::perform_action`].
    pub fn perform_action(&mut self, action: &ActionVector) -> Result<(), EnvError> {
        if self.phase.is_finished() {
            debug!("episode finished, dropping action");
            return Ok(());
        }
        self.env.perform_action(action)?;
        self.cum_reward += self.reward.distance;
        self.samples += 1;
        Ok(())
    }

    /// Canonical actions allowed in the current state.
    #[must_use]
    pub fn filter_actions(&self) -> Vec<ActionVector> {
        legal_actions(self.state.can_jump)
    }

    /// Close the environment.
    pub fn disconnect(&mut self) {
        self.env.disconnect();
    }

    /// Reward of the latest step: all zero until the fitness frame arrives.
    pub const fn reward(&self) -> &Fitness {
        &self.reward
    }

    pub const fn cum_reward(&self) -> f64 {
        self.cum_reward
    }

    /// Actions sent this episode.
    pub const fn samples(&self) -> u32 {
        self.samples
    }

    pub const fn finished(&self) -> bool {
        self.phase.is_finished()
    }

    pub const fn phase(&self) -> TaskPhase {
        self.phase
    }

    /// Status reported by the fitness frame, 0 before it arrives.
    pub const fn status(&self) -> i32 {
        self.status
    }

    pub const fn state(&self) -> &EpisodeState {
        &self.state
    }

    pub const fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub const fn env(&self) -> &Environment<C> {
        &self.env
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
