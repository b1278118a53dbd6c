//! One-call composition of a full experiment from a [`HarnessConfig`].

use marioai_core::config::HarnessConfig;
use marioai_core::traits::Agent;
use marioai_core::types::Fitness;
use marioai_gym::transport::{Connection, TcpSession};
use marioai_gym::EnvError;

use crate::experiment::{EpisodeSummary, Experiment, StopHandle};
use crate::task::Task;

/// Owns an [`Experiment`] and the number of episodes to play.
///
/// The experiment is closed exactly once: after [`run`](Self::run), on an
/// explicit [`close`](Self::close), or on drop.
pub struct Runner<A: Agent, C: Connection = TcpSession> {
    experiment: Experiment<A, C>,
    episodes: u32,
}

impl<A: Agent> Runner<A, TcpSession> {
    /// Launch the simulator, connect, and build the experiment.
    ///
    /// # Errors
    ///
    /// See [`Task::launch`].
    pub fn launch(config: &HarnessConfig, agent: A) -> Result<Self, EnvError> {
        let task = Task::launch(config)?;
        Ok(Self::from_task(task, agent, config))
    }
}

impl<A: Agent, C: Connection> Runner<A, C> {
    /// Build from an already connected task.
    pub fn from_task(task: Task<C>, agent: A, config: &HarnessConfig) -> Self {
        let experiment = Experiment::new(task, agent, config.reset.clone(), config.experiment);
        Self {
            experiment,
            episodes: config.experiment.episodes,
        }
    }

    /// Play the configured number of episodes and close.
    ///
    /// # Errors
    ///
    /// See [`Experiment::run`].
    pub fn run(&mut self) -> Result<Vec<Vec<Fitness>>, EnvError> {
        self.experiment.run(self.episodes)
    }

    pub fn close(&mut self) {
        self.experiment.close();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.experiment.stop_handle()
    }

    pub fn summaries(&self) -> &[EpisodeSummary] {
        self.experiment.summaries()
    }

    pub const fn episodes(&self) -> u32 {
        self.episodes
    }

    pub const fn experiment(&self) -> &Experiment<A, C> {
        &self.experiment
    }
}

impl<A: Agent, C: Connection> Drop for Runner<A, C> {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
