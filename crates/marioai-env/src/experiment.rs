//! Episode driver.
//!
//! An [`Experiment`] runs the sense-act-reward loop between a [`Task`] and
//! an [`Agent`]. The agent decides on every `response_delay + 1`-th frame
//! (and on the terminal frame); the frames in between send a no-op. The
//! loop is paced to `max_fps` when that is positive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use marioai_core::config::{ExperimentConfig, ResetConfig};
use marioai_core::traits::Agent;
use marioai_core::types::{ActionVector, Fitness};
use marioai_gym::transport::{Connection, TcpSession};
use marioai_gym::EnvError;
use tracing::{debug, info, warn};

use crate::pacing::FramePacer;
use crate::task::Task;

// ---------------------------------------------------------------------------
// StopHandle
// ---------------------------------------------------------------------------

/// Shared flag that stops an experiment between frames.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// EpisodeSummary
// ---------------------------------------------------------------------------

/// Outcome of one episode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EpisodeSummary {
    /// Frames processed.
    pub steps: u32,
    pub cum_reward: f64,
    /// Final fitness; all zero if the episode was stopped early.
    pub fitness: Fitness,
}

// ---------------------------------------------------------------------------
// Experiment
// ---------------------------------------------------------------------------

/// Runs episodes of a [`Task`] with an [`Agent`].
pub struct Experiment<A: Agent, C: Connection = TcpSession> {
    task: Task<C>,
    agent: A,
    reset: ResetConfig,
    config: ExperimentConfig,
    pacer: FramePacer,
    stop: StopHandle,
    summaries: Vec<EpisodeSummary>,
    closed: bool,
}

impl<A: Agent, C: Connection> Experiment<A, C> {
    pub fn new(task: Task<C>, agent: A, reset: ResetConfig, config: ExperimentConfig) -> Self {
        Self {
            task,
            agent,
            reset,
            pacer: FramePacer::new(config.max_fps),
            config,
            stop: StopHandle::default(),
            summaries: Vec::new(),
            closed: false,
        }
    }

    /// Handle that stops the experiment before its next frame.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Play one episode and return the reward of every frame.
    ///
    /// # Errors
    ///
    /// Any error from the task aborts the episode.
    pub fn run_episode(&mut self) -> Result<Vec<Fitness>, EnvError> {
        self.agent.reset();
        self.task.reset(&self.reset)?;
        debug!(agent = self.agent.name(), "episode started");

        let decide_every = u64::from(self.config.response_delay) + 1;
        let mut rewards = Vec::new();
        let mut frame: u64 = 0;

        while !self.task.finished() {
            if self.stop.is_stopped() {
                warn!(frame, "stop requested, abandoning episode");
                break;
            }
            let frame_start = Instant::now();
            self.task.get_sensors()?;

            if self.task.finished() || frame % decide_every == 0 {
                self.agent.sense(self.task.state());
                let action = self.agent.act();
                self.task.perform_action(&action)?;
                self.agent
                    .give_rewards(self.task.reward(), self.task.cum_reward());
            } else {
                self.task.perform_action(&ActionVector::NOOP)?;
            }

            rewards.push(*self.task.reward());
            frame += 1;
            self.pacer.wait(frame_start);
        }

        let summary = EpisodeSummary {
            steps: u32::try_from(rewards.len()).unwrap_or(u32::MAX),
            cum_reward: self.task.cum_reward(),
            fitness: *self.task.reward(),
        };
        info!(
            steps = summary.steps,
            status = summary.fitness.status,
            distance = summary.fitness.distance,
            coins = summary.fitness.coins,
            "episode summary"
        );
        self.summaries.push(summary);
        Ok(rewards)
    }

    /// Play up to `episodes` episodes, then disconnect.
    ///
    /// The environment is disconnected exactly once, whether the episodes
    /// complete, are stopped, or fail.
    ///
    /// # Errors
    ///
    /// The first error from any episode.
    pub fn run(&mut self, episodes: u32) -> Result<Vec<Vec<Fitness>>, EnvError> {
        let result = self.run_episodes(episodes);
        if let Err(err) = &result {
            warn!(error = %err, "experiment aborted");
        }
        self.close();
        result
    }

    fn run_episodes(&mut self, episodes: u32) -> Result<Vec<Vec<Fitness>>, EnvError> {
        let mut all = Vec::new();
        for episode in 0..episodes {
            if self.stop.is_stopped() {
                info!(episode, "stop requested, skipping remaining episodes");
                break;
            }
            all.push(self.run_episode()?);
        }
        Ok(all)
    }

    /// Disconnect the task. Calling it again has no effect.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.task.disconnect();
    }

    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    pub const fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Summaries of every episode played so far.
    pub fn summaries(&self) -> &[EpisodeSummary] {
        &self.summaries
    }

    pub const fn agent(&self) -> &A {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    pub const fn task(&self) -> &Task<C> {
        &self.task
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use marioai_core::config::TaskConfig;
    use marioai_core::scene::LevelScene;
    use marioai_gym::{DecodeOptions, Environment};
    use marioai_test_utils::frames::{fitness_line, observation_line};
    use marioai_test_utils::mocks::{CallRecordingAgent, ScriptedConnection};

    use super::*;

    const FORWARD: ActionVector = ActionVector::new([0, 1, 0, 0, 0]);

    fn episode_frames(live: usize, distance: f64) -> Vec<Vec<u8>> {
        let scene = LevelScene::zeros();
        let mut frames: Vec<Vec<u8>> = (0..live)
            .map(|_| observation_line(true, true, &scene, (0.0, 0.0), &[]))
            .collect();
        frames.push(fitness_line(&Fitness {
            status: 1,
            distance,
            ..Fitness::default()
        }));
        frames
    }

    fn experiment(
        frames: Vec<Vec<u8>>,
        response_delay: u32,
    ) -> Experiment<CallRecordingAgent, ScriptedConnection> {
        let env = Environment::with_connection(
            ScriptedConnection::new(frames),
            DecodeOptions::default(),
        );
        let task = Task::new(env, TaskConfig::default()).unwrap();
        let config = ExperimentConfig {
            episodes: 1,
            max_fps: 0,
            response_delay,
        };
        Experiment::new(
            task,
            CallRecordingAgent::new(FORWARD),
            ResetConfig::default(),
            config,
        )
    }

    fn sent_actions(exp: &Experiment<CallRecordingAgent, ScriptedConnection>) -> Vec<Vec<u8>> {
        exp.task()
            .env()
            .connection()
            .sent()
            .iter()
            .filter(|line| !line.starts_with(b"reset"))
            .cloned()
            .collect()
    }

    // ---- Response delay ----

    #[test]
    fn agent_decides_every_third_frame() {
        // frames 0..=7 live, frame 8 is the fitness frame
        let mut exp = experiment(episode_frames(8, 100.0), 2);
        let rewards = exp.run_episode().unwrap();
        assert_eq!(rewards.len(), 9);

        // 0, 3, 6 and the terminal frame 8
        assert_eq!(exp.agent().act_calls(), 4);
        assert_eq!(exp.agent().reward_calls(), 4);
        assert_eq!(exp.agent().resets(), 1);

        let actions = sent_actions(&exp);
        assert_eq!(actions.len(), 8);
        for (frame, action) in actions.iter().enumerate() {
            let expected: &[u8] = if frame % 3 == 0 { b"01000\r\n" } else { b"00000\r\n" };
            assert_eq!(action.as_slice(), expected, "frame {frame}");
        }
    }

    #[test]
    fn zero_delay_consults_agent_every_frame() {
        let mut exp = experiment(episode_frames(5, 1.0), 0);
        exp.run_episode().unwrap();
        assert_eq!(exp.agent().act_calls(), 6);
        assert!(sent_actions(&exp).iter().all(|a| a == b"01000\r\n"));
    }

    #[test]
    fn terminal_frame_sends_nothing() {
        let mut exp = experiment(episode_frames(0, 12.0), 2);
        let rewards = exp.run_episode().unwrap();
        assert_eq!(rewards.len(), 1);
        assert_relative_eq!(rewards[0].distance, 12.0);
        assert!(sent_actions(&exp).is_empty());
        assert_eq!(exp.agent().act_calls(), 1);
    }

    #[test]
    fn rewards_are_zero_until_fitness_frame() {
        let mut exp = experiment(episode_frames(3, 55.0), 0);
        let rewards = exp.run_episode().unwrap();
        assert!(rewards[..3].iter().all(|r| *r == Fitness::default()));
        assert_relative_eq!(rewards[3].distance, 55.0);

        let summary = exp.summaries()[0];
        assert_eq!(summary.steps, 4);
        assert_relative_eq!(summary.cum_reward, 0.0);
        assert!(summary.fitness.is_win());
    }

    // ---- Multiple episodes and teardown ----

    #[test]
    fn run_plays_each_episode_and_closes_once() {
        let mut frames = episode_frames(2, 10.0);
        frames.extend(episode_frames(1, 20.0));
        let mut exp = experiment(frames, 0);

        let all = exp.run(2).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].len(), 3);
        assert_eq!(all[1].len(), 2);
        assert_relative_eq!(all[1][1].distance, 20.0);
        assert_eq!(exp.summaries().len(), 2);

        assert!(exp.is_closed());
        assert_eq!(exp.task().env().connection().disconnects(), 1);
        exp.close();
        assert_eq!(exp.task().env().connection().disconnects(), 1);
    }

    #[test]
    fn run_closes_on_error() {
        let mut frames = episode_frames(1, 1.0);
        frames.truncate(1);
        frames.push(b"BOGUS".to_vec());
        let mut exp = experiment(frames, 0);

        let err = exp.run(1).unwrap_err();
        assert!(matches!(err, EnvError::Protocol(_)));
        assert!(exp.is_closed());
        assert_eq!(exp.task().env().connection().disconnects(), 1);
    }

    #[test]
    fn run_closes_when_stream_ends() {
        let mut exp = experiment(vec![b"ciao".to_vec()], 0);
        assert!(matches!(exp.run(3), Err(EnvError::StreamClosed)));
        assert_eq!(exp.task().env().connection().disconnects(), 1);
    }

    #[test]
    fn stop_before_run_skips_all_episodes() {
        let mut exp = experiment(episode_frames(1, 1.0), 0);
        exp.stop_handle().stop();
        let all = exp.run(5).unwrap();
        assert!(all.is_empty());
        assert!(exp.is_closed());
    }

    #[test]
    fn stop_mid_episode_ends_it_early() {
        struct StopAfterFirst {
            inner: CallRecordingAgent,
            stop: Option<StopHandle>,
        }
        impl Agent for StopAfterFirst {
            fn sense(&mut self, state: &marioai_core::state::EpisodeState) {
                self.inner.sense(state);
            }
            fn act(&mut self) -> ActionVector {
                if let Some(stop) = &self.stop {
                    stop.stop();
                }
                self.inner.act()
            }
        }

        let env = Environment::with_connection(
            ScriptedConnection::new(episode_frames(5, 1.0)),
            DecodeOptions::default(),
        );
        let mut exp = Experiment::new(
            Task::new(env, TaskConfig::default()).unwrap(),
            StopAfterFirst {
                inner: CallRecordingAgent::new(FORWARD),
                stop: None,
            },
            ResetConfig::default(),
            ExperimentConfig {
                episodes: 1,
                max_fps: 0,
                response_delay: 0,
            },
        );
        let handle = exp.stop_handle();
        exp.agent_mut().stop = Some(handle);

        let all = exp.run(2).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].len(), 1);
        assert_eq!(exp.summaries()[0].fitness, Fitness::default());
    }
}
