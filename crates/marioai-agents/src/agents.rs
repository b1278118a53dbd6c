//! Basic agent implementations.
//!
//! All agents implement [`Agent`] from `marioai-core`.

use marioai_core::state::EpisodeState;
use marioai_core::traits::Agent;
use marioai_core::types::{legal_actions, ActionVector, Fitness};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ---------------------------------------------------------------------------
// ConstantAgent
// ---------------------------------------------------------------------------

/// Agent that always plays the same action.
pub struct ConstantAgent {
    action: ActionVector,
}

impl ConstantAgent {
    pub const fn new(action: ActionVector) -> Self {
        Self { action }
    }

    /// Hold the forward button.
    pub const fn forward() -> Self {
        Self::new(ActionVector::new([0, 1, 0, 0, 0]))
    }
}

impl Agent for ConstantAgent {
    fn sense(&mut self, _state: &EpisodeState) {}

    fn act(&mut self) -> ActionVector {
        self.action
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ConstantAgent"
    }
}

// ---------------------------------------------------------------------------
// RandomAgent
// ---------------------------------------------------------------------------

/// Agent that always runs forward and flips a coin for jump and speed.
///
/// Uses a seeded RNG for determinism.
pub struct RandomAgent {
    rng: ChaCha8Rng,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn sense(&mut self, _state: &EpisodeState) {}

    fn act(&mut self) -> ActionVector {
        let jump = self.rng.gen_bool(0.5);
        let speed = self.rng.gen_bool(0.5);
        ActionVector::from_bools([false, true, false, jump, speed])
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "RandomAgent"
    }
}

// ---------------------------------------------------------------------------
// RandomPoolAgent
// ---------------------------------------------------------------------------

/// Agent that picks uniformly among the canonical actions legal in the last
/// sensed state.
pub struct RandomPoolAgent {
    rng: ChaCha8Rng,
    can_jump: bool,
}

impl RandomPoolAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            can_jump: false,
        }
    }
}

impl Agent for RandomPoolAgent {
    fn reset(&mut self) {
        self.can_jump = false;
    }

    fn sense(&mut self, state: &EpisodeState) {
        self.can_jump = state.can_jump;
    }

    fn act(&mut self) -> ActionVector {
        legal_actions(self.can_jump)
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(ActionVector::NOOP)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "RandomPoolAgent"
    }
}

// ---------------------------------------------------------------------------
// RecordingAgent
// ---------------------------------------------------------------------------

/// Wraps an agent and keeps the current episode's history.
///
/// The history is cleared on [`reset`](Agent::reset).
pub struct RecordingAgent<A> {
    inner: A,
    states: Vec<EpisodeState>,
    actions: Vec<ActionVector>,
    rewards: Vec<Fitness>,
    cum_reward: f64,
}

impl<A: Agent> RecordingAgent<A> {
    pub const fn new(inner: A) -> Self {
        Self {
            inner,
            states: Vec::new(),
            actions: Vec::new(),
            rewards: Vec::new(),
            cum_reward: 0.0,
        }
    }

    pub fn states(&self) -> &[EpisodeState] {
        &self.states
    }

    pub fn actions(&self) -> &[ActionVector] {
        &self.actions
    }

    pub fn rewards(&self) -> &[Fitness] {
        &self.rewards
    }

    /// Latest cumulative reward handed over by the task.
    pub const fn cum_reward(&self) -> f64 {
        self.cum_reward
    }

    /// Most recently sensed state.
    pub fn last_state(&self) -> Option<&EpisodeState> {
        self.states.last()
    }

    pub const fn inner(&self) -> &A {
        &self.inner
    }

    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A: Agent> Agent for RecordingAgent<A> {
    fn reset(&mut self) {
        self.states.clear();
        self.actions.clear();
        self.rewards.clear();
        self.cum_reward = 0.0;
        self.inner.reset();
    }

    fn sense(&mut self, state: &EpisodeState) {
        self.states.push(state.clone());
        self.inner.sense(state);
    }

    fn act(&mut self) -> ActionVector {
        let action = self.inner.act();
        self.actions.push(action);
        action
    }

    fn give_rewards(&mut self, reward: &Fitness, cum_reward: f64) {
        self.rewards.push(*reward);
        self.cum_reward = cum_reward;
        self.inner.give_rewards(reward, cum_reward);
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
