use crate::state::EpisodeState;
use crate::types::{ActionVector, Fitness};

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A decision maker driven by the episode loop.
///
/// Per decision the loop calls [`sense`](Self::sense), then
/// [`act`](Self::act), then [`give_rewards`](Self::give_rewards).
pub trait Agent {
    /// Start of a new episode.
    fn reset(&mut self) {}

    /// Receive the latest state.
    fn sense(&mut self, state: &EpisodeState);

    /// Produce the next action.
    fn act(&mut self) -> ActionVector;

    /// Receive the current step reward and the episode total so far.
    fn give_rewards(&mut self, _reward: &Fitness, _cum_reward: f64) {}

    /// Human-readable name for this agent.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<A: Agent + ?Sized> Agent for Box<A> {
    fn reset(&mut self) {
        (**self).reset();
    }

    fn sense(&mut self, state: &EpisodeState) {
        (**self).sense(state);
    }

    fn act(&mut self) -> ActionVector {
        (**self).act()
    }

    fn give_rewards(&mut self, reward: &Fitness, cum_reward: f64) {
        (**self).give_rewards(reward, cum_reward);
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
