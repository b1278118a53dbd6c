//! Agent implementations for the MarioAI client.
//!
//! Every agent implements [`Agent`](marioai_core::traits::Agent) and is
//! picked when the experiment is composed:
//!
//! - [`ConstantAgent`](agents::ConstantAgent): the same action every time
//! - [`RandomAgent`](agents::RandomAgent): runs forward, jumping and
//!   speeding at random
//! - [`RandomPoolAgent`](agents::RandomPoolAgent): uniform over the
//!   canonical actions currently legal
//! - [`RecordingAgent`](agents::RecordingAgent): wraps another agent and
//!   keeps the episode's states, actions, and rewards

pub mod agents;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::agents::{ConstantAgent, RandomAgent, RandomPoolAgent, RecordingAgent};
}
