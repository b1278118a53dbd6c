//! Episode layer of the MarioAI client.
//!
//! - [`features`]: ground line, object proximity, and hole detection around
//!   the player
//! - [`task`]: [`Task`], the `Idle → Active → Finished` episode state machine
//! - [`experiment`]: [`Experiment`], the paced sense-act-reward loop with
//!   response delay
//! - [`runner`]: [`Runner`], an experiment built from a
//!   [`HarnessConfig`](marioai_core::config::HarnessConfig)
//! - [`pacing`]: [`FramePacer`]

pub mod experiment;
pub mod features;
pub mod pacing;
pub mod runner;
pub mod task;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use experiment::{EpisodeSummary, Experiment, StopHandle};
pub use pacing::FramePacer;
pub use runner::Runner;
pub use task::{Task, TaskPhase};

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{EpisodeSummary, Experiment, FramePacer, Runner, StopHandle, Task, TaskPhase};
}
