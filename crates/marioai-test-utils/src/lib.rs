//! Shared test fixtures for the MarioAI client crates.
//!
//! Provides wire-frame builders, an in-memory [`Connection`] with a scripted
//! inbound stream, a TCP [`FakeSimulator`] speaking the real protocol, a
//! call-recording agent, and deterministic RNG setup.
//!
//! [`Connection`]: marioai_gym::Connection

pub mod fake_sim;
pub mod frames;
pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fake_sim::{FakeSimulator, SimulatorLog};
pub use frames::{fitness_line, observation_line, snapshot_frame};
pub use mocks::{CallRecordingAgent, ScriptedConnection};
pub use rng::seeded_rng;
