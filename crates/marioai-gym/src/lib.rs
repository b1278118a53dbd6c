//! Communication layer between a MarioAI client and the simulator.
//!
//! - [`codec`]: decoding of snapshot, observation, and fitness frames;
//!   encoding of actions, reset commands, and the handshake
//! - [`framing`]: line framing, including snapshots whose payload spans
//!   several lines
//! - [`transport`]: [`Connection`] trait, blocking [`TcpSession`], and
//!   bounded connect retry
//! - [`supervisor`]: [`ServerProcess`] lifecycle of the external simulator
//! - [`env`](mod@env): [`Environment`] facade combining the above
//!
//! The protocol is CRLF-terminated text. The client connects, reads one
//! greeting line, identifies itself, and then alternates between sending a
//! `reset` or an action and reading a frame until the simulator reports the
//! episode result.

pub mod codec;
pub mod env;
pub mod error;
pub mod framing;
pub mod supervisor;
pub mod transport;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::DecodeOptions;
pub use env::Environment;
pub use error::{ConnectError, EnvError, ProtocolError, SupervisorError, TransportError};
pub use supervisor::ServerProcess;
pub use transport::{connect_with_retry, Connection, RetryPolicy, TcpSession};

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        codec::{decode, decode_with, encode_action, encode_reset, DecodeOptions},
        connect_with_retry, Connection, ConnectError, EnvError, Environment, ProtocolError,
        RetryPolicy, ServerProcess, SupervisorError, TcpSession, TransportError,
    };
}
