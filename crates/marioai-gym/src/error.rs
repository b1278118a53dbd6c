//! Error types for the codec, transport, and process layers.
//!
//! Each layer has its own enum; [`EnvError`] is the umbrella returned by the
//! environment facade.

use std::path::PathBuf;

use marioai_core::error::{ConfigError, ValidationError};
use thiserror::Error;

/// Frame decoding/encoding errors. Local to a single decode or encode call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Checksum mismatch: frame carries {expected}, payload sums to {computed}")]
    ChecksumMismatch { expected: u64, computed: u64 },

    #[error("Unexpected frame length: expected {expected} payload units, got {got}")]
    UnexpectedFrameLength { expected: usize, got: usize },

    #[error("Invalid action encoding: {0}")]
    InvalidActionEncoding(#[from] ValidationError),
}

impl ProtocolError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFrame(message.into())
    }
}

/// Send/receive failures. Always fatal to the session.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out waiting for the simulator")]
    Timeout,

    #[error("Connection closed by peer")]
    Closed,

    #[error("Session is not connected")]
    NotConnected,
}

/// Connection establishment failures.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Connection refused: {0}")]
    Refused(#[source] std::io::Error),

    #[error("Gave up after {attempts} connection attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<ConnectError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Handshake failed: {0}")]
    Handshake(#[from] TransportError),
}

impl ConnectError {
    /// Classify a socket error from `connect`.
    #[must_use]
    pub fn from_connect(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::ConnectionRefused {
            Self::Refused(err)
        } else {
            Self::Io(err)
        }
    }

    /// Whether another attempt may succeed.
    #[must_use]
    pub const fn is_refused(&self) -> bool {
        matches!(self, Self::Refused(_))
    }
}

/// Simulator process failures.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Runtime `{program}` is not installed: {source}")]
    RuntimeNotFound {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open log file {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to stop simulator: {0}")]
    Signal(#[source] std::io::Error),
}

/// Top-level error for the environment facade.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Simulator ended the session")]
    StreamClosed,
}
