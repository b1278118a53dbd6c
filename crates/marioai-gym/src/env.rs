//! Environment facade over a simulator connection.
//!
//! [`Environment`] owns the connection and, when it started one, the
//! simulator process. It turns actions and reset settings into wire
//! commands and inbound frames into [`Frame`]s. Teardown always closes the
//! connection first and then stops the process.

use marioai_core::config::{HarnessConfig, ResetConfig};
use marioai_core::types::{ActionVector, Frame};
use tracing::{debug, info, warn};

use crate::codec::{self, DecodeOptions};
use crate::error::EnvError;
use crate::supervisor::ServerProcess;
use crate::transport::{connect_with_retry, Connection, RetryPolicy, TcpSession};

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Simulator environment: one connection, optionally one child process.
///
/// Dropping an `Environment` disconnects it.
pub struct Environment<C: Connection = TcpSession> {
    connection: C,
    server: Option<ServerProcess>,
    decode: DecodeOptions,
    closed: bool,
}

impl Environment<TcpSession> {
    /// Start the simulator (if configured to) and connect to it.
    ///
    /// Refused connections are retried per the session settings. If
    /// connecting finally fails, the freshly started simulator is stopped
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// - [`EnvError::Config`] for an invalid configuration
    /// - [`EnvError::Supervisor`] if the simulator cannot be started
    /// - [`EnvError::Connect`] if no session could be established
    pub fn launch(config: &HarnessConfig) -> Result<Self, EnvError> {
        config.validate()?;

        let mut server = if config.simulator.launch {
            Some(ServerProcess::launch(&config.simulator)?)
        } else {
            info!("simulator launch disabled, connecting to a running instance");
            None
        };

        let policy = RetryPolicy::from(&config.session);
        match connect_with_retry(policy, |_| TcpSession::from_config(&config.session)) {
            Ok(session) => Ok(Self::with_parts(
                session,
                server,
                DecodeOptions::from(&config.codec),
            )),
            Err(err) => {
                if let Some(server) = server.as_mut() {
                    if let Err(stop_err) = server.terminate() {
                        warn!(error = %stop_err, "failed to stop simulator after connect failure");
                    }
                }
                Err(err.into())
            }
        }
    }
}

impl<C: Connection> Environment<C> {
    /// Wrap an established connection with no managed process.
    pub fn with_connection(connection: C, decode: DecodeOptions) -> Self {
        Self::with_parts(connection, None, decode)
    }

    /// Wrap an established connection and the process serving it.
    pub fn with_parts(connection: C, server: Option<ServerProcess>, decode: DecodeOptions) -> Self {
        Self {
            connection,
            server,
            decode,
            closed: false,
        }
    }

    /// Send the reset command for a new episode.
    ///
    /// # Errors
    ///
    /// - [`EnvError::Config`] if `config` is invalid
    /// - [`EnvError::Transport`] if the command cannot be sent
    pub fn reset(&mut self, config: &ResetConfig) -> Result<(), EnvError> {
        config.validate()?;
        debug!(seed = config.level_seed, "sending reset");
        self.connection.send(&codec::encode_reset(config))?;
        Ok(())
    }

    /// Receive and decode the next frame.
    ///
    /// Returns `Ok(None)` when the simulator says goodbye (the environment
    /// is disconnected as a side effect) or the environment is already
    /// closed.
    ///
    /// # Errors
    ///
    /// - [`EnvError::Transport`] if receiving fails
    /// - [`EnvError::Protocol`] if the frame does not decode
    pub fn get_sensors(&mut self) -> Result<Option<Frame>, EnvError> {
        if self.closed {
            return Ok(None);
        }
        let raw = self.connection.recv()?;
        if codec::is_end_of_stream(&raw) {
            info!("simulator closed the session");
            self.disconnect();
            return Ok(None);
        }
        Ok(Some(codec::decode_with(&raw, self.decode)?))
    }

    /// Send one action.
    ///
    /// # Errors
    ///
    /// - [`EnvError::Protocol`] if the action has a non-binary flag
    /// - [`EnvError::Transport`] if sending fails
    pub fn perform_action(&mut self, action: &ActionVector) -> Result<(), EnvError> {
        let bytes = codec::encode_action(action)?;
        self.connection.send(&bytes)?;
        Ok(())
    }

    /// Close the connection, then stop the simulator. Calling it again has
    /// no effect.
    pub fn disconnect(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.connection.disconnect();
        if let Some(mut server) = self.server.take() {
            if let Err(err) = server.terminate() {
                warn!(error = %err, "failed to stop simulator");
            }
        }
        debug!("environment disconnected");
    }

    /// Whether the environment can still exchange frames.
    pub fn is_connected(&self) -> bool {
        !self.closed && self.connection.is_connected()
    }

    /// Whether this environment manages a simulator process.
    pub const fn has_server(&self) -> bool {
        self.server.is_some()
    }

    pub const fn decode_options(&self) -> DecodeOptions {
        self.decode
    }

    pub const fn connection(&self) -> &C {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }
}

impl<C: Connection> Drop for Environment<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<C: Connection> std::fmt::Debug for Environment<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("connected", &self.is_connected())
            .field("server", &self.server.as_ref().map(ServerProcess::pid))
            .field("decode", &self.decode)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use marioai_core::config::{SessionConfig, SimulatorConfig};
    use marioai_core::types::Fitness;

    use super::*;
    use crate::error::{ConnectError, ProtocolError, TransportError};

    #[derive(Default)]
    struct Wire {
        inbound: VecDeque<Vec<u8>>,
        sent: Vec<Vec<u8>>,
        disconnects: usize,
    }

    /// In-memory connection sharing its wire with the test body.
    struct MockConnection {
        wire: Rc<RefCell<Wire>>,
        connected: bool,
    }

    impl MockConnection {
        fn new(frames: &[&str]) -> (Self, Rc<RefCell<Wire>>) {
            let wire = Rc::new(RefCell::new(Wire {
                inbound: frames.iter().map(|f| f.as_bytes().to_vec()).collect(),
                ..Wire::default()
            }));
            (
                Self {
                    wire: Rc::clone(&wire),
                    connected: true,
                },
                wire,
            )
        }
    }

    impl Connection for MockConnection {
        fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
            if !self.connected {
                return Err(TransportError::NotConnected);
            }
            self.wire.borrow_mut().sent.push(data.to_vec());
            Ok(())
        }

        fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
            self.wire
                .borrow_mut()
                .inbound
                .pop_front()
                .ok_or(TransportError::Closed)
        }

        fn disconnect(&mut self) {
            if self.connected {
                self.connected = false;
                self.wire.borrow_mut().disconnects += 1;
            }
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn env(frames: &[&str]) -> (Environment<MockConnection>, Rc<RefCell<Wire>>) {
        let (conn, wire) = MockConnection::new(frames);
        (Environment::with_connection(conn, DecodeOptions::default()), wire)
    }

    #[test]
    fn reset_sends_encoded_command() {
        let (mut env, wire) = env(&[]);
        env.reset(&ResetConfig::default()).unwrap();
        let sent = &wire.borrow().sent;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with(b"reset -maxFPS on"));
        assert!(sent[0].ends_with(b"\r\n"));
    }

    #[test]
    fn reset_rejects_invalid_config() {
        let (mut env, wire) = env(&[]);
        let config = ResetConfig {
            mario_mode: 7,
            ..ResetConfig::default()
        };
        assert!(matches!(env.reset(&config), Err(EnvError::Config(_))));
        assert!(wire.borrow().sent.is_empty());
    }

    #[test]
    fn perform_action_sends_wire_form() {
        let (mut env, wire) = env(&[]);
        env.perform_action(&ActionVector::new([0, 1, 0, 1, 1])).unwrap();
        assert_eq!(wire.borrow().sent[0], b"01011\r\n");
    }

    #[test]
    fn invalid_action_is_not_sent() {
        let (mut env, wire) = env(&[]);
        let err = env
            .perform_action(&ActionVector::new([0, 3, 0, 0, 0]))
            .unwrap_err();
        assert!(matches!(
            err,
            EnvError::Protocol(ProtocolError::InvalidActionEncoding(_))
        ));
        assert!(wire.borrow().sent.is_empty());
    }

    #[test]
    fn get_sensors_decodes_frames() {
        let (mut env, _) = env(&["FIT 1 12.5 30 2 4"]);
        let frame = env.get_sensors().unwrap().unwrap();
        assert_eq!(
            frame.fitness(),
            Some(&Fitness {
                status: 1,
                distance: 12.5,
                time_left: 30,
                mario_mode: 2,
                coins: 4
            })
        );
    }

    #[test]
    fn end_of_stream_disconnects_and_returns_none() {
        let (mut env, wire) = env(&["ciao", "FIT 1 1 1 1 1"]);
        assert!(env.get_sensors().unwrap().is_none());
        assert!(!env.is_connected());
        assert_eq!(wire.borrow().disconnects, 1);
        // nothing more is read once closed
        assert!(env.get_sensors().unwrap().is_none());
        assert_eq!(wire.borrow().inbound.len(), 1);
    }

    #[test]
    fn malformed_frame_is_protocol_error() {
        let (mut env, _) = env(&["BOGUS 1 2 3"]);
        assert!(matches!(
            env.get_sensors(),
            Err(EnvError::Protocol(ProtocolError::MalformedFrame(_)))
        ));
    }

    #[test]
    fn closed_stream_is_transport_error() {
        let (mut env, _) = env(&[]);
        assert!(matches!(
            env.get_sensors(),
            Err(EnvError::Transport(TransportError::Closed))
        ));
    }

    #[test]
    fn disconnect_is_idempotent_and_runs_on_drop() {
        let (mut env, wire) = env(&[]);
        env.disconnect();
        env.disconnect();
        drop(env);
        assert_eq!(wire.borrow().disconnects, 1);

        let (env, wire) = self::env(&[]);
        drop(env);
        assert_eq!(wire.borrow().disconnects, 1);
    }

    #[test]
    fn launch_without_simulator_gives_up_on_refusal() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = HarnessConfig {
            session: SessionConfig {
                host: "127.0.0.1".into(),
                port,
                connect_attempts: 2,
                connect_backoff_ms: 1,
                ..SessionConfig::default()
            },
            simulator: SimulatorConfig {
                launch: false,
                ..SimulatorConfig::default()
            },
            ..HarnessConfig::default()
        };
        let err = Environment::launch(&config).unwrap_err();
        assert!(matches!(
            err,
            EnvError::Connect(ConnectError::Exhausted { attempts: 2, .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn connect_failure_after_launch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = HarnessConfig {
            session: SessionConfig {
                host: "127.0.0.1".into(),
                port,
                connect_attempts: 1,
                connect_backoff_ms: 1,
                ..SessionConfig::default()
            },
            simulator: SimulatorConfig {
                launch: true,
                program: "/bin/sh".into(),
                args: vec!["-c".into(), "sleep 30".into()],
                working_dir: dir.path().to_path_buf(),
                log_dir: dir.path().join("logs"),
                check_runtime: false,
            },
            ..HarnessConfig::default()
        };
        let err = Environment::launch(&config).unwrap_err();
        assert!(matches!(err, EnvError::Connect(_)));
        // logs were created, so the process was started before connecting
        assert!(dir.path().join("logs/server_logOut.log").exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn connect_failure_terminates_launched_simulator() {
        let dir = tempfile::tempdir().unwrap();
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = HarnessConfig {
            session: SessionConfig {
                host: "127.0.0.1".into(),
                port,
                // leaves the shell time to record its pid
                connect_attempts: 3,
                connect_backoff_ms: 200,
                ..SessionConfig::default()
            },
            simulator: SimulatorConfig {
                launch: true,
                program: "/bin/sh".into(),
                args: vec!["-c".into(), "echo $$ > sim.pid; sleep 30".into()],
                working_dir: dir.path().to_path_buf(),
                log_dir: dir.path().join("logs"),
                check_runtime: false,
            },
            ..HarnessConfig::default()
        };
        let err = Environment::launch(&config).unwrap_err();
        assert!(matches!(
            err,
            EnvError::Connect(ConnectError::Exhausted { attempts: 3, .. })
        ));

        let pid: u32 = std::fs::read_to_string(dir.path().join("sim.pid"))
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(crate::supervisor::has_exited(pid));
    }

    #[test]
    fn launch_rejects_invalid_config() {
        let mut config = HarnessConfig::default();
        config.session.port = 0;
        assert!(matches!(
            Environment::launch(&config),
            Err(EnvError::Config(_))
        ));
    }
}
