//! TCP session with the simulator.
//!
//! [`TcpSession`] connects, reads the simulator's greeting, and identifies
//! itself with the handshake line. After that it exchanges one frame per
//! [`recv`](Connection::recv) and writes raw command bytes per
//! [`send`](Connection::send). Any I/O failure marks the session as no
//! longer connected.
//!
//! [`connect_with_retry`] wraps an arbitrary connect closure and retries
//! refused connections, which is how the client waits for a simulator that
//! is still starting up.

use std::io::BufReader;
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use marioai_core::config::SessionConfig;
use tracing::{debug, info, warn};

use crate::codec::encode_handshake;
use crate::error::{ConnectError, TransportError};
use crate::framing::{read_frame, write_frame};

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// A bidirectional frame channel to the simulator.
pub trait Connection {
    /// Write `data` verbatim.
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Block until one complete inbound frame is available.
    fn recv(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Close the channel. Calling it again has no effect.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).send(data)
    }

    fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        (**self).recv()
    }

    fn disconnect(&mut self) {
        (**self).disconnect();
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

// ---------------------------------------------------------------------------
// TcpSession
// ---------------------------------------------------------------------------

/// Blocking TCP connection to a running simulator.
pub struct TcpSession {
    name: String,
    greeting: String,
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    connected: bool,
}

impl TcpSession {
    /// Connect to `host:port`, read the greeting, and send the handshake.
    ///
    /// `read_timeout` bounds every later [`recv`](Connection::recv); `None`
    /// blocks indefinitely.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::Refused`] if nothing is listening yet
    /// - [`ConnectError::Io`] for other socket failures
    /// - [`ConnectError::Handshake`] if the greeting or handshake exchange fails
    pub fn connect(
        name: &str,
        host: &str,
        port: u16,
        read_timeout: Option<Duration>,
    ) -> Result<Self, ConnectError> {
        let stream = TcpStream::connect((host, port)).map_err(ConnectError::from_connect)?;
        stream.set_read_timeout(read_timeout)?;
        stream.set_nodelay(true)?;
        let mut writer = stream.try_clone()?;
        let mut reader = BufReader::new(stream);

        let greeting = read_frame(&mut reader)?.ok_or(TransportError::Closed)?;
        let greeting = String::from_utf8_lossy(&greeting).into_owned();
        debug!(%greeting, "simulator greeting");

        write_frame(&mut writer, &encode_handshake(name))?;
        info!(name, host, port, "connected to simulator");

        Ok(Self {
            name: name.to_owned(),
            greeting,
            reader,
            writer,
            connected: true,
        })
    }

    /// Connect using the address, name, and timeout from `config`.
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub fn from_config(config: &SessionConfig) -> Result<Self, ConnectError> {
        Self::connect(
            &config.name,
            &config.host,
            config.port,
            config.read_timeout_ms.map(Duration::from_millis),
        )
    }

    /// Client name sent in the handshake.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First line the simulator sent after accepting the connection.
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    fn fail(&mut self, err: TransportError) -> TransportError {
        warn!(error = %err, "transport failure, closing session");
        self.disconnect();
        err
    }
}

impl Connection for TcpSession {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        write_frame(&mut self.writer, data).map_err(|e| self.fail(e))
    }

    fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        match read_frame(&mut self.reader) {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => Err(self.fail(TransportError::Closed)),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        // The peer may already be gone; nothing to do about it here.
        let _ = self.writer.shutdown(Shutdown::Both);
        debug!(name = %self.name, "session closed");
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Drop for TcpSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for TcpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpSession")
            .field("name", &self.name)
            .field("peer", &self.writer.peer_addr().ok())
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// How often, and how patiently, to retry a refused connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for RetryPolicy {
    fn from(config: &SessionConfig) -> Self {
        Self {
            max_attempts: config.connect_attempts,
            backoff: Duration::from_millis(config.connect_backoff_ms),
        }
    }
}

/// Call `connect` until it succeeds, retrying only refused connections.
///
/// The closure receives the 1-based attempt number. Between refused
/// attempts the thread sleeps for `policy.backoff`. A `max_attempts` of 0 is
/// treated as 1.
///
/// # Errors
///
/// - [`ConnectError::Exhausted`] when every attempt was refused
/// - any non-refusal error from `connect`, immediately
pub fn connect_with_retry<C, F>(policy: RetryPolicy, mut connect: F) -> Result<C, ConnectError>
where
    F: FnMut(u32) -> Result<C, ConnectError>,
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        info!("Connection attempt {attempt}/{max}");
        match connect(attempt) {
            Ok(connection) => return Ok(connection),
            Err(err) if err.is_refused() && attempt < max => {
                warn!(attempt, error = %err, "connection refused, retrying in {:?}", policy.backoff);
                std::thread::sleep(policy.backoff);
                attempt += 1;
            }
            Err(err) if err.is_refused() => {
                return Err(ConnectError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            Err(err) => return Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::{BufRead, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Instant;

    use super::*;

    /// Accept one client, greet it, and hand back the hello line and stream.
    fn greet_one(listener: TcpListener) -> thread::JoinHandle<(String, TcpStream)> {
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"Server: hello\r\n").unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut hello = String::new();
            reader.read_line(&mut hello).unwrap();
            (hello, stream)
        })
    }

    fn refused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
        // listener dropped here, port is closed
    }

    #[test]
    fn handshake_sends_client_name() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = greet_one(listener);

        let session = TcpSession::connect("Bot", "127.0.0.1", port, None).unwrap();
        let (hello, _stream) = server.join().unwrap();
        assert_eq!(hello, "Client: Dear Server, hello! I am Bot\r\n");
        assert_eq!(session.greeting(), "Server: hello");
        assert_eq!(session.name(), "Bot");
        assert!(session.is_connected());
    }

    #[test]
    fn send_and_recv_exchange_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = greet_one(listener);

        let mut session = TcpSession::connect("Bot", "127.0.0.1", port, None).unwrap();
        let (_, mut stream) = server.join().unwrap();

        session.send(b"01000\r\n").unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "01000\r\n");

        stream.write_all(b"FIT 1 10.0 3 2 0\r\n").unwrap();
        assert_eq!(session.recv().unwrap(), b"FIT 1 10.0 3 2 0");
    }

    #[test]
    fn peer_close_marks_session_disconnected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = greet_one(listener);

        let mut session = TcpSession::connect("Bot", "127.0.0.1", port, None).unwrap();
        let (_, stream) = server.join().unwrap();
        drop(stream);

        assert!(matches!(session.recv(), Err(TransportError::Closed)));
        assert!(!session.is_connected());
        assert!(matches!(session.send(b"x"), Err(TransportError::NotConnected)));
    }

    #[test]
    fn silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = greet_one(listener);

        let mut session =
            TcpSession::connect("Bot", "127.0.0.1", port, Some(Duration::from_millis(50)))
                .unwrap();
        let (_, _stream) = server.join().unwrap();

        assert!(matches!(session.recv(), Err(TransportError::Timeout)));
        assert!(!session.is_connected());
    }

    #[test]
    fn disconnect_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = greet_one(listener);

        let mut session = TcpSession::connect("Bot", "127.0.0.1", port, None).unwrap();
        let _ = server.join().unwrap();
        session.disconnect();
        session.disconnect();
        assert!(!session.is_connected());
    }

    #[test]
    fn connect_to_closed_port_is_refused() {
        let err = TcpSession::connect("Bot", "127.0.0.1", refused_port(), None).unwrap_err();
        assert!(err.is_refused());
    }

    // ---- Retry ----

    #[test]
    fn retry_gives_up_after_max_attempts() {
        let port = refused_port();
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff: Duration::from_millis(10),
        };
        let mut calls = 0;
        let start = Instant::now();
        let err = connect_with_retry(policy, |_| {
            calls += 1;
            TcpSession::connect("Bot", "127.0.0.1", port, None)
        })
        .unwrap_err();

        assert_eq!(calls, 5);
        assert!(start.elapsed() >= Duration::from_millis(40));
        match err {
            ConnectError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 5);
                assert!(last.is_refused());
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[test]
    fn retry_stops_on_first_success() {
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff: Duration::from_millis(1),
        };
        let mut seen = Vec::new();
        let value = connect_with_retry(policy, |attempt| {
            seen.push(attempt);
            if attempt < 3 {
                Err(ConnectError::Refused(std::io::ErrorKind::ConnectionRefused.into()))
            } else {
                Ok(attempt)
            }
        })
        .unwrap();
        assert_eq!(value, 3);
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn retry_does_not_repeat_other_errors() {
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff: Duration::from_millis(1),
        };
        let mut calls = 0;
        let err = connect_with_retry::<(), _>(policy, |_| {
            calls += 1;
            Err(ConnectError::Handshake(TransportError::Closed))
        })
        .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, ConnectError::Handshake(_)));
    }

    #[test]
    fn retry_policy_from_session_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Duration::from_secs(5));
    }
}
