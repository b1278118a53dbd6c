//! A TCP stand-in for the simulator, speaking the real line protocol.
//!
//! The fake serves one client: it sends a greeting, reads the handshake,
//! and then answers every `reset` with the next scripted episode. Each
//! non-terminal frame of an episode is followed by reading one action line;
//! the terminal fitness frame is not. A `reset` with no episodes left is
//! answered with the end-of-stream message.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use marioai_core::types::ActionVector;
use marioai_gym::codec::{decode_action, END_OF_STREAM, FITNESS_TAG};

/// Greeting line sent to every client.
pub const GREETING: &str = "Server: Hello from the fake simulator";

const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// What the fake saw from its client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatorLog {
    /// The handshake line, without terminator.
    pub hello: String,
    /// Every reset command, without terminator.
    pub resets: Vec<String>,
    /// Actions received, one list per served episode.
    pub actions: Vec<Vec<ActionVector>>,
    /// Whether the end-of-stream message was sent.
    pub said_goodbye: bool,
}

/// Scripted single-client simulator running on a background thread.
#[derive(Debug)]
pub struct FakeSimulator {
    port: u16,
    handle: JoinHandle<SimulatorLog>,
}

impl FakeSimulator {
    /// Bind to an ephemeral localhost port and start serving `episodes`.
    ///
    /// Each episode is a list of frames (without line terminators), normally
    /// ending with a fitness frame.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the listener cannot be bound.
    pub fn start(episodes: Vec<Vec<Vec<u8>>>) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let handle = thread::spawn(move || serve(&listener, episodes));
        Ok(Self { port, handle })
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the client to leave and return what it sent.
    ///
    /// # Panics
    ///
    /// Panics if the server thread panicked.
    pub fn finish(self) -> SimulatorLog {
        self.handle.join().expect("fake simulator thread panicked")
    }
}

fn serve(listener: &TcpListener, episodes: Vec<Vec<Vec<u8>>>) -> SimulatorLog {
    let mut log = SimulatorLog::default();
    let Ok((stream, _)) = listener.accept() else {
        return log;
    };
    // Any I/O failure means the client went away; report what was seen.
    let _ = session(stream, episodes, &mut log);
    log
}

fn session(
    stream: TcpStream,
    episodes: Vec<Vec<Vec<u8>>>,
    log: &mut SimulatorLog,
) -> io::Result<()> {
    stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT))?;
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);

    write_line(&mut writer, GREETING.as_bytes())?;
    let Some(hello) = read_line(&mut reader)? else {
        return Ok(());
    };
    log.hello = hello;

    let mut episodes = episodes.into_iter();
    while let Some(command) = read_line(&mut reader)? {
        if !command.starts_with("reset") {
            continue;
        }
        log.resets.push(command);

        let Some(frames) = episodes.next() else {
            write_line(&mut writer, END_OF_STREAM.as_bytes())?;
            log.said_goodbye = true;
            return Ok(());
        };

        let mut actions = Vec::new();
        for frame in frames {
            write_line(&mut writer, &frame)?;
            if frame.starts_with(FITNESS_TAG.as_bytes()) {
                break;
            }
            let Some(line) = read_line(&mut reader)? else {
                log.actions.push(actions);
                return Ok(());
            };
            if let Ok(action) = decode_action(line.as_bytes()) {
                actions.push(action);
            }
        }
        log.actions.push(actions);
    }
    Ok(())
}

fn write_line(writer: &mut impl Write, data: &[u8]) -> io::Result<()> {
    writer.write_all(data)?;
    writer.write_all(b"\r\n")?;
    writer.flush()
}

fn read_line(reader: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use marioai_core::types::Fitness;

    use super::*;
    use crate::frames::fitness_line;

    #[test]
    fn serves_greeting_episode_and_goodbye() {
        let sim = FakeSimulator::start(vec![vec![b"FRAME".to_vec(), fitness_line(&Fitness::default())]])
            .unwrap();
        let stream = TcpStream::connect(("127.0.0.1", sim.port())).unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);

        assert_eq!(read_line(&mut reader).unwrap().unwrap(), GREETING);
        write_line(&mut writer, b"Client: hi").unwrap();

        write_line(&mut writer, b"reset -ld 0").unwrap();
        assert_eq!(read_line(&mut reader).unwrap().unwrap(), "FRAME");
        write_line(&mut writer, b"01000").unwrap();
        assert!(read_line(&mut reader).unwrap().unwrap().starts_with("FIT"));

        write_line(&mut writer, b"reset -ld 0").unwrap();
        assert_eq!(read_line(&mut reader).unwrap().unwrap(), END_OF_STREAM);
        drop(writer);
        drop(reader);

        let log = sim.finish();
        assert_eq!(log.hello, "Client: hi");
        assert_eq!(log.resets.len(), 2);
        assert_eq!(log.actions, vec![vec![ActionVector::new([0, 1, 0, 0, 0])]]);
        assert!(log.said_goodbye);
    }
}
