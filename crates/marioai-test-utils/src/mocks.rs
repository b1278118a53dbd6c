//! Mock implementations of the connection and agent traits for testing.

use std::collections::VecDeque;

use marioai_core::state::EpisodeState;
use marioai_core::traits::Agent;
use marioai_core::types::{ActionVector, Fitness};
use marioai_gym::error::TransportError;
use marioai_gym::transport::Connection;

// ---------------------------------------------------------------------------
// ScriptedConnection
// ---------------------------------------------------------------------------

/// In-memory connection replaying a fixed list of inbound frames.
///
/// Everything sent is recorded. Receiving past the end of the script
/// reports [`TransportError::Closed`].
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    inbound: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    connected: bool,
    disconnects: usize,
}

impl ScriptedConnection {
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            inbound: frames.into(),
            sent: Vec::new(),
            connected: true,
            disconnects: 0,
        }
    }

    /// Append a frame to the end of the script.
    pub fn push(&mut self, frame: impl Into<Vec<u8>>) {
        self.inbound.push_back(frame.into());
    }

    /// Every byte string passed to `send`, in order.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Frames not yet received.
    pub fn remaining(&self) -> usize {
        self.inbound.len()
    }

    /// Times `disconnect` actually closed the connection.
    pub const fn disconnects(&self) -> usize {
        self.disconnects
    }
}

impl Connection for ScriptedConnection {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.inbound.pop_front().ok_or(TransportError::Closed)
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.disconnects += 1;
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ---------------------------------------------------------------------------
// CallRecordingAgent
// ---------------------------------------------------------------------------

/// Agent that always plays the same action and counts every call.
#[derive(Debug, Clone)]
pub struct CallRecordingAgent {
    action: ActionVector,
    resets: usize,
    sensed: Vec<EpisodeState>,
    act_calls: usize,
    rewards: Vec<(Fitness, f64)>,
}

impl CallRecordingAgent {
    pub const fn new(action: ActionVector) -> Self {
        Self {
            action,
            resets: 0,
            sensed: Vec::new(),
            act_calls: 0,
            rewards: Vec::new(),
        }
    }

    pub const fn resets(&self) -> usize {
        self.resets
    }

    pub const fn act_calls(&self) -> usize {
        self.act_calls
    }

    pub fn reward_calls(&self) -> usize {
        self.rewards.len()
    }

    /// States passed to `sense`, in order.
    pub fn sensed(&self) -> &[EpisodeState] {
        &self.sensed
    }

    /// `(reward, cum_reward)` pairs passed to `give_rewards`, in order.
    pub fn rewards(&self) -> &[(Fitness, f64)] {
        &self.rewards
    }
}

impl Agent for CallRecordingAgent {
    fn reset(&mut self) {
        self.resets += 1;
    }

    fn sense(&mut self, state: &EpisodeState) {
        self.sensed.push(state.clone());
    }

    fn act(&mut self) -> ActionVector {
        self.act_calls += 1;
        self.action
    }

    fn give_rewards(&mut self, reward: &Fitness, cum_reward: f64) {
        self.rewards.push((*reward, cum_reward));
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "CallRecordingAgent"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_connection_replays_then_closes() {
        let mut conn = ScriptedConnection::new(vec![b"a".to_vec()]);
        conn.push("b");
        assert_eq!(conn.recv().unwrap(), b"a");
        assert_eq!(conn.recv().unwrap(), b"b");
        assert!(matches!(conn.recv(), Err(TransportError::Closed)));
    }

    #[test]
    fn scripted_connection_records_sends() {
        let mut conn = ScriptedConnection::new(Vec::new());
        conn.send(b"00000\r\n").unwrap();
        assert_eq!(conn.sent(), &[b"00000\r\n".to_vec()]);
    }

    #[test]
    fn disconnect_counts_once() {
        let mut conn = ScriptedConnection::new(Vec::new());
        conn.disconnect();
        conn.disconnect();
        assert_eq!(conn.disconnects(), 1);
        assert!(!conn.is_connected());
        assert!(matches!(conn.send(b"x"), Err(TransportError::NotConnected)));
    }

    #[test]
    fn recording_agent_counts_calls() {
        let mut agent = CallRecordingAgent::new(ActionVector::NOOP);
        agent.reset();
        agent.sense(&EpisodeState::default());
        assert_eq!(agent.act(), ActionVector::NOOP);
        agent.give_rewards(&Fitness::default(), 1.5);
        assert_eq!(agent.resets(), 1);
        assert_eq!(agent.sensed().len(), 1);
        assert_eq!(agent.act_calls(), 1);
        assert_eq!(agent.rewards()[0].1, 1.5);
        assert_eq!(agent.name(), "CallRecordingAgent");
    }
}
