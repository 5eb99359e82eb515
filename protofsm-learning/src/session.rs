//! The data model of observed traffic, as it is handed over by the capture and
//! segmentation layers.

use std::fmt::Display;

use protofsm_core::math;

/// Identifies a bidirectional flow between two endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    pub ip1: String,
    pub port1: u16,
    pub ip2: String,
    pub port2: u16,
    pub protocol: String,
}

impl SessionKey {
    pub fn new<S: Into<String>>(ip1: S, port1: u16, ip2: S, port2: u16, protocol: S) -> Self {
        Self {
            ip1: ip1.into(),
            port1,
            ip2: ip2.into(),
            port2,
            protocol: protocol.into(),
        }
    }
}

impl Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} <-> {}:{} ({})",
            self.ip1, self.port1, self.ip2, self.port2, self.protocol
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

impl Direction {
    /// Numeric encoding used in feature vectors.
    pub fn to_feature(self) -> f64 {
        match self {
            Direction::ClientToServer => 0.0,
            Direction::ServerToClient => 1.0,
        }
    }
}

/// One application level message within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub session_key: SessionKey,
    pub timestamp: f64,
    pub payload: Vec<u8>,
    pub direction: Direction,
}

impl MessageEvent {
    pub fn new(
        session_key: SessionKey,
        timestamp: f64,
        payload: impl Into<Vec<u8>>,
        direction: Direction,
    ) -> Self {
        Self {
            session_key,
            timestamp,
            payload: payload.into(),
            direction,
        }
    }
}

/// All message events of a capture, possibly interleaving several sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    pub events: Vec<MessageEvent>,
}

impl Trace {
    pub fn new(events: Vec<MessageEvent>) -> Self {
        Self { events }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Groups the events by session. Sessions appear in the order of their first event and
    /// the events of each session are sorted by timestamp, keeping capture order for ties.
    pub fn sessions(&self) -> math::Map<&SessionKey, Vec<&MessageEvent>> {
        let mut sessions: math::Map<&SessionKey, Vec<&MessageEvent>> = math::Map::default();
        for event in &self.events {
            sessions.entry(&event.session_key).or_default().push(event);
        }
        for events in sessions.values_mut() {
            events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        }
        sessions
    }
}

impl FromIterator<MessageEvent> for Trace {
    fn from_iter<T: IntoIterator<Item = MessageEvent>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
