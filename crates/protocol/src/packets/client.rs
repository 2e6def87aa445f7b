//! Client -> Server messages.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Directional movement intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Held directions resolve in this order when more than one is active.
    pub const PRIORITY: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
}

/// Parsed/encodable client message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request to enter the world.
    JoinGame { username: String },
    /// Continuous directional intent.
    Move { direction: Direction },
    /// Cease movement.
    Stop,
    /// Free-text chat line.
    Chat { message: String },
}

impl ClientMessage {
    /// Encode as a single text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a client frame (used by tests and tooling that replay traffic).
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(frame)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_actions() {
        let join = ClientMessage::JoinGame { username: "Ron".into() };
        assert_eq!(join.encode().unwrap(), r#"{"action":"join_game","username":"Ron"}"#);

        let mv = ClientMessage::Move { direction: Direction::Left };
        assert_eq!(mv.encode().unwrap(), r#"{"action":"move","direction":"left"}"#);

        assert_eq!(ClientMessage::Stop.encode().unwrap(), r#"{"action":"stop"}"#);
    }

    #[test]
    fn test_decode_chat() {
        let msg = ClientMessage::decode(r#"{"action":"chat","message":"hi"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Chat { message: "hi".into() });
    }

    #[test]
    fn test_priority_order_matches_index() {
        for (i, dir) in Direction::PRIORITY.iter().enumerate() {
            assert_eq!(dir.index(), i);
        }
    }
}
