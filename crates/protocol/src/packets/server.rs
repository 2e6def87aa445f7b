//! Server -> Client message parsing.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use super::server_action;
use crate::{AvatarDef, Player, PlayerUpdate, ProtocolError};

/// Parsed server message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Response to `join_game`.
    JoinGame(JoinResponse),
    /// A new entity entered the world.
    PlayerJoined { player: Player, avatar: AvatarDef },
    /// Authoritative deltas, keyed by player id.
    PlayersMoved {
        #[serde(default, deserialize_with = "null_as_default")]
        players: HashMap<String, PlayerUpdate>,
    },
    /// An entity departed.
    PlayerLeft {
        #[serde(rename = "playerId")]
        player_id: String,
    },
    /// Broadcast chat line.
    Chat {
        #[serde(default)]
        username: String,
        #[serde(default)]
        message: String,
    },
    /// Generic failure notice (`success: false`) for anything but a join response.
    #[serde(skip_deserializing)]
    Failure {
        failed_action: Option<String>,
        error: Option<String>,
    },
}

/// Fields shared by every server frame, read before the typed decode.
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl Envelope {
    /// Failure reason as text. Non-string payloads are kept in their JSON form.
    fn reason(&self) -> Option<String> {
        match self.error.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ServerMessage {
    /// Decode one text frame.
    ///
    /// The frame is read twice: once for its envelope, once typed. The typed pass
    /// goes straight from text so avatar frame tables keep their declaration order.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(frame)?;
        let failed = envelope.success == Some(false);

        match envelope.action.as_deref() {
            // A rejection only needs the reason; the rest of the body is not trusted.
            Some(server_action::JOIN_GAME) if failed => Ok(ServerMessage::JoinGame(JoinResponse {
                error: envelope.reason(),
                ..JoinResponse::default()
            })),
            Some(server_action::JOIN_GAME) => Ok(serde_json::from_str(frame)?),
            action if failed => Ok(ServerMessage::Failure {
                failed_action: action.map(str::to_string),
                error: envelope.reason(),
            }),
            Some(action) if server_action::ALL.contains(&action) => Ok(serde_json::from_str(frame)?),
            Some(action) => Err(ProtocolError::UnknownAction(action.to_string())),
            None => Err(ProtocolError::MissingAction),
        }
    }

    /// The wire action of this message, for logging.
    pub fn action(&self) -> &str {
        match self {
            ServerMessage::JoinGame(_) => server_action::JOIN_GAME,
            ServerMessage::PlayerJoined { .. } => server_action::PLAYER_JOINED,
            ServerMessage::PlayersMoved { .. } => server_action::PLAYERS_MOVED,
            ServerMessage::PlayerLeft { .. } => server_action::PLAYER_LEFT,
            ServerMessage::Chat { .. } => server_action::CHAT,
            ServerMessage::Failure { failed_action, .. } => failed_action.as_deref().unwrap_or("unknown"),
        }
    }
}

/// Response to a join request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoinResponse {
    pub success: bool,
    pub player_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub players: HashMap<String, Player>,
    #[serde(deserialize_with = "null_as_default")]
    pub avatars: HashMap<String, AvatarDef>,
    pub error: Option<String>,
}

/// A successful join: the local id plus full registries.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinAccepted {
    pub player_id: String,
    pub players: HashMap<String, Player>,
    pub avatars: HashMap<String, AvatarDef>,
}

impl JoinResponse {
    /// Split into the accepted payload or the server's rejection reason.
    pub fn into_result(self) -> Result<JoinAccepted, String> {
        if !self.success {
            return Err(self.error.unwrap_or_else(|| "join rejected".to_string()));
        }
        match self.player_id {
            Some(player_id) if !player_id.is_empty() => Ok(JoinAccepted {
                player_id,
                players: self.players,
                avatars: self.avatars,
            }),
            _ => Err("join accepted without a player id".to_string()),
        }
    }
}
