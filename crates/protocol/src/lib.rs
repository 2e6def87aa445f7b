//! Shared protocol crate for world-viewer.
//!
//! This crate contains:
//! - The JSON message definitions exchanged with the world server
//! - Shared types (Player, AvatarDef, Facing, Position)
//! - Frame decoding/encoding helpers

mod error;
mod model;
pub mod packets;

pub use error::ProtocolError;
pub use model::{AvatarDef, Facing, FrameTable, Player, PlayerUpdate};
pub use packets::{ClientMessage, Direction, JoinAccepted, JoinResponse, ServerMessage};

/// Represents a 2D world position using glam's DVec2.
pub type Position = glam::DVec2;
