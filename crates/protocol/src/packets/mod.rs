//! Message definitions for the world protocol.
//!
//! Every frame is a single JSON object discriminated by its string `action`.
//! This module contains both client->server and server->client message types.

mod client;
mod server;

pub use client::*;
pub use server::*;

/// Actions the server may send.
pub mod server_action {
    pub const JOIN_GAME: &str = "join_game";
    pub const PLAYER_JOINED: &str = "player_joined";
    pub const PLAYERS_MOVED: &str = "players_moved";
    pub const PLAYER_LEFT: &str = "player_left";
    pub const CHAT: &str = "chat";

    pub const ALL: [&str; 5] = [JOIN_GAME, PLAYER_JOINED, PLAYERS_MOVED, PLAYER_LEFT, CHAT];
}
