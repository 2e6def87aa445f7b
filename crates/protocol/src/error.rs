//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding or encoding a frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Frame has no action")]
    MissingAction,

    #[error("Unknown action: {0}")]
    UnknownAction(String),
}
