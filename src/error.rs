//! Typed error taxonomy for the protocol, transport and session layers.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ZkError>;

/// Everything that can go wrong talking to a device.
#[derive(Error, Debug)]
pub enum ZkError {
    /// Missing or invalid configuration (e.g. no host set) at construction time.
    #[error("configuration error: {0}")]
    Config(String),

    /// Socket-level failure: connect, write, unexpected close.
    #[error("transport error: {0}")]
    Transport(#[source] std::io::Error),

    /// No reply arrived within the per-operation deadline.
    #[error("timed out waiting for a reply")]
    Timeout,

    /// The stream envelope or a length field did not parse.
    #[error("frame error: {0}")]
    Frame(String),

    /// `CMD_ACK_UNAUTH` persisted after `CMD_AUTH`.
    #[error("authentication failed")]
    Auth,

    /// Any other non-ok reply, or an unexpected command in a reply.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A semantic refusal the device reported for a well-formed request.
    #[error("operation refused: {0}")]
    Operation(String),
}

impl From<std::io::Error> for ZkError {
    fn from(e: std::io::Error) -> Self {
        ZkError::Transport(e)
    }
}
