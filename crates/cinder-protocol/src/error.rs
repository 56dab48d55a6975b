//! # Error Types
//!
//! Two layers: [`TransportError`] is what a single receive attempt reports;
//! [`ProtocolError`] is what a deadline-bounded exchange reports to callers.

use std::io;

use thiserror::Error;

/// Outcome of one failed receive attempt
#[derive(Error, Debug)]
pub enum TransportError
{
    /// The wait was cut short by a signal; the attempt may be retried
    #[error("Receive interrupted")]
    Interrupted,

    /// Nothing arrived within the requested wait
    #[error("Receive timed out")]
    TimedOut,

    /// The other end is gone and nothing more will arrive
    #[error("Peer disconnected")]
    Disconnected,

    /// Any other I/O failure
    #[error("Transport I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from deadline-bounded messaging and message decoding
#[derive(Error, Debug)]
pub enum ProtocolError
{
    /// The deadline passed before a message arrived
    #[error("Deadline expired before a message arrived")]
    TimedOut,

    /// The transport failed for a reason other than a timeout or interruption
    #[error(transparent)]
    Transport(TransportError),

    /// A received message has the wrong size or magic
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Failed to encode or decode a message
    #[error("Message encoding error: {0}")]
    Encoding(#[from] scroll::Error),
}

impl From<TransportError> for ProtocolError
{
    fn from(error: TransportError) -> Self
    {
        match error {
            TransportError::TimedOut => ProtocolError::TimedOut,
            other => ProtocolError::Transport(other),
        }
    }
}

/// Convenience type alias for `Result<T, ProtocolError>`
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
