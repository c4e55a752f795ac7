use std::io;
use thiserror::Error;
use tokio::time::error::Elapsed as TimeElapsed;

/// Failures reported by the remote primitive layer
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// The server refused a primitive call
    #[error("{0}")]
    Rejected(String),
    /// Any errors related to I/O
    #[error("I/O: {0}")]
    IO(String),
    /// Time limit for receiving a response exceeded
    #[error("Timeout")]
    Timeout,
    /// The server answered in a way the session cannot interpret
    #[error("{0}")]
    UnexpectedBehavior(String),
}

impl From<io::Error> for ChannelError {
    fn from(error: io::Error) -> Self {
        Self::IO(error.to_string())
    }
}

impl From<TimeElapsed> for ChannelError {
    fn from(_: TimeElapsed) -> Self {
        Self::Timeout
    }
}

impl From<russh::Error> for ChannelError {
    fn from(error: russh::Error) -> Self {
        Self::UnexpectedBehavior(format!("SSH: {error}"))
    }
}

impl From<russh_sftp::client::error::Error> for ChannelError {
    fn from(error: russh_sftp::client::error::Error) -> Self {
        use russh_sftp::client::error::Error as SftpError;

        match error {
            SftpError::Status(status) => Self::Rejected(status.error_message),
            SftpError::IO(message) => Self::IO(message),
            SftpError::Timeout => Self::Timeout,
            other => Self::UnexpectedBehavior(other.to_string()),
        }
    }
}
