use std::io;
use thiserror::Error;

use crate::channel::error::ChannelError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Path {0} is invalid.")]
    InvalidPath(String),
    #[error("Directory or file {0} does not exist.")]
    NotFound(String),
    #[error("Path {0} is not a directory.")]
    NotADirectory(String),
    #[error("Unsupported command \"{0}\"")]
    UnsupportedCommand(String),
    #[error("{0}")]
    Channel(#[from] ChannelError),
    #[error("Local I/O: {0}")]
    LocalFilesystem(String),
    #[error("{0}")]
    Config(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::LocalFilesystem(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
