//! The remote side of a session.
//!
//! A [`RemoteChannel`] exposes only single-level primitives: every name it
//! accepts is relative to the channel's current directory, and the only way
//! to learn where that is, is [`RemoteChannel::pwd`].

mod dir;
pub mod error;
pub mod memory;
pub mod sftp;

use tokio::io::{AsyncRead, AsyncWrite};

pub use dir::{DirectoryEntry, EntryKind, ReadDir};
pub use error::ChannelError;

pub type ChannelResult<T> = Result<T, ChannelError>;

/// Readable byte stream handed to [`RemoteChannel::put`] and [`RemoteChannel::append`]
pub type Source<'a> = &'a mut (dyn AsyncRead + Send + Unpin);
/// Writable byte stream handed to [`RemoteChannel::get`]
pub type Sink<'a> = &'a mut (dyn AsyncWrite + Send + Unpin);

/// Primitive command set of a directory-oriented remote server. This is `async_trait`
///
/// Implementations must support at most one call in flight; callers never
/// issue a second call before the first one settles.
#[async_trait]
pub trait RemoteChannel: Send {
    /// Moves into the child directory `name`.
    async fn cwd(&mut self, name: &str) -> ChannelResult<()>;

    /// Moves to the parent directory. At the root this is a no-op.
    async fn cdup(&mut self) -> ChannelResult<()>;

    /// Reports the absolute path of the current directory.
    async fn pwd(&mut self) -> ChannelResult<String>;

    /// Lists the entries of the current directory.
    async fn list(&mut self) -> ChannelResult<ReadDir>;

    async fn mkdir(&mut self, name: &str) -> ChannelResult<()>;

    /// Removes the empty child directory `name`.
    async fn rmdir(&mut self, name: &str) -> ChannelResult<()>;

    /// Removes the file `name`.
    async fn delete(&mut self, name: &str) -> ChannelResult<()>;

    async fn rename(&mut self, old: &str, new: &str) -> ChannelResult<()>;

    /// Streams the content of file `name` into `sink`, returning the byte count.
    async fn get(&mut self, name: &str, sink: Sink<'_>) -> ChannelResult<u64>;

    /// Creates or truncates file `name` and fills it from `source`.
    async fn put(&mut self, name: &str, source: Source<'_>) -> ChannelResult<u64>;

    /// Appends `source` to file `name`, creating it when missing.
    async fn append(&mut self, name: &str, source: Source<'_>) -> ChannelResult<u64>;
}
