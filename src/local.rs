//! Local filesystem access used by the transfer engine.

use std::{io, path::Path};
use tokio::{
    fs,
    io::{AsyncRead, AsyncWrite},
};

/// What a local path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    File,
    Directory,
    Other,
}

/// Minimal local filesystem capability. This is `async_trait`
#[async_trait]
pub trait LocalFs: Send + Sync {
    /// Returns `None` when nothing exists at `path`.
    async fn kind(&self, path: &Path) -> io::Result<Option<LocalKind>>;

    /// Names of the entries of directory `path`, sorted.
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    async fn create_dir(&self, path: &Path) -> io::Result<()>;

    async fn open_read(&self, path: &Path) -> io::Result<Box<dyn AsyncRead + Send + Unpin>>;

    /// Creates or truncates the file at `path`.
    async fn open_write(&self, path: &Path) -> io::Result<Box<dyn AsyncWrite + Send + Unpin>>;

    /// Moves `from` over `to`, replacing an existing file.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    async fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`LocalFs`] backed by `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

#[async_trait]
impl LocalFs for TokioFs {
    async fn kind(&self, path: &Path) -> io::Result<Option<LocalKind>> {
        match fs::metadata(path).await {
            Ok(metadata) if metadata.is_dir() => Ok(Some(LocalKind::Directory)),
            Ok(metadata) if metadata.is_file() => Ok(Some(LocalKind::File)),
            Ok(_) => Ok(Some(LocalKind::Other)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = vec![];
        let mut entries = fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path).await
    }

    async fn open_read(&self, path: &Path) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        Ok(Box::new(fs::File::open(path).await?))
    }

    async fn open_write(&self, path: &Path) -> io::Result<Box<dyn AsyncWrite + Send + Unpin>> {
        Ok(Box::new(fs::File::create(path).await?))
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }
}
