//! [`RemoteChannel`] over an SFTP session.
//!
//! SFTP addresses everything by path, so the working directory is kept on
//! the client side and every primitive is resolved against it. Moves are
//! logical: entering a symlinked directory and leaving it again lands where
//! the walk started.

use russh::{client, Disconnect};
use russh_keys::key;
use russh_sftp::{client::SftpSession, protocol::OpenFlags};
use std::sync::Arc;
use tokio::{
    io::{self, AsyncWriteExt},
    time,
};

use super::{
    ChannelError, ChannelResult, DirectoryEntry, EntryKind, ReadDir, RemoteChannel, Sink, Source,
};
use crate::{
    config::ConnectConfig,
    utils::{from_unix, join},
};

struct Client;

#[async_trait]
impl client::Handler for Client {
    type Error = russh::Error;

    async fn check_server_key(
        self,
        server_public_key: &key::PublicKey,
    ) -> Result<(Self, bool), Self::Error> {
        debug!("Server key {}", server_public_key.fingerprint());
        Ok((self, true))
    }
}

pub struct SftpChannel {
    sftp: SftpSession,
    cwd: String,
    handle: client::Handle<Client>,
}

impl SftpChannel {
    /// Opens an SSH connection, authenticates with a password and starts the
    /// `sftp` subsystem. The working directory starts at the login directory.
    pub async fn connect(config: &ConnectConfig) -> ChannelResult<Self> {
        let ssh = client::Config {
            keepalive_interval: Some(config.keepalive),
            ..Default::default()
        };

        let address = (config.host.as_str(), config.port);
        let mut handle = time::timeout(
            config.connect_timeout,
            client::connect(Arc::new(ssh), address, Client),
        )
        .await??;

        if !handle
            .authenticate_password(config.user.as_str(), config.password.as_str())
            .await?
        {
            return Err(ChannelError::Rejected(format!(
                "Authentication failed for user {}",
                config.user
            )));
        }

        let mut channel = handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;

        let sftp = SftpSession::new(channel.into_stream()).await?;
        sftp.set_timeout(config.response_timeout.as_secs());
        let cwd = sftp.canonicalize(".").await?;

        info!("Connected to {}:{}, working directory {cwd}", config.host, config.port);
        Ok(Self { sftp, cwd, handle })
    }

    /// Ends the SFTP session and the SSH connection.
    pub async fn close(self) -> ChannelResult<()> {
        self.sftp.close().await?;
        self.handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await?;
        Ok(())
    }

    fn resolve(&self, name: &str) -> String {
        if name.starts_with('/') {
            name.to_owned()
        } else {
            join(&self.cwd, name)
        }
    }
}

#[async_trait]
impl RemoteChannel for SftpChannel {
    async fn cwd(&mut self, name: &str) -> ChannelResult<()> {
        let path = self.resolve(name);
        if !self.sftp.metadata(path.as_str()).await?.is_dir() {
            return Err(ChannelError::Rejected(format!("{path}: Not a directory")));
        }
        self.cwd = path;
        Ok(())
    }

    async fn cdup(&mut self) -> ChannelResult<()> {
        self.cwd = match self.cwd.rsplit_once('/') {
            Some(("", _)) | None => "/".to_owned(),
            Some((parent, _)) => parent.to_owned(),
        };
        Ok(())
    }

    async fn pwd(&mut self) -> ChannelResult<String> {
        Ok(self.cwd.clone())
    }

    async fn list(&mut self) -> ChannelResult<ReadDir> {
        Ok(self
            .sftp
            .read_dir(self.cwd.as_str())
            .await?
            .map(|entry| {
                let metadata = entry.metadata();
                let kind = if metadata.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                };

                let mut entry = DirectoryEntry::new(entry.file_name(), kind);
                if let Some(size) = metadata.size {
                    entry = entry.with_size(size);
                }
                if let Some(modified) = metadata.mtime.and_then(from_unix) {
                    entry = entry.with_modified(modified);
                }
                entry
            })
            .collect())
    }

    async fn mkdir(&mut self, name: &str) -> ChannelResult<()> {
        Ok(self.sftp.create_dir(self.resolve(name)).await?)
    }

    async fn rmdir(&mut self, name: &str) -> ChannelResult<()> {
        Ok(self.sftp.remove_dir(self.resolve(name)).await?)
    }

    async fn delete(&mut self, name: &str) -> ChannelResult<()> {
        Ok(self.sftp.remove_file(self.resolve(name)).await?)
    }

    async fn rename(&mut self, old: &str, new: &str) -> ChannelResult<()> {
        Ok(self
            .sftp
            .rename(self.resolve(old), self.resolve(new))
            .await?)
    }

    async fn get(&mut self, name: &str, sink: Sink<'_>) -> ChannelResult<u64> {
        let mut file = self.sftp.open(self.resolve(name)).await?;
        let len = io::copy(&mut file, &mut *sink).await?;
        sink.flush().await?;
        Ok(len)
    }

    async fn put(&mut self, name: &str, source: Source<'_>) -> ChannelResult<u64> {
        let mut file = self.sftp.create(self.resolve(name)).await?;
        let len = io::copy(&mut *source, &mut file).await?;
        file.shutdown().await?;
        Ok(len)
    }

    async fn append(&mut self, name: &str, source: Source<'_>) -> ChannelResult<u64> {
        let mut file = self
            .sftp
            .open_with_flags(
                self.resolve(name),
                OpenFlags::CREATE | OpenFlags::APPEND | OpenFlags::WRITE,
            )
            .await?;
        let len = io::copy(&mut *source, &mut file).await?;
        file.shutdown().await?;
        Ok(len)
    }
}
