use crate::{
    channel::{DirectoryEntry, EntryKind, RemoteChannel},
    error::{Error, Result},
    local::{LocalFs, TokioFs},
    navigator::{Create, Navigator},
    path::{split_relaxed, VirtualPath},
    transfer::{TransferRecord, TreeTransfer, WriteMode},
    utils::BoxFuture,
};

/// High-level operations on a remote session, one per script verb.
///
/// Every operation except [`Session::cd`] returns the remote session to the
/// directory it was in before the call, whether the call succeeded or not.
pub struct Session<C, F = TokioFs> {
    navigator: Navigator<C>,
    local: F,
    transfers: Vec<TransferRecord>,
}

impl<C: RemoteChannel> Session<C> {
    /// Creates a session that reads and writes local files through `tokio::fs`.
    pub const fn new(channel: C) -> Self {
        Self::with_local(channel, TokioFs)
    }
}

impl<C, F> Session<C, F>
where
    C: RemoteChannel,
    F: LocalFs,
{
    pub const fn with_local(channel: C, local: F) -> Self {
        Self {
            navigator: Navigator::new(channel),
            local,
            transfers: vec![],
        }
    }

    pub const fn channel(&self) -> &C {
        self.navigator.channel()
    }

    pub fn channel_mut(&mut self) -> &mut C {
        self.navigator.channel_mut()
    }

    pub fn into_channel(self) -> C {
        self.navigator.into_inner()
    }

    /// Every file transferred by this session so far, in transfer order.
    pub fn transfers(&self) -> &[TransferRecord] {
        &self.transfers
    }

    /// Lists the current remote directory and logs each entry.
    pub async fn list(&mut self) -> Result<Vec<DirectoryEntry>> {
        info!("Listing");
        let entries: Vec<DirectoryEntry> = self.navigator.channel_mut().list().await?.collect();
        for entry in &entries {
            info!("{entry}");
        }
        Ok(entries)
    }

    /// Downloads the remote `remote` file or directory to `local`.
    pub async fn get(&mut self, remote: &str, local: Option<&str>) -> Result<()> {
        let mut transfer = TreeTransfer::new(&mut self.navigator, &self.local);
        let result = transfer.download(remote, local).await;
        self.transfers.extend(transfer.into_records());
        result
    }

    /// Uploads `local` to `remote`, overwriting existing files.
    pub async fn put(&mut self, local: &str, remote: Option<&str>) -> Result<()> {
        self.upload(WriteMode::Overwrite, local, remote).await
    }

    /// Uploads `local` to `remote`, appending to existing files.
    pub async fn append(&mut self, local: &str, remote: Option<&str>) -> Result<()> {
        self.upload(WriteMode::Append, local, remote).await
    }

    async fn upload(&mut self, mode: WriteMode, local: &str, remote: Option<&str>) -> Result<()> {
        let mut transfer = TreeTransfer::new(&mut self.navigator, &self.local);
        let result = transfer.upload(mode, local, remote).await;
        self.transfers.extend(transfer.into_records());
        result
    }

    pub async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        self.navigator.channel_mut().rename(from, to).await?;
        info!("Renamed {from} to {to}");
        Ok(())
    }

    /// Removes the file or directory tree at `path`.
    ///
    /// A path that does not exist, or whose parent does not exist, is only
    /// reported with a warning.
    pub async fn delete(&mut self, path: &str) -> Result<()> {
        let path = VirtualPath::parse_leaf(path)?;
        let Some(leaf) = path.leaf() else {
            return Err(Error::InvalidPath(path.as_str().to_owned()));
        };

        let marker = match self.navigator.descend(path.parent(), Create::Never).await {
            Ok(marker) => marker,
            Err(Error::NotFound(_)) => {
                warn!("Directory or file {} does not exist.", path.as_str());
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let result = self.remove(leaf, path.as_str()).await;
        let restored = self.navigator.ascend(marker).await;

        result?;
        restored
    }

    /// Same as [`Session::delete`].
    pub async fn rmdir(&mut self, path: &str) -> Result<()> {
        self.delete(path).await
    }

    async fn remove(&mut self, name: &str, display: &str) -> Result<()> {
        match self.navigator.channel_mut().list().await?.kind_of(name) {
            None => warn!("Directory or file {display} does not exist."),
            Some(EntryKind::File) => {
                self.navigator.channel_mut().delete(name).await?;
                info!("Deleted {display}");
            }
            Some(EntryKind::Directory) => {
                remove_tree(&mut self.navigator, name.to_owned()).await?;
                info!("Removed directory {display}");
            }
        }
        Ok(())
    }

    /// Changes the remote working directory for the rest of the session.
    ///
    /// `..` may appear anywhere in `path`. A failed change leaves the
    /// directory where it was.
    pub async fn cd(&mut self, path: &str) -> Result<()> {
        let segments = split_relaxed(path)?;
        let _ = self.navigator.descend(&segments, Create::Never).await?;
        info!("Changed working directory to {path}");
        Ok(())
    }

    /// Creates the directory at `path` along with every missing parent.
    pub async fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = VirtualPath::parse(path)?;
        let marker = self
            .navigator
            .descend(path.segments(), Create::Missing)
            .await?;
        self.navigator.ascend(marker).await?;
        info!("Created directory {}", path.as_str());
        Ok(())
    }
}

/// Empties and removes the child directory `name`, bottom-up.
fn remove_tree<C: RemoteChannel>(navigator: &mut Navigator<C>, name: String) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        navigator.cwd(&name).await?;
        let result = clear_directory(navigator).await;
        let restored = navigator.cdup().await;

        result?;
        restored?;

        debug!("RMD {name}");
        navigator.channel_mut().rmdir(&name).await?;
        Ok(())
    })
}

async fn clear_directory<C: RemoteChannel>(navigator: &mut Navigator<C>) -> Result<()> {
    let entries: Vec<DirectoryEntry> = navigator.channel_mut().list().await?.collect();
    for entry in entries {
        match entry.kind() {
            EntryKind::File => {
                debug!("DELE {}", entry.file_name());
                navigator.channel_mut().delete(entry.file_name()).await?;
            }
            EntryKind::Directory => remove_tree(navigator, entry.file_name().to_owned()).await?,
        }
    }
    Ok(())
}
