//! Recursive download and upload between a local tree and the remote one.
//!
//! Both directions walk depth-first and strictly one call at a time. A
//! failure stops the walk where it happened; whatever was already written
//! stays, but the remote working directory is always put back.

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::{
    channel::{DirectoryEntry, EntryKind, RemoteChannel},
    error::{Error, Result},
    local::{LocalFs, LocalKind},
    navigator::{Create, Navigator},
    path::VirtualPath,
    utils::{join, BoxFuture},
};

/// How an uploaded file is written on the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Overwrite,
    Append,
}

/// One completed file transfer, kept for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub bytes: u64,
}

/// Sibling of `target` a download is written to before it replaces `target`.
fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}

fn local_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |err| Error::LocalFilesystem(format!("{}: {err}", path.display()))
}

/// Splits a local destination argument into the directory to write into and
/// an optional new name for the top-level entry.
fn local_destination(destination: Option<&str>) -> (PathBuf, Option<String>) {
    match destination {
        None => (PathBuf::from("."), None),
        Some(dir) if dir.ends_with('/') => {
            let trimmed = dir.trim_end_matches('/');
            (PathBuf::from(if trimmed.is_empty() { "/" } else { trimmed }), None)
        }
        Some(path) => {
            let path = Path::new(path);
            match path.file_name() {
                None => (path.to_path_buf(), None),
                Some(name) => {
                    let dir = path
                        .parent()
                        .filter(|p| !p.as_os_str().is_empty())
                        .unwrap_or_else(|| Path::new("."));
                    (dir.to_path_buf(), Some(name.to_string_lossy().into_owned()))
                }
            }
        }
    }
}

async fn ensure_local_dir<F: LocalFs + ?Sized>(local: &F, path: &Path) -> Result<()> {
    match local.kind(path).await.map_err(local_error(path))? {
        Some(LocalKind::Directory) => Ok(()),
        Some(_) => Err(Error::NotADirectory(path.display().to_string())),
        None => local.create_dir(path).await.map_err(local_error(path)),
    }
}

/// Name an uploaded local path takes remotely when no explicit one is given.
/// A trailing slash means "the contents of", so there is none.
fn upload_name(source: &str) -> Option<String> {
    if source.ends_with('/') {
        return None;
    }
    Path::new(source)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

pub struct TreeTransfer<'a, C, F: ?Sized> {
    navigator: &'a mut Navigator<C>,
    local: &'a F,
    records: Vec<TransferRecord>,
}

impl<'a, C, F> TreeTransfer<'a, C, F>
where
    C: RemoteChannel,
    F: LocalFs + ?Sized,
{
    pub fn new(navigator: &'a mut Navigator<C>, local: &'a F) -> Self {
        Self {
            navigator,
            local,
            records: vec![],
        }
    }

    /// Files transferred so far, in transfer order.
    pub fn records(&self) -> &[TransferRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TransferRecord> {
        self.records
    }

    /// Downloads the remote file or directory `target` into the local
    /// `destination`.
    ///
    /// A target without a leaf (`dir/`, `.`, `/`) downloads every entry of
    /// that directory.
    pub async fn download(&mut self, target: &str, destination: Option<&str>) -> Result<()> {
        let target = VirtualPath::parse(target)?;
        let (dest, rename) = local_destination(destination);

        let marker = self
            .navigator
            .descend(target.parent(), Create::Never)
            .await?;

        let result = self
            .mirror_remote(
                target.dirname().to_owned(),
                target.leaf().map(str::to_owned),
                dest,
                rename,
            )
            .await;
        let restored = self.navigator.ascend(marker).await;

        result?;
        restored
    }

    /// Uploads the local file or directory `source` to the remote `target`,
    /// creating missing remote directories on the way.
    pub async fn upload(&mut self, mode: WriteMode, source: &str, target: Option<&str>) -> Result<()> {
        let target = VirtualPath::parse(target.unwrap_or_default())?;
        let name = target
            .leaf()
            .map(str::to_owned)
            .or_else(|| upload_name(source));

        let marker = self
            .navigator
            .descend(target.parent(), Create::Missing)
            .await?;

        let result = self
            .mirror_local(
                mode,
                PathBuf::from(source),
                target.dirname().to_owned(),
                name,
            )
            .await;
        let restored = self.navigator.ascend(marker).await;

        result?;
        restored
    }

    /// Copies the entries of the current remote directory matching `leaf`
    /// (all of them when `None`) into `dest`.
    fn mirror_remote<'s>(
        &'s mut self,
        work: String,
        leaf: Option<String>,
        dest: PathBuf,
        rename: Option<String>,
    ) -> BoxFuture<'s, Result<()>>
    where
        'a: 's,
        C: 's,
        F: 's,
    {
        Box::pin(async move {
            let entries: Vec<DirectoryEntry> = self
                .navigator
                .channel_mut()
                .list()
                .await?
                .filter(|entry| leaf.as_deref().map_or(true, |l| entry.file_name() == l))
                .collect();

            if let Some(name) = &leaf {
                if entries.is_empty() {
                    return Err(Error::NotFound(join(&work, name)));
                }
            }

            let mut dirs = vec![];
            for entry in entries {
                let local_name = match (&leaf, &rename) {
                    (Some(_), Some(rename)) => rename.clone(),
                    _ => entry.file_name().to_owned(),
                };
                let target = dest.join(local_name);

                match entry.kind() {
                    EntryKind::File => self.fetch(&work, entry.file_name(), &target).await?,
                    EntryKind::Directory => dirs.push((entry.file_name().to_owned(), target)),
                }
            }

            for (name, target) in dirs {
                ensure_local_dir(self.local, &target).await?;
                self.navigator.cwd(&name).await?;

                let result = self
                    .mirror_remote(join(&work, &name), None, target, None)
                    .await;
                let restored = self.navigator.cdup().await;

                result?;
                restored?;
            }

            Ok(())
        })
    }

    /// Downloads file `name` into `target`.
    ///
    /// The content lands in a `.part` sibling first and only replaces
    /// `target` once the whole file has arrived.
    async fn fetch(&mut self, work: &str, name: &str, target: &Path) -> Result<()> {
        let partial = partial_path(target);
        let mut file = self
            .local
            .open_write(&partial)
            .await
            .map_err(local_error(&partial))?;

        let result = self.navigator.channel_mut().get(name, &mut *file).await;
        let closed = file.shutdown().await;
        drop(file);

        let outcome = match (result, closed) {
            (Err(err), _) => Err(Error::from(err)),
            (Ok(_), Err(err)) => Err(local_error(&partial)(err)),
            (Ok(bytes), Ok(())) => self
                .local
                .rename(&partial, target)
                .await
                .map(|()| bytes)
                .map_err(local_error(target)),
        };
        let bytes = match outcome {
            Ok(bytes) => bytes,
            Err(err) => {
                if let Err(cleanup) = self.local.remove_file(&partial).await {
                    warn!("Could not remove {}: {cleanup}", partial.display());
                }
                return Err(err);
            }
        };

        let remote_path = join(work, name);
        info!(
            "Downloaded file {} to {} ({bytes} bytes)",
            remote_path,
            target.display()
        );
        self.records.push(TransferRecord {
            local_path: target.to_path_buf(),
            remote_path,
            bytes,
        });
        Ok(())
    }

    /// Uploads `source` into the current remote directory under `name`.
    ///
    /// A directory without a name has its contents uploaded in place.
    fn mirror_local<'s>(
        &'s mut self,
        mode: WriteMode,
        source: PathBuf,
        work: String,
        name: Option<String>,
    ) -> BoxFuture<'s, Result<()>>
    where
        'a: 's,
        C: 's,
        F: 's,
    {
        Box::pin(async move {
            let kind = self
                .local
                .kind(&source)
                .await
                .map_err(local_error(&source))?;

            match (kind, name) {
                (Some(LocalKind::File), Some(name)) => self.send(mode, &source, &work, &name).await,
                (Some(LocalKind::Directory), name) => {
                    let work = match &name {
                        Some(name) => {
                            self.navigator.enter(name, Create::Missing).await?;
                            join(&work, name)
                        }
                        None => work,
                    };

                    let result = self.mirror_children(mode, &source, &work).await;
                    if name.is_some() {
                        let restored = self.navigator.cdup().await;
                        result?;
                        restored
                    } else {
                        result
                    }
                }
                (None, _) => Err(Error::LocalFilesystem(format!(
                    "{}: No such file or directory",
                    source.display()
                ))),
                _ => Err(Error::InvalidPath(source.display().to_string())),
            }
        })
    }

    /// Uploads every entry of the local directory `source`, sub-directories
    /// first, each group in name order.
    async fn mirror_children(&mut self, mode: WriteMode, source: &Path, work: &str) -> Result<()> {
        let names = self
            .local
            .read_dir(source)
            .await
            .map_err(local_error(source))?;

        let mut dirs = vec![];
        let mut files = vec![];
        for name in names {
            let path = source.join(&name);
            match self.local.kind(&path).await.map_err(local_error(&path))? {
                Some(LocalKind::Directory) => dirs.push(name),
                _ => files.push(name),
            }
        }

        for name in dirs.into_iter().chain(files) {
            self.mirror_local(mode, source.join(&name), work.to_owned(), Some(name))
                .await?;
        }
        Ok(())
    }

    async fn send(&mut self, mode: WriteMode, source: &Path, work: &str, name: &str) -> Result<()> {
        let mut file = self
            .local
            .open_read(source)
            .await
            .map_err(local_error(source))?;

        let channel = self.navigator.channel_mut();
        let bytes = match mode {
            WriteMode::Overwrite => channel.put(name, &mut *file).await?,
            WriteMode::Append => channel.append(name, &mut *file).await?,
        };

        let remote_path = join(work, name);
        info!(
            "Transferred file {} to {} ({bytes} bytes)",
            source.display(),
            remote_path
        );
        self.records.push(TransferRecord {
            local_path: source.to_path_buf(),
            remote_path,
            bytes,
        });
        Ok(())
    }
}

#[cfg(test)]
mod test_transfer {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        channel::memory::{Call, MemoryChannel},
        local::TokioFs,
    };

    fn local_path(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).display().to_string()
    }

    #[tokio::test]
    async fn test_download_single_file_with_rename() {
        let local = TempDir::new().unwrap();
        let channel = MemoryChannel::new()
            .with_file("/pub/report.csv", "a,b\n")
            .at("/");
        let mut nav = Navigator::new(channel);

        let dest = local_path(&local, "copy.csv");
        let mut transfer = TreeTransfer::new(&mut nav, &TokioFs);
        transfer
            .download("pub/report.csv", Some(dest.as_str()))
            .await
            .unwrap();

        assert_eq!(
            transfer.records(),
            &[TransferRecord {
                local_path: local.path().join("copy.csv"),
                remote_path: "pub/report.csv".to_owned(),
                bytes: 4,
            }]
        );
        assert_eq!(
            std::fs::read_to_string(local.path().join("copy.csv")).unwrap(),
            "a,b\n"
        );
        assert_eq!(nav.channel().current_dir(), "/");
    }

    #[tokio::test]
    async fn test_download_directory_mirrors_tree() {
        let local = TempDir::new().unwrap();
        let channel = MemoryChannel::new()
            .with_file("/site/index.html", "<html>")
            .with_file("/site/css/main.css", "body{}")
            .with_dir("/site/empty")
            .at("/site");
        let mut nav = Navigator::new(channel);

        let dest = format!("{}/", local.path().display());
        let mut transfer = TreeTransfer::new(&mut nav, &TokioFs);
        transfer.download("/site", Some(dest.as_str())).await.unwrap();

        let root = local.path().join("site");
        assert_eq!(
            std::fs::read_to_string(root.join("index.html")).unwrap(),
            "<html>"
        );
        assert_eq!(
            std::fs::read_to_string(root.join("css/main.css")).unwrap(),
            "body{}"
        );
        assert!(root.join("empty").is_dir());
        assert_eq!(transfer.records().len(), 2);
        assert_eq!(nav.channel().current_dir(), "/site");
    }

    #[tokio::test]
    async fn test_download_missing_leaf_is_not_found() {
        let local = TempDir::new().unwrap();
        let channel = MemoryChannel::new().with_dir("/pub");
        let mut nav = Navigator::new(channel);

        let dest = format!("{}/", local.path().display());
        let mut transfer = TreeTransfer::new(&mut nav, &TokioFs);
        let err = transfer
            .download("pub/nothing.txt", Some(dest.as_str()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(path) if path == "pub/nothing.txt"));
        assert_eq!(nav.channel().current_dir(), "/");
    }

    #[tokio::test]
    async fn test_download_into_local_file_is_not_a_directory() {
        let local = TempDir::new().unwrap();
        std::fs::write(local.path().join("data"), "occupied").unwrap();
        let channel = MemoryChannel::new().with_file("/data/inner.txt", "x");
        let mut nav = Navigator::new(channel);

        let dest = format!("{}/", local.path().display());
        let mut transfer = TreeTransfer::new(&mut nav, &TokioFs);
        let err = transfer
            .download("data", Some(dest.as_str()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotADirectory(_)));
        assert_eq!(nav.channel().current_dir(), "/");
    }

    #[tokio::test]
    async fn test_upload_directory_reproduces_tree() {
        let local = TempDir::new().unwrap();
        let tree = local.path().join("bundle");
        std::fs::create_dir_all(tree.join("sub")).unwrap();
        std::fs::write(tree.join("file.txt"), "payload").unwrap();

        let mut nav = Navigator::new(MemoryChannel::new());
        let source = tree.display().to_string();
        let mut transfer = TreeTransfer::new(&mut nav, &TokioFs);
        transfer
            .upload(WriteMode::Overwrite, &source, None)
            .await
            .unwrap();
        assert_eq!(transfer.records().len(), 1);

        let writes: Vec<Call> = nav
            .channel()
            .calls()
            .iter()
            .filter(|call| matches!(call, Call::Mkdir(_) | Call::Put(_)))
            .cloned()
            .collect();
        assert_eq!(
            writes,
            vec![
                Call::Mkdir("bundle".to_owned()),
                Call::Mkdir("sub".to_owned()),
                Call::Put("file.txt".to_owned()),
            ]
        );
        assert_eq!(
            nav.channel().read_file("/bundle/file.txt").unwrap(),
            "payload"
        );
        assert!(nav.channel().is_dir("/bundle/sub"));
        assert_eq!(nav.channel().current_dir(), "/");
    }

    #[tokio::test]
    async fn test_upload_file_creates_destination_parents() {
        let local = TempDir::new().unwrap();
        std::fs::write(local.path().join("notes.txt"), "hello").unwrap();

        let channel = MemoryChannel::new().with_dir("/home").at("/home");
        let mut nav = Navigator::new(channel);
        let source = local_path(&local, "notes.txt");
        let mut transfer = TreeTransfer::new(&mut nav, &TokioFs);
        transfer
            .upload(WriteMode::Overwrite, &source, Some("a/b/renamed.txt"))
            .await
            .unwrap();

        assert_eq!(
            transfer.records()[0].remote_path,
            "a/b/renamed.txt".to_owned()
        );
        assert_eq!(
            nav.channel().read_file("/home/a/b/renamed.txt").unwrap(),
            "hello"
        );
        assert_eq!(nav.channel().current_dir(), "/home");
    }

    #[tokio::test]
    async fn test_upload_into_directory_keeps_local_name() {
        let local = TempDir::new().unwrap();
        std::fs::write(local.path().join("notes.txt"), "hello").unwrap();

        let channel = MemoryChannel::new().with_dir("/srv/in");
        let mut nav = Navigator::new(channel);
        let source = local_path(&local, "notes.txt");
        let mut transfer = TreeTransfer::new(&mut nav, &TokioFs);
        transfer
            .upload(WriteMode::Overwrite, &source, Some("/srv/in/"))
            .await
            .unwrap();

        assert!(nav.channel().exists("/srv/in/notes.txt"));
        assert_eq!(nav.channel().current_dir(), "/");
    }

    #[tokio::test]
    async fn test_append_extends_remote_file() {
        let local = TempDir::new().unwrap();
        std::fs::write(local.path().join("tail.log"), "second").unwrap();

        let channel = MemoryChannel::new().with_file("/tail.log", "first,");
        let mut nav = Navigator::new(channel);
        let source = local_path(&local, "tail.log");
        let mut transfer = TreeTransfer::new(&mut nav, &TokioFs);
        transfer
            .upload(WriteMode::Append, &source, None)
            .await
            .unwrap();

        assert_eq!(transfer.records()[0].bytes, 6);
        assert_eq!(nav.channel().read_file("/tail.log").unwrap(), "first,second");
    }

    #[tokio::test]
    async fn test_failed_download_keeps_existing_local_file() {
        let local = TempDir::new().unwrap();
        std::fs::write(local.path().join("r.txt"), "precious").unwrap();

        let channel = MemoryChannel::new()
            .with_file("/r.txt", "remote")
            .fail_on(Call::Get("r.txt".to_owned()));
        let mut nav = Navigator::new(channel);
        let dest = format!("{}/", local.path().display());
        let mut transfer = TreeTransfer::new(&mut nav, &TokioFs);
        let err = transfer
            .download("r.txt", Some(dest.as_str()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Channel(_)));
        assert!(transfer.records().is_empty());
        assert_eq!(
            std::fs::read_to_string(local.path().join("r.txt")).unwrap(),
            "precious"
        );
        assert!(!local.path().join("r.txt.part").exists());
    }

    #[tokio::test]
    async fn test_download_replaces_existing_local_file() {
        let local = TempDir::new().unwrap();
        std::fs::write(local.path().join("r.txt"), "stale").unwrap();

        let mut nav = Navigator::new(MemoryChannel::new().with_file("/r.txt", "fresh"));
        let dest = format!("{}/", local.path().display());
        let mut transfer = TreeTransfer::new(&mut nav, &TokioFs);
        transfer.download("r.txt", Some(dest.as_str())).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(local.path().join("r.txt")).unwrap(),
            "fresh"
        );
        assert!(!local.path().join("r.txt.part").exists());
    }

    #[tokio::test]
    async fn test_upload_over_remote_file_is_not_a_directory() {
        let local = TempDir::new().unwrap();
        std::fs::create_dir(local.path().join("docs")).unwrap();

        let channel = MemoryChannel::new().with_file("/docs", "a file");
        let mut nav = Navigator::new(channel);
        let source = local_path(&local, "docs");
        let mut transfer = TreeTransfer::new(&mut nav, &TokioFs);
        let err = transfer
            .upload(WriteMode::Overwrite, &source, None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotADirectory(name) if name == "docs"));
    }

    #[test]
    fn test_local_destination_forms() {
        assert_eq!(local_destination(None), (PathBuf::from("."), None));
        assert_eq!(
            local_destination(Some("out/")),
            (PathBuf::from("out"), None)
        );
        assert_eq!(
            local_destination(Some("out/copy.txt")),
            (PathBuf::from("out"), Some("copy.txt".to_owned()))
        );
        assert_eq!(
            local_destination(Some("copy.txt")),
            (PathBuf::from("."), Some("copy.txt".to_owned()))
        );
    }
}
