//! In-memory remote server.
//!
//! Keeps a directory tree and a current directory the same way a real server
//! session does, and records every primitive call it receives so callers can
//! assert on the exact call sequence. Used as the test double for the
//! navigation and transfer engines.

use bytes::{Bytes, BytesMut};
use std::collections::BTreeMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{
    ChannelError, ChannelResult, DirectoryEntry, EntryKind, ReadDir, RemoteChannel, Sink, Source,
};

/// One primitive call received by a [`MemoryChannel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Cwd(String),
    Cdup,
    Pwd,
    List,
    Mkdir(String),
    Rmdir(String),
    Delete(String),
    Rename(String, String),
    Get(String),
    Put(String),
    Append(String),
}

#[derive(Debug, Clone)]
enum Node {
    Directory(BTreeMap<String, Node>),
    File(Bytes),
}

enum Found {
    Missing,
    Directory { empty: bool },
    File(Bytes),
}

#[derive(Debug, Default)]
pub struct MemoryChannel {
    root: BTreeMap<String, Node>,
    cwd: Vec<String>,
    calls: Vec<Call>,
    failures: Vec<Call>,
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty() && *c != ".")
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the directory at absolute `path` and every missing parent.
    #[must_use]
    pub fn with_dir(mut self, path: &str) -> Self {
        let mut dir = &mut self.root;
        for name in components(path) {
            let node = dir
                .entry(name.to_owned())
                .or_insert_with(|| Node::Directory(BTreeMap::new()));
            if let Node::File(_) = node {
                *node = Node::Directory(BTreeMap::new());
            }
            dir = match node {
                Node::Directory(children) => children,
                Node::File(_) => break,
            };
        }
        self
    }

    /// Creates a file at absolute `path`, creating missing parents.
    #[must_use]
    pub fn with_file<B: Into<Bytes>>(self, path: &str, content: B) -> Self {
        let (parent, name) = path.rsplit_once('/').unwrap_or(("", path));
        let mut channel = self.with_dir(parent);
        if let Some(dir) = Self::dir_at(&mut channel.root, &Self::absolute(parent)) {
            let _ = dir.insert(name.to_owned(), Node::File(content.into()));
        }
        channel
    }

    /// Sets the current directory to the absolute `path`.
    #[must_use]
    pub fn at(mut self, path: &str) -> Self {
        self.cwd = Self::absolute(path);
        self
    }

    /// Makes every later call equal to `call` fail.
    #[must_use]
    pub fn fail_on(mut self, call: Call) -> Self {
        self.failures.push(call);
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Current directory as an absolute path.
    pub fn current_dir(&self) -> String {
        format!("/{}", self.cwd.join("/"))
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(self.node(path), Some(Node::Directory(_)))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.node(path).is_some()
    }

    pub fn read_file(&self, path: &str) -> Option<Bytes> {
        match self.node(path) {
            Some(Node::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    fn absolute(path: &str) -> Vec<String> {
        components(path).map(str::to_owned).collect()
    }

    /// Resolves `path` against the current directory.
    fn resolve(&self, path: &str) -> Vec<String> {
        let mut resolved = if path.starts_with('/') {
            vec![]
        } else {
            self.cwd.clone()
        };
        for name in components(path) {
            if name == ".." {
                let _ = resolved.pop();
            } else {
                resolved.push(name.to_owned());
            }
        }
        resolved
    }

    fn node(&self, path: &str) -> Option<&Node> {
        let mut resolved = Self::absolute(path);
        let name = resolved.pop()?;
        let mut dir = &self.root;
        for component in &resolved {
            match dir.get(component) {
                Some(Node::Directory(children)) => dir = children,
                _ => return None,
            }
        }
        dir.get(&name)
    }

    fn dir_at<'a>(
        root: &'a mut BTreeMap<String, Node>,
        path: &[String],
    ) -> Option<&'a mut BTreeMap<String, Node>> {
        let mut dir = root;
        for component in path {
            match dir.get_mut(component) {
                Some(Node::Directory(children)) => dir = children,
                _ => return None,
            }
        }
        Some(dir)
    }

    fn current(&mut self) -> ChannelResult<&mut BTreeMap<String, Node>> {
        let cwd = self.cwd.clone();
        Self::dir_at(&mut self.root, &cwd)
            .ok_or_else(|| ChannelError::UnexpectedBehavior("working directory vanished".to_owned()))
    }

    fn child(&mut self, name: &str) -> ChannelResult<Found> {
        Ok(match self.current()?.get(name) {
            Some(Node::Directory(children)) => Found::Directory {
                empty: children.is_empty(),
            },
            Some(Node::File(content)) => Found::File(content.clone()),
            None => Found::Missing,
        })
    }

    fn record(&mut self, call: Call) -> ChannelResult<()> {
        let failing = self.failures.contains(&call);
        self.calls.push(call.clone());
        if failing {
            return Err(ChannelError::Rejected(format!("{call:?} refused")));
        }
        Ok(())
    }

    fn rejected(name: &str, reason: &str) -> ChannelError {
        ChannelError::Rejected(format!("550 {name}: {reason}"))
    }
}

#[async_trait]
impl RemoteChannel for MemoryChannel {
    async fn cwd(&mut self, name: &str) -> ChannelResult<()> {
        self.record(Call::Cwd(name.to_owned()))?;
        match self.child(name)? {
            Found::Directory { .. } => {
                self.cwd.push(name.to_owned());
                Ok(())
            }
            Found::File(_) => Err(Self::rejected(name, "Not a directory")),
            Found::Missing => Err(Self::rejected(name, "No such file or directory")),
        }
    }

    async fn cdup(&mut self) -> ChannelResult<()> {
        self.record(Call::Cdup)?;
        let _ = self.cwd.pop();
        Ok(())
    }

    async fn pwd(&mut self) -> ChannelResult<String> {
        self.record(Call::Pwd)?;
        Ok(self.current_dir())
    }

    async fn list(&mut self) -> ChannelResult<ReadDir> {
        self.record(Call::List)?;
        Ok(self
            .current()?
            .iter()
            .map(|(name, node)| match node {
                Node::Directory(_) => DirectoryEntry::new(name.as_str(), EntryKind::Directory),
                Node::File(content) => DirectoryEntry::new(name.as_str(), EntryKind::File)
                    .with_size(content.len() as u64),
            })
            .collect())
    }

    async fn mkdir(&mut self, name: &str) -> ChannelResult<()> {
        self.record(Call::Mkdir(name.to_owned()))?;
        match self.child(name)? {
            Found::Missing => {
                let _ = self
                    .current()?
                    .insert(name.to_owned(), Node::Directory(BTreeMap::new()));
                Ok(())
            }
            _ => Err(Self::rejected(name, "File exists")),
        }
    }

    async fn rmdir(&mut self, name: &str) -> ChannelResult<()> {
        self.record(Call::Rmdir(name.to_owned()))?;
        match self.child(name)? {
            Found::Directory { empty: true } => {
                let _ = self.current()?.remove(name);
                Ok(())
            }
            Found::Directory { empty: false } => Err(Self::rejected(name, "Directory not empty")),
            Found::File(_) => Err(Self::rejected(name, "Not a directory")),
            Found::Missing => Err(Self::rejected(name, "No such file or directory")),
        }
    }

    async fn delete(&mut self, name: &str) -> ChannelResult<()> {
        self.record(Call::Delete(name.to_owned()))?;
        match self.child(name)? {
            Found::File(_) => {
                let _ = self.current()?.remove(name);
                Ok(())
            }
            Found::Directory { .. } => Err(Self::rejected(name, "Is a directory")),
            Found::Missing => Err(Self::rejected(name, "No such file or directory")),
        }
    }

    async fn rename(&mut self, old: &str, new: &str) -> ChannelResult<()> {
        self.record(Call::Rename(old.to_owned(), new.to_owned()))?;
        let mut from = self.resolve(old);
        let mut to = self.resolve(new);
        let (Some(from_name), Some(to_name)) = (from.pop(), to.pop()) else {
            return Err(Self::rejected(old, "Cannot rename the root"));
        };

        if Self::dir_at(&mut self.root, &to).is_none() {
            return Err(Self::rejected(new, "No such file or directory"));
        }
        let node = Self::dir_at(&mut self.root, &from)
            .and_then(|dir| dir.remove(&from_name))
            .ok_or_else(|| Self::rejected(old, "No such file or directory"))?;
        if let Some(dir) = Self::dir_at(&mut self.root, &to) {
            let _ = dir.insert(to_name, node);
        }
        Ok(())
    }

    async fn get(&mut self, name: &str, sink: Sink<'_>) -> ChannelResult<u64> {
        self.record(Call::Get(name.to_owned()))?;
        let content = match self.child(name)? {
            Found::File(content) => content,
            Found::Directory { .. } => return Err(Self::rejected(name, "Is a directory")),
            Found::Missing => return Err(Self::rejected(name, "No such file or directory")),
        };
        sink.write_all(&content).await?;
        sink.flush().await?;
        Ok(content.len() as u64)
    }

    async fn put(&mut self, name: &str, source: Source<'_>) -> ChannelResult<u64> {
        self.record(Call::Put(name.to_owned()))?;
        if let Found::Directory { .. } = self.child(name)? {
            return Err(Self::rejected(name, "Is a directory"));
        }
        let mut buffer = Vec::new();
        let len = source.read_to_end(&mut buffer).await?;
        let _ = self
            .current()?
            .insert(name.to_owned(), Node::File(Bytes::from(buffer)));
        Ok(len as u64)
    }

    async fn append(&mut self, name: &str, source: Source<'_>) -> ChannelResult<u64> {
        self.record(Call::Append(name.to_owned()))?;
        let mut content = match self.child(name)? {
            Found::File(existing) => BytesMut::from(&existing[..]),
            Found::Directory { .. } => return Err(Self::rejected(name, "Is a directory")),
            Found::Missing => BytesMut::new(),
        };
        let mut buffer = Vec::new();
        let len = source.read_to_end(&mut buffer).await?;
        content.extend_from_slice(&buffer);
        let _ = self
            .current()?
            .insert(name.to_owned(), Node::File(content.freeze()));
        Ok(len as u64)
    }
}
