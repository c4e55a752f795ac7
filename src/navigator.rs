//! Directory navigation on top of single-level moves.
//!
//! The remote session is the only holder of the current directory. Every
//! [`Navigator::descend`] returns a [`BackMarker`] describing how to undo it,
//! and [`Navigator::ascend`] consumes that marker with as few primitive calls
//! as it can.

use crate::{
    channel::{EntryKind, RemoteChannel},
    error::{Error, Result},
    path::Segment,
    utils::components,
};

/// Recorded instruction for undoing a [`Navigator::descend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackMarker {
    /// Undo with this many parent moves
    Steps(usize),
    /// Undo by walking back to this absolute directory
    AbsolutePath(String),
}

/// Whether a missing directory met during a descent is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Create {
    Missing,
    Never,
}

pub struct Navigator<C> {
    channel: C,
}

impl<C: RemoteChannel> Navigator<C> {
    pub const fn new(channel: C) -> Self {
        Self { channel }
    }

    pub const fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_inner(self) -> C {
        self.channel
    }

    pub async fn pwd(&mut self) -> Result<String> {
        let current = self.channel.pwd().await?;
        debug!("PWD {current}");
        Ok(current)
    }

    pub async fn cwd(&mut self, name: &str) -> Result<()> {
        debug!("CWD {name}");
        Ok(self.channel.cwd(name).await?)
    }

    pub async fn cdup(&mut self) -> Result<()> {
        debug!("CDUP");
        Ok(self.channel.cdup().await?)
    }

    /// Moves to the absolute root and returns the directory it started from.
    pub async fn root(&mut self) -> Result<String> {
        let current = self.pwd().await?;
        for _ in components(&current) {
            self.cdup().await?;
        }
        Ok(current)
    }

    /// Moves into the child directory `name`, creating it first when it is
    /// missing and `create` allows it.
    pub async fn enter(&mut self, name: &str, create: Create) -> Result<()> {
        match self.channel.list().await?.kind_of(name) {
            Some(EntryKind::Directory) => (),
            Some(EntryKind::File) => return Err(Error::NotADirectory(name.to_owned())),
            None if create == Create::Missing => {
                debug!("MKD {name}");
                self.channel.mkdir(name).await?;
            }
            None => return Err(Error::NotFound(name.to_owned())),
        }
        self.cwd(name).await
    }

    /// Walks `segments` from the current directory.
    ///
    /// On failure the moves already made are undone before the error is
    /// returned, so the current directory is unchanged either way.
    pub async fn descend(&mut self, segments: &[Segment], create: Create) -> Result<BackMarker> {
        let mut marker = BackMarker::Steps(0);

        match self.walk(segments, create, &mut marker).await {
            Ok(()) => Ok(marker),
            Err(err) => {
                if let Err(undo) = self.ascend(marker).await {
                    warn!("Could not restore working directory: {undo}");
                }
                Err(err)
            }
        }
    }

    async fn walk(
        &mut self,
        segments: &[Segment],
        create: Create,
        marker: &mut BackMarker,
    ) -> Result<()> {
        for segment in segments {
            match segment {
                Segment::Current | Segment::TrailingBlank => (),
                Segment::Root => {
                    let origin = self.root().await?;
                    if let BackMarker::Steps(_) = marker {
                        *marker = BackMarker::AbsolutePath(origin);
                    }
                }
                Segment::Parent => {
                    if *marker == BackMarker::Steps(0) {
                        *marker = BackMarker::AbsolutePath(self.pwd().await?);
                    }
                    self.cdup().await?;
                    if let BackMarker::Steps(steps) = marker {
                        *steps = steps.saturating_sub(1);
                    }
                }
                Segment::Name(name) => {
                    self.enter(name, create).await?;
                    if let BackMarker::Steps(steps) = marker {
                        *steps += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Undoes a descent.
    ///
    /// For an absolute marker only the segments past the longest common
    /// prefix of the current directory and the target are walked.
    pub async fn ascend(&mut self, marker: BackMarker) -> Result<()> {
        match marker {
            BackMarker::Steps(steps) => {
                for _ in 0..steps {
                    self.cdup().await?;
                }
            }
            BackMarker::AbsolutePath(target) => {
                let current = self.pwd().await?;
                let current = components(&current);
                let target = components(&target);
                let common = current
                    .iter()
                    .zip(&target)
                    .take_while(|(a, b)| a == b)
                    .count();

                for _ in common..current.len() {
                    self.cdup().await?;
                }
                for name in &target[common..] {
                    self.cwd(name).await?;
                }
            }
        }
        Ok(())
    }
}
