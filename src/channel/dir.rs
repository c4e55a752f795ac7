use chrono::{DateTime, Utc};
use std::{collections::VecDeque, fmt};

/// Kind of a remote entry as reported by a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    name: String,
    kind: EntryKind,
    size: Option<u64>,
    modified: Option<DateTime<Utc>>,
}

impl DirectoryEntry {
    pub fn new<T: Into<String>>(name: T, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            size: None,
            modified: None,
        }
    }

    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub const fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Returns the bare name of the entry, without any directory prefix.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Size in bytes, when the server reports one.
    #[must_use]
    pub const fn size(&self) -> Option<u64> {
        self.size
    }

    #[must_use]
    pub const fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }
}

impl fmt::Display for DirectoryEntry {
    /// Renders a listing line: kind marker, size, modification time and name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_dir() { 'd' } else { '-' };
        let size = self.size.map(|s| s.to_string()).unwrap_or_default();
        let modified = self
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        write!(f, "{marker} {size:>10} {modified:>16} {}", self.name)
    }
}

/// Iterator over the entries of one remote directory listing.
///
/// The `.` and `..` pseudo entries some servers return are skipped.
#[derive(Debug, Default)]
pub struct ReadDir {
    entries: VecDeque<DirectoryEntry>,
}

impl ReadDir {
    /// Returns the kind of the entry called `name`, if the listing has one.
    pub fn kind_of(self, name: &str) -> Option<EntryKind> {
        self.into_iter()
            .find(|entry| entry.file_name() == name)
            .map(|entry| entry.kind())
    }
}

impl FromIterator<DirectoryEntry> for ReadDir {
    fn from_iter<I: IntoIterator<Item = DirectoryEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Iterator for ReadDir {
    type Item = DirectoryEntry;

    fn next(&mut self) -> Option<Self::Item> {
        match self.entries.pop_front() {
            None => None,
            Some(entry) if entry.name == "." || entry.name == ".." => self.next(),
            Some(entry) => Some(entry),
        }
    }
}
