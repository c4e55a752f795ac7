//! Remote path syntax.
//!
//! A path is split on `/` into segments. A leading blank segment means the
//! server's absolute root, a trailing blank one means "this names a
//! directory, not a leaf". `.` is only meaningful in first position and `..`
//! may not follow a name, except in [`split_relaxed`] which `cd` uses.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Leading blank segment: start from the absolute root
    Root,
    /// `.` in first position
    Current,
    /// `..`
    Parent,
    Name(String),
    /// Trailing blank segment: the path denotes a directory
    TrailingBlank,
}

/// Splits `path` into validated segments.
///
/// An empty path yields no segments, i.e. the current directory.
pub fn split(path: &str, allow_trailing_blank: bool) -> Result<Vec<Segment>> {
    split_with(path, allow_trailing_blank, false)
}

/// Like [`split`] but lets `..` follow names anywhere, and always accepts a
/// trailing slash. Only meaningful for a plain walk that is never undone.
pub fn split_relaxed(path: &str) -> Result<Vec<Segment>> {
    split_with(path, true, true)
}

fn split_with(path: &str, allow_trailing_blank: bool, relaxed: bool) -> Result<Vec<Segment>> {
    if path.is_empty() {
        return Ok(vec![]);
    }

    let parts: Vec<&str> = path.split('/').collect();
    let last = parts.len() - 1;
    let invalid = || Error::InvalidPath(path.to_owned());

    let mut named = false;
    let mut segments = Vec::with_capacity(parts.len());

    for (i, part) in parts.into_iter().enumerate() {
        let segment = match part {
            "" if i == 0 => Segment::Root,
            "" if i == last && allow_trailing_blank => Segment::TrailingBlank,
            "" => return Err(invalid()),
            "." if i == 0 => Segment::Current,
            "." => return Err(invalid()),
            ".." if named && !relaxed => return Err(invalid()),
            ".." => Segment::Parent,
            name => {
                named = true;
                Segment::Name(name.to_owned())
            }
        };
        segments.push(segment);
    }

    Ok(segments)
}

/// A parsed remote path, split into the directory part and an optional leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPath {
    raw: String,
    segments: Vec<Segment>,
}

impl VirtualPath {
    /// Parses a path that may end with `/`.
    pub fn parse<T: Into<String>>(path: T) -> Result<Self> {
        let raw = path.into();
        let segments = split(&raw, true)?;
        Ok(Self { raw, segments })
    }

    /// Parses a path that must not end with `/`.
    pub fn parse_leaf<T: Into<String>>(path: T) -> Result<Self> {
        let raw = path.into();
        let segments = split(&raw, false)?;
        Ok(Self { raw, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The final name, unless the path denotes a directory (`a/`, `.`, `..`, `/`).
    pub fn leaf(&self) -> Option<&str> {
        match self.segments.last() {
            Some(Segment::Name(name)) => Some(name),
            _ => None,
        }
    }

    /// Segments leading to the directory that holds the leaf, or to the
    /// directory itself when there is no leaf.
    pub fn parent(&self) -> &[Segment] {
        match self.segments.split_last() {
            Some((Segment::Name(_) | Segment::TrailingBlank, rest)) => rest,
            _ => &self.segments,
        }
    }

    /// Textual form of [`Self::parent`], used for log records.
    pub fn dirname(&self) -> &str {
        let raw = self.raw.as_str();
        if self.leaf().is_none() {
            return raw.strip_suffix('/').filter(|p| !p.is_empty()).unwrap_or(raw);
        }
        match raw.rsplit_once('/') {
            Some(("", _)) => "/",
            Some((dir, _)) => dir,
            None => "",
        }
    }
}

#[cfg(test)]
mod test_path {
    use super::*;

    fn name(n: &str) -> Segment {
        Segment::Name(n.to_owned())
    }

    #[test]
    fn test_absolute_path() {
        assert_eq!(
            split("/a/b", false).unwrap(),
            vec![Segment::Root, name("a"), name("b")]
        );
    }

    #[test]
    fn test_trailing_blank_marks_directory() {
        assert_eq!(
            split("a/b/", true).unwrap(),
            vec![name("a"), name("b"), Segment::TrailingBlank]
        );
        assert!(matches!(split("a/b/", false), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_current_only_first() {
        assert_eq!(split("./a", false).unwrap(), vec![Segment::Current, name("a")]);
        assert!(matches!(split("a/./b", true), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_parent_after_name_is_rejected() {
        assert!(matches!(split("a/../b", true), Err(Error::InvalidPath(_))));
        assert_eq!(
            split("../../a", false).unwrap(),
            vec![Segment::Parent, Segment::Parent, name("a")]
        );
    }

    #[test]
    fn test_relaxed_allows_parent_anywhere() {
        assert_eq!(
            split_relaxed("a/../b/").unwrap(),
            vec![name("a"), Segment::Parent, name("b"), Segment::TrailingBlank]
        );
    }

    #[test]
    fn test_interior_blank_is_rejected() {
        assert!(matches!(split("a//b", true), Err(Error::InvalidPath(_))));
        assert!(matches!(split_relaxed("//"), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_root_alone() {
        assert_eq!(
            split("/", true).unwrap(),
            vec![Segment::Root, Segment::TrailingBlank]
        );
        assert!(split("", false).unwrap().is_empty());
    }

    #[test]
    fn test_leaf_and_parent() {
        let path = VirtualPath::parse("/srv/www/index.html").unwrap();
        assert_eq!(path.leaf(), Some("index.html"));
        assert_eq!(path.parent(), &[Segment::Root, name("srv"), name("www")]);
        assert_eq!(path.dirname(), "/srv/www");

        let dir = VirtualPath::parse("srv/www/").unwrap();
        assert_eq!(dir.leaf(), None);
        assert_eq!(dir.parent(), &[name("srv"), name("www")]);
        assert_eq!(dir.dirname(), "srv/www");

        let top = VirtualPath::parse("/index.html").unwrap();
        assert_eq!(top.dirname(), "/");

        let current = VirtualPath::parse(".").unwrap();
        assert_eq!(current.leaf(), None);
        assert_eq!(current.parent(), &[Segment::Current]);
    }
}
