//! Remote path ("URN") handling.
//!
//! A [`RemotePath`] is a list of segments plus a directory flag. It never carries
//! empty segments, so joining and rendering cannot produce doubled separators.

use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters left untouched when a segment is escaped: `A-Z a-z 0-9 - . _ ~`.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SEPARATOR: char = '/';

/// Normalized remote path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RemotePath {
    segments: Vec<String>,
    directory: bool,
}

impl RemotePath {
    /// Build a path from raw text. Separators are collapsed and empty segments dropped.
    ///
    /// A path without segments is the root, which is always a directory.
    pub fn new(raw: &str, is_directory: bool) -> Self {
        let segments: Vec<String> = raw
            .split(SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        let directory = is_directory || segments.is_empty();
        Self {
            segments,
            directory,
        }
    }

    /// The root path, `/`.
    pub fn root() -> Self {
        Self::new("", true)
    }

    /// Parse a percent-encoded path (as produced by [`RemotePath::encoded`]).
    pub fn from_encoded(raw: &str, is_directory: bool) -> Self {
        let segments: Vec<String> = raw
            .split(SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .collect();
        let directory = is_directory || segments.is_empty();
        Self {
            segments,
            directory,
        }
    }

    /// Append `relative` to this path.
    ///
    /// The directory flag comes from `relative`, except when `relative` is the root
    /// (nothing was appended) in which case this path's flag is kept.
    pub fn concat(&self, relative: &RemotePath) -> Self {
        if relative.segments.is_empty() {
            return self.clone();
        }
        let mut segments = Vec::with_capacity(self.segments.len() + relative.segments.len());
        segments.extend(self.segments.iter().cloned());
        segments.extend(relative.segments.iter().cloned());
        Self {
            segments,
            directory: relative.directory,
        }
    }

    /// Append raw text; a trailing `/` marks the appended part as a directory.
    pub fn join(&self, relative: &str) -> Self {
        self.concat(&RemotePath::new(relative, relative.ends_with(SEPARATOR)))
    }

    /// Drop the last segment. The root is its own parent.
    pub fn parent(&self) -> Self {
        if self.segments.is_empty() {
            return self.clone();
        }
        Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
            directory: true,
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_directory(&self) -> bool {
        self.directory
    }

    /// Same segments, flagged as a directory.
    pub fn as_directory(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            directory: true,
        }
    }

    /// Last segment, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Logical (unencoded) rendering.
    pub fn path(&self) -> String {
        self.render(|segment| segment.to_owned())
    }

    /// Percent-encoded rendering, safe to append to a host to form a URL.
    pub fn encoded(&self) -> String {
        self.render(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
    }

    fn render(&self, escape: impl Fn(&str) -> String) -> String {
        let mut out = String::with_capacity(self.segments.iter().map(|s| s.len() + 1).sum());
        for segment in &self.segments {
            out.push(SEPARATOR);
            out.push_str(&escape(segment));
        }
        if self.directory || out.is_empty() {
            out.push(SEPARATOR);
        }
        out
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl From<&str> for RemotePath {
    fn from(raw: &str) -> Self {
        RemotePath::new(raw, raw.ends_with(SEPARATOR))
    }
}
