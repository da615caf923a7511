//! Normalized absolute paths in the parameter namespace.
//!
//! Responsibilities:
//! - Normalize any slash-delimited string into a canonical absolute path.
//! - Path arithmetic (join, parent, relative) and `ssm://` URI conversion.
//!
//! Invariants:
//! - Every path starts with `/` and has no empty, `.` or `..` segments.
//! - Two paths are equal iff their normalized strings are equal.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::constants::SSM_URI_PREFIX;
use crate::error::ConfigError;

/// Characters escaped in the path part of an `ssm://` URI.
const URI_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// An absolute, normalized parameter path such as `/app/prod/db`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterPath(String);

impl ParameterPath {
    /// Normalize `raw` into an absolute path.
    ///
    /// Empty and `.` segments are dropped; `..` removes the preceding segment
    /// and does nothing at the root.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.as_ref().split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
        Self(format!("/{}", segments.join("/")))
    }

    /// The root path `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Segments below the root, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Append `relative` beneath this path. A leading `/` on `relative` is ignored.
    pub fn join(&self, relative: impl AsRef<str>) -> Self {
        Self::new(format!("{}/{}", self.0, relative.as_ref()))
    }

    /// The containing path; the root is its own parent.
    pub fn parent(&self) -> Self {
        self.join("..")
    }

    /// The last segment, or `None` at the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Segments of `self` below `base`, or `None` if `self` is not at or under `base`.
    pub fn relative_to(&self, base: &ParameterPath) -> Option<Vec<String>> {
        let mut own = self.segments();
        for expected in base.segments() {
            if own.next() != Some(expected) {
                return None;
            }
        }
        Some(own.map(str::to_string).collect())
    }

    /// `ssm:/` followed by the percent-encoded path (`/a/b` becomes `ssm://a/b`).
    pub fn to_uri(&self) -> String {
        format!("ssm:/{}", utf8_percent_encode(&self.0, URI_PATH))
    }

    /// Parse an `ssm://` URI back into a path.
    pub fn from_uri(uri: &str) -> Result<Self, ConfigError> {
        let rest = uri
            .strip_prefix(SSM_URI_PREFIX)
            .ok_or_else(|| ConfigError::InvalidPath(format!("not an ssm:// uri: {uri}")))?;
        let decoded = percent_decode_str(rest)
            .decode_utf8()
            .map_err(|e| ConfigError::InvalidPath(format!("{uri}: {e}")))?;
        Ok(Self::new(decoded))
    }
}

impl fmt::Display for ParameterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ParameterPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for ParameterPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ParameterPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for ParameterPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
