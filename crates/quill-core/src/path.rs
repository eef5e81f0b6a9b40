//! Patch paths for addressing within value trees
//!
//! Provides [`PatchPath`] for the location of a draft relative to the root
//! of its session, as reported to the patch generator.

use crate::value::PropKey;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path from a session root to a nested value
///
/// Displayed as a JSON pointer.
///
/// # Examples
/// - `[]` → `` (root)
/// - `["todos", 1, "done"]` → `/todos/1/done`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchPath(Vec<PropKey>);

impl PatchPath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<PropKey>) -> Self {
        Self(segments)
    }

    /// Empty path (session root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PropKey] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is the root
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<PropKey>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }
}

impl Display for PatchPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            let text = segment.to_string();
            write!(f, "/{}", text.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl FromStr for PatchPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = s.strip_prefix('/') else {
            return Err(PathError::MissingLeadingSlash(s.to_string()));
        };

        let segments = rest
            .split('/')
            .map(|raw| {
                if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(index) = raw.parse::<usize>() {
                        return Ok(PropKey::Index(index));
                    }
                }
                unescape(raw).map(PropKey::Name)
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

fn unescape(raw: &str) -> Result<String, PathError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return Err(PathError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}

impl From<Vec<PropKey>> for PatchPath {
    fn from(segments: Vec<PropKey>) -> Self {
        Self(segments)
    }
}

/// Errors related to patch paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Non-root pointer without a leading `/`
    #[error("path '{0}' must be empty or start with '/'")]
    MissingLeadingSlash(String),

    /// `~` not followed by `0` or `1`
    #[error("invalid escape in segment '{0}'")]
    InvalidEscape(String),
}
