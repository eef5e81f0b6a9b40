//! Property keys
//!
//! Provides [`PropKey`] for addressing a single slot of a composite value.

use crate::error::DraftError;
use crate::value::NodeKind;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Name of the pseudo-property exposing an array's length
pub const LENGTH: &str = "length";

/// Largest array length; valid positions are strictly below it
pub const MAX_ARRAY_LEN: usize = u32::MAX as usize;

/// Key of one slot in an object, array, map or set
///
/// Objects and maps are keyed by name, arrays and sets by position.
/// Arrays additionally accept the name `length`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropKey {
    /// Positional key
    Index(usize),
    /// Named key
    Name(String),
}

impl PropKey {
    /// The array `length` key
    #[inline]
    #[must_use]
    pub fn length() -> Self {
        Self::Name(LENGTH.to_string())
    }

    /// Check if this is the array `length` key
    #[inline]
    #[must_use]
    pub fn is_length(&self) -> bool {
        matches!(self, Self::Name(name) if name == LENGTH)
    }

    /// Positional value, if any
    #[inline]
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Name(_) => None,
        }
    }

    /// Bring the key into the canonical form for a container kind
    ///
    /// # Errors
    /// Returns [`DraftError::InvalidArrayKey`] for non-numeric names other
    /// than `length` on arrays and for positions at or above
    /// [`MAX_ARRAY_LEN`], and a kind mismatch for named keys on sets.
    pub fn normalize(self, kind: NodeKind) -> Result<Self, DraftError> {
        match kind {
            NodeKind::Object | NodeKind::Map => Ok(match self {
                Self::Index(index) => Self::Name(index.to_string()),
                name @ Self::Name(_) => name,
            }),
            NodeKind::Array => match self {
                Self::Index(index) => bounded(index),
                Self::Name(name) if name == LENGTH => Ok(Self::Name(name)),
                Self::Name(name) => match name.parse::<usize>() {
                    Ok(index) => bounded(index),
                    Err(_) => Err(DraftError::InvalidArrayKey(name)),
                },
            },
            NodeKind::Set => match self {
                Self::Index(index) => bounded(index),
                Self::Name(name) => match name.parse::<usize>() {
                    Ok(index) => bounded(index),
                    Err(_) => Err(DraftError::kind_mismatch("set position", "name")),
                },
            },
        }
    }
}

fn bounded(index: usize) -> Result<PropKey, DraftError> {
    if index >= MAX_ARRAY_LEN {
        return Err(DraftError::InvalidArrayKey(index.to_string()));
    }
    Ok(PropKey::Index(index))
}

impl Display for PropKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for PropKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for PropKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for PropKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&String> for PropKey {
    fn from(name: &String) -> Self {
        Self::Name(name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_become_names() {
        assert_eq!(
            PropKey::Index(3).normalize(NodeKind::Object).unwrap(),
            PropKey::Name("3".into())
        );
        assert_eq!(
            PropKey::from("a").normalize(NodeKind::Map).unwrap(),
            PropKey::from("a")
        );
    }

    #[test]
    fn array_keys_accept_indices_and_length() {
        assert_eq!(
            PropKey::from("2").normalize(NodeKind::Array).unwrap(),
            PropKey::Index(2)
        );
        assert!(PropKey::length()
            .normalize(NodeKind::Array)
            .unwrap()
            .is_length());
    }

    #[test]
    fn positions_beyond_the_array_limit_are_rejected() {
        assert_eq!(
            PropKey::Index(MAX_ARRAY_LEN - 1).normalize(NodeKind::Array).unwrap(),
            PropKey::Index(MAX_ARRAY_LEN - 1)
        );
        assert_eq!(
            PropKey::from("4294967295").normalize(NodeKind::Array).unwrap_err(),
            DraftError::InvalidArrayKey("4294967295".into())
        );
        assert!(PropKey::Index(usize::MAX).normalize(NodeKind::Set).is_err());
    }

    #[test]
    fn array_rejects_other_names() {
        let err = PropKey::from("name").normalize(NodeKind::Array).unwrap_err();
        assert_eq!(err, DraftError::InvalidArrayKey("name".into()));
    }

    #[test]
    fn display() {
        assert_eq!(PropKey::Index(0).to_string(), "0");
        assert_eq!(PropKey::from("todo").to_string(), "todo");
    }

    #[test]
    fn serializes_untagged() {
        let keys = vec![PropKey::from("a"), PropKey::Index(1)];
        let json = serde_json::to_string(&keys).unwrap();
        assert_eq!(json, r#"["a",1]"#);
        let back: Vec<PropKey> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, keys);
    }
}
