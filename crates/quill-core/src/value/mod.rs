//! Value model
//!
//! # Core Concepts
//!
//! - **Primitive**: null, bool, number and string; compared by content
//! - **Node**: shared composite (object, array, map, set); compared by identity
//! - **Draft**: handle to a live draft inside a session
//!
//! Identity is decided by [`same_value`]: numbers follow SameValue semantics
//! (NaN equals NaN, `+0` differs from `-0`), nodes and drafts compare by
//! reference. Structural comparison is available through `PartialEq`.

mod key;
mod node;
mod proto;

pub use key::{PropKey, LENGTH, MAX_ARRAY_LEN};
pub(crate) use node::array_length;
pub use node::{Node, NodeKind};
pub use proto::{Getter, Inherited, Prototype, Setter};

use crate::draft::{self, ArrayDraft, DraftHandle, ObjectDraft};
use crate::error::DraftError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Any value the engine can hold
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value; also fills array holes
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// IEEE-754 double
    Number(f64),
    /// Immutable string
    String(Arc<str>),
    /// Shared composite
    Node(Node),
    /// Live draft in a session
    Draft(DraftHandle),
}

impl Value {
    /// Short name of the value's shape, used in error messages
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Node(node) => node.kind().name(),
            Self::Draft(_) => "draft",
        }
    }

    /// Check for `Null`
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check for a number
    #[inline]
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// Check for a live draft handle
    #[inline]
    #[must_use]
    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft(_))
    }

    /// Whether the engine would draft this value
    #[inline]
    #[must_use]
    pub fn is_draftable(&self) -> bool {
        is_draftable(self)
    }

    /// Primitives are always frozen; drafts never are
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        match self {
            Self::Node(node) => node.is_frozen(),
            Self::Draft(_) => false,
            _ => true,
        }
    }

    /// Boolean content
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric content
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String content
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Node reference
    #[inline]
    #[must_use]
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Draft handle
    #[inline]
    #[must_use]
    pub fn as_draft(&self) -> Option<DraftHandle> {
        match self {
            Self::Draft(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Object facade over a draft value
    ///
    /// # Errors
    /// Fails when the value is not a live object draft.
    pub fn as_object_draft(&self) -> Result<ObjectDraft, DraftError> {
        match self {
            Self::Draft(handle) => handle.as_object(),
            other => Err(DraftError::kind_mismatch("object draft", other.kind_name())),
        }
    }

    /// Array facade over a draft value
    ///
    /// # Errors
    /// Fails when the value is not a live array draft.
    pub fn as_array_draft(&self) -> Result<ArrayDraft, DraftError> {
        match self {
            Self::Draft(handle) => handle.as_array(),
            other => Err(DraftError::kind_mismatch("array draft", other.kind_name())),
        }
    }

    /// Freeze a node value; other values are left alone
    pub fn freeze(&self, deep: bool) {
        if let Self::Node(node) = self {
            node.freeze(deep);
        }
    }

    /// Convert into JSON, reading drafts through their latest state
    ///
    /// # Errors
    /// Fails when a draft handle has been revoked.
    pub fn to_json(&self) -> Result<serde_json::Value, DraftError> {
        Ok(match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => serde_json::Value::String(s.to_string()),
            Self::Node(node) => node_to_json(node)?,
            Self::Draft(handle) => node_to_json(&draft::live_node(*handle)?)?,
        })
    }
}

fn node_to_json(node: &Node) -> Result<serde_json::Value, DraftError> {
    match node.kind() {
        NodeKind::Object | NodeKind::Map => {
            let mut map = serde_json::Map::new();
            for (key, value) in node.entries() {
                map.insert(key.to_string(), value.to_json()?);
            }
            Ok(serde_json::Value::Object(map))
        }
        NodeKind::Array | NodeKind::Set => node
            .values()
            .iter()
            .map(Value::to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(serde_json::Value::Array),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 && !(n == 0.0 && n.is_sign_negative()) {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// SameValue identity: the comparison drafts use to detect changes
#[must_use]
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => {
            if x.is_nan() && y.is_nan() {
                return true;
            }
            x == y && x.is_sign_negative() == y.is_sign_negative()
        }
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Node(x), Value::Node(y)) => Node::ptr_eq(x, y),
        (Value::Draft(x), Value::Draft(y)) => x == y,
        _ => false,
    }
}

/// Whether a value takes part in drafting
///
/// Plain objects, arrays, maps and sets are draftable whether or not they
/// are frozen, and so is an existing draft. Primitives and instances of
/// opaque prototypes are not.
#[must_use]
pub fn is_draftable(value: &Value) -> bool {
    match value {
        Value::Node(node) => node.is_draftable(),
        Value::Draft(_) => true,
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(x), Self::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
            (Self::Node(x), Self::Node(y)) => x == y,
            _ => same_value(self, other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<usize> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: usize) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<DraftHandle> for Value {
    fn from(handle: DraftHandle) -> Self {
        Self::Draft(handle)
    }
}

impl From<ObjectDraft> for Value {
    fn from(draft: ObjectDraft) -> Self {
        Self::Draft(draft.handle())
    }
}

impl From<ArrayDraft> for Value {
    fn from(draft: ArrayDraft) -> Self {
        Self::Draft(draft.handle())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::from(s),
            serde_json::Value::Array(items) => {
                Self::Node(Node::array_from(items.into_iter().map(Value::from)))
            }
            serde_json::Value::Object(map) => {
                Self::Node(Node::object_from(map.into_iter().map(|(k, v)| (k, Value::from(v)))))
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
