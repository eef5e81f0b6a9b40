//! Shared composite nodes
//!
//! A [`Node`] is a reference-counted container: cloning a node clones the
//! reference, never the contents. Identity (not structure) is what the
//! drafting engine uses to detect sharing.

use crate::error::DraftError;
use crate::value::{same_value, PropKey, Prototype, Value, MAX_ARRAY_LEN};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Container kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Ordered string-keyed record
    Object,
    /// Dense indexed sequence
    Array,
    /// Ordered string-keyed container, drafted through a container plugin
    Map,
    /// Insertion-ordered, identity-unique members, drafted through a container plugin
    Set,
}

impl NodeKind {
    /// Lowercase name of the kind
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::Map => "map",
            Self::Set => "set",
        }
    }

    /// Kinds whose drafts are built by a container plugin
    #[inline]
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, Self::Map | Self::Set)
    }
}

#[derive(Clone)]
enum Body {
    Object(IndexMap<String, Value>),
    Array(Vec<Value>),
    Map(IndexMap<String, Value>),
    Set(Vec<Value>),
}

impl Body {
    fn kind(&self) -> NodeKind {
        match self {
            Self::Object(_) => NodeKind::Object,
            Self::Array(_) => NodeKind::Array,
            Self::Map(_) => NodeKind::Map,
            Self::Set(_) => NodeKind::Set,
        }
    }
}

struct NodeInner {
    kind: NodeKind,
    frozen: AtomicBool,
    prototype: Option<Arc<Prototype>>,
    body: RwLock<Body>,
}

/// Reference-counted composite value
///
/// # Invariants
/// - `kind` never changes
/// - `frozen` only ever goes from false to true
/// - every mutation of a frozen node fails with [`DraftError::FrozenValue`]
#[derive(Clone)]
pub struct Node(Arc<NodeInner>);

impl Node {
    fn from_body(body: Body, prototype: Option<Arc<Prototype>>) -> Self {
        Self(Arc::new(NodeInner {
            kind: body.kind(),
            frozen: AtomicBool::new(false),
            prototype,
            body: RwLock::new(body),
        }))
    }

    /// Empty object
    #[must_use]
    pub fn object() -> Self {
        Self::from_body(Body::Object(IndexMap::new()), None)
    }

    /// Empty array
    #[must_use]
    pub fn array() -> Self {
        Self::from_body(Body::Array(Vec::new()), None)
    }

    /// Empty map
    #[must_use]
    pub fn map() -> Self {
        Self::from_body(Body::Map(IndexMap::new()), None)
    }

    /// Empty set
    #[must_use]
    pub fn set() -> Self {
        Self::from_body(Body::Set(Vec::new()), None)
    }

    /// Object built from entries
    pub fn object_from<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_body(Body::Object(map), None)
    }

    /// Array built from values
    pub fn array_from<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        let items = values.into_iter().map(Into::into).collect();
        Self::from_body(Body::Array(items), None)
    }

    /// Map built from entries
    pub fn map_from<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_body(Body::Map(map), None)
    }

    /// Set built from values; duplicates (by identity) are dropped
    pub fn set_from<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        let mut members: Vec<Value> = Vec::new();
        for value in values.into_iter().map(Into::into) {
            if !members.iter().any(|m| same_value(m, &value)) {
                members.push(value);
            }
        }
        Self::from_body(Body::Set(members), None)
    }

    /// Object attached to a prototype
    pub fn instance<K, V>(prototype: Arc<Prototype>, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_body(Body::Object(map), Some(prototype))
    }

    /// Container kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    /// Attached prototype
    #[inline]
    #[must_use]
    pub fn prototype(&self) -> Option<&Arc<Prototype>> {
        self.0.prototype.as_ref()
    }

    /// Opaque instances (non-draftable prototype) are never drafted
    #[inline]
    #[must_use]
    pub fn is_draftable(&self) -> bool {
        self.0.prototype.as_ref().map_or(true, |p| p.is_draftable())
    }

    /// Check the frozen flag
    #[inline]
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.0.frozen.load(Ordering::Acquire)
    }

    /// Reference identity
    #[inline]
    #[must_use]
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Number of own slots
    #[must_use]
    pub fn len(&self) -> usize {
        match &*self.0.body.read() {
            Body::Object(map) | Body::Map(map) => map.len(),
            Body::Array(items) | Body::Set(items) => items.len(),
        }
    }

    /// Check if the node has no slots
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read an own slot; arrays also answer `length`
    #[must_use]
    pub fn get(&self, key: impl Into<PropKey>) -> Option<Value> {
        let key = key.into().normalize(self.kind()).ok()?;
        match (&*self.0.body.read(), key) {
            (Body::Object(map) | Body::Map(map), PropKey::Name(name)) => map.get(&name).cloned(),
            (Body::Array(items), PropKey::Name(_)) => Some(length_value(items.len())),
            (Body::Array(items) | Body::Set(items), PropKey::Index(index)) => {
                items.get(index).cloned()
            }
            _ => None,
        }
    }

    /// Check for an own slot
    #[must_use]
    pub fn contains_key(&self, key: impl Into<PropKey>) -> bool {
        let Ok(key) = key.into().normalize(self.kind()) else {
            return false;
        };
        match (&*self.0.body.read(), key) {
            (Body::Object(map) | Body::Map(map), PropKey::Name(name)) => map.contains_key(&name),
            (Body::Array(_), PropKey::Name(_)) => true,
            (Body::Array(items) | Body::Set(items), PropKey::Index(index)) => index < items.len(),
            _ => false,
        }
    }

    /// Check set or array membership by identity
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        match &*self.0.body.read() {
            Body::Object(map) | Body::Map(map) => map.values().any(|v| same_value(v, value)),
            Body::Array(items) | Body::Set(items) => items.iter().any(|v| same_value(v, value)),
        }
    }

    /// Own keys in iteration order (arrays do not list `length`)
    #[must_use]
    pub fn keys(&self) -> Vec<PropKey> {
        match &*self.0.body.read() {
            Body::Object(map) | Body::Map(map) => map.keys().map(PropKey::from).collect(),
            Body::Array(items) | Body::Set(items) => (0..items.len()).map(PropKey::Index).collect(),
        }
    }

    /// Own values in iteration order
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        match &*self.0.body.read() {
            Body::Object(map) | Body::Map(map) => map.values().cloned().collect(),
            Body::Array(items) | Body::Set(items) => items.clone(),
        }
    }

    /// Snapshot of own entries in iteration order
    #[must_use]
    pub fn entries(&self) -> Vec<(PropKey, Value)> {
        match &*self.0.body.read() {
            Body::Object(map) | Body::Map(map) => map
                .iter()
                .map(|(k, v)| (PropKey::from(k), v.clone()))
                .collect(),
            Body::Array(items) | Body::Set(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (PropKey::Index(i), v.clone()))
                .collect(),
        }
    }

    fn ensure_mutable(&self) -> Result<(), DraftError> {
        if self.is_frozen() {
            return Err(DraftError::FrozenValue);
        }
        Ok(())
    }

    /// Write a slot, returning the previous value
    ///
    /// Writing past the end of an array fills the gap with `Null`; writing
    /// `length` truncates or extends.
    ///
    /// # Errors
    /// Fails on frozen nodes, invalid keys and invalid lengths.
    pub fn insert(&self, key: impl Into<PropKey>, value: impl Into<Value>) -> Result<Option<Value>, DraftError> {
        self.ensure_mutable()?;
        let key = key.into().normalize(self.kind())?;
        let value = value.into();
        let mut body = self.0.body.write();
        match (&mut *body, key) {
            (Body::Object(map) | Body::Map(map), PropKey::Name(name)) => Ok(map.insert(name, value)),
            (Body::Array(items), PropKey::Name(_)) => {
                let len = array_length(&value)?;
                let previous = length_value(items.len());
                items
                    .try_reserve(len.saturating_sub(items.len()))
                    .map_err(|_| DraftError::InvalidArrayLength(len.to_string()))?;
                items.resize(len, Value::Null);
                Ok(Some(previous))
            }
            (Body::Array(items) | Body::Set(items), PropKey::Index(index)) => place(items, index, value),
            (body, _) => Err(DraftError::kind_mismatch("key for this kind", body.kind().name())),
        }
    }

    /// Remove a slot, returning the removed value
    ///
    /// Array slots become `Null` holes so later indices keep their
    /// positions; set members are removed outright.
    ///
    /// # Errors
    /// Fails on frozen nodes, invalid keys and on `length`.
    pub fn remove(&self, key: impl Into<PropKey>) -> Result<Option<Value>, DraftError> {
        self.ensure_mutable()?;
        let key = key.into().normalize(self.kind())?;
        let mut body = self.0.body.write();
        match (&mut *body, key) {
            (Body::Object(map) | Body::Map(map), PropKey::Name(name)) => Ok(map.shift_remove(&name)),
            (Body::Array(_), PropKey::Name(_)) => {
                Err(DraftError::UnsupportedOperation("delete array length"))
            }
            (Body::Array(items), PropKey::Index(index)) => Ok(items
                .get_mut(index)
                .map(|slot| std::mem::replace(slot, Value::Null))),
            (Body::Set(items), PropKey::Index(index)) => {
                Ok((index < items.len()).then(|| items.remove(index)))
            }
            (body, _) => Err(DraftError::kind_mismatch("key for this kind", body.kind().name())),
        }
    }

    /// Append to an array
    ///
    /// # Errors
    /// Fails on frozen nodes and non-arrays.
    pub fn push(&self, value: impl Into<Value>) -> Result<(), DraftError> {
        self.ensure_mutable()?;
        match &mut *self.0.body.write() {
            Body::Array(items) => {
                items.push(value.into());
                Ok(())
            }
            body => Err(DraftError::kind_mismatch("array", body.kind().name())),
        }
    }

    /// Add a set member; returns false if an identical member exists
    ///
    /// # Errors
    /// Fails on frozen nodes and non-sets.
    pub fn add(&self, value: impl Into<Value>) -> Result<bool, DraftError> {
        self.ensure_mutable()?;
        let value = value.into();
        match &mut *self.0.body.write() {
            Body::Set(items) => {
                if items.iter().any(|m| same_value(m, &value)) {
                    return Ok(false);
                }
                items.push(value);
                Ok(true)
            }
            body => Err(DraftError::kind_mismatch("set", body.kind().name())),
        }
    }

    /// One-level copy: new, unfrozen node sharing every child by reference
    #[must_use]
    pub fn shallow_clone(&self) -> Node {
        let body = self.0.body.read().clone();
        Self::from_body(body, self.0.prototype.clone())
    }

    /// Freeze this node, and with `deep` everything reachable from it
    ///
    /// Stops at drafts, opaque nodes and nodes that are already frozen,
    /// which also makes it safe on cyclic structures.
    pub fn freeze(&self, deep: bool) {
        if self.is_frozen() || !self.is_draftable() {
            return;
        }
        self.0.frozen.store(true, Ordering::Release);
        if deep {
            for child in self.values() {
                child.freeze(true);
            }
        }
    }
}

fn place(items: &mut Vec<Value>, index: usize, value: Value) -> Result<Option<Value>, DraftError> {
    if let Some(slot) = items.get_mut(index) {
        return Ok(Some(std::mem::replace(slot, value)));
    }
    items
        .try_reserve(index + 1 - items.len())
        .map_err(|_| DraftError::InvalidArrayKey(index.to_string()))?;
    items.resize(index, Value::Null);
    items.push(value);
    Ok(None)
}

#[allow(clippy::cast_precision_loss)]
fn length_value(len: usize) -> Value {
    Value::Number(len as f64)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub(crate) fn array_length(value: &Value) -> Result<usize, DraftError> {
    match value {
        Value::Number(n) if *n >= 0.0 && *n <= MAX_ARRAY_LEN as f64 && n.fract() == 0.0 => Ok(*n as usize),
        Value::Number(n) => Err(DraftError::InvalidArrayLength(n.to_string())),
        other => Err(DraftError::InvalidArrayLength(other.kind_name().to_string())),
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if Node::ptr_eq(self, other) {
            return true;
        }
        if self.kind() != other.kind() {
            return false;
        }
        let (a, b) = (self.0.body.read(), other.0.body.read());
        match (&*a, &*b) {
            (Body::Object(x), Body::Object(y)) | (Body::Map(x), Body::Map(y)) => x == y,
            (Body::Array(x), Body::Array(y)) | (Body::Set(x), Body::Set(y)) => x == y,
            _ => false,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(proto) = self.prototype() {
            write!(f, "{} ", proto.name())?;
        }
        match &*self.0.body.read() {
            Body::Object(map) => f.debug_map().entries(map.iter()).finish(),
            Body::Map(map) => {
                f.write_str("Map ")?;
                f.debug_map().entries(map.iter()).finish()
            }
            Body::Array(items) => f.debug_list().entries(items.iter()).finish(),
            Body::Set(items) => {
                f.write_str("Set ")?;
                f.debug_set().entries(items.iter()).finish()
            }
        }
    }
}
