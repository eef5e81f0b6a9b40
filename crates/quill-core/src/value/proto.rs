//! Prototypes: inherited members shared by object nodes
//!
//! A [`Prototype`] supplies default data members and computed accessors to
//! every object node attached to it. Accessors run against the draft facade
//! when the object is being drafted, so a getter observes in-session writes
//! and a setter routes its writes back through the draft.

use crate::draft::ObjectDraft;
use crate::error::DraftError;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Computed read: receives the draft the property was read on
pub type Getter = Arc<dyn Fn(&ObjectDraft) -> Result<Value, DraftError> + Send + Sync>;

/// Computed write: receives the draft the property was assigned on
pub type Setter = Arc<dyn Fn(&ObjectDraft, Value) -> Result<(), DraftError> + Send + Sync>;

/// Member inherited from a prototype
#[derive(Clone)]
pub enum Inherited {
    /// Plain default value
    Data(Value),
    /// Computed property
    Accessor {
        /// Read half, if readable
        get: Option<Getter>,
        /// Write half, if writable
        set: Option<Setter>,
    },
}

impl fmt::Debug for Inherited {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(value) => f.debug_tuple("Data").field(value).finish(),
            Self::Accessor { get, set } => f
                .debug_struct("Accessor")
                .field("get", &get.is_some())
                .field("set", &set.is_some())
                .finish(),
        }
    }
}

/// Shared description of a class of object nodes
#[derive(Debug, Clone)]
pub struct Prototype {
    name: String,
    draftable: bool,
    members: IndexMap<String, Inherited>,
    parent: Option<Arc<Prototype>>,
}

impl Prototype {
    /// Prototype whose instances can be drafted
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            draftable: true,
            members: IndexMap::new(),
            parent: None,
        }
    }

    /// Prototype whose instances are opaque: never drafted, never frozen
    #[must_use]
    pub fn opaque(name: impl Into<String>) -> Self {
        Self {
            draftable: false,
            ..Self::new(name)
        }
    }

    /// Inherit from another prototype
    #[must_use]
    pub fn extending(mut self, parent: Arc<Prototype>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Add a default data member
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(key.into(), Inherited::Data(value.into()));
        self
    }

    /// Add a read-only computed member
    #[must_use]
    pub fn with_getter<G>(mut self, key: impl Into<String>, get: G) -> Self
    where
        G: Fn(&ObjectDraft) -> Result<Value, DraftError> + Send + Sync + 'static,
    {
        self.members.insert(
            key.into(),
            Inherited::Accessor {
                get: Some(Arc::new(get)),
                set: None,
            },
        );
        self
    }

    /// Add a computed member with both halves
    #[must_use]
    pub fn with_accessor<G, S>(mut self, key: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&ObjectDraft) -> Result<Value, DraftError> + Send + Sync + 'static,
        S: Fn(&ObjectDraft, Value) -> Result<(), DraftError> + Send + Sync + 'static,
    {
        self.members.insert(
            key.into(),
            Inherited::Accessor {
                get: Some(Arc::new(get)),
                set: Some(Arc::new(set)),
            },
        );
        self
    }

    /// Prototype name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether instances take part in drafting
    #[inline]
    #[must_use]
    pub fn is_draftable(&self) -> bool {
        self.draftable
    }

    /// Find a member on this prototype or its ancestors
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&Inherited> {
        let mut proto = Some(self);
        while let Some(current) = proto {
            if let Some(member) = current.members.get(key) {
                return Some(member);
            }
            proto = current.parent.as_deref();
        }
        None
    }

    /// Inherited setter for `key`, if any
    #[must_use]
    pub fn setter(&self, key: &str) -> Option<Setter> {
        match self.lookup(key)? {
            Inherited::Accessor { set, .. } => set.clone(),
            Inherited::Data(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_the_chain() {
        let base = Arc::new(Prototype::new("Base").with_data("kind", "base"));
        let derived = Prototype::new("Derived")
            .with_data("level", 2)
            .extending(base);

        assert!(matches!(derived.lookup("level"), Some(Inherited::Data(_))));
        assert!(matches!(derived.lookup("kind"), Some(Inherited::Data(_))));
        assert!(derived.lookup("missing").is_none());
    }

    #[test]
    fn setter_only_for_accessors() {
        let proto = Prototype::new("Point")
            .with_data("x", 0)
            .with_accessor("y", |_| Ok(Value::Null), |_, _| Ok(()))
            .with_getter("z", |_| Ok(Value::Null));

        assert!(proto.setter("x").is_none());
        assert!(proto.setter("y").is_some());
        assert!(proto.setter("z").is_none());
    }

    #[test]
    fn opaque_is_not_draftable() {
        assert!(Prototype::new("Plain").is_draftable());
        assert!(!Prototype::opaque("Handle").is_draftable());
    }
}
