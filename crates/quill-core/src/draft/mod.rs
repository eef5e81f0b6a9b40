//! Drafts: lazily copied stand-ins for immutable values
//!
//! # Core Concepts
//!
//! - **DraftState**: per-node record (base, working copy, flags, assignments)
//!   stored in the thread's draft arena
//! - **DraftHandle**: generation-checked reference to a `DraftState`;
//!   every access fails with [`DraftError::Revoked`] once the owning
//!   session is revoked
//! - **Facades**: [`ObjectDraft`] and [`ArrayDraft`] expose typed read,
//!   write and delete over a handle; both share the contract in `access`
//!
//! Child drafts are created only when a draftable child is read, so
//! untouched subtrees are never copied.

mod access;
mod array;
mod object;

pub use array::ArrayDraft;
pub use object::ObjectDraft;

use crate::config::InterceptionMode;
use crate::error::DraftError;
use crate::propagate;
use crate::runtime::{self, DraftId, Runtime, ScopeId};
use crate::scope::Scope;
use crate::value::{Node, NodeKind, PropKey, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// How a key was last touched through a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignment {
    /// Written with a new value
    Added,
    /// Removed from a key present on the base
    Deleted,
    /// Original value written back over its own child draft
    Unchanged,
}

pub(crate) struct DraftState {
    pub(crate) kind: NodeKind,
    pub(crate) scope: ScopeId,
    pub(crate) parent: Option<DraftId>,
    pub(crate) base: Value,
    pub(crate) copy: Option<Node>,
    pub(crate) modified: bool,
    pub(crate) finalized: bool,
    pub(crate) manual: bool,
    pub(crate) assigned: IndexMap<PropKey, Assignment>,
}

/// Snapshot of a draft's bookkeeping
#[derive(Debug, Clone)]
pub struct DraftInfo {
    /// Container kind of the drafted value
    pub kind: NodeKind,
    /// Owning session
    pub scope: Scope,
    /// Enclosing draft, if this is not a session root
    pub parent: Option<DraftHandle>,
    /// Some write changed this draft or a descendant
    pub modified: bool,
    /// The finalizer has already produced this draft's result
    pub finalized: bool,
    /// Created through `Producer::create_draft`
    pub manual: bool,
    /// A working copy exists
    pub has_copy: bool,
    /// Per-key assignment record
    pub assigned: IndexMap<PropKey, Assignment>,
}

/// Reference to a live draft
///
/// Handles are plain `Copy` keys; all state lives in the thread's runtime.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DraftHandle(pub(crate) DraftId);

impl std::fmt::Debug for DraftHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Draft{:?}", self.0)
    }
}

impl DraftHandle {
    /// Read a key, drafting draftable children on first access
    ///
    /// # Errors
    /// Fails when revoked or when the key is invalid for the draft's kind.
    pub fn get(self, key: impl Into<PropKey>) -> Result<Value, DraftError> {
        access::read(self, key.into())
    }

    /// Write a key
    ///
    /// # Errors
    /// Fails when revoked or when the key is invalid for the draft's kind.
    pub fn set(self, key: impl Into<PropKey>, value: impl Into<Value>) -> Result<(), DraftError> {
        access::write(self, key.into(), value.into())
    }

    /// Delete a key
    ///
    /// # Errors
    /// Fails when revoked or when the key is invalid for the draft's kind.
    pub fn delete(self, key: impl Into<PropKey>) -> Result<(), DraftError> {
        access::remove(self, key.into())
    }

    /// Check for an own or inherited key
    ///
    /// # Errors
    /// Fails when revoked.
    pub fn has(self, key: impl Into<PropKey>) -> Result<bool, DraftError> {
        access::has(self, key.into())
    }

    /// Own keys of the latest state
    ///
    /// # Errors
    /// Fails when revoked.
    pub fn keys(self) -> Result<Vec<PropKey>, DraftError> {
        Ok(self.latest()?.keys())
    }

    /// Number of own slots in the latest state
    ///
    /// # Errors
    /// Fails when revoked.
    pub fn len(self) -> Result<usize, DraftError> {
        Ok(self.latest()?.len())
    }

    /// Kind of the drafted value
    ///
    /// # Errors
    /// Fails when revoked.
    pub fn kind(self) -> Result<NodeKind, DraftError> {
        runtime::with(|rt| Ok(rt.draft(self.0)?.kind))
    }

    /// Bookkeeping snapshot
    ///
    /// # Errors
    /// Fails when revoked.
    pub fn info(self) -> Result<DraftInfo, DraftError> {
        runtime::with(|rt| {
            let state = rt.draft(self.0)?;
            Ok(DraftInfo {
                kind: state.kind,
                scope: Scope(state.scope),
                parent: state.parent.map(DraftHandle),
                modified: state.modified,
                finalized: state.finalized,
                manual: state.manual,
                has_copy: state.copy.is_some(),
                assigned: state.assigned.clone(),
            })
        })
    }

    /// The base value this draft stands in for
    ///
    /// # Errors
    /// Fails when revoked.
    pub fn original(self) -> Result<Value, DraftError> {
        runtime::with(|rt| Ok(rt.draft(self.0)?.base.clone()))
    }

    /// Check whether the owning session has been revoked
    #[must_use]
    pub fn is_revoked(self) -> bool {
        runtime::with(|rt| !rt.drafts.contains(self.0))
    }

    /// Object facade
    ///
    /// # Errors
    /// Fails when revoked or not an object draft.
    pub fn as_object(self) -> Result<ObjectDraft, DraftError> {
        match self.kind()? {
            NodeKind::Object => Ok(ObjectDraft::from_handle(self)),
            other => Err(DraftError::kind_mismatch("object", other.name())),
        }
    }

    /// Array facade
    ///
    /// # Errors
    /// Fails when revoked or not an array draft.
    pub fn as_array(self) -> Result<ArrayDraft, DraftError> {
        match self.kind()? {
            NodeKind::Array => Ok(ArrayDraft::from_handle(self)),
            other => Err(DraftError::kind_mismatch("array", other.name())),
        }
    }

    /// Node currently holding this draft's contents: the copy if one
    /// exists, the base otherwise
    ///
    /// # Errors
    /// Fails when revoked.
    pub fn latest(self) -> Result<Node, DraftError> {
        live_node(self)
    }

    /// Ensure a working copy exists and return it
    ///
    /// Writes made directly on the returned node bypass change tracking;
    /// pair them with [`DraftHandle::mark_changed`] and [`DraftHandle::assign`].
    ///
    /// # Errors
    /// Fails when revoked.
    pub fn prepare_copy(self) -> Result<Node, DraftError> {
        runtime::with(|rt| prepare_copy(rt, self.0))
    }

    /// Mark this draft and its ancestors modified
    ///
    /// # Errors
    /// Fails when revoked.
    pub fn mark_changed(self) -> Result<(), DraftError> {
        let dirtied = runtime::with(|rt| propagate::mark_changed(rt, self.0))?;
        propagate::notify(self, &dirtied)
    }

    /// Record how a key was touched
    ///
    /// # Errors
    /// Fails when revoked.
    pub fn assign(self, key: impl Into<PropKey>, assignment: Assignment) -> Result<(), DraftError> {
        let key = key.into();
        runtime::with(|rt| {
            let state = rt.draft_mut(self.0)?;
            let key = key.normalize(state.kind)?;
            state.assigned.insert(key, assignment);
            Ok(())
        })
    }

    /// Accessor definitions cannot be added to drafts
    ///
    /// # Errors
    /// Always fails with [`DraftError::UnsupportedOperation`].
    pub fn define_property(self, _key: impl Into<PropKey>) -> Result<(), DraftError> {
        Err(DraftError::UnsupportedOperation("define property on a draft"))
    }

    /// Drafts cannot change their prototype
    ///
    /// # Errors
    /// Always fails with [`DraftError::UnsupportedOperation`].
    pub fn set_prototype(self, _prototype: Option<std::sync::Arc<crate::value::Prototype>>) -> Result<(), DraftError> {
        Err(DraftError::UnsupportedOperation("set prototype of a draft"))
    }
}

/// Allocate a draft state for `base` inside the right session
///
/// Nested drafts join their parent's session; roots join the current one.
/// This is the entry point container and compatibility plugins use to
/// create drafts that take part in finalization and revocation.
///
/// # Errors
/// Fails with [`DraftError::NoActiveSession`] for a root outside any
/// session, or when `base` is not draftable.
pub fn register_draft(base: &Value, parent: Option<DraftHandle>) -> Result<DraftHandle, DraftError> {
    runtime::with(|rt| register_in(rt, base, parent.map(|p| p.0)))
}

fn register_in(rt: &mut Runtime, base: &Value, parent: Option<DraftId>) -> Result<DraftHandle, DraftError> {
    let kind = match resolve_source(rt, base)? {
        Some(node) if node.is_draftable() => node.kind(),
        _ => return Err(DraftError::kind_mismatch("draftable value", base.kind_name())),
    };
    let scope = scope_for(rt, parent)?;
    let id = rt.drafts.alloc(DraftState {
        kind,
        scope,
        parent,
        base: base.clone(),
        copy: None,
        modified: false,
        finalized: false,
        manual: false,
        assigned: IndexMap::new(),
    });
    rt.scope_mut(scope)?.drafts.push(id);
    trace!(draft = ?id, kind = kind.name(), nested = parent.is_some(), "draft created");
    Ok(DraftHandle(id))
}

fn scope_for(rt: &Runtime, parent: Option<DraftId>) -> Result<ScopeId, DraftError> {
    let scope = match parent {
        Some(parent) => rt.draft(parent)?.scope,
        None => rt.current_scope()?,
    };
    rt.scope(scope)?;
    Ok(scope)
}

/// Create a draft, routing container kinds and compat mode to plugins.
pub(crate) fn create_draft(base: &Value, parent: Option<DraftId>) -> Result<DraftHandle, DraftError> {
    let (kind, shared) = runtime::with(|rt| {
        let kind = resolve_source(rt, base)?
            .map(|node| node.kind())
            .ok_or_else(|| DraftError::kind_mismatch("draftable value", base.kind_name()))?;
        let scope = scope_for(rt, parent)?;
        Ok::<_, DraftError>((kind, rt.scope(scope)?.shared.clone()))
    })?;
    let parent = parent.map(DraftHandle);
    if kind.is_container() {
        return shared.plugins.container(kind)?.create_draft(base, parent);
    }
    if shared.config.interception == InterceptionMode::Compat {
        return shared.plugins.compat()?.create_draft(base, parent);
    }
    register_draft(base, parent)
}

/// Follow draft indirections down to the node holding a value's contents.
pub(crate) fn resolve_source(rt: &Runtime, value: &Value) -> Result<Option<Node>, DraftError> {
    let mut current = value.clone();
    loop {
        current = match current {
            Value::Node(node) => return Ok(Some(node)),
            Value::Draft(handle) => {
                let state = rt.draft(handle.0)?;
                match &state.copy {
                    Some(copy) => return Ok(Some(copy.clone())),
                    None => state.base.clone(),
                }
            }
            _ => return Ok(None),
        };
    }
}

pub(crate) fn latest(rt: &Runtime, id: DraftId) -> Result<Node, DraftError> {
    let state = rt.draft(id)?;
    if let Some(copy) = &state.copy {
        return Ok(copy.clone());
    }
    resolve_source(rt, &state.base)?
        .ok_or_else(|| DraftError::kind_mismatch("composite", state.base.kind_name()))
}

/// Read a key off a value without creating drafts.
pub(crate) fn peek(rt: &Runtime, value: &Value, key: &PropKey) -> Result<Option<Value>, DraftError> {
    Ok(resolve_source(rt, value)?.and_then(|node| node.get(key.clone())))
}

pub(crate) fn prepare_copy(rt: &mut Runtime, id: DraftId) -> Result<Node, DraftError> {
    let state = rt.draft(id)?;
    if let Some(copy) = &state.copy {
        return Ok(copy.clone());
    }
    let copy = latest(rt, id)?.shallow_clone();
    rt.draft_mut(id)?.copy = Some(copy.clone());
    trace!(draft = ?id, "working copy created");
    Ok(copy)
}

pub(crate) fn live_node(handle: DraftHandle) -> Result<Node, DraftError> {
    runtime::with(|rt| latest(rt, handle.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::{Outcome, Producer};

    fn with_root<R>(base: Node, f: impl FnOnce(DraftHandle) -> Result<R, DraftError>) -> R {
        let producer = Producer::new();
        let mut out = None;
        producer
            .produce(Value::from(base), |draft| {
                out = Some(f(draft.as_draft().ok_or(DraftError::EmptySession)?)?);
                Ok(Outcome::Commit)
            })
            .unwrap();
        out.unwrap()
    }

    #[test]
    fn register_outside_session_fails() {
        std::thread::spawn(|| {
            let err = register_draft(&Value::from(Node::object()), None).unwrap_err();
            assert_eq!(err, DraftError::NoActiveSession);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn register_rejects_primitives() {
        let err = with_root(Node::object(), |_| Ok(register_draft(&Value::from(3), None))).unwrap_err();
        assert!(matches!(err, DraftError::KindMismatch { .. }));
    }

    #[test]
    fn prepare_copy_is_shallow_and_lazy() {
        let child = Node::object();
        let base = Node::object_from([("child", child.clone())]);
        let (before, copy) = with_root(base.clone(), |draft| {
            let before = draft.info()?.has_copy;
            Ok((before, draft.prepare_copy()?))
        });
        assert!(!before);
        assert!(!Node::ptr_eq(&base, &copy));
        assert!(matches!(copy.get("child"), Some(Value::Node(c)) if Node::ptr_eq(&c, &child)));
    }

    #[test]
    fn info_reports_parent_and_kind() {
        let base = Node::object_from([("list", Node::array())]);
        let (root, info) = with_root(base, |draft| {
            let child = draft.get("list")?.as_draft().ok_or(DraftError::EmptySession)?;
            Ok((draft, child.info()?))
        });
        assert_eq!(info.kind, NodeKind::Array);
        assert_eq!(info.parent, Some(root));
        assert!(!info.modified);
    }

    #[test]
    fn handles_are_revoked_after_session() {
        let handle = with_root(Node::object(), Ok);
        assert!(handle.is_revoked());
        assert_eq!(handle.get("a"), Err(DraftError::Revoked));
        assert_eq!(handle.set("a", 1), Err(DraftError::Revoked));
    }

    #[test]
    fn unsupported_operations() {
        let (define, proto) = with_root(Node::object(), |draft| {
            Ok((draft.define_property("x"), draft.set_prototype(None)))
        });
        assert!(matches!(define, Err(DraftError::UnsupportedOperation(_))));
        assert!(matches!(proto, Err(DraftError::UnsupportedOperation(_))));
    }

    #[test]
    fn kind_checked_facades() {
        let err = with_root(Node::object(), |draft| Ok(draft.as_array())).unwrap_err();
        assert_eq!(err, DraftError::kind_mismatch("array", "object"));
    }
}
