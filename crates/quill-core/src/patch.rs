//! Patch records and the patch generator extension point
//!
//! The engine decides *when* patches are generated (once per finalized
//! draft with a known path, or once per replaced root) and where they are
//! delivered. What a patch contains is up to the registered
//! [`PatchGenerator`].

use crate::draft::{Assignment, DraftHandle};
use crate::path::PatchPath;
use crate::value::{Node, NodeKind, PropKey, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Patch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Key did not exist before
    Add,
    /// Key no longer exists
    Remove,
    /// Key holds a different value
    Replace,
}

/// One recorded change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// What happened
    pub op: PatchOp,
    /// Where it happened, relative to the session root
    pub path: PatchPath,
    /// New value for `add` and `replace`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Patch {
    /// Addition at `path`
    #[must_use]
    pub fn add(path: PatchPath, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOp::Add,
            path,
            value: Some(value.into()),
        }
    }

    /// Removal at `path`
    #[must_use]
    pub fn remove(path: PatchPath) -> Self {
        Self {
            op: PatchOp::Remove,
            path,
            value: None,
        }
    }

    /// Replacement at `path`
    #[must_use]
    pub fn replace(path: PatchPath, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOp::Replace,
            path,
            value: Some(value.into()),
        }
    }
}

/// Finalized draft as seen by a patch generator
///
/// Captured after the draft's children were resolved, so `copy` holds
/// committed values rather than child drafts.
#[derive(Debug, Clone)]
pub struct DraftView {
    /// Draft being reported
    pub handle: DraftHandle,
    /// Container kind
    pub kind: NodeKind,
    /// Value before the session
    pub base: Value,
    /// Value after the session
    pub copy: Option<Node>,
    /// Per-key assignment record
    pub assigned: IndexMap<PropKey, Assignment>,
}

/// Diff generation plugin
pub trait PatchGenerator: Send + Sync {
    /// Record the changes of one finalized draft found at `path`
    fn generate_patches(
        &self,
        draft: &DraftView,
        path: &PatchPath,
        patches: &mut Vec<Patch>,
        inverse: &mut Vec<Patch>,
    );

    /// Record a whole-root replacement; `result` is `None` for an explicit drop
    fn generate_replacement_patches(
        &self,
        base: &Value,
        result: Option<&Value>,
        patches: &mut Vec<Patch>,
        inverse: &mut Vec<Patch>,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        let path = PatchPath::root().child("a");
        assert_eq!(Patch::add(path.clone(), 1).op, PatchOp::Add);
        assert!(Patch::remove(path.clone()).value.is_none());
        assert_eq!(Patch::replace(path, "x").value, Some(Value::from("x")));
    }

    #[test]
    fn serializes_like_json_patch() {
        let patch = Patch::replace(PatchPath::root().child("done"), true);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"op": "replace", "path": ["done"], "value": true}));

        let removal = serde_json::to_value(Patch::remove(PatchPath::root().child(0usize))).unwrap();
        assert_eq!(removal, serde_json::json!({"op": "remove", "path": [0]}));
    }
}
