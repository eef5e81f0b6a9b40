//! Testing utilities for the Quill workspace
//!
//! Shared fixtures, helper plugins and tracing setup.

#![allow(missing_docs)]

use parking_lot::Mutex;
use quill_core::{
    register_draft, Assignment, CompatShim, ContainerDrafter, DraftError, DraftHandle, DraftView, EngineConfig,
    InterceptionMode, Node, NodeKind, Outcome, Patch, PatchGenerator, PatchPath, Plugins, Producer, Scope, Value,
};
use serde_json::json;
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`; safe to call repeatedly.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn from_json(json: serde_json::Value) -> Value {
    Value::from(json)
}

pub fn to_json(value: &Value) -> serde_json::Value {
    value.to_json().unwrap()
}

/// Unwrap a node, panicking with the value's shape otherwise
pub fn node(value: &Value) -> Node {
    match value {
        Value::Node(node) => node.clone(),
        other => panic!("expected a node, found {}", other.kind_name()),
    }
}

/// Child node at `key`
pub fn child(parent: &Node, key: impl Into<quill_core::PropKey>) -> Node {
    node(&parent.get(key).unwrap_or(Value::Null))
}

pub fn named_people() -> Value {
    from_json(json!([{"name": "tom"}, {"name": "jerry"}, {"name": "kitty"}]))
}

pub fn todo_list() -> Value {
    from_json(json!([
        {"todo": "Learn", "done": true},
        {"todo": "Try", "done": false}
    ]))
}

/// Three levels of nesting with a few untouched siblings
pub fn nested_state() -> Value {
    from_json(json!({
        "user": {"profile": {"name": "ann", "tags": ["a", "b"]}, "settings": {"theme": "dark"}},
        "items": [{"id": 1}, {"id": 2}, {"id": 3}],
        "meta": {"version": 1}
    }))
}

fn contents(value: &Value) -> Option<Node> {
    match value {
        Value::Node(node) => Some(node.clone()),
        Value::Draft(handle) => handle.latest().ok(),
        _ => None,
    }
}

/// Shallow patch generator driven by each draft's assignment record
#[derive(Debug, Default)]
pub struct RecordingPatches {
    visited: Mutex<Vec<PatchPath>>,
}

impl RecordingPatches {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Paths of every draft reported by the finalizer, in order
    pub fn visited(&self) -> Vec<PatchPath> {
        self.visited.lock().clone()
    }
}

impl PatchGenerator for RecordingPatches {
    fn generate_patches(&self, draft: &DraftView, path: &PatchPath, patches: &mut Vec<Patch>, inverse: &mut Vec<Patch>) {
        self.visited.lock().push(path.clone());
        let base = contents(&draft.base);
        for (key, assignment) in &draft.assigned {
            let at = path.child(key.clone());
            let before = base.as_ref().and_then(|b| b.get(key.clone()));
            let after = draft.copy.as_ref().and_then(|c| c.get(key.clone()));
            match (assignment, before, after) {
                (Assignment::Added, Some(before), Some(after)) => {
                    patches.push(Patch::replace(at.clone(), after));
                    inverse.push(Patch::replace(at, before));
                }
                (Assignment::Added, None, Some(after)) => {
                    patches.push(Patch::add(at.clone(), after));
                    inverse.push(Patch::remove(at));
                }
                (Assignment::Deleted, Some(before), _) => {
                    patches.push(Patch::remove(at.clone()));
                    inverse.push(Patch::add(at, before));
                }
                _ => {}
            }
        }
    }

    fn generate_replacement_patches(
        &self,
        base: &Value,
        result: Option<&Value>,
        patches: &mut Vec<Patch>,
        inverse: &mut Vec<Patch>,
    ) {
        match result {
            Some(value) => patches.push(Patch::replace(PatchPath::root(), value.clone())),
            None => patches.push(Patch::remove(PatchPath::root())),
        }
        inverse.push(Patch::replace(PatchPath::root(), base.clone()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimEvent {
    Created { nested: bool },
    WillFinalize { replaced: bool },
    Changed(DraftHandle),
}

/// Compatibility shim that registers drafts normally and logs every hook
#[derive(Debug, Default)]
pub struct RecordingShim {
    events: Mutex<Vec<ShimEvent>>,
}

impl RecordingShim {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ShimEvent> {
        self.events.lock().clone()
    }
}

impl CompatShim for RecordingShim {
    fn create_draft(&self, base: &Value, parent: Option<DraftHandle>) -> Result<DraftHandle, DraftError> {
        self.events.lock().push(ShimEvent::Created {
            nested: parent.is_some(),
        });
        register_draft(base, parent)
    }

    fn will_finalize(&self, _scope: Scope, _outcome: &Outcome, replaced: bool) {
        self.events.lock().push(ShimEvent::WillFinalize { replaced });
    }

    fn mark_changed(&self, draft: DraftHandle) {
        self.events.lock().push(ShimEvent::Changed(draft));
    }
}

/// Container drafter that treats maps and sets like keyed records
#[derive(Debug, Default)]
pub struct PassthroughContainers {
    created: Mutex<Vec<NodeKind>>,
}

impl PassthroughContainers {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> Vec<NodeKind> {
        self.created.lock().clone()
    }
}

impl ContainerDrafter for PassthroughContainers {
    fn create_draft(&self, base: &Value, parent: Option<DraftHandle>) -> Result<DraftHandle, DraftError> {
        let handle = register_draft(base, parent)?;
        self.created.lock().push(handle.kind()?);
        Ok(handle)
    }
}

pub fn patch_producer(generator: Arc<RecordingPatches>) -> Producer {
    Producer::new().with_plugins(Plugins::new().with_patches(generator))
}

pub fn compat_producer(shim: Arc<RecordingShim>) -> Producer {
    Producer::with_config(EngineConfig::new().with_interception(InterceptionMode::Compat))
        .with_plugins(Plugins::new().with_compat(shim))
}

pub fn container_producer(drafter: Arc<PassthroughContainers>) -> Producer {
    Producer::new().with_plugins(
        Plugins::new()
            .with_container(NodeKind::Map, drafter.clone())
            .with_container(NodeKind::Set, drafter),
    )
}

pub fn unfrozen_producer() -> Producer {
    Producer::with_config(EngineConfig::new().with_auto_freeze(false))
}
