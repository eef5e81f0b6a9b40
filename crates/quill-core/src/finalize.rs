//! Finalizer: turns a session's draft tree into committed values
//!
//! # Core Concepts
//!
//! - **Reuse**: a draft that was never modified resolves to its base, so
//!   untouched subtrees keep their identity
//! - **Promote**: a modified draft resolves to its working copy once every
//!   child has been resolved
//! - **Isolation**: drafts of another session are left exactly as found,
//!   and their presence disables auto-freeze for this session
//! - **Idempotence**: a draft is walked at most once; later visits return
//!   the same copy

use crate::config::InterceptionMode;
use crate::draft::{prepare_copy, DraftHandle};
use crate::error::DraftError;
use crate::freeze::maybe_freeze;
use crate::patch::{DraftView, Patch, PatchGenerator};
use crate::path::PatchPath;
use crate::producer::Outcome;
use crate::runtime::{self, ScopeId};
use crate::scope::{PatchRecorder, Scope};
use crate::value::{is_draftable, Node, NodeKind, PropKey, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Result of a finished session
pub(crate) struct Finalized {
    pub(crate) value: Option<Value>,
    pub(crate) patches: Option<(Vec<Patch>, Vec<Patch>)>,
}

/// Finalize `outcome` for `scope`, then revoke the scope whatever happened.
pub(crate) fn process(outcome: &Outcome, scope: ScopeId) -> Result<Finalized, DraftError> {
    let result = resolve_outcome(outcome, scope);
    let recorder = runtime::with(|rt| rt.scope_mut(scope).ok().and_then(|state| state.patches.take()));
    Scope(scope).revoke();

    let value = result?;
    let patches = recorder.map(|PatchRecorder { patches, inverse, listener }| {
        if let Some(listener) = listener {
            listener(&patches, &inverse);
        }
        (patches, inverse)
    });
    Ok(Finalized { value, patches })
}

fn resolve_outcome(outcome: &Outcome, scope: ScopeId) -> Result<Option<Value>, DraftError> {
    let (root, shared, drafts) = runtime::with(|rt| {
        let state = rt.scope_mut(scope)?;
        state.unfinalized = state.drafts.len();
        let root = state.drafts.first().copied().ok_or(DraftError::EmptySession)?;
        Ok::<_, DraftError>((DraftHandle(root), state.shared.clone(), state.drafts.len()))
    })?;

    let replaced = match outcome {
        Outcome::Commit => false,
        Outcome::Replace(Value::Draft(handle)) => *handle != root,
        Outcome::Replace(_) | Outcome::Nothing => true,
    };
    if shared.config.interception == InterceptionMode::Compat {
        shared.plugins.compat()?.will_finalize(Scope(scope), outcome, replaced);
    }

    let mut walk = Walk::new(scope);
    if !replaced {
        let value = walk.finalize(&Value::Draft(root), Some(&PatchPath::root()))?;
        debug!(scope = ?scope, drafts, "session committed");
        return Ok(Some(value));
    }

    let (root_modified, root_base, top_level) = runtime::with(|rt| {
        let state = rt.draft(root.0)?;
        Ok::<_, DraftError>((state.modified, state.base.clone(), rt.scope(scope)?.parent.is_none()))
    })?;
    if root_modified {
        return Err(DraftError::ConflictingCommit);
    }

    let value = match outcome {
        Outcome::Replace(value) if is_draftable(value) => {
            let value = walk.finalize(value, None)?;
            if top_level {
                maybe_freeze(scope, &value, false);
            }
            Some(value)
        }
        Outcome::Replace(value) => Some(value.clone()),
        Outcome::Commit | Outcome::Nothing => None,
    };
    record(scope, |generator, patches, inverse| {
        generator.generate_replacement_patches(&root_base, value.as_ref(), patches, inverse);
    })?;
    debug!(scope = ?scope, drafts, dropped = value.is_none(), "session replaced its root");
    Ok(value)
}

struct Walk {
    scope: ScopeId,
    visiting: HashSet<usize>,
}

impl Walk {
    fn new(scope: ScopeId) -> Self {
        Self {
            scope,
            visiting: HashSet::new(),
        }
    }

    fn finalize(&mut self, value: &Value, path: Option<&PatchPath>) -> Result<Value, DraftError> {
        match value {
            Value::Draft(handle) => self.finalize_draft(*handle, path),
            Value::Node(node) if !node.is_frozen() && node.is_draftable() => {
                if !self.visiting.insert(node.addr()) {
                    return Err(DraftError::CircularReference);
                }
                for (key, child) in node.entries() {
                    self.finalize_property(None, node, key, child, path)?;
                }
                self.visiting.remove(&node.addr());
                Ok(value.clone())
            }
            _ => Ok(value.clone()),
        }
    }

    fn finalize_draft(&mut self, handle: DraftHandle, path: Option<&PatchPath>) -> Result<Value, DraftError> {
        let scope = self.scope;
        let step = runtime::with(|rt| {
            let state = rt.draft(handle.0)?;
            if state.scope != scope {
                return Ok(Step::Foreign);
            }
            if !state.modified {
                return Ok(Step::Reuse(state.base.clone()));
            }
            if state.finalized {
                return Ok(Step::Done(prepare_copy(rt, handle.0)?));
            }
            let copy = prepare_copy(rt, handle.0)?;
            rt.draft_mut(handle.0)?.finalized = true;
            let scope_state = rt.scope_mut(scope)?;
            scope_state.unfinalized = scope_state.unfinalized.saturating_sub(1);
            Ok::<_, DraftError>(Step::Walk(copy))
        })?;

        let copy = match step {
            Step::Foreign => return Ok(Value::Draft(handle)),
            Step::Reuse(base) => {
                maybe_freeze(scope, &base, true);
                return Ok(base);
            }
            Step::Done(copy) => return Ok(Value::Node(copy)),
            Step::Walk(copy) => copy,
        };

        self.visiting.insert(copy.addr());
        for (key, child) in copy.entries() {
            self.finalize_property(Some(handle), &copy, key, child, path)?;
        }
        self.visiting.remove(&copy.addr());

        let result = Value::Node(copy);
        maybe_freeze(scope, &result, false);
        if let Some(path) = path {
            if is_recording(scope) {
                let view = runtime::with(|rt| {
                    let state = rt.draft(handle.0)?;
                    Ok::<_, DraftError>(DraftView {
                        handle,
                        kind: state.kind,
                        base: state.base.clone(),
                        copy: state.copy.clone(),
                        assigned: state.assigned.clone(),
                    })
                })?;
                record(scope, |generator, patches, inverse| {
                    generator.generate_patches(&view, path, patches, inverse);
                })?;
            }
        }
        Ok(result)
    }

    fn finalize_property(
        &mut self,
        parent: Option<DraftHandle>,
        target: &Node,
        key: PropKey,
        child: Value,
        root_path: Option<&PatchPath>,
    ) -> Result<(), DraftError> {
        if child.as_node().is_some_and(|node| Node::ptr_eq(node, target)) {
            return Err(DraftError::CircularReference);
        }

        if let Value::Draft(handle) = child {
            let path = match (root_path, parent) {
                (Some(root_path), Some(parent)) => runtime::with(|rt| {
                    let state = rt.draft(parent.0)?;
                    let tracked = state.kind != NodeKind::Set && !state.assigned.contains_key(&key);
                    Ok::<_, DraftError>(tracked.then(|| root_path.child(key.clone())))
                })?,
                _ => None,
            };
            let resolved = self.finalize(&Value::Draft(handle), path.as_ref())?;
            target.insert(key, resolved.clone())?;
            if resolved.is_draft() {
                runtime::with(|rt| {
                    if let Ok(state) = rt.scope_mut(self.scope) {
                        state.can_auto_freeze = false;
                    }
                });
                warn!(scope = ?self.scope, draft = ?handle, "nested session draft escaped; auto-freeze disabled");
            }
            return Ok(());
        }

        if !is_draftable(&child) || child.is_frozen() {
            return Ok(());
        }
        let (auto_freeze, unfinalized, top_level) = runtime::with(|rt| {
            let state = rt.scope(self.scope)?;
            Ok::<_, DraftError>((state.shared.config.auto_freeze, state.unfinalized, state.parent.is_none()))
        })?;
        if !auto_freeze && unfinalized < 1 {
            return Ok(());
        }
        self.finalize(&child, None)?;
        if parent.is_none() || top_level {
            maybe_freeze(self.scope, &child, false);
        }
        Ok(())
    }
}

enum Step {
    Foreign,
    Reuse(Value),
    Done(Node),
    Walk(Node),
}

fn is_recording(scope: ScopeId) -> bool {
    runtime::with(|rt| rt.scope(scope).is_ok_and(|state| state.patches.is_some()))
}

/// Run the patch generator against the scope's recorder, outside any
/// runtime borrow; a scope that is not recording is skipped.
fn record(
    scope: ScopeId,
    generate: impl FnOnce(&dyn PatchGenerator, &mut Vec<Patch>, &mut Vec<Patch>),
) -> Result<(), DraftError> {
    let (recorder, shared) = runtime::with(|rt| {
        let state = rt.scope_mut(scope)?;
        Ok::<_, DraftError>((state.patches.take(), state.shared.clone()))
    })?;
    let Some(mut recorder) = recorder else {
        return Ok(());
    };
    let generated = shared.plugins.patches().map(|generator| {
        generate(generator.as_ref(), &mut recorder.patches, &mut recorder.inverse);
    });
    runtime::with(|rt| {
        if let Ok(state) = rt.scope_mut(scope) {
            state.patches = Some(recorder);
        }
    });
    generated
}
