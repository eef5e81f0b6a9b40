//! Read, write and delete contracts shared by every draft facade
//!
//! Each operation takes short runtime borrows and releases them before
//! running inherited accessors, plugins or child draft creation, so user
//! code invoked from here may freely touch other drafts.

use super::{create_draft, latest, peek, prepare_copy, resolve_source, Assignment, DraftHandle, ObjectDraft};
use crate::error::DraftError;
use crate::propagate;
use crate::runtime::{self, DraftId, Runtime};
use crate::value::{array_length, is_draftable, same_value, Inherited, Node, NodeKind, PropKey, Value};

/// Read contract: lazily draft children that still equal their base value.
pub(super) fn read(handle: DraftHandle, key: PropKey) -> Result<Value, DraftError> {
    let id = handle.0;
    let (kind, source, finalized) = runtime::with(|rt| {
        let state = rt.draft(id)?;
        Ok::<_, DraftError>((state.kind, latest(rt, id)?, state.finalized))
    })?;
    let key = key.normalize(kind)?;

    let Some(value) = source.get(key.clone()) else {
        return read_inherited(handle, &source, &key);
    };
    if finalized || !is_draftable(&value) {
        return Ok(value);
    }

    let untouched = runtime::with(|rt| {
        let base = rt.draft(id)?.base.clone();
        Ok::<_, DraftError>(peek(rt, &base, &key)?.is_some_and(|original| same_value(&original, &value)))
    })?;
    if !untouched {
        return Ok(value);
    }

    let child = create_draft(&value, Some(id))?;
    runtime::with(|rt| {
        let copy = prepare_copy(rt, id)?;
        copy.insert(key, Value::Draft(child))?;
        Ok(Value::Draft(child))
    })
}

fn read_inherited(handle: DraftHandle, source: &Node, key: &PropKey) -> Result<Value, DraftError> {
    let (PropKey::Name(name), Some(proto)) = (key, source.prototype()) else {
        return Ok(Value::Null);
    };
    match proto.lookup(name) {
        Some(Inherited::Data(value)) => Ok(value.clone()),
        Some(Inherited::Accessor { get: Some(get), .. }) => get(&ObjectDraft::from_handle(handle)),
        _ => Ok(Value::Null),
    }
}

/// Write contract: record the change unless it writes back what is already there.
pub(super) fn write(handle: DraftHandle, key: PropKey, value: Value) -> Result<(), DraftError> {
    let id = handle.0;
    let (kind, source) = runtime::with(|rt| {
        let state = rt.draft(id)?;
        Ok::<_, DraftError>((state.kind, latest(rt, id)?))
    })?;
    let key = key.normalize(kind)?;
    if kind == NodeKind::Array && key.is_length() {
        array_length(&value)?;
    }

    if let PropKey::Name(name) = &key {
        if let Some(setter) = source.prototype().and_then(|proto| proto.setter(name)) {
            return setter(&ObjectDraft::from_handle(handle), value);
        }
    }

    let dirtied = runtime::with(|rt| write_slot(rt, id, key, value))?;
    propagate::notify(handle, &dirtied)
}

fn write_slot(rt: &mut Runtime, id: DraftId, key: PropKey, value: Value) -> Result<Vec<DraftId>, DraftError> {
    let mut dirtied = Vec::new();
    if !rt.draft(id)?.modified {
        let current = latest(rt, id)?.get(key.clone());
        if let Some(Value::Draft(child)) = &current {
            let restores_base = rt
                .draft(child.0)
                .is_ok_and(|child| same_value(&child.base, &value));
            if restores_base {
                prepare_copy(rt, id)?.insert(key.clone(), value)?;
                rt.draft_mut(id)?.assigned.insert(key, Assignment::Unchanged);
                return Ok(dirtied);
            }
        }
        if current.is_some_and(|current| same_value(&value, &current)) {
            return Ok(dirtied);
        }
        prepare_copy(rt, id)?;
        dirtied = propagate::mark_changed(rt, id)?;
    }

    let copy = prepare_copy(rt, id)?;
    if !value.is_number() && copy.get(key.clone()).is_some_and(|held| same_value(&held, &value)) {
        return Ok(dirtied);
    }
    copy.insert(key.clone(), value)?;
    rt.draft_mut(id)?.assigned.insert(key, Assignment::Added);
    Ok(dirtied)
}

/// Delete contract: keys the base never had leave no trace.
pub(super) fn remove(handle: DraftHandle, key: PropKey) -> Result<(), DraftError> {
    let id = handle.0;
    let dirtied = runtime::with(|rt| {
        let state = rt.draft(id)?;
        let key = key.normalize(state.kind)?;
        if state.kind == NodeKind::Array && key.is_length() {
            return Err(DraftError::UnsupportedOperation("delete array length"));
        }

        let base = state.base.clone();
        let on_base = resolve_source(rt, &base)?.is_some_and(|node| node.contains_key(key.clone()));
        let mut dirtied = Vec::new();
        if on_base {
            rt.draft_mut(id)?.assigned.insert(key.clone(), Assignment::Deleted);
            prepare_copy(rt, id)?;
            dirtied = propagate::mark_changed(rt, id)?;
        } else {
            rt.draft_mut(id)?.assigned.shift_remove(&key);
        }

        if let Some(copy) = &rt.draft(id)?.copy {
            copy.remove(key)?;
        }
        Ok(dirtied)
    })?;
    propagate::notify(handle, &dirtied)
}

/// Own slot on the latest state, or a member inherited from its prototype.
pub(super) fn has(handle: DraftHandle, key: PropKey) -> Result<bool, DraftError> {
    let source = runtime::with(|rt| latest(rt, handle.0))?;
    let key = key.normalize(source.kind())?;
    if source.contains_key(key.clone()) {
        return Ok(true);
    }
    Ok(match (&key, source.prototype()) {
        (PropKey::Name(name), Some(proto)) => proto.lookup(name).is_some(),
        _ => false,
    })
}
