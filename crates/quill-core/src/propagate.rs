//! Change propagation
//!
//! Marking a draft modified marks every ancestor too. The walk stops at the
//! first ancestor that is already modified, so only the first write in a
//! subtree pays for the climb.

use crate::config::InterceptionMode;
use crate::draft::DraftHandle;
use crate::error::DraftError;
use crate::runtime::{self, DraftId, Runtime};
use tracing::trace;

/// Set `modified` on `id` and its ancestors; returns the drafts newly dirtied.
pub(crate) fn mark_changed(rt: &mut Runtime, id: DraftId) -> Result<Vec<DraftId>, DraftError> {
    let mut dirtied = Vec::new();
    let mut next = Some(id);
    while let Some(current) = next {
        let state = rt.draft_mut(current)?;
        if state.modified {
            break;
        }
        state.modified = true;
        dirtied.push(current);
        next = state.parent;
    }
    if !dirtied.is_empty() {
        trace!(draft = ?id, depth = dirtied.len(), "marked modified");
    }
    Ok(dirtied)
}

/// Forward newly dirtied drafts to the compatibility shim, if it is in use.
///
/// Must be called outside any runtime borrow.
pub(crate) fn notify(origin: DraftHandle, dirtied: &[DraftId]) -> Result<(), DraftError> {
    if dirtied.is_empty() {
        return Ok(());
    }
    let shared = runtime::with(|rt| {
        let scope = rt.draft(origin.0)?.scope;
        Ok::<_, DraftError>(rt.scope(scope)?.shared.clone())
    })?;
    if shared.config.interception != InterceptionMode::Compat {
        return Ok(());
    }
    let shim = shared.plugins.compat()?;
    for id in dirtied {
        shim.mark_changed(DraftHandle(*id));
    }
    Ok(())
}
