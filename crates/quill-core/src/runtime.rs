//! Per-thread draft runtime
//!
//! Holds the draft and scope arenas plus the "current session" slot.
//! Sessions are stack-scoped to a call chain, so one runtime per thread is
//! enough and no global mutable state exists.
//!
//! The runtime is borrowed only for short, non-reentrant sections: callers
//! must release it before running recipes, accessors or plugins.

use crate::arena::{Arena, Key};
use crate::draft::DraftState;
use crate::error::DraftError;
use crate::scope::ScopeState;
use std::cell::RefCell;

pub(crate) type DraftId = Key<DraftState>;
pub(crate) type ScopeId = Key<ScopeState>;

#[derive(Default)]
pub(crate) struct Runtime {
    pub(crate) drafts: Arena<DraftState>,
    pub(crate) scopes: Arena<ScopeState>,
    pub(crate) current: Option<ScopeId>,
}

thread_local! {
    static RUNTIME: RefCell<Runtime> = RefCell::new(Runtime::default());
}

/// Run `f` with exclusive access to this thread's runtime.
pub(crate) fn with<R>(f: impl FnOnce(&mut Runtime) -> R) -> R {
    RUNTIME.with(|cell| f(&mut cell.borrow_mut()))
}

/// Whether the runtime can be borrowed right now
///
/// False while it is already borrowed and once the thread has started
/// destroying its locals.
pub(crate) fn is_available() -> bool {
    RUNTIME.try_with(|cell| cell.try_borrow_mut().is_ok()).unwrap_or(false)
}

impl Runtime {
    pub(crate) fn draft(&self, id: DraftId) -> Result<&DraftState, DraftError> {
        self.drafts.get(id).ok_or(DraftError::Revoked)
    }

    pub(crate) fn draft_mut(&mut self, id: DraftId) -> Result<&mut DraftState, DraftError> {
        self.drafts.get_mut(id).ok_or(DraftError::Revoked)
    }

    pub(crate) fn scope(&self, id: ScopeId) -> Result<&ScopeState, DraftError> {
        self.scopes.get(id).ok_or(DraftError::Revoked)
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> Result<&mut ScopeState, DraftError> {
        self.scopes.get_mut(id).ok_or(DraftError::Revoked)
    }

    pub(crate) fn current_scope(&self) -> Result<ScopeId, DraftError> {
        self.current.ok_or(DraftError::NoActiveSession)
    }
}
