//! Draft sessions
//!
//! # Core Concepts
//!
//! - **Scope**: one mutation session; owns every draft created while it
//!   was current, in creation order
//! - **Stack**: scopes link to the scope that was current when they were
//!   entered; leaving restores it
//! - **Revocation**: freeing a scope frees all of its drafts, after which
//!   every handle to them fails with [`DraftError::Revoked`]
//!
//! # Example
//!
//! ```rust,ignore
//! let scope = Scope::enter(&producer);
//! let root = register_draft(&base, None)?;
//! // ... mutate through `root` ...
//! scope.leave();
//! scope.revoke();
//! ```

use crate::draft::DraftHandle;
use crate::error::DraftError;
use crate::patch::Patch;
use crate::producer::{Producer, Shared};
use crate::runtime::{self, DraftId, ScopeId};
use std::sync::Arc;
use tracing::debug;

/// Receives the patches and inverse patches of a finished session
pub type PatchListener = Box<dyn FnOnce(&[Patch], &[Patch])>;

pub(crate) struct PatchRecorder {
    pub(crate) patches: Vec<Patch>,
    pub(crate) inverse: Vec<Patch>,
    pub(crate) listener: Option<PatchListener>,
}

pub(crate) struct ScopeState {
    pub(crate) parent: Option<ScopeId>,
    pub(crate) drafts: Vec<DraftId>,
    pub(crate) can_auto_freeze: bool,
    pub(crate) unfinalized: usize,
    pub(crate) patches: Option<PatchRecorder>,
    pub(crate) shared: Arc<Shared>,
}

/// Handle to a draft session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope(pub(crate) ScopeId);

impl Scope {
    /// Start a session for `producer` and make it current
    #[must_use]
    pub fn enter(producer: &Producer) -> Scope {
        Self::enter_shared(producer.shared())
    }

    pub(crate) fn enter_shared(shared: Arc<Shared>) -> Scope {
        runtime::with(|rt| {
            let parent = rt.current;
            let id = rt.scopes.alloc(ScopeState {
                parent,
                drafts: Vec::new(),
                can_auto_freeze: true,
                unfinalized: 0,
                patches: None,
                shared,
            });
            rt.current = Some(id);
            debug!(scope = ?id, nested = parent.is_some(), "session entered");
            Scope(id)
        })
    }

    /// The session drafts are currently created in
    ///
    /// # Errors
    /// Returns [`DraftError::NoActiveSession`] outside any session.
    pub fn current() -> Result<Scope, DraftError> {
        runtime::with(|rt| rt.current_scope().map(Scope))
    }

    /// Restore the enclosing session if this one is current; otherwise a no-op
    pub fn leave(self) {
        runtime::with(|rt| {
            if rt.current != Some(self.0) {
                return;
            }
            rt.current = rt
                .scopes
                .get(self.0)
                .and_then(|scope| scope.parent)
                .filter(|parent| rt.scopes.contains(*parent));
            debug!(scope = ?self.0, "session left");
        });
    }

    /// Leave, then invalidate every draft of this session and the session itself
    pub fn revoke(self) {
        self.leave();
        runtime::with(|rt| {
            let Some(scope) = rt.scopes.free(self.0) else {
                return;
            };
            for id in &scope.drafts {
                rt.drafts.free(*id);
            }
            debug!(
                scope = ?self.0,
                drafts = scope.drafts.len(),
                live_drafts = rt.drafts.len(),
                "session revoked"
            );
        });
    }

    pub(crate) fn guard(self) -> ScopeGuard {
        ScopeGuard(Some(self))
    }

    /// Record patches for this session
    ///
    /// With a listener, patches are handed to it once the session is
    /// finalized; without one they are only returned to the caller.
    ///
    /// # Errors
    /// Fails with [`DraftError::PluginNotLoaded`] when the producer has no
    /// patch generator, or [`DraftError::Revoked`] for a finished session.
    pub fn use_patches(self, listener: Option<PatchListener>) -> Result<(), DraftError> {
        runtime::with(|rt| {
            let scope = rt.scope_mut(self.0)?;
            scope.shared.plugins.patches()?;
            scope.patches = Some(PatchRecorder {
                patches: Vec::new(),
                inverse: Vec::new(),
                listener,
            });
            Ok(())
        })
    }

    /// Session that was current when this one was entered
    ///
    /// # Errors
    /// Fails when the session was revoked.
    pub fn parent(self) -> Result<Option<Scope>, DraftError> {
        runtime::with(|rt| Ok(rt.scope(self.0)?.parent.map(Scope)))
    }

    /// Whether finalized values of this session may still be frozen
    ///
    /// # Errors
    /// Fails when the session was revoked.
    pub fn can_auto_freeze(self) -> Result<bool, DraftError> {
        runtime::with(|rt| Ok(rt.scope(self.0)?.can_auto_freeze))
    }

    /// Drafts created in this session, in creation order
    ///
    /// # Errors
    /// Fails when the session was revoked.
    pub fn drafts(self) -> Result<Vec<DraftHandle>, DraftError> {
        runtime::with(|rt| Ok(rt.scope(self.0)?.drafts.iter().copied().map(DraftHandle).collect()))
    }

    /// Number of drafts created in this session
    ///
    /// # Errors
    /// Fails when the session was revoked.
    pub fn draft_count(self) -> Result<usize, DraftError> {
        runtime::with(|rt| Ok(rt.scope(self.0)?.drafts.len()))
    }

    /// Drafts not yet finalized in the running finalize pass
    ///
    /// # Errors
    /// Fails when the session was revoked.
    pub fn unfinalized(self) -> Result<usize, DraftError> {
        runtime::with(|rt| Ok(rt.scope(self.0)?.unfinalized))
    }

    /// Check the session has not been revoked
    #[must_use]
    pub fn is_active(self) -> bool {
        runtime::with(|rt| rt.scopes.contains(self.0))
    }

    /// Check this is the current session
    #[must_use]
    pub fn is_current(self) -> bool {
        runtime::with(|rt| rt.current == Some(self.0))
    }
}

/// Revokes its session when dropped, including while a recipe unwinds
pub(crate) struct ScopeGuard(Option<Scope>);

impl ScopeGuard {
    /// Keep the session alive past the guard
    pub(crate) fn disarm(mut self) -> Option<Scope> {
        self.0.take()
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let Some(scope) = self.0.take() else {
            return;
        };
        if !runtime::is_available() {
            return;
        }
        if std::thread::panicking() {
            debug!(scope = ?scope.0, "session revoked while unwinding");
        }
        scope.revoke();
    }
}
