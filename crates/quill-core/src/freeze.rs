//! Freeze policy
//!
//! A finalized value is frozen only when the producer has auto-freeze on
//! and the session has not seen a nested draft escape into its result.

use crate::runtime::{self, ScopeId};
use crate::value::Value;

/// Freeze `value` if the session's policy allows it.
pub(crate) fn maybe_freeze(scope: ScopeId, value: &Value, deep: bool) {
    let allowed = runtime::with(|rt| {
        rt.scope(scope)
            .is_ok_and(|state| state.shared.config.auto_freeze && state.can_auto_freeze)
    });
    if allowed {
        value.freeze(deep);
    }
}
