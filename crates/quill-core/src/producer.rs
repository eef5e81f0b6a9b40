//! Entry API
//!
//! # Core Concepts
//!
//! - **Producer**: engine instance holding an [`EngineConfig`] and a
//!   [`Plugins`] registry; cheap to clone
//! - **Recipe**: closure receiving the root draft and returning an
//!   [`Outcome`]
//! - **Manual drafts**: [`Producer::create_draft`] and
//!   [`Producer::finish_draft`] split one session across two calls
//!
//! # Example
//!
//! ```rust,ignore
//! let producer = Producer::new();
//! let next = producer.produce(todos, |draft| {
//!     let todos = draft.as_array_draft()?;
//!     todos.push(Node::object_from([("todo", "Tweet")]))?;
//!     todos.get_object(1)?.set("done", true)?;
//!     Ok(())
//! })?;
//! ```

use crate::config::EngineConfig;
use crate::draft::{self, DraftHandle};
use crate::error::DraftError;
use crate::finalize;
use crate::patch::Patch;
use crate::plugins::Plugins;
use crate::runtime;
use crate::scope::{PatchListener, Scope};
use crate::value::{is_draftable, Value};
use std::sync::Arc;
use tracing::debug;

/// What a recipe commits
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Outcome {
    /// Commit the root draft as mutated
    #[default]
    Commit,
    /// Commit this value instead; returning the root draft itself is a commit
    Replace(Value),
    /// Commit the absence of a value
    Nothing,
}

impl From<()> for Outcome {
    fn from((): ()) -> Self {
        Self::Commit
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Self::Replace(value)
    }
}

/// Result of [`Producer::produce_with_patches`]
#[derive(Debug, Clone, PartialEq)]
pub struct Produced {
    /// Committed value, `None` for [`Outcome::Nothing`]
    pub value: Option<Value>,
    /// Changes from base to value
    pub patches: Vec<Patch>,
    /// Changes from value back to base
    pub inverse_patches: Vec<Patch>,
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) config: EngineConfig,
    pub(crate) plugins: Plugins,
}

/// Draft engine instance
#[derive(Debug, Clone)]
pub struct Producer {
    shared: Arc<Shared>,
}

impl Producer {
    /// Producer with default configuration and no plugins
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Producer with a configuration
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                plugins: Plugins::new(),
            }),
        }
    }

    /// Replace the plugin registry
    #[must_use]
    pub fn with_plugins(self, plugins: Plugins) -> Self {
        Self {
            shared: Arc::new(Shared {
                config: self.shared.config,
                plugins,
            }),
        }
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Installed plugins
    #[inline]
    #[must_use]
    pub fn plugins(&self) -> &Plugins {
        &self.shared.plugins
    }

    pub(crate) fn shared(&self) -> Arc<Shared> {
        Arc::clone(&self.shared)
    }

    /// Run `recipe` against a draft of `base` and commit the result
    ///
    /// Non-draftable bases are handed to the recipe as they are.
    ///
    /// # Errors
    /// Propagates recipe failures (after revoking the session) and every
    /// usage error raised while drafting or finalizing.
    pub fn produce<F, O>(&self, base: impl Into<Value>, recipe: F) -> Result<Option<Value>, DraftError>
    where
        F: FnOnce(Value) -> Result<O, DraftError>,
        O: Into<Outcome>,
    {
        let base = base.into();
        if !is_draftable(&base) {
            return self.produce_primitive(base, recipe);
        }
        Ok(self.run(base, recipe, false)?.value)
    }

    /// Like [`Producer::produce`], also returning patches and inverse patches
    ///
    /// # Errors
    /// Fails with [`DraftError::PluginNotLoaded`] without a patch generator,
    /// and otherwise as [`Producer::produce`].
    pub fn produce_with_patches<F, O>(&self, base: impl Into<Value>, recipe: F) -> Result<Produced, DraftError>
    where
        F: FnOnce(Value) -> Result<O, DraftError>,
        O: Into<Outcome>,
    {
        let generator = Arc::clone(self.plugins().patches()?);
        let base = base.into();
        if !is_draftable(&base) {
            let value = self.produce_primitive(base.clone(), recipe)?;
            let (mut patches, mut inverse_patches) = (Vec::new(), Vec::new());
            generator.generate_replacement_patches(&base, value.as_ref(), &mut patches, &mut inverse_patches);
            return Ok(Produced {
                value,
                patches,
                inverse_patches,
            });
        }

        let finalized = self.run(base, recipe, true)?;
        let (patches, inverse_patches) = finalized.patches.unwrap_or_default();
        Ok(Produced {
            value: finalized.value,
            patches,
            inverse_patches,
        })
    }

    fn produce_primitive<F, O>(&self, base: Value, recipe: F) -> Result<Option<Value>, DraftError>
    where
        F: FnOnce(Value) -> Result<O, DraftError>,
        O: Into<Outcome>,
    {
        let outcome: Outcome = recipe(base.clone())?.into();
        let value = match outcome {
            Outcome::Commit => Some(base),
            Outcome::Replace(value) => Some(value),
            Outcome::Nothing => None,
        };
        if self.shared.config.auto_freeze {
            if let Some(value) = &value {
                value.freeze(true);
            }
        }
        Ok(value)
    }

    fn run<F, O>(&self, base: Value, recipe: F, record: bool) -> Result<finalize::Finalized, DraftError>
    where
        F: FnOnce(Value) -> Result<O, DraftError>,
        O: Into<Outcome>,
    {
        let scope = Scope::enter_shared(self.shared());
        let _guard = scope.guard();
        let root = if record {
            scope.use_patches(None).and_then(|()| draft::create_draft(&base, None))
        } else {
            draft::create_draft(&base, None)
        }?;

        let outcome: Outcome = match recipe(Value::Draft(root)) {
            Ok(outcome) => outcome.into(),
            Err(err) => {
                debug!(scope = ?scope.0, error = %err, "recipe failed; session revoked");
                return Err(err);
            }
        };
        scope.leave();
        finalize::process(&outcome, scope.0)
    }

    /// Draft that outlives this call; commit it with [`Producer::finish_draft`]
    ///
    /// # Errors
    /// Fails when `base` is not draftable or a required plugin is missing.
    pub fn create_draft(&self, base: impl Into<Value>) -> Result<DraftHandle, DraftError> {
        let base = base.into();
        if !is_draftable(&base) {
            return Err(DraftError::kind_mismatch("draftable value", base.kind_name()));
        }
        let scope = Scope::enter_shared(self.shared());
        let guard = scope.guard();
        let handle = draft::create_draft(&base, None)?;
        scope.leave();
        runtime::with(|rt| rt.draft_mut(handle.0).map(|state| state.manual = true))?;
        guard.disarm();
        debug!(scope = ?scope.0, draft = ?handle, "manual draft created");
        Ok(handle)
    }

    /// Finalize a draft made by [`Producer::create_draft`]
    ///
    /// The draft is finalized by the session it was created in, which also
    /// decides the freeze policy.
    ///
    /// # Errors
    /// - [`DraftError::NotManualDraft`] for drafts created by a recipe
    /// - [`DraftError::AlreadyFinalized`] for drafts that were already
    ///   finished (and are therefore no longer live)
    /// - [`DraftError::PluginNotLoaded`] when a listener is given without a
    ///   patch generator
    pub fn finish_draft(&self, draft: DraftHandle, listener: Option<PatchListener>) -> Result<Option<Value>, DraftError> {
        let scope = runtime::with(|rt| {
            let state = rt.draft(draft.0).map_err(|_| DraftError::AlreadyFinalized)?;
            if !state.manual {
                return Err(DraftError::NotManualDraft);
            }
            if state.finalized {
                return Err(DraftError::AlreadyFinalized);
            }
            Ok(Scope(state.scope))
        })?;
        if let Some(listener) = listener {
            scope.use_patches(Some(listener))?;
        }
        Ok(finalize::process(&Outcome::Commit, scope.0)?.value)
    }
}

impl Default for Producer {
    fn default() -> Self {
        Self::new()
    }
}

/// Check whether a value is a live draft handle
#[inline]
#[must_use]
pub fn is_draft(value: &Value) -> bool {
    value.as_draft().is_some_and(|handle| !handle.is_revoked())
}

/// Base value behind a draft
///
/// # Errors
/// Fails when `value` is not a draft or the draft was revoked.
pub fn original(value: &Value) -> Result<Value, DraftError> {
    match value {
        Value::Draft(handle) => handle.original(),
        other => Err(DraftError::kind_mismatch("draft", other.kind_name())),
    }
}
