//! Plugin registry
//!
//! Provides [`Plugins`], the per-producer set of optional extensions:
//! a patch generator, a compatibility shim for environments without native
//! interception, and draft builders for container kinds (map, set).
//! A missing plugin is reported as [`DraftError::PluginNotLoaded`] only when
//! a session actually needs it.

use crate::draft::DraftHandle;
use crate::error::DraftError;
use crate::patch::PatchGenerator;
use crate::producer::Outcome;
use crate::scope::Scope;
use crate::value::{NodeKind, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Alternate draft construction for [`crate::InterceptionMode::Compat`]
pub trait CompatShim: Send + Sync {
    /// Create an object or array draft; implementations normally finish by
    /// calling [`crate::register_draft`]
    ///
    /// # Errors
    /// Implementation defined.
    fn create_draft(&self, base: &Value, parent: Option<DraftHandle>) -> Result<DraftHandle, DraftError>;

    /// Called once per session before finalization starts
    fn will_finalize(&self, scope: Scope, outcome: &Outcome, replaced: bool);

    /// Called for each draft newly marked modified
    fn mark_changed(&self, draft: DraftHandle);
}

/// Draft construction for one container kind
pub trait ContainerDrafter: Send + Sync {
    /// Create a draft for a map or set value
    ///
    /// # Errors
    /// Implementation defined.
    fn create_draft(&self, base: &Value, parent: Option<DraftHandle>) -> Result<DraftHandle, DraftError>;
}

/// Registry of optional engine extensions
#[derive(Clone, Default)]
pub struct Plugins {
    patches: Option<Arc<dyn PatchGenerator>>,
    compat: Option<Arc<dyn CompatShim>>,
    containers: HashMap<NodeKind, Arc<dyn ContainerDrafter>>,
}

impl Plugins {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a patch generator
    #[must_use]
    pub fn with_patches(mut self, generator: Arc<dyn PatchGenerator>) -> Self {
        self.patches = Some(generator);
        self
    }

    /// Install a compatibility shim
    #[must_use]
    pub fn with_compat(mut self, shim: Arc<dyn CompatShim>) -> Self {
        self.compat = Some(shim);
        self
    }

    /// Install a drafter for a container kind
    ///
    /// Only [`NodeKind::Map`] and [`NodeKind::Set`] are routed to
    /// container drafters; other kinds are ignored.
    #[must_use]
    pub fn with_container(mut self, kind: NodeKind, drafter: Arc<dyn ContainerDrafter>) -> Self {
        if kind.is_container() {
            self.containers.insert(kind, drafter);
        }
        self
    }

    /// Patch generator
    ///
    /// # Errors
    /// Fails when none is installed.
    pub fn patches(&self) -> Result<&Arc<dyn PatchGenerator>, DraftError> {
        self.patches.as_ref().ok_or(DraftError::PluginNotLoaded("patches"))
    }

    /// Compatibility shim
    ///
    /// # Errors
    /// Fails when none is installed.
    pub fn compat(&self) -> Result<&Arc<dyn CompatShim>, DraftError> {
        self.compat.as_ref().ok_or(DraftError::PluginNotLoaded("compat"))
    }

    /// Drafter for a container kind
    ///
    /// # Errors
    /// Fails when none is installed for `kind`.
    pub fn container(&self, kind: NodeKind) -> Result<&Arc<dyn ContainerDrafter>, DraftError> {
        self.containers.get(&kind).ok_or(match kind {
            NodeKind::Set => DraftError::PluginNotLoaded("set"),
            _ => DraftError::PluginNotLoaded("map"),
        })
    }

    /// Check if a patch generator is installed
    #[inline]
    #[must_use]
    pub fn has_patches(&self) -> bool {
        self.patches.is_some()
    }

    /// Names of installed plugins
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.patches.is_some() {
            names.push("patches");
        }
        if self.compat.is_some() {
            names.push("compat");
        }
        for kind in [NodeKind::Map, NodeKind::Set] {
            if self.containers.contains_key(&kind) {
                names.push(kind.name());
            }
        }
        names
    }
}

impl fmt::Debug for Plugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugins").field("loaded", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoDrafts;

    impl ContainerDrafter for NoDrafts {
        fn create_draft(&self, _base: &Value, _parent: Option<DraftHandle>) -> Result<DraftHandle, DraftError> {
            Err(DraftError::UnsupportedOperation("test drafter"))
        }
    }

    #[test]
    fn missing_plugins_are_reported_by_name() {
        let plugins = Plugins::new();
        assert_eq!(plugins.patches().err(), Some(DraftError::PluginNotLoaded("patches")));
        assert_eq!(plugins.compat().err(), Some(DraftError::PluginNotLoaded("compat")));
        assert_eq!(plugins.container(NodeKind::Map).err(), Some(DraftError::PluginNotLoaded("map")));
        assert_eq!(plugins.container(NodeKind::Set).err(), Some(DraftError::PluginNotLoaded("set")));
    }

    #[test]
    fn only_container_kinds_are_registered() {
        let plugins = Plugins::new()
            .with_container(NodeKind::Map, Arc::new(NoDrafts))
            .with_container(NodeKind::Object, Arc::new(NoDrafts));
        assert!(plugins.container(NodeKind::Map).is_ok());
        assert_eq!(plugins.names(), vec!["map"]);
        assert!(!plugins.has_patches());
    }
}
