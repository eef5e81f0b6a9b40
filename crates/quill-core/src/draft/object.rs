//! Record view over an object draft

use super::{access, ArrayDraft, DraftHandle};
use crate::error::DraftError;
use crate::value::{PropKey, Value};

/// Object draft facade
///
/// Reads of draftable children return drafts; writes and deletes are
/// recorded against the working copy.
///
/// # Example
///
/// ```rust,ignore
/// let user = draft.as_object_draft()?;
/// user.set("name", "tom")?;
/// user.get_object("address")?.set("city", "Paris")?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectDraft(DraftHandle);

impl ObjectDraft {
    pub(crate) fn from_handle(handle: DraftHandle) -> Self {
        Self(handle)
    }

    /// Underlying handle
    #[inline]
    #[must_use]
    pub fn handle(&self) -> DraftHandle {
        self.0
    }

    /// Read a property
    ///
    /// # Errors
    /// Fails when the draft is revoked or an accessor fails.
    pub fn get(&self, key: impl Into<PropKey>) -> Result<Value, DraftError> {
        access::read(self.0, key.into())
    }

    /// Read a property that holds an object, as a draft
    ///
    /// # Errors
    /// Fails when revoked or the property is not a draftable object.
    pub fn get_object(&self, key: impl Into<PropKey>) -> Result<ObjectDraft, DraftError> {
        self.get(key)?.as_object_draft()
    }

    /// Read a property that holds an array, as a draft
    ///
    /// # Errors
    /// Fails when revoked or the property is not a draftable array.
    pub fn get_array(&self, key: impl Into<PropKey>) -> Result<ArrayDraft, DraftError> {
        self.get(key)?.as_array_draft()
    }

    /// Write a property
    ///
    /// # Errors
    /// Fails when the draft is revoked or an accessor fails.
    pub fn set(&self, key: impl Into<PropKey>, value: impl Into<Value>) -> Result<(), DraftError> {
        access::write(self.0, key.into(), value.into())
    }

    /// Delete a property
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn delete(&self, key: impl Into<PropKey>) -> Result<(), DraftError> {
        access::remove(self.0, key.into())
    }

    /// Check for an own or inherited property
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn has(&self, key: impl Into<PropKey>) -> Result<bool, DraftError> {
        access::has(self.0, key.into())
    }

    /// Own property names in insertion order
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn keys(&self) -> Result<Vec<String>, DraftError> {
        Ok(self.0.keys()?.into_iter().map(|key| key.to_string()).collect())
    }

    /// Number of own properties
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn len(&self) -> Result<usize, DraftError> {
        self.0.len()
    }

    /// Check for no own properties
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn is_empty(&self) -> Result<bool, DraftError> {
        Ok(self.len()? == 0)
    }
}
