//! Indexed-sequence view over an array draft

use super::{access, DraftHandle, ObjectDraft};
use crate::error::DraftError;
use crate::value::{PropKey, Value};

/// Array draft facade
///
/// Same contract as [`ObjectDraft`], with positional keys. `length` is
/// exposed through [`ArrayDraft::len`] and [`ArrayDraft::set_len`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayDraft(DraftHandle);

impl ArrayDraft {
    pub(crate) fn from_handle(handle: DraftHandle) -> Self {
        Self(handle)
    }

    /// Underlying handle
    #[inline]
    #[must_use]
    pub fn handle(&self) -> DraftHandle {
        self.0
    }

    /// Read an element; out-of-range reads yield `Null`
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn get(&self, index: usize) -> Result<Value, DraftError> {
        access::read(self.0, PropKey::Index(index))
    }

    /// Read an element that holds an object, as a draft
    ///
    /// # Errors
    /// Fails when revoked or the element is not a draftable object.
    pub fn get_object(&self, index: usize) -> Result<ObjectDraft, DraftError> {
        self.get(index)?.as_object_draft()
    }

    /// Read an element that holds an array, as a draft
    ///
    /// # Errors
    /// Fails when revoked or the element is not a draftable array.
    pub fn get_array(&self, index: usize) -> Result<ArrayDraft, DraftError> {
        self.get(index)?.as_array_draft()
    }

    /// Write an element, padding with `Null` past the end
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<(), DraftError> {
        access::write(self.0, PropKey::Index(index), value.into())
    }

    /// Clear an element, leaving a `Null` hole
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn delete(&self, index: usize) -> Result<(), DraftError> {
        access::remove(self.0, PropKey::Index(index))
    }

    /// Current length
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn len(&self) -> Result<usize, DraftError> {
        self.0.len()
    }

    /// Check for zero length
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn is_empty(&self) -> Result<bool, DraftError> {
        Ok(self.len()? == 0)
    }

    /// Truncate or extend through the `length` key
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn set_len(&self, len: usize) -> Result<(), DraftError> {
        access::write(self.0, PropKey::length(), Value::from(len))
    }

    /// Append an element, returning the new length
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn push(&self, value: impl Into<Value>) -> Result<usize, DraftError> {
        let len = self.len()?;
        self.set(len, value)?;
        Ok(len + 1)
    }

    /// Remove and return the last element
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn pop(&self) -> Result<Option<Value>, DraftError> {
        let len = self.len()?;
        if len == 0 {
            return Ok(None);
        }
        let last = self.get(len - 1)?;
        self.set_len(len - 1)?;
        Ok(Some(last))
    }

    /// Every element, read through the draft
    ///
    /// # Errors
    /// Fails when the draft is revoked.
    pub fn items(&self) -> Result<Vec<Value>, DraftError> {
        (0..self.len()?).map(|index| self.get(index)).collect()
    }
}
