//! Error types for draft sessions
//!
//! Every failure the engine can report is a local precondition violation:
//! there is no retry or partial-failure semantics. A session either
//! finalizes completely or produces no result.

/// Errors raised by sessions, drafts and the finalizer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    /// Session state was requested outside of any active session
    #[error("no active draft session on this thread")]
    NoActiveSession,

    /// A recipe modified its root draft and also returned a different value
    #[error("recipe modified its draft and returned a different value; commit one or the other")]
    ConflictingCommit,

    /// Array drafts only accept integer indices and `length`
    #[error("invalid array key '{0}': only indices and 'length' are allowed")]
    InvalidArrayKey(String),

    /// Array length must be a non-negative integer
    #[error("invalid array length: {0}")]
    InvalidArrayLength(String),

    /// Operation is not supported on drafts
    #[error("unsupported draft operation: {0}")]
    UnsupportedOperation(&'static str),

    /// A required plugin was not registered on the producer
    #[error("plugin '{0}' is not loaded")]
    PluginNotLoaded(&'static str),

    /// Draft or session was accessed after its session was revoked
    #[error("draft or session has been revoked")]
    Revoked,

    /// Mutation attempted on a frozen value
    #[error("cannot mutate a frozen value")]
    FrozenValue,

    /// A value contains itself as a direct child
    #[error("circular reference: a value cannot contain itself")]
    CircularReference,

    /// `finish_draft` called on a draft not created by `create_draft`
    #[error("draft was not created with create_draft")]
    NotManualDraft,

    /// `finish_draft` called twice on the same draft
    #[error("draft has already been finalized")]
    AlreadyFinalized,

    /// Value had a different shape than the operation requires
    #[error("expected {expected}, found {found}")]
    KindMismatch {
        /// Shape the operation needed
        expected: &'static str,
        /// Shape it was given
        found: &'static str,
    },

    /// A session was finalized without ever creating its root draft
    #[error("session has no root draft")]
    EmptySession,

    /// Failure raised by a recipe
    #[error("recipe failed: {0}")]
    Recipe(String),
}

impl DraftError {
    /// Create a recipe failure
    pub fn recipe(message: impl Into<String>) -> Self {
        Self::Recipe(message.into())
    }

    /// Create a kind mismatch error
    #[must_use]
    pub fn kind_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::KindMismatch { expected, found }
    }

    /// Programmer errors: misuse of the API rather than a failing recipe
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        !matches!(self, Self::Recipe(_))
    }

    /// Errors caused by touching state whose session already ended
    #[must_use]
    pub fn is_stale_access(&self) -> bool {
        matches!(self, Self::Revoked | Self::AlreadyFinalized)
    }
}
