//! Quill Core
//!
//! Draft sessions over immutable value trees: mutate a draft with ordinary
//! reads and writes, get back a new tree that shares every untouched
//! subtree with the original.
//!
//! # Core Concepts
//!
//! - [`Value`] / [`Node`]: dynamic tree with reference identity
//! - [`Producer`]: runs a recipe against a draft and commits the result
//! - [`DraftHandle`], [`ObjectDraft`], [`ArrayDraft`]: revocable draft facades
//! - [`Scope`]: one mutation session and the drafts it owns
//! - [`Plugins`]: patch generation, compatibility shim and container drafters
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_core::{Node, Producer};
//!
//! let base = Node::object_from([("count", 1)]);
//! let next = Producer::new().produce(base.clone(), |draft| {
//!     draft.as_object_draft()?.set("count", 2)?;
//!     Ok(())
//! })?;
//!
//! // base is untouched; next is a new, frozen object
//! ```

mod arena;
mod config;
mod draft;
mod error;
mod finalize;
mod freeze;
mod patch;
mod path;
mod plugins;
mod producer;
mod propagate;
mod runtime;
mod scope;

/// Value model
pub mod value;

pub use config::{EngineConfig, InterceptionMode};
pub use draft::{register_draft, ArrayDraft, Assignment, DraftHandle, DraftInfo, ObjectDraft};
pub use error::DraftError;
pub use patch::{DraftView, Patch, PatchGenerator, PatchOp};
pub use path::{PatchPath, PathError};
pub use plugins::{CompatShim, ContainerDrafter, Plugins};
pub use producer::{is_draft, original, Outcome, Produced, Producer};
pub use scope::{PatchListener, Scope};
pub use value::{is_draftable, same_value, Node, NodeKind, PropKey, Prototype, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
