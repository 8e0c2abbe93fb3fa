//! # SnapKit DOM
//!
//! The in-memory document that visual test cases build, mutate and hand to
//! the renderer.
//!
//! This crate provides:
//! - An arena of nodes addressed by generation-checked [`NodeId`] handles
//! - The tree builder (`create`, `create_text`, `append`, `remove_child`)
//! - A singleton root container (`body`) that is reset between test cases
//! - An event dispatcher with snapshot-at-dispatch listener semantics
//! - A mutation log a renderer can drain to observe changes
//!
//! ## Modules
//!
//! - [`node`]: node kinds, handles and inline styles
//! - [`document`]: the arena and tree operations
//! - [`events`]: listeners, events and listener failure reporting
//! - [`dom`]: the shared [`Dom`] handle used by test bodies and listeners

pub mod document;
pub mod dom;
pub mod events;
pub mod node;
mod printing;

pub use document::{Descendants, Document, Mutation};
pub use dom::{panic_message, Dom};
pub use events::{
    Event, EventInit, EventListener, FailureHook, ListenerError, ListenerFailure, ListenerFuture,
};
pub use node::{Node, NodeId, NodeKind, Style};
pub use string_cache::DefaultAtom as Atom;

use thiserror::Error;

/// Errors for tree operations.
///
/// All of these indicate a broken assumption in the calling test, so they are
/// reported rather than ignored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Stale node handle: {0:?}")]
    StaleNode(NodeId),

    #[error("{child:?} is not a child of {parent:?}")]
    DetachedNode { parent: NodeId, child: NodeId },

    #[error("{0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("Cannot insert {child:?} into {parent:?}: {reason}")]
    HierarchyRequest {
        parent: NodeId,
        child: NodeId,
        reason: &'static str,
    },
}
