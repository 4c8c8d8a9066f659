//! fOS DOM - Document Object Model
//!
//! Arena-backed DOM tree with the host services a live-tree watcher needs:
//! shadow roots, mutation observers, shadow-attachment notifications and
//! animation frames. Everything is single-threaded; [`Dom`] is a cheap
//! `Rc` handle that may be cloned into callbacks.

mod document;
mod generation;
mod node;
mod observer;
mod scheduler;
mod shadow;
mod style;
mod tree;

pub use document::Dom;
pub use generation::Generation;
pub use node::{Attribute, ElementData, Node, NodeData, NodeType};
pub use observer::{MutationObserverInit, MutationRecord, MutationType, ObserverId};
pub use scheduler::FrameId;
pub use shadow::{HookId, ShadowRootData, ShadowRootInit, ShadowRootMode};
pub use style::{parse_inline_style, serialize_inline_style};
pub use tree::{Descendants, DomTree};

/// Node identifier: arena slot plus the generation of that slot.
///
/// A slot is reused after its node is destroyed, with a bumped generation,
/// so an id kept past the node's lifetime never aliases a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: Generation,
}

impl NodeId {
    pub(crate) const fn new(index: u32, generation: Generation) -> Self {
        Self { index, generation }
    }

    /// Slot index in the arena
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this id was issued
    #[inline]
    pub const fn generation(self) -> Generation {
        self.generation
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation.value())
    }
}

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The id refers to a destroyed node
    #[error("Node {0} no longer exists")]
    StaleNode(NodeId),

    /// Insertion would create a cycle or put a node where it cannot live
    #[error("Hierarchy request error: cannot insert {child} into {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// Operation requires an element
    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    /// Reference node is not a child of the given parent
    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// `attachShadow` on an element that already hosts a shadow root
    #[error("Element {0} already hosts a shadow root")]
    ShadowAlreadyAttached(NodeId),
}
