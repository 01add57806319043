//! Parent-linked hierarchies for presenting backend entities.
//!
//! Entities (and local shapes) only carry a pointer to their parent. This
//! crate turns a set of such nodes into a navigable tree:
//!
//! - [`TreeNode`]: the three things a node must expose (id, parent id, name)
//! - [`Hierarchy`]: an arena plus an id index, with children kept sorted by id
//!   so the resulting structure does not depend on insertion order
//! - [`TreeEvent`]: ordered insert/remove notifications for incremental UIs
//!
//! A node whose parent id is unknown is shown as a root until that parent
//! arrives, at which point it is adopted. Cycles are rejected when the tree
//! is built or mutated.

mod hierarchy;
mod node;

pub use hierarchy::{Hierarchy, TreeEvent, DEFAULT_EVENT_CAPACITY};
pub use node::TreeNode;

/// Result type for hierarchy mutations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors raised while building or mutating a hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("duplicate node id: {0}")]
    DuplicateId(String),

    #[error("parent links form a cycle through node {0}")]
    Cycle(String),

    #[error("node not found: {0}")]
    NotFound(String),
}
