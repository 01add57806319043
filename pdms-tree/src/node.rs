use std::fmt::Debug;
use std::hash::Hash;

/// A node that knows its own id and the id of its parent.
///
/// Implemented by backend entities that form hierarchies (functions) and
/// by anything else the navigation panel needs to show as a tree.
pub trait TreeNode {
    /// Identifier type. Ordering decides sibling order.
    type Id: Clone + Eq + Hash + Ord + Debug;

    fn id(&self) -> Self::Id;

    /// `None` marks a root.
    fn parent_id(&self) -> Option<Self::Id>;

    /// Display name of the node.
    fn node_name(&self) -> &str;
}
