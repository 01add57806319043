//! Arena-backed hierarchy with an id index.
//!
//! Nodes live in a slot vector; parent/child links are slot indices. The
//! effective parent of a node is its declared parent when that parent is
//! present, otherwise the node is a root. Sibling lists (and the root list)
//! are kept sorted by node id.

use crate::{TreeError, TreeNode, TreeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::debug;

/// Buffered notifications per subscriber before lagging.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A single positional change to the hierarchy.
///
/// `index` is the position among the siblings of `parent` (or among the
/// roots when `parent` is `None`) at the moment the event was produced.
/// Replaying events in order against a mirror keeps it identical to the
/// hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TreeEvent<I> {
    Inserted {
        parent: Option<I>,
        index: usize,
        id: I,
    },
    Removed {
        parent: Option<I>,
        index: usize,
        id: I,
    },
}

impl<I> TreeEvent<I> {
    pub fn id(&self) -> &I {
        match self {
            Self::Inserted { id, .. } | Self::Removed { id, .. } => id,
        }
    }

    pub fn parent(&self) -> Option<&I> {
        match self {
            Self::Inserted { parent, .. } | Self::Removed { parent, .. } => parent.as_ref(),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Inserted { index, .. } | Self::Removed { index, .. } => *index,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

struct Slot<N: TreeNode> {
    id: N::Id,
    node: N,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// A navigable, incrementally updatable tree of [`TreeNode`]s.
pub struct Hierarchy<N: TreeNode> {
    slots: Vec<Option<Slot<N>>>,
    free: Vec<usize>,
    index: HashMap<N::Id, usize>,
    roots: Vec<usize>,
    events: broadcast::Sender<TreeEvent<N::Id>>,
}

impl<N: TreeNode> Default for Hierarchy<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: TreeNode> Hierarchy<N> {
    /// Creates an empty hierarchy.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            roots: Vec::new(),
            events,
        }
    }

    /// Builds a hierarchy from a set of nodes.
    ///
    /// The result depends only on the nodes and their parent links, not on
    /// the order they are supplied in. Fails on duplicate ids and on parent
    /// links that loop.
    pub fn build(nodes: impl IntoIterator<Item = N>) -> TreeResult<Self> {
        let mut tree = Self::new();

        for node in nodes {
            let id = node.id();
            if tree.index.contains_key(&id) {
                return Err(TreeError::DuplicateId(format!("{id:?}")));
            }
            tree.index.insert(id.clone(), tree.slots.len());
            tree.slots.push(Some(Slot {
                id,
                node,
                parent: None,
                children: Vec::new(),
            }));
        }

        let parents: Vec<Option<usize>> = (0..tree.slots.len())
            .map(|i| tree.declared_parent(i))
            .collect();

        // Each slot is walked at most once: a walk stops at the first slot
        // already proven to reach a root.
        let count = parents.len();
        let mut mark = vec![Mark::Unvisited; count];
        let mut path = Vec::new();
        for start in 0..count {
            let mut current = Some(start);
            while let Some(i) = current {
                match mark[i] {
                    Mark::Done => break,
                    Mark::OnPath => return Err(TreeError::Cycle(tree.id_debug(i))),
                    Mark::Unvisited => {
                        mark[i] = Mark::OnPath;
                        path.push(i);
                        current = parents[i];
                    }
                }
            }
            for i in path.drain(..) {
                mark[i] = Mark::Done;
            }
        }

        for (i, parent) in parents.into_iter().enumerate() {
            tree.attach(i, parent);
        }

        debug!(nodes = count, roots = tree.roots.len(), "Built hierarchy");
        Ok(tree)
    }

    /// Subscribes to change notifications produced by later mutations.
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent<N::Id>> {
        self.events.subscribe()
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Adds a node.
    ///
    /// Roots whose declared parent is the new node are adopted by it; each
    /// adoption is reported as a root removal followed by a child insertion.
    pub fn insert(&mut self, node: N) -> TreeResult<Vec<TreeEvent<N::Id>>> {
        let id = node.id();
        if self.index.contains_key(&id) {
            return Err(TreeError::DuplicateId(format!("{id:?}")));
        }
        if node.parent_id().as_ref() == Some(&id) {
            return Err(TreeError::Cycle(format!("{id:?}")));
        }

        let parent = node
            .parent_id()
            .and_then(|p| self.index.get(&p).copied());

        // Adopting orphans closes a loop if our own parent chain ends in
        // a root that is waiting for us.
        if let Some(p) = parent {
            let top = self.root_of(p);
            let waits_for_us = self
                .slot(top)
                .and_then(|s| s.node.parent_id())
                .is_some_and(|pid| pid == id);
            if waits_for_us {
                return Err(TreeError::Cycle(format!("{id:?}")));
            }
        }

        let slot = Slot {
            id: id.clone(),
            node,
            parent: None,
            children: Vec::new(),
        };
        let idx = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                i
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.index.insert(id.clone(), idx);

        let mut events = Vec::new();
        let pos = self.attach(idx, parent);
        events.push(TreeEvent::Inserted {
            parent: self.id_of(parent),
            index: pos,
            id: id.clone(),
        });

        let orphans: Vec<usize> = self
            .roots
            .iter()
            .copied()
            .filter(|&r| r != idx)
            .filter(|&r| {
                self.slot(r)
                    .and_then(|s| s.node.parent_id())
                    .is_some_and(|pid| pid == id)
            })
            .collect();

        for orphan in orphans {
            let Some(orphan_id) = self.id_of(Some(orphan)) else {
                continue;
            };
            if let Some((_, old)) = self.detach(orphan) {
                events.push(TreeEvent::Removed {
                    parent: None,
                    index: old,
                    id: orphan_id.clone(),
                });
            }
            let pos = self.attach(orphan, Some(idx));
            events.push(TreeEvent::Inserted {
                parent: Some(id.clone()),
                index: pos,
                id: orphan_id,
            });
        }

        self.emit(&events);
        Ok(events)
    }

    /// Removes a node. Its children stay in the hierarchy as roots.
    pub fn remove(&mut self, id: &N::Id) -> TreeResult<Vec<TreeEvent<N::Id>>> {
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| TreeError::NotFound(format!("{id:?}")))?;

        let mut events = Vec::new();
        if let Some((parent, old)) = self.detach(idx) {
            events.push(TreeEvent::Removed {
                parent: self.id_of(parent),
                index: old,
                id: id.clone(),
            });
        }

        let children = self
            .slots
            .get_mut(idx)
            .and_then(Option::take)
            .map(|slot| slot.children)
            .unwrap_or_default();
        self.index.remove(id);
        self.free.push(idx);

        // Children leave the removed node front to back, so each one is
        // at index 0 when it goes.
        for child in children {
            if let Some(slot) = self.slot_mut(child) {
                slot.parent = None;
            }
            let Some(child_id) = self.id_of(Some(child)) else {
                continue;
            };
            events.push(TreeEvent::Removed {
                parent: Some(id.clone()),
                index: 0,
                id: child_id.clone(),
            });
            let pos = self.attach(child, None);
            events.push(TreeEvent::Inserted {
                parent: None,
                index: pos,
                id: child_id,
            });
        }

        self.emit(&events);
        Ok(events)
    }

    /// Inserts a node, or replaces the existing node with the same id.
    ///
    /// A replaced node is reported as removed and re-inserted, possibly
    /// under a different parent; its own children move with it.
    pub fn upsert(&mut self, node: N) -> TreeResult<Vec<TreeEvent<N::Id>>> {
        let id = node.id();
        let Some(&idx) = self.index.get(&id) else {
            return self.insert(node);
        };

        let new_parent = node
            .parent_id()
            .and_then(|p| self.index.get(&p).copied());
        if let Some(p) = new_parent {
            if p == idx || self.is_ancestor(idx, p) {
                return Err(TreeError::Cycle(format!("{id:?}")));
            }
        }

        let mut events = Vec::new();
        if let Some((parent, old)) = self.detach(idx) {
            events.push(TreeEvent::Removed {
                parent: self.id_of(parent),
                index: old,
                id: id.clone(),
            });
        }
        if let Some(slot) = self.slot_mut(idx) {
            slot.node = node;
        }
        let pos = self.attach(idx, new_parent);
        events.push(TreeEvent::Inserted {
            parent: self.id_of(new_parent),
            index: pos,
            id,
        });

        self.emit(&events);
        Ok(events)
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &N::Id) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &N::Id) -> Option<&N> {
        self.index
            .get(id)
            .and_then(|&i| self.slot(i))
            .map(|s| &s.node)
    }

    /// Root nodes, sorted by id.
    pub fn roots(&self) -> Vec<&N> {
        self.nodes_at(&self.roots)
    }

    /// Direct children ("inferiors") of a node, sorted by id.
    pub fn children(&self, id: &N::Id) -> Vec<&N> {
        self.index
            .get(id)
            .and_then(|&i| self.slot(i))
            .map(|s| self.nodes_at(&s.children))
            .unwrap_or_default()
    }

    /// The effective parent of a node.
    pub fn parent(&self, id: &N::Id) -> Option<&N> {
        self.index
            .get(id)
            .and_then(|&i| self.slot(i))
            .and_then(|s| s.parent)
            .and_then(|p| self.slot(p))
            .map(|s| &s.node)
    }

    /// Lineage of a node, nearest ancestor first.
    pub fn ancestors(&self, id: &N::Id) -> Vec<&N> {
        let mut lineage = Vec::new();
        let mut current = self
            .index
            .get(id)
            .and_then(|&i| self.slot(i))
            .and_then(|s| s.parent);
        while let Some(p) = current {
            let Some(slot) = self.slot(p) else { break };
            lineage.push(&slot.node);
            current = slot.parent;
        }
        lineage
    }

    /// All nodes below `id`, in depth-first pre-order.
    pub fn descendants(&self, id: &N::Id) -> Vec<&N> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self
            .slot(start)
            .map(|s| s.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(i) = stack.pop() {
            if let Some(slot) = self.slot(i) {
                out.push(&slot.node);
                stack.extend(slot.children.iter().rev().copied());
            }
        }
        out
    }

    /// Every node with its depth (roots at 0), in depth-first pre-order.
    pub fn depth_first(&self) -> Vec<(usize, &N)> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<(usize, usize)> =
            self.roots.iter().rev().map(|&r| (r, 0)).collect();
        while let Some((i, depth)) = stack.pop() {
            if let Some(slot) = self.slot(i) {
                out.push((depth, &slot.node));
                stack.extend(slot.children.iter().rev().map(|&c| (c, depth + 1)));
            }
        }
        out
    }

    // ── Internals ────────────────────────────────────────────────

    fn slot(&self, i: usize) -> Option<&Slot<N>> {
        self.slots.get(i).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, i: usize) -> Option<&mut Slot<N>> {
        self.slots.get_mut(i).and_then(Option::as_mut)
    }

    fn id_of(&self, i: Option<usize>) -> Option<N::Id> {
        i.and_then(|i| self.slot(i)).map(|s| s.id.clone())
    }

    fn id_debug(&self, i: usize) -> String {
        self.slot(i)
            .map(|s| format!("{:?}", s.id))
            .unwrap_or_default()
    }

    fn declared_parent(&self, i: usize) -> Option<usize> {
        self.slot(i)
            .and_then(|s| s.node.parent_id())
            .and_then(|p| self.index.get(&p).copied())
    }

    fn nodes_at(&self, indices: &[usize]) -> Vec<&N> {
        indices
            .iter()
            .filter_map(|&i| self.slot(i))
            .map(|s| &s.node)
            .collect()
    }

    fn root_of(&self, mut i: usize) -> usize {
        while let Some(p) = self.slot(i).and_then(|s| s.parent) {
            i = p;
        }
        i
    }

    /// Whether `ancestor` lies on the parent chain of `i`.
    fn is_ancestor(&self, ancestor: usize, i: usize) -> bool {
        let mut current = self.slot(i).and_then(|s| s.parent);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.slot(p).and_then(|s| s.parent);
        }
        false
    }

    /// Links slot `i` under `parent` (or among the roots) at its sorted
    /// position and returns that position.
    fn attach(&mut self, i: usize, parent: Option<usize>) -> usize {
        let Some(id) = self.id_of(Some(i)) else {
            return 0;
        };

        let mut siblings = match parent {
            Some(p) => self
                .slot_mut(p)
                .map(|slot| std::mem::take(&mut slot.children))
                .unwrap_or_default(),
            None => std::mem::take(&mut self.roots),
        };
        let pos = siblings.partition_point(|&s| self.slot(s).is_some_and(|slot| slot.id < id));
        siblings.insert(pos, i);

        match parent {
            Some(p) => {
                if let Some(slot) = self.slot_mut(p) {
                    slot.children = siblings;
                }
            }
            None => self.roots = siblings,
        }
        if let Some(slot) = self.slot_mut(i) {
            slot.parent = parent;
        }
        pos
    }

    /// Unlinks slot `i` from its sibling list. Returns the former parent
    /// and position.
    fn detach(&mut self, i: usize) -> Option<(Option<usize>, usize)> {
        let parent = self.slot(i)?.parent;
        let siblings = match parent {
            Some(p) => &mut self.slot_mut(p)?.children,
            None => &mut self.roots,
        };
        let pos = siblings.iter().position(|&s| s == i)?;
        siblings.remove(pos);
        if let Some(slot) = self.slot_mut(i) {
            slot.parent = None;
        }
        Some((parent, pos))
    }

    fn emit(&self, events: &[TreeEvent<N::Id>]) {
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event.clone());
        }
    }
}
