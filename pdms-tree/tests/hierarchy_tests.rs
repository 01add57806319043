use pdms_tree::{Hierarchy, TreeError, TreeEvent, TreeNode};
use pretty_assertions::assert_eq;

#[derive(Debug, Clone, PartialEq)]
struct Node {
    id: u32,
    parent: Option<u32>,
    name: String,
}

impl TreeNode for Node {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }

    fn parent_id(&self) -> Option<u32> {
        self.parent
    }

    fn node_name(&self) -> &str {
        &self.name
    }
}

fn node(id: u32, parent: Option<u32>) -> Node {
    Node {
        id,
        parent,
        name: format!("node-{id}"),
    }
}

fn ids(nodes: Vec<&Node>) -> Vec<u32> {
    nodes.into_iter().map(|n| n.id).collect()
}

fn outline(tree: &Hierarchy<Node>) -> Vec<(usize, u32)> {
    tree.depth_first().into_iter().map(|(d, n)| (d, n.id)).collect()
}

// zone 1 ─┬─ group 10 ─┬─ element 100
//         │            └─ element 101
//         └─ group 11
// zone 2
fn plant() -> Vec<Node> {
    vec![
        node(1, None),
        node(2, None),
        node(10, Some(1)),
        node(11, Some(1)),
        node(100, Some(10)),
        node(101, Some(10)),
    ]
}

// ── Build ────────────────────────────────────────────────────────

#[test]
fn build_links_children_to_parents() {
    let tree = Hierarchy::build(plant()).unwrap();

    assert_eq!(tree.len(), 6);
    assert_eq!(ids(tree.roots()), vec![1, 2]);
    assert_eq!(ids(tree.children(&1)), vec![10, 11]);
    assert_eq!(ids(tree.children(&10)), vec![100, 101]);
    assert!(tree.children(&2).is_empty());
    assert_eq!(tree.parent(&100).map(|n| n.id), Some(10));
    assert_eq!(tree.parent(&1), None);
    assert_eq!(tree.get(&11).map(|n| n.node_name()), Some("node-11"));
}

#[test]
fn build_does_not_depend_on_input_order() {
    let mut reversed = plant();
    reversed.reverse();

    let a = Hierarchy::build(plant()).unwrap();
    let b = Hierarchy::build(reversed).unwrap();
    assert_eq!(outline(&a), outline(&b));
}

#[test]
fn unknown_parent_makes_a_root() {
    let tree = Hierarchy::build(vec![node(5, Some(99)), node(6, Some(5))]).unwrap();
    assert_eq!(ids(tree.roots()), vec![5]);
    assert_eq!(ids(tree.children(&5)), vec![6]);
}

#[test]
fn build_rejects_duplicates() {
    let err = Hierarchy::build(vec![node(1, None), node(1, None)]).err();
    assert_eq!(err, Some(TreeError::DuplicateId("1".into())));
}

#[test]
fn build_rejects_cycles() {
    let self_loop = Hierarchy::build(vec![node(1, Some(1))]).err();
    assert!(matches!(self_loop, Some(TreeError::Cycle(_))));

    let ring = Hierarchy::build(vec![node(1, Some(3)), node(2, Some(1)), node(3, Some(2))]).err();
    assert!(matches!(ring, Some(TreeError::Cycle(_))));

    // a tail hanging off a ring is reported too
    let tail = Hierarchy::build(vec![node(1, Some(2)), node(2, Some(1)), node(7, Some(1))]).err();
    assert!(matches!(tail, Some(TreeError::Cycle(_))));
}

#[test]
fn build_handles_long_chains() {
    // supplied leaf first so every walk would cover the whole chain
    let chain: Vec<Node> = (0..20_000_u32)
        .rev()
        .map(|i| node(i, i.checked_sub(1)))
        .collect();
    let tree = Hierarchy::build(chain).unwrap();
    assert_eq!(tree.len(), 20_000);
    assert_eq!(ids(tree.roots()), vec![0]);
    assert_eq!(tree.parent(&19_999).map(|n| n.id), Some(19_998));

    let mut looped: Vec<Node> = (1..5_000_u32).map(|i| node(i, Some(i - 1))).collect();
    looped.push(node(0, Some(4_999)));
    assert!(matches!(Hierarchy::build(looped).err(), Some(TreeError::Cycle(_))));
}

// ── Queries ──────────────────────────────────────────────────────

#[test]
fn ancestors_are_nearest_first() {
    let tree = Hierarchy::build(plant()).unwrap();
    assert_eq!(ids(tree.ancestors(&101)), vec![10, 1]);
    assert!(tree.ancestors(&1).is_empty());
    assert!(tree.ancestors(&404).is_empty());
}

#[test]
fn descendants_are_preorder() {
    let tree = Hierarchy::build(plant()).unwrap();
    assert_eq!(ids(tree.descendants(&1)), vec![10, 100, 101, 11]);
    assert!(tree.descendants(&2).is_empty());
}

#[test]
fn depth_first_reports_depths() {
    let tree = Hierarchy::build(plant()).unwrap();
    assert_eq!(
        outline(&tree),
        vec![(0, 1), (1, 10), (2, 100), (2, 101), (1, 11), (0, 2)]
    );
}

// ── Incremental updates ──────────────────────────────────────────

#[test]
fn insert_reports_sorted_position() {
    let mut tree = Hierarchy::build(plant()).unwrap();
    let events = tree.insert(node(105, Some(10))).unwrap();
    assert_eq!(
        events,
        vec![TreeEvent::Inserted { parent: Some(10), index: 2, id: 105 }]
    );

    let events = tree.insert(node(0, None)).unwrap();
    assert_eq!(
        events,
        vec![TreeEvent::Inserted { parent: None, index: 0, id: 0 }]
    );
}

#[test]
fn insert_adopts_waiting_orphans() {
    let mut tree = Hierarchy::build(vec![node(20, Some(3)), node(21, Some(3)), node(4, None)]).unwrap();
    assert_eq!(ids(tree.roots()), vec![4, 20, 21]);

    let events = tree.insert(node(3, None)).unwrap();
    assert_eq!(
        events,
        vec![
            TreeEvent::Inserted { parent: None, index: 0, id: 3 },
            TreeEvent::Removed { parent: None, index: 2, id: 20 },
            TreeEvent::Inserted { parent: Some(3), index: 0, id: 20 },
            TreeEvent::Removed { parent: None, index: 2, id: 21 },
            TreeEvent::Inserted { parent: Some(3), index: 1, id: 21 },
        ]
    );
    assert_eq!(ids(tree.roots()), vec![3, 4]);
    assert_eq!(ids(tree.children(&3)), vec![20, 21]);
}

#[test]
fn insert_rejects_duplicate_and_cycle() {
    let mut tree = Hierarchy::build(vec![node(1, Some(2))]).unwrap();
    assert_eq!(tree.insert(node(1, None)), Err(TreeError::DuplicateId("1".into())));
    // 2 -> 1 while 1 waits for 2
    assert!(matches!(tree.insert(node(2, Some(1))), Err(TreeError::Cycle(_))));
    assert!(matches!(tree.insert(node(9, Some(9))), Err(TreeError::Cycle(_))));
    assert_eq!(tree.len(), 1);
}

#[test]
fn remove_promotes_children_to_roots() {
    let mut tree = Hierarchy::build(plant()).unwrap();
    let events = tree.remove(&10).unwrap();
    assert_eq!(
        events,
        vec![
            TreeEvent::Removed { parent: Some(1), index: 0, id: 10 },
            TreeEvent::Removed { parent: Some(10), index: 0, id: 100 },
            TreeEvent::Inserted { parent: None, index: 2, id: 100 },
            TreeEvent::Removed { parent: Some(10), index: 0, id: 101 },
            TreeEvent::Inserted { parent: None, index: 3, id: 101 },
        ]
    );
    assert!(!tree.contains(&10));
    assert_eq!(ids(tree.roots()), vec![1, 2, 100, 101]);

    // re-inserting the group adopts its elements again
    tree.insert(node(10, Some(1))).unwrap();
    assert_eq!(outline(&tree), outline(&Hierarchy::build(plant()).unwrap()));
}

#[test]
fn remove_missing_node_fails() {
    let mut tree = Hierarchy::<Node>::new();
    assert_eq!(tree.remove(&1), Err(TreeError::NotFound("1".into())));
}

#[test]
fn upsert_moves_subtree() {
    let mut tree = Hierarchy::build(plant()).unwrap();
    let events = tree.upsert(node(10, Some(2))).unwrap();
    assert_eq!(
        events,
        vec![
            TreeEvent::Removed { parent: Some(1), index: 0, id: 10 },
            TreeEvent::Inserted { parent: Some(2), index: 0, id: 10 },
        ]
    );
    assert_eq!(ids(tree.descendants(&2)), vec![10, 100, 101]);
}

#[test]
fn upsert_rejects_moving_under_own_descendant() {
    let mut tree = Hierarchy::build(plant()).unwrap();
    assert!(matches!(tree.upsert(node(1, Some(100))), Err(TreeError::Cycle(_))));
    assert_eq!(tree.parent(&10).map(|n| n.id), Some(1));
}

#[test]
fn upsert_of_new_node_inserts() {
    let mut tree = Hierarchy::build(plant()).unwrap();
    let events = tree.upsert(node(12, Some(1))).unwrap();
    assert_eq!(events, vec![TreeEvent::Inserted { parent: Some(1), index: 2, id: 12 }]);
}

#[tokio::test]
async fn subscribers_receive_events_in_order() {
    let mut tree = Hierarchy::build(plant()).unwrap();
    let mut rx = tree.subscribe();

    tree.insert(node(3, None)).unwrap();
    tree.remove(&11).unwrap();

    assert_eq!(rx.recv().await.unwrap(), TreeEvent::Inserted { parent: None, index: 2, id: 3 });
    assert_eq!(rx.recv().await.unwrap(), TreeEvent::Removed { parent: Some(1), index: 1, id: 11 });
    assert!(rx.try_recv().is_err());
}

#[test]
fn event_accessors() {
    let e = TreeEvent::Removed { parent: Some(1_u32), index: 4, id: 7 };
    assert_eq!(*e.id(), 7);
    assert_eq!(e.parent(), Some(&1));
    assert_eq!(e.index(), 4);
}
