//! # Action arena
//!
//! Storage for instantiated action nodes. Nodes refer to their children by [`ActionId`], and a
//! freed slot bumps its generation so stale IDs can never reach a node that reused the slot.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::BTreeSet;

use super::{Factory, Predicate, Primitive, Resource};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle to a node in the arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId {
    index: usize,
    generation: u64,
}

pub(super) struct Node {
    pub name: String,
    pub state: NodeState,
    pub kind: NodeKind,
}

pub(super) enum NodeKind {
    Primitive(Box<dyn Primitive>),
    Sequence {
        children: Vec<ActionId>,
        current: usize,
    },
    Race(Vec<ActionId>),
    Parallel(Vec<ActionId>),
    Timeout {
        child: ActionId,
        duration_s: f64,
        ticks: u64,
        elapsed: u64,
    },
    Until {
        child: ActionId,
        pred: Predicate,
    },
    Deferred {
        factory: Factory,
        requirements: BTreeSet<Resource>,
        child: Option<ActionId>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum NodeState {
    Idle,
    Running,
    Finished,
}

struct Slot {
    generation: u64,
    node: Option<Node>,
}

#[derive(Default)]
pub(super) struct Arena {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Node {
    pub fn new(name: String, kind: NodeKind) -> Self {
        Self {
            name,
            state: NodeState::Idle,
            kind,
        }
    }

    /// IDs of every child this node currently holds.
    pub fn children(&self) -> Vec<ActionId> {
        match &self.kind {
            NodeKind::Primitive(_) => vec![],
            NodeKind::Sequence { children, .. }
            | NodeKind::Race(children)
            | NodeKind::Parallel(children) => children.clone(),
            NodeKind::Timeout { child, .. } | NodeKind::Until { child, .. } => vec![*child],
            NodeKind::Deferred { child, .. } => child.iter().copied().collect(),
        }
    }
}

impl Arena {
    pub fn insert(&mut self, node: Node) -> ActionId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                ActionId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                ActionId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    pub fn get(&self, id: ActionId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    /// Take the node out of its slot while it is being ticked.
    ///
    /// The slot stays reserved, put the node back with [`Arena::restore`].
    pub fn take(&mut self, id: ActionId) -> Option<Node> {
        self.slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.take())
    }

    pub fn restore(&mut self, id: ActionId, node: Node) {
        if let Some(slot) = self.slots.get_mut(id.index) {
            if slot.generation == id.generation {
                slot.node = Some(node);
            }
        }
    }

    /// Free a node and all of its descendants.
    pub fn remove(&mut self, id: ActionId) {
        let node = match self.slots.get_mut(id.index) {
            Some(slot) if slot.generation == id.generation => {
                slot.generation += 1;
                self.free.push(id.index);
                slot.node.take()
            }
            _ => None,
        };

        if let Some(node) = node {
            for child in node.children() {
                self.remove(child);
            }
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cmd::Wait;

    fn leaf() -> Node {
        Node::new("leaf".into(), NodeKind::Primitive(Box::new(Wait::new(1.0))))
    }

    #[test]
    fn test_stale_ids() {
        let mut arena = Arena::default();

        let a = arena.insert(leaf());
        arena.remove(a);
        let b = arena.insert(leaf());

        // Slot reused but the old handle no longer resolves
        assert_eq!(a.index, b.index);
        assert!(arena.get(a).is_none());
        assert!(arena.get(b).is_some());
    }

    #[test]
    fn test_ids_are_ordered() {
        let mut arena = Arena::default();

        let a = arena.insert(leaf());
        let b = arena.insert(leaf());
        arena.remove(a);
        let c = arena.insert(leaf());

        // Slot order first, then generation
        assert!(a < b);
        assert!(a < c);
        assert_eq!(a.index, c.index);

        let set: std::collections::BTreeSet<ActionId> = vec![b, c, a, b].into_iter().collect();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![a, c, b]);
    }

    #[test]
    fn test_remove_frees_children() {
        let mut arena = Arena::default();

        let c0 = arena.insert(leaf());
        let c1 = arena.insert(leaf());
        let seq = arena.insert(Node::new(
            "seq".into(),
            NodeKind::Sequence {
                children: vec![c0, c1],
                current: 0,
            },
        ));
        assert_eq!(arena.len(), 3);

        arena.remove(seq);
        assert_eq!(arena.len(), 0);
        assert!(arena.get(c1).is_none());
    }
}
