//! Immutable behavior-tree definitions stored in an arena.
//!
//! A [`Tree`] is built once per behavior preset and shared read-only by every agent using that
//! preset. Nodes refer to each other by [`NodeId`]; all execution state lives in the per-agent
//! [`crate::Cursor`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Branch, TreeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Decorator {
    /// Retry the child (next tick) until it succeeds.
    UntilSuccess,
    /// Retry the child (next tick) until it fails; then succeed.
    UntilFail,
    /// Fail once the child has been Running for `n` consecutive ticks.
    TimeLimit(u32),
    Inverter,
    /// Run the child only while the blackboard holds `key`.
    WithBlackboardKey(u64),
    /// After the child finishes, fail without ticking it for `n` ticks.
    Cooldown(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node<L> {
    /// First non-Failure child wins. A reactive selector re-checks earlier children on every
    /// full evaluation; otherwise it resumes at the running child.
    Selector { children: Vec<NodeId>, reactive: bool },
    /// Fails on the first failing child; succeeds when all do.
    Sequence { children: Vec<NodeId>, reactive: bool },
    Decorator { kind: Decorator, child: NodeId },
    Leaf(L),
}

impl<L> Node<L> {
    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::Selector { children, .. } | Node::Sequence { children, .. } => children,
            Node::Decorator { child, .. } => std::slice::from_ref(child),
            Node::Leaf(_) => &[],
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Selector { .. } => "selector",
            Node::Sequence { .. } => "sequence",
            Node::Decorator { .. } => "decorator",
            Node::Leaf(_) => "leaf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Slot<L> {
    pub(crate) node: Node<L>,
    pub(crate) branch: Option<Branch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tree<L> {
    name: String,
    pub(crate) slots: Vec<Slot<L>>,
    root: NodeId,
}

impl<L> Tree<L> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<L>> {
        self.slots.get(id.index()).map(|s| &s.node)
    }

    pub fn branch(&self, id: NodeId) -> Option<Branch> {
        self.slots.get(id.index()).and_then(|s| s.branch)
    }

    pub fn leaf(&self, id: NodeId) -> Option<&L> {
        match self.node(id)? {
            Node::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Whether `path` is a root-anchored parent→child chain in this tree.
    pub fn is_valid_path(&self, path: &[NodeId]) -> bool {
        match path.first() {
            None => return true,
            Some(first) if *first != self.root => return false,
            Some(_) => {}
        }
        path.windows(2).all(|pair| {
            self.node(pair[0])
                .map(|n| n.children().contains(&pair[1]))
                .unwrap_or(false)
        })
    }

    /// Enforce the top-level priority contract: the root is a reactive selector whose children
    /// carry branch labels in non-decreasing rank (survive, attack, defend, explore, idle).
    pub fn check_priority(&self) -> Result<(), TreeError> {
        let Some(Node::Selector {
            children,
            reactive: true,
        }) = self.node(self.root)
        else {
            return Err(TreeError::RootNotPrioritySelector);
        };
        let mut previous: Option<Branch> = None;
        for (index, child) in children.iter().enumerate() {
            let branch = self
                .branch(*child)
                .ok_or(TreeError::UnlabelledBranch { index })?;
            if let Some(earlier) = previous {
                if branch < earlier {
                    return Err(TreeError::PriorityOrder {
                        earlier,
                        later: branch,
                    });
                }
            }
            previous = Some(branch);
        }
        Ok(())
    }
}

/// Incremental arena construction. Children must be added before their parents.
#[derive(Debug, Clone)]
pub struct TreeBuilder<L> {
    name: String,
    slots: Vec<Slot<L>>,
}

impl<L> TreeBuilder<L> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
        }
    }

    fn push(&mut self, node: Node<L>) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Slot { node, branch: None });
        id
    }

    pub fn leaf(&mut self, leaf: L) -> NodeId {
        self.push(Node::Leaf(leaf))
    }

    pub fn selector(&mut self, children: Vec<NodeId>) -> NodeId {
        self.push(Node::Selector {
            children,
            reactive: false,
        })
    }

    pub fn reactive_selector(&mut self, children: Vec<NodeId>) -> NodeId {
        self.push(Node::Selector {
            children,
            reactive: true,
        })
    }

    pub fn sequence(&mut self, children: Vec<NodeId>) -> NodeId {
        self.push(Node::Sequence {
            children,
            reactive: false,
        })
    }

    pub fn reactive_sequence(&mut self, children: Vec<NodeId>) -> NodeId {
        self.push(Node::Sequence {
            children,
            reactive: true,
        })
    }

    pub fn decorate(&mut self, kind: Decorator, child: NodeId) -> NodeId {
        self.push(Node::Decorator { kind, child })
    }

    pub fn label(&mut self, id: NodeId, branch: Branch) -> NodeId {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            slot.branch = Some(branch);
        }
        id
    }

    pub fn build(self, root: NodeId) -> Result<Tree<L>, TreeError> {
        let len = self.slots.len() as u32;
        if root.0 >= len {
            return Err(TreeError::DanglingNode(root.0));
        }
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.node.children().is_empty() && !matches!(slot.node, Node::Leaf(_)) {
                return Err(TreeError::EmptyComposite(slot.node.kind_name()));
            }
            if let Some(bad) = slot.node.children().iter().find(|c| c.0 >= len) {
                return Err(TreeError::DanglingNode(bad.0));
            }
            // Children precede their parent, which keeps the arena acyclic.
            let node = index as u32;
            if let Some(bad) = slot.node.children().iter().find(|c| c.0 >= node) {
                return Err(TreeError::ForwardChild { node, child: bad.0 });
            }
        }
        Ok(Tree {
            name: self.name,
            slots: self.slots,
            root,
        })
    }
}
