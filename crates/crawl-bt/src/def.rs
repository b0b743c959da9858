//! Declarative tree definitions, as loaded from behavior preset files.
//!
//! ```yaml
//! name: skirmisher
//! root:
//!   selector:
//!     reactive: true
//!     children:
//!       - sequence:
//!           branch: survive
//!           children:
//!             - leaf: { name: fear_above, params: { threshold: 0.8 } }
//!             - leaf: { name: flee }
//!       - leaf: { name: wait, branch: idle }
//! ```

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Branch, Decorator, NodeId, Tree, TreeBuilder, TreeError};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TreeDef {
    pub name: String,
    pub root: NodeDef,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NodeDef {
    Selector {
        #[cfg_attr(feature = "serde", serde(default))]
        reactive: bool,
        #[cfg_attr(feature = "serde", serde(default))]
        branch: Option<Branch>,
        children: Vec<NodeDef>,
    },
    Sequence {
        #[cfg_attr(feature = "serde", serde(default))]
        reactive: bool,
        #[cfg_attr(feature = "serde", serde(default))]
        branch: Option<Branch>,
        children: Vec<NodeDef>,
    },
    Decorator {
        decorator: DecoratorDef,
        #[cfg_attr(feature = "serde", serde(default))]
        branch: Option<Branch>,
        child: Box<NodeDef>,
    },
    Leaf {
        name: String,
        #[cfg_attr(feature = "serde", serde(default))]
        params: BTreeMap<String, f32>,
        #[cfg_attr(feature = "serde", serde(default))]
        branch: Option<Branch>,
    },
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DecoratorDef {
    UntilSuccess,
    UntilFail,
    Inverter,
    TimeLimit { ticks: u32 },
    Cooldown { ticks: u32 },
    WithBlackboardKey { key: String },
}

/// Maps definition names onto a closed set of leaf variants and blackboard keys.
pub trait LeafRegistry<L> {
    fn leaf(&self, name: &str, params: &BTreeMap<String, f32>) -> Result<L, TreeError>;
    fn key(&self, name: &str) -> Option<u64>;
}

impl TreeDef {
    /// Build the arena without checking the top-level priority contract.
    pub fn compile<L, R>(&self, registry: &R) -> Result<Tree<L>, TreeError>
    where
        R: LeafRegistry<L> + ?Sized,
    {
        let mut builder = TreeBuilder::new(self.name.clone());
        let root = add(&mut builder, &self.root, registry)?;
        builder.build(root)
    }

    /// Build a behavior preset: [`TreeDef::compile`] plus [`Tree::check_priority`].
    pub fn compile_preset<L, R>(&self, registry: &R) -> Result<Tree<L>, TreeError>
    where
        R: LeafRegistry<L> + ?Sized,
    {
        let tree = self.compile(registry)?;
        tree.check_priority()?;
        Ok(tree)
    }
}

fn add<L, R>(builder: &mut TreeBuilder<L>, def: &NodeDef, registry: &R) -> Result<NodeId, TreeError>
where
    R: LeafRegistry<L> + ?Sized,
{
    let (id, branch) = match def {
        NodeDef::Selector {
            reactive,
            branch,
            children,
        } => {
            if children.is_empty() {
                return Err(TreeError::EmptyComposite("selector"));
            }
            let ids = children
                .iter()
                .map(|c| add(builder, c, registry))
                .collect::<Result<Vec<_>, _>>()?;
            let id = if *reactive {
                builder.reactive_selector(ids)
            } else {
                builder.selector(ids)
            };
            (id, *branch)
        }
        NodeDef::Sequence {
            reactive,
            branch,
            children,
        } => {
            if children.is_empty() {
                return Err(TreeError::EmptyComposite("sequence"));
            }
            let ids = children
                .iter()
                .map(|c| add(builder, c, registry))
                .collect::<Result<Vec<_>, _>>()?;
            let id = if *reactive {
                builder.reactive_sequence(ids)
            } else {
                builder.sequence(ids)
            };
            (id, *branch)
        }
        NodeDef::Decorator {
            decorator,
            branch,
            child,
        } => {
            let kind = match decorator {
                DecoratorDef::UntilSuccess => Decorator::UntilSuccess,
                DecoratorDef::UntilFail => Decorator::UntilFail,
                DecoratorDef::Inverter => Decorator::Inverter,
                DecoratorDef::TimeLimit { ticks } => Decorator::TimeLimit(*ticks),
                DecoratorDef::Cooldown { ticks } => Decorator::Cooldown(*ticks),
                DecoratorDef::WithBlackboardKey { key } => Decorator::WithBlackboardKey(
                    registry
                        .key(key)
                        .ok_or_else(|| TreeError::UnknownKey(key.clone()))?,
                ),
            };
            let child = add(builder, child, registry)?;
            (builder.decorate(kind, child), *branch)
        }
        NodeDef::Leaf {
            name,
            params,
            branch,
        } => (builder.leaf(registry.leaf(name, params)?), *branch),
    };
    if let Some(branch) = branch {
        builder.label(id, branch);
    }
    Ok(id)
}
