//! Behavior trees for dungeon agents.
//!
//! Tree definitions are immutable arenas shared by every agent running the same preset; each
//! agent owns a [`Cursor`] holding its running path and decorator timers. Leaves are a closed
//! enum supplied by the caller and executed through a [`LeafHandler`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod bt;
pub mod cursor;
pub mod def;
pub mod error;
pub mod exec;
pub mod tree;

pub use bt::{BtStatus, Branch};
pub use cursor::Cursor;
pub use def::{DecoratorDef, LeafRegistry, NodeDef, TreeDef};
pub use error::TreeError;
pub use exec::{LeafHandler, TickReport};
pub use tree::{Decorator, Node, NodeId, Tree, TreeBuilder};
