use crawl_core::SimError;
use thiserror::Error;

use crate::Branch;

/// A behavior definition that cannot be turned into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("unknown leaf `{0}`")]
    UnknownLeaf(String),
    #[error("invalid parameters for leaf `{leaf}`: {detail}")]
    BadLeafParams { leaf: String, detail: String },
    #[error("unknown blackboard key `{0}`")]
    UnknownKey(String),
    #[error("{0} has no children")]
    EmptyComposite(&'static str),
    #[error("node id {0} is out of range")]
    DanglingNode(u32),
    #[error("node {node} lists child {child}, which was not added before it")]
    ForwardChild { node: u32, child: u32 },
    #[error("root must be a reactive selector to enforce branch priority")]
    RootNotPrioritySelector,
    #[error("top-level child {index} has no branch label")]
    UnlabelledBranch { index: usize },
    #[error("branch `{later:?}` is ordered after lower-priority branch `{earlier:?}`")]
    PriorityOrder { earlier: Branch, later: Branch },
    #[error("unknown behavior preset `{0}`")]
    UnknownPreset(String),
}

impl From<TreeError> for SimError {
    fn from(value: TreeError) -> Self {
        SimError::data_integrity("behavior tree", value.to_string())
    }
}
