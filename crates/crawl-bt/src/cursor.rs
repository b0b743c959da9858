use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{BtStatus, Branch, NodeId};

/// Per-agent traversal state for a shared [`crate::Tree`].
///
/// Holds only ids: the root-to-running-node path, `TimeLimit` counters for decorators on that
/// path, and `Cooldown` ready-at ticks. An empty path means the agent is idle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Cursor {
    pub(crate) path: Vec<NodeId>,
    pub(crate) timers: BTreeMap<NodeId, u32>,
    pub(crate) cooldowns: BTreeMap<NodeId, u64>,
    pub(crate) active_branch: Option<Branch>,
    pub(crate) last_status: Option<BtStatus>,
    pub(crate) last_evaluated: Option<u64>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.path.is_empty()
    }

    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    /// The node that reported Running last tick.
    pub fn running(&self) -> Option<NodeId> {
        self.path.last().copied()
    }

    pub fn timers(&self) -> &BTreeMap<NodeId, u32> {
        &self.timers
    }

    pub fn cooldowns(&self) -> &BTreeMap<NodeId, u64> {
        &self.cooldowns
    }

    pub fn active_branch(&self) -> Option<Branch> {
        self.active_branch
    }

    pub fn last_status(&self) -> Option<BtStatus> {
        self.last_status
    }

    pub fn last_evaluated(&self) -> Option<u64> {
        self.last_evaluated
    }

    /// Whether a full re-evaluation is allowed at `tick` given the agent's reaction interval.
    pub fn reaction_elapsed(&self, tick: u64, reaction_ticks: u32) -> bool {
        match self.last_evaluated {
            None => true,
            Some(last) => tick.saturating_sub(last) >= reaction_ticks as u64,
        }
    }

    /// Drop the running path and decorator timers so the next tick replans from the root.
    /// Cooldowns survive.
    pub fn reset(&mut self) {
        self.path.clear();
        self.timers.clear();
        self.active_branch = None;
        self.last_evaluated = None;
    }
}
