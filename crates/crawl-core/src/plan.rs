#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Serializable plan data: an ordered sequence of step specs.
///
/// Planners (GOAP) output `PlanSpec<Spec>`; the simulation turns each spec into a concrete action
/// lazily, one step per tick, so a step always sees the world as it is when it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanSpec<S> {
    pub steps: Vec<S>,
}

impl<S> PlanSpec<S> {
    pub fn new(steps: Vec<S>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Execution position within a [`PlanSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanRun<S> {
    plan: PlanSpec<S>,
    index: usize,
}

impl<S> PlanRun<S> {
    pub fn new(plan: PlanSpec<S>) -> Self {
        Self { plan, index: 0 }
    }

    pub fn plan(&self) -> &PlanSpec<S> {
        &self.plan
    }

    pub fn current(&self) -> Option<&S> {
        self.plan.steps.get(self.index)
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Move to the next step; returns `true` when the plan is exhausted.
    pub fn advance(&mut self) -> bool {
        self.index = (self.index + 1).min(self.plan.len());
        self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.plan.len()
    }
}
