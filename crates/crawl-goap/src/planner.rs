use core::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use crawl_core::PlanSpec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// World-state atoms packed into a bitset; bit `i` is atom `i`.
pub type GoapState = u64;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GoapAction<S> {
    pub name: String,
    pub cost: u32,
    /// Atoms that must hold.
    pub preconditions: GoapState,
    /// Atoms that must not hold.
    pub forbidden: GoapState,
    pub add: GoapState,
    pub remove: GoapState,
    pub spec: S,
}

impl<S> GoapAction<S> {
    pub fn new(name: impl Into<String>, cost: u32, spec: S) -> Self {
        Self {
            name: name.into(),
            cost,
            preconditions: 0,
            forbidden: 0,
            add: 0,
            remove: 0,
            spec,
        }
    }

    pub fn requires(mut self, atoms: GoapState) -> Self {
        self.preconditions |= atoms;
        self
    }

    pub fn forbids(mut self, atoms: GoapState) -> Self {
        self.forbidden |= atoms;
        self
    }

    pub fn adds(mut self, atoms: GoapState) -> Self {
        self.add |= atoms;
        self
    }

    pub fn removes(mut self, atoms: GoapState) -> Self {
        self.remove |= atoms;
        self
    }

    pub fn is_applicable(&self, state: GoapState) -> bool {
        (state & self.preconditions) == self.preconditions && (state & self.forbidden) == 0
    }

    pub fn apply(&self, state: GoapState) -> GoapState {
        (state | self.add) & !self.remove
    }
}

pub fn goal_met(state: GoapState, goal: GoapState) -> bool {
    (state & goal) == goal
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GoapPlannerConfig {
    pub max_expansions: usize,
}

impl Default for GoapPlannerConfig {
    fn default() -> Self {
        Self { max_expansions: 4096 }
    }
}

/// Search statistics for the last [`GoapPlanner::plan_with_stats`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoapSearchStats {
    pub expansions: usize,
    pub budget_exhausted: bool,
}

#[derive(Debug, Clone)]
pub struct GoapPlanner<S> {
    actions: Vec<GoapAction<S>>,
    config: GoapPlannerConfig,
}

impl<S> GoapPlanner<S>
where
    S: Clone,
{
    pub fn new(actions: Vec<GoapAction<S>>) -> Self {
        Self {
            actions,
            config: GoapPlannerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GoapPlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> GoapPlannerConfig {
        self.config
    }

    pub fn actions(&self) -> &[GoapAction<S>] {
        &self.actions
    }

    pub fn plan(&self, start: GoapState, goal: GoapState) -> Option<PlanSpec<S>> {
        self.plan_with_stats(start, goal).0
    }

    pub fn plan_with_stats(
        &self,
        start: GoapState,
        goal: GoapState,
    ) -> (Option<PlanSpec<S>>, GoapSearchStats) {
        let (steps, stats) = self.search(start, goal);
        let plan = steps.map(|steps| {
            PlanSpec::new(
                steps
                    .into_iter()
                    .map(|idx| self.actions[idx].spec.clone())
                    .collect(),
            )
        });
        (plan, stats)
    }

    /// A* over reachable atom states, returning indices into [`GoapPlanner::actions`]. Cheapest
    /// plan first; among equal costs the plan whose actions come earlier in the library wins, so
    /// results never depend on hashing.
    pub fn search(&self, start: GoapState, goal: GoapState) -> (Option<Vec<usize>>, GoapSearchStats) {
        let mut stats = GoapSearchStats::default();
        if goal_met(start, goal) {
            return (Some(vec![]), stats);
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        struct OpenNode {
            f: u32,
            g: u32,
            state: GoapState,
            tie: u64,
        }

        impl OpenNode {
            fn key(&self) -> (u32, u32, u64, GoapState) {
                (self.f, self.g, self.tie, self.state)
            }
        }

        impl Ord for OpenNode {
            fn cmp(&self, other: &Self) -> Ordering {
                // Reverse ordering to make BinaryHeap behave like a min-heap.
                other.key().cmp(&self.key())
            }
        }

        impl PartialOrd for OpenNode {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        // Each step clears at most `max_gain` missing goal atoms and costs at least `min_cost`.
        let min_cost = self.actions.iter().map(|a| a.cost).min().unwrap_or(0);
        let max_gain = self
            .actions
            .iter()
            .map(|a| (a.add & goal).count_ones())
            .max()
            .unwrap_or(1)
            .max(1);
        let h = |state: GoapState| -> u32 {
            let missing = (goal & !state).count_ones();
            missing.div_ceil(max_gain).saturating_mul(min_cost)
        };

        let mut open = BinaryHeap::<OpenNode>::new();
        let mut tie: u64 = 0;
        let mut g_score: BTreeMap<GoapState, u32> = BTreeMap::new();
        let mut came_from: BTreeMap<GoapState, (GoapState, usize)> = BTreeMap::new();

        g_score.insert(start, 0);
        open.push(OpenNode {
            f: h(start),
            g: 0,
            state: start,
            tie,
        });
        tie += 1;

        while let Some(node) = open.pop() {
            let best_g = g_score.get(&node.state).copied().unwrap_or(u32::MAX);
            if node.g != best_g {
                continue; // stale heap entry
            }

            stats.expansions += 1;
            if stats.expansions > self.config.max_expansions {
                stats.budget_exhausted = true;
                return (None, stats);
            }

            if goal_met(node.state, goal) {
                let mut steps: Vec<usize> = Vec::new();
                let mut current = node.state;
                while let Some((prev, action_idx)) = came_from.get(&current).copied() {
                    steps.push(action_idx);
                    current = prev;
                }
                steps.reverse();
                return (Some(steps), stats);
            }

            for (action_idx, action) in self.actions.iter().enumerate() {
                if !action.is_applicable(node.state) {
                    continue;
                }
                let next = action.apply(node.state);
                if next == node.state {
                    continue;
                }

                let next_g = node.g.saturating_add(action.cost);
                let prev_best = g_score.get(&next).copied().unwrap_or(u32::MAX);
                if next_g >= prev_best {
                    continue;
                }

                g_score.insert(next, next_g);
                came_from.insert(next, (node.state, action_idx));
                open.push(OpenNode {
                    f: next_g.saturating_add(h(next)),
                    g: next_g,
                    state: next,
                    tie,
                });
                tie += 1;
            }
        }

        (None, stats)
    }

    /// Total cost of running `steps` in order from `start`, or `None` if a step is not applicable
    /// when reached.
    pub fn plan_cost(&self, start: GoapState, steps: &[usize]) -> Option<u32> {
        let mut state = start;
        let mut cost = 0u32;
        for &idx in steps {
            let action = self.actions.get(idx)?;
            if !action.is_applicable(state) {
                return None;
            }
            state = action.apply(state);
            cost = cost.saturating_add(action.cost);
        }
        Some(cost)
    }
}
