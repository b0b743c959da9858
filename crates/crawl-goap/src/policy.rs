use crawl_core::{PlanRun, PlanSpec};

use crate::{goal_met, GoapPlanner, GoapState};

/// Cache/invalidation key for a GOAP plan.
///
/// - `start`: current atom state.
/// - `goal`: desired atoms; satisfied when `(start & goal) == goal`.
/// - `signature`: invalidation input for facts not represented as atoms (the world's path
///   generation in the simulation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoapPlanKey {
    pub start: GoapState,
    pub goal: GoapState,
    pub signature: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoapPlanPolicyConfig {
    /// Minimum ticks between two replans caused by drift from the expected state.
    pub min_replan_interval_ticks: u32,
    /// Cap on how many times a plan may be started for the same key. Guards against loops where
    /// steps succeed but their modeled effects never show up.
    pub max_plan_starts_per_key: Option<u32>,
}

impl Default for GoapPlanPolicyConfig {
    fn default() -> Self {
        Self {
            min_replan_interval_ticks: 0,
            max_plan_starts_per_key: Some(3),
        }
    }
}

/// What the agent should do this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoapStep<S> {
    /// The goal already holds.
    Done,
    /// Run this step.
    Step(S),
    /// No plan reaches the goal from here.
    NoPlan,
    /// The same plan was restarted too often without reaching the goal.
    Exhausted,
}

#[derive(Debug, Clone)]
struct ActivePlan<S> {
    key: GoapPlanKey,
    run: PlanRun<S>,
    /// `states[i]` is the modeled state before step `i`; the last entry is the final state.
    states: Vec<GoapState>,
}

/// Per-agent plan driver: plans on demand, follows the plan by watching the observed atom state
/// advance through the modeled states, and replans on drift.
#[derive(Debug, Clone)]
pub struct GoapPlanPolicy<S> {
    config: GoapPlanPolicyConfig,
    active: Option<ActivePlan<S>>,
    last_planned_tick: Option<u64>,
    last_started_key: Option<GoapPlanKey>,
    starts_for_key: u32,
    plan_calls: u64,
}

impl<S: Clone> Default for GoapPlanPolicy<S> {
    fn default() -> Self {
        Self::new(GoapPlanPolicyConfig::default())
    }
}

impl<S: Clone> GoapPlanPolicy<S> {
    pub fn new(config: GoapPlanPolicyConfig) -> Self {
        Self {
            config,
            active: None,
            last_planned_tick: None,
            last_started_key: None,
            starts_for_key: 0,
            plan_calls: 0,
        }
    }

    pub fn plan_calls(&self) -> u64 {
        self.plan_calls
    }

    pub fn current_plan(&self) -> Option<&PlanSpec<S>> {
        self.active.as_ref().map(|a| a.run.plan())
    }

    pub fn current_index(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.run.current_index())
    }

    /// Drop the running plan; the next call replans.
    pub fn invalidate(&mut self) {
        self.active = None;
    }

    pub fn next_step(&mut self, planner: &GoapPlanner<S>, key: GoapPlanKey, tick: u64) -> GoapStep<S> {
        if goal_met(key.start, key.goal) {
            self.active = None;
            self.last_started_key = None;
            self.starts_for_key = 0;
            return GoapStep::Done;
        }

        if let Some(step) = self.follow(key, tick) {
            return GoapStep::Step(step);
        }
        self.active = None;

        if self.last_started_key == Some(key) {
            if let Some(max) = self.config.max_plan_starts_per_key {
                if self.starts_for_key >= max {
                    return GoapStep::Exhausted;
                }
            }
        } else {
            self.last_started_key = Some(key);
            self.starts_for_key = 0;
        }

        self.plan_calls += 1;
        self.last_planned_tick = Some(tick);
        let Some(steps) = planner.search(key.start, key.goal).0 else {
            return GoapStep::NoPlan;
        };
        let mut states = Vec::with_capacity(steps.len() + 1);
        let mut state = key.start;
        states.push(state);
        let mut specs = Vec::with_capacity(steps.len());
        for idx in steps {
            let Some(action) = planner.actions().get(idx) else {
                return GoapStep::NoPlan;
            };
            state = action.apply(state);
            states.push(state);
            specs.push(action.spec.clone());
        }
        let Some(first) = specs.first().cloned() else {
            return GoapStep::Done;
        };
        self.starts_for_key += 1;
        self.active = Some(ActivePlan {
            key,
            run: PlanRun::new(PlanSpec::new(specs)),
            states,
        });
        GoapStep::Step(first)
    }

    /// Keep following the active plan if `key` is still on it.
    fn follow(&mut self, key: GoapPlanKey, tick: u64) -> Option<S> {
        let throttled = self
            .last_planned_tick
            .is_some_and(|t| tick < t + self.config.min_replan_interval_ticks as u64);
        let active = self.active.as_mut()?;
        if active.key.goal != key.goal || active.key.signature != key.signature {
            return None;
        }
        let from = active.run.current_index();
        let last_step = active.run.plan().len();
        let on_plan = active.states[from..last_step]
            .iter()
            .position(|s| *s == key.start)
            .map(|offset| from + offset);
        match on_plan {
            Some(at) => {
                while active.run.current_index() < at {
                    active.run.advance();
                }
                active.run.current().cloned()
            }
            None if throttled => active.run.current().cloned(),
            None => None,
        }
    }
}
