//! Goal-oriented action planning over bitset world-state atoms.
//!
//! [`GoapPlanner`] runs A* from a start state to any state containing the goal atoms and returns a
//! `crawl-core` [`crawl_core::PlanSpec`]. [`GoapPlanPolicy`] wraps it for one agent: it caches the
//! running plan, advances it as the observed state moves through the modeled states, and replans
//! when the world drifts off the plan.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod planner;
pub mod policy;

pub use planner::{goal_met, GoapAction, GoapPlanner, GoapPlannerConfig, GoapSearchStats, GoapState};
pub use policy::{GoapPlanKey, GoapPlanPolicy, GoapPlanPolicyConfig, GoapStep};
