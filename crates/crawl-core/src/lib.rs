//! Deterministic kernel primitives for the dungeon agent simulation.
//!
//! Ids, tile geometry, seeded RNG streams, the decaying per-agent blackboard, action status values
//! and the in-simulation trace log. Nothing here reads wall-clock time or global state.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod agent;
pub mod blackboard;
pub mod error;
pub mod geom;
pub mod plan;
pub mod rng;
pub mod trace;

pub use action::{ActionStatus, Fault, Precondition};
pub use agent::{AgentId, FactionId, KeyId, ThreatClass};
pub use blackboard::{
    ApplyReport, BbKey, Blackboard, Fact, FactType, FactValue, MemoryUpdate, Retention, Sighting,
    TileSet,
};
pub use error::{SimError, SimResult};
pub use geom::{to_local, to_world, Facing, Tile, TileRect};
pub use plan::{PlanRun, PlanSpec};
pub use rng::{DeterministicRng, SplitMix64, StableHasher};
pub use trace::{TraceEvent, TraceLog};
