//! Deterministic NPC simulation for a tile-grid dungeon crawler.
//!
//! Each tick delivers last tick's events, lets every agent perceive and pick one intent against
//! the frozen world, then performs those intents one agent at a time in ascending id order.
//! Identical seed, definitions and inputs always produce the identical world hash.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod agent;
pub mod body;
pub mod config;
pub mod debug;
pub mod defs;
pub mod events;
pub mod goap;
pub mod leaves;
pub mod memory;
pub mod party;
pub mod queue;
pub mod repro;
pub mod save;
pub mod scheduler;

pub use action::{ActCtx, Action, ActionKind, Spell, POTION_HEAL};
pub use agent::{Brain, Command, Mind, Profile, Snapshot, Travel};
pub use body::Body;
pub use config::SimConfig;
pub use debug::{AgentInspection, FactDump};
pub use defs::{CreatureDef, Definitions, FactionTable, LootEntry, LootTable};
pub use events::{Event, EventBus};
pub use goap::{GoalKind, GoapOp};
pub use leaves::{Leaf, LeafLibrary};
pub use party::{Formation, Hit, Member, Slot};
pub use queue::{ActionQueue, ActionReport, InFlight};
pub use repro::{ReplayHarness, ReplayInput};
pub use save::{AgentSave, SaveGame, SAVE_VERSION};
pub use scheduler::{Census, Simulation, SpawnRequest};
