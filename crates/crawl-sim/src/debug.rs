//! Pause/step control, seed forcing and per-agent inspection dumps.

use std::collections::{BTreeMap, BTreeSet};

use crawl_core::{
    AgentId, Facing, FactValue, SimError, SimResult, SplitMix64, Tile, TraceEvent,
};
use serde::Serialize;

use crate::agent::Travel;
use crate::memory;
use crate::queue::{ActionReport, InFlight};
use crate::{ActionKind, Simulation};

/// One blackboard entry as shown to a developer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactDump {
    pub key: String,
    pub value: FactValue,
    pub stamped_at: u64,
    pub confidence: f32,
}

/// A read-only snapshot of everything one agent is thinking and doing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentInspection {
    pub agent: AgentId,
    pub kind: String,
    pub tile: Tile,
    pub facing: Facing,
    pub hp: i32,
    pub max_hp: i32,
    pub alive: bool,
    pub branch: Option<&'static str>,
    /// Root-to-running-node ids of the behavior tree cursor.
    pub cursor_path: Vec<u32>,
    pub running_leaf: Option<String>,
    pub in_flight: Option<InFlight>,
    pub last_action: Option<ActionReport>,
    pub cooldowns: BTreeMap<ActionKind, u32>,
    pub facts: Vec<FactDump>,
    pub travel: Option<Travel>,
    pub cached_paths: Vec<(Tile, u64)>,
    pub rng_state: u64,
    pub trace: Vec<TraceEvent>,
    /// Only filled while the agent's FOV overlay is on.
    pub fov: Option<BTreeSet<Tile>>,
}

impl AgentInspection {
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Simulation {
    pub fn pause(&mut self) {
        self.paused = true;
        tracing::info!(tick = self.tick, "paused");
    }

    pub fn resume(&mut self) {
        self.paused = false;
        tracing::info!(tick = self.tick, "resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Advance exactly one tick, paused or not.
    pub fn step_once(&mut self) {
        self.advance();
    }

    /// Reseed the dungeon and every agent's stream as if they had been spawned under `seed`.
    pub fn force_seed(&mut self, seed: u64) {
        self.config.seed = seed;
        for (id, mind) in &mut self.minds {
            mind.brain.rng = SplitMix64::for_agent(seed, id.stable_id());
        }
        tracing::info!(seed, tick = self.tick, "seed forced");
    }

    pub fn set_fov_overlay(&mut self, agent: AgentId, on: bool) -> SimResult<()> {
        let mind = self
            .minds
            .get_mut(&agent)
            .ok_or_else(|| SimError::data_integrity("debug", format!("no agent {agent}")))?;
        mind.brain.fov_overlay = on;
        Ok(())
    }

    /// The tiles `agent` saw on its last think, when its overlay is on.
    pub fn fov_overlay(&self, agent: AgentId) -> Option<&BTreeSet<Tile>> {
        let mind = self.minds.get(&agent)?;
        if !mind.brain.fov_overlay {
            return None;
        }
        mind.brain.fov.last()
    }

    pub fn inspect(&self, agent: AgentId) -> Option<AgentInspection> {
        let body = self.bodies.get(&agent)?;
        let mind = self.minds.get(&agent)?;
        let brain = &mind.brain;
        let running_leaf = mind.cursor.running().and_then(|node| {
            mind.profile
                .tree
                .as_ref()
                .and_then(|t| t.leaf(node))
                .map(|leaf| format!("{leaf:?}"))
        });
        let facts = brain
            .blackboard
            .iter()
            .map(|(id, fact)| FactDump {
                key: memory::key_name(id)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#{id}")),
                value: fact.value.clone(),
                stamped_at: fact.stamped_at,
                confidence: fact.confidence(self.tick),
            })
            .collect();
        Some(AgentInspection {
            agent,
            kind: body.kind.clone(),
            tile: body.tile,
            facing: body.facing,
            hp: body.hp,
            max_hp: body.max_hp,
            alive: body.alive,
            branch: mind.active_branch().map(|b| b.name()),
            cursor_path: mind.cursor.path().iter().map(|n| n.0).collect(),
            running_leaf,
            in_flight: brain.queue.in_flight().copied(),
            last_action: brain.queue.last().copied(),
            cooldowns: brain.queue.cooldowns().clone(),
            facts,
            travel: brain.travel,
            cached_paths: brain
                .paths
                .keys()
                .map(|(_, target, generation)| (target, generation))
                .collect(),
            rng_state: brain.rng.state(),
            trace: brain.trace.tail(16),
            fov: self.fov_overlay(agent).cloned(),
        })
    }
}
