//! Save games: the complete simulation state as JSON.
//!
//! Every field has a default, so saves written by older builds (or trimmed by hand) still load;
//! missing per-agent state is rebuilt the way a fresh spawn would build it.

use std::collections::VecDeque;
use std::path::Path;

use crawl_bt::Cursor;
use crawl_core::{Blackboard, SimError, SimResult, SplitMix64, TraceLog};
use crawl_nav::StuckTracker;
use crawl_world::GridWorld;
use serde::{Deserialize, Serialize};

use crate::agent::{Mind, Travel};
use crate::{ActionQueue, Body, Command, Definitions, Event, EventBus, SimConfig, Simulation};

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSave {
    pub body: Body,
    #[serde(default)]
    pub blackboard: Blackboard,
    #[serde(default)]
    pub cursor: Cursor,
    /// Reseeded from the dungeon seed when absent.
    #[serde(default)]
    pub rng: Option<SplitMix64>,
    #[serde(default)]
    pub queue: ActionQueue,
    #[serde(default)]
    pub travel: Option<Travel>,
    #[serde(default)]
    pub stuck: StuckTracker,
    #[serde(default)]
    pub trace: Option<TraceLog>,
    #[serde(default)]
    pub commands: VecDeque<Command>,
    /// Events drained in the last act phase and not yet perceived.
    #[serde(default)]
    pub inbox: Vec<Event>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveGame {
    pub version: u32,
    pub tick: u64,
    pub config: SimConfig,
    pub world: Option<GridWorld>,
    pub agents: Vec<AgentSave>,
    pub bus: EventBus,
    pub next_id: u64,
}

impl SaveGame {
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn save_to(&self, path: &Path) -> SimResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

impl Simulation {
    pub fn to_save(&self) -> SaveGame {
        let agents = self
            .bodies
            .iter()
            .filter_map(|(id, body)| {
                let mind = self.minds.get(id)?;
                Some(AgentSave {
                    body: body.clone(),
                    blackboard: mind.brain.blackboard.clone(),
                    cursor: mind.cursor.clone(),
                    rng: Some(mind.brain.rng),
                    queue: mind.brain.queue.clone(),
                    travel: mind.brain.travel,
                    stuck: mind.brain.stuck,
                    trace: Some(mind.brain.trace.clone()),
                    commands: mind.brain.commands.clone(),
                    inbox: mind.brain.inbox.clone(),
                })
            })
            .collect();
        SaveGame {
            version: SAVE_VERSION,
            tick: self.tick,
            config: self.config.clone(),
            world: Some(self.world.clone()),
            agents,
            bus: self.bus.clone(),
            next_id: self.next_id,
        }
    }

    /// Rebuild a simulation from a save. Agents whose kind no longer resolves, or whose cells are
    /// taken, are logged and left out.
    pub fn from_save(save: SaveGame, defs: Definitions) -> SimResult<Self> {
        if save.version > SAVE_VERSION {
            tracing::warn!(version = save.version, "save written by a newer build");
        }
        let mut world = save
            .world
            .ok_or_else(|| SimError::Save("save has no world".to_string()))?;
        world.rehydrate();

        let mut sim = Simulation::new(save.config, defs, world);
        sim.tick = save.tick;
        sim.bus = save.bus;
        let mut next_id = save.next_id.max(1);

        for agent in save.agents {
            let body = agent.body;
            let id = body.id;
            next_id = next_id.max(id.0 + 1);
            let profile = if body.party.is_some() {
                sim.party_profile()
            } else {
                match sim.instantiate(id, &body.kind, body.tile, body.facing) {
                    Ok((_, profile)) => profile,
                    Err(err) => {
                        tracing::warn!(agent = %id, kind = %body.kind, error = %err, "saved agent skipped");
                        continue;
                    }
                }
            };
            if body.alive {
                if let Err(err) = sim.world.occupy(id, &body.cells()) {
                    tracing::warn!(agent = %id, error = %err, "saved agent skipped");
                    continue;
                }
            }

            let mut mind = Mind::new(id, profile, &sim.config);
            mind.cursor = agent.cursor;
            let brain = &mut mind.brain;
            brain.blackboard = agent.blackboard;
            brain.queue = agent.queue;
            brain.travel = agent.travel;
            brain.stuck = agent.stuck;
            brain.commands = agent.commands;
            brain.inbox = agent.inbox;
            if let Some(rng) = agent.rng {
                brain.rng = rng;
            } else {
                brain.rng = SplitMix64::for_agent(sim.config.seed, id.stable_id());
            }
            if let Some(trace) = agent.trace {
                brain.trace = trace;
            }
            sim.bodies.insert(id, body);
            sim.minds.insert(id, mind);
        }
        sim.next_id = next_id;
        tracing::info!(tick = sim.tick, agents = sim.bodies.len(), "save loaded");
        Ok(sim)
    }
}
