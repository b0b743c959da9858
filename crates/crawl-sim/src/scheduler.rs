//! The tick loop: deliver, think on a frozen snapshot, then act serially in id order.

use std::collections::BTreeMap;
use std::sync::Arc;

use crawl_bt::Tree;
use crawl_core::{
    AgentId, Facing, Retention, SimError, SimResult, StableHasher, ThreatClass, Tile, TraceEvent,
};
use crawl_perception::Roster;
use crawl_world::GridWorld;

use crate::agent::{Mind, Profile, Snapshot};
use crate::leaves::{Leaf, LeafLibrary};
use crate::memory::HOME;
use crate::{
    ActCtx, Body, Command, Definitions, Event, EventBus, FactionTable, Formation, SimConfig,
};

/// A spawn asked for during play, resolved at the start of the next tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub kind: String,
    pub tile: Tile,
    pub facing: Facing,
}

/// Faction lookups over the current bodies.
pub struct Census<'a> {
    bodies: &'a BTreeMap<AgentId, Body>,
    factions: &'a FactionTable,
}

impl Roster for Census<'_> {
    fn threat(&self, observer: AgentId, other: AgentId) -> ThreatClass {
        match (self.bodies.get(&observer), self.bodies.get(&other)) {
            (Some(a), Some(b)) => self.factions.threat(a.faction, b.faction),
            _ => ThreatClass::Neutral,
        }
    }
}

/// The whole simulation: world, agents and the event bus, advanced one tick at a time.
pub struct Simulation {
    pub(crate) config: SimConfig,
    pub(crate) defs: Definitions,
    pub(crate) factions: FactionTable,
    presets: BTreeMap<String, Arc<Tree<Leaf>>>,
    pub(crate) world: GridWorld,
    pub(crate) bodies: BTreeMap<AgentId, Body>,
    pub(crate) minds: BTreeMap<AgentId, Mind>,
    pub(crate) bus: EventBus,
    pub(crate) tick: u64,
    pub(crate) next_id: u64,
    pub(crate) paused: bool,
    spawn_queue: Vec<SpawnRequest>,
    spawn_failures: u64,
}

impl Simulation {
    pub fn new(config: SimConfig, defs: Definitions, world: GridWorld) -> Self {
        let factions = defs.faction_table();
        Self {
            config,
            defs,
            factions,
            presets: BTreeMap::new(),
            world,
            bodies: BTreeMap::new(),
            minds: BTreeMap::new(),
            bus: EventBus::new(),
            tick: 0,
            next_id: 1,
            paused: false,
            spawn_queue: Vec::new(),
            spawn_failures: 0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn definitions(&self) -> &Definitions {
        &self.defs
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    /// Edit the map between ticks (scripted events, level setup).
    pub fn world_mut(&mut self) -> &mut GridWorld {
        &mut self.world
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn bodies(&self) -> &BTreeMap<AgentId, Body> {
        &self.bodies
    }

    pub fn body(&self, agent: AgentId) -> Option<&Body> {
        self.bodies.get(&agent)
    }

    pub fn mind(&self, agent: AgentId) -> Option<&Mind> {
        self.minds.get(&agent)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn agents(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.bodies.keys().copied()
    }

    pub fn living(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values().filter(|b| b.alive)
    }

    pub fn spawn_failures(&self) -> u64 {
        self.spawn_failures
    }

    /// Compiled tree for a preset, shared by every agent that runs it.
    pub(crate) fn preset(&mut self, name: &str) -> SimResult<Arc<Tree<Leaf>>> {
        if let Some(tree) = self.presets.get(name) {
            return Ok(Arc::clone(tree));
        }
        let library = LeafLibrary::new(&self.config);
        let tree = Arc::new(self.defs.behavior(name)?.compile_preset(&library)?);
        self.presets.insert(name.to_string(), Arc::clone(&tree));
        Ok(tree)
    }

    /// Resolve `kind` against the definitions into a body and its profile. Nothing is placed.
    pub(crate) fn instantiate(
        &mut self,
        id: AgentId,
        kind: &str,
        tile: Tile,
        facing: Facing,
    ) -> SimResult<(Body, Profile)> {
        let def = self.defs.creature(kind)?.clone();
        let faction = self.defs.faction_id(&def.faction)?;
        if let Some(loot) = &def.loot {
            self.defs.loot_table(loot)?;
        }
        let tree = match &def.behavior {
            Some(name) => Some(self.preset(name)?),
            None => None,
        };
        let body = Body {
            id,
            kind: kind.to_string(),
            tile,
            facing,
            footprint: def.footprint,
            hp: def.hp,
            max_hp: def.hp,
            mana: def.mana,
            max_mana: def.mana,
            min_atk: def.min_atk,
            max_atk: def.max_atk,
            strength: def.strength,
            faction,
            keys: def.keys.iter().copied().collect(),
            potions: def.potions,
            alive: true,
            opens_doors: def.opens_doors,
            bashes_doors: def.bashes_doors,
            spells: def.spells.clone(),
            loot: def.loot.clone(),
            party: None,
        };
        let profile = Profile {
            kind: kind.to_string(),
            tree,
            goal: def.goal,
            reaction_ticks: def.reaction_ticks.unwrap_or(self.config.default_reaction_ticks),
            act_every_ticks: def.act_every_ticks.max(1),
            senses: def.senses.unwrap_or_else(|| self.config.default_senses()),
            controlled: false,
        };
        Ok((body, profile))
    }

    /// Place a creature now. Unresolvable definitions and blocked tiles are
    /// [`SimError::DataIntegrity`]; nothing is placed in that case.
    pub fn spawn(&mut self, kind: &str, tile: Tile, facing: Facing) -> SimResult<AgentId> {
        let id = AgentId(self.next_id);
        let (body, profile) = self.instantiate(id, kind, tile, facing)?;
        self.place(body, profile)
    }

    /// Place the player party, driven by [`Simulation::submit`].
    pub fn spawn_party(
        &mut self,
        formation: Formation,
        tile: Tile,
        facing: Facing,
        faction: &str,
    ) -> SimResult<AgentId> {
        let id = AgentId(self.next_id);
        let faction = self.defs.faction_id(faction)?;
        let mut body = Body {
            id,
            kind: "party".to_string(),
            tile,
            facing,
            footprint: crawl_nav::Footprint::SINGLE,
            hp: 0,
            max_hp: 0,
            mana: 0,
            max_mana: 0,
            min_atk: 0,
            max_atk: 0,
            strength: 3,
            faction,
            keys: Default::default(),
            potions: 0,
            alive: true,
            opens_doors: true,
            bashes_doors: true,
            spells: vec![crate::Spell::Firebolt, crate::Spell::Mend],
            loot: None,
            party: Some(formation),
        };
        body.sync_party();
        let profile = self.party_profile();
        self.place(body, profile)
    }

    pub(crate) fn party_profile(&self) -> Profile {
        Profile {
            kind: "party".to_string(),
            tree: None,
            goal: None,
            reaction_ticks: 1,
            act_every_ticks: 1,
            senses: self.config.default_senses(),
            controlled: true,
        }
    }

    fn place(&mut self, body: Body, profile: Profile) -> SimResult<AgentId> {
        let id = body.id;
        self.world.occupy(id, &body.cells()).map_err(|e| {
            SimError::data_integrity("spawn", format!("{} at {:?}: {e}", body.kind, body.tile))
        })?;
        let mut mind = Mind::new(id, profile, &self.config);
        mind.brain
            .blackboard
            .set(HOME, body.tile, self.tick, Retention::Forever);
        tracing::debug!(agent = %id, kind = %body.kind, tile = ?body.tile, "spawned");
        self.next_id += 1;
        self.bodies.insert(id, body);
        self.minds.insert(id, mind);
        Ok(id)
    }

    /// Queue a spawn for the start of the next tick. A spawn that cannot be resolved then is
    /// logged and skipped.
    pub fn request_spawn(&mut self, kind: impl Into<String>, tile: Tile, facing: Facing) {
        self.spawn_queue.push(SpawnRequest {
            kind: kind.into(),
            tile,
            facing,
        });
    }

    fn process_spawns(&mut self) {
        for request in std::mem::take(&mut self.spawn_queue) {
            if let Err(err) = self.spawn(&request.kind, request.tile, request.facing) {
                self.spawn_failures += 1;
                tracing::warn!(
                    kind = %request.kind,
                    tile = ?request.tile,
                    error = %err,
                    "spawn skipped"
                );
            }
        }
    }

    /// Queue a command for a controlled agent. It is consumed by that agent's next think.
    pub fn submit(&mut self, agent: AgentId, command: Command) -> SimResult<()> {
        let mind = self
            .minds
            .get_mut(&agent)
            .filter(|m| m.profile.controlled)
            .ok_or_else(|| {
                SimError::data_integrity("command", format!("{agent} is not a controlled agent"))
            })?;
        mind.brain.commands.push_back(command);
        Ok(())
    }

    /// Remove an agent outright. A living agent is announced as down.
    pub fn despawn(&mut self, agent: AgentId) -> Option<Body> {
        let body = self.bodies.remove(&agent)?;
        self.minds.remove(&agent);
        if body.alive {
            self.world.vacate(agent, &body.cells());
            self.bus.publish(Event::AgentDown {
                agent,
                by: None,
                tile: body.tile,
            });
        }
        for mind in self.minds.values_mut() {
            mind.brain.paths.forget_agent(agent);
        }
        Some(body)
    }

    /// Advance one tick unless paused. Returns whether a tick ran.
    pub fn step(&mut self) -> bool {
        if self.paused {
            return false;
        }
        self.advance();
        true
    }

    /// Run up to `ticks` ticks; stops early while paused.
    pub fn run(&mut self, ticks: u64) -> u64 {
        let mut ran = 0;
        while ran < ticks && self.step() {
            ran += 1;
        }
        ran
    }

    pub(crate) fn advance(&mut self) {
        let tick = self.tick;
        let _span = tracing::debug_span!("tick", tick).entered();

        let subscribers: Vec<AgentId> = self.living().map(|b| b.id).collect();
        self.bus.deliver(subscribers);
        self.reap_dead();
        self.process_spawns();

        for mind in self.minds.values_mut() {
            mind.brain.queue.begin_tick();
        }

        let slots = self.planner_slots();
        self.think_all(&slots);
        self.act_all();

        self.world.decay_scent(self.config.scent_decay);
        self.tick += 1;
    }

    /// Agents that went down last tick leave once their `AgentDown` has been delivered.
    fn reap_dead(&mut self) {
        let dead: Vec<AgentId> = self
            .bodies
            .values()
            .filter(|b| !b.alive)
            .map(|b| b.id)
            .collect();
        for id in dead {
            self.despawn(id);
            tracing::debug!(agent = %id, "removed");
        }
    }

    /// Tree-driven agents allowed a full re-evaluation this tick: everyone while under the cap,
    /// otherwise a window that rotates with the tick.
    fn planner_slots(&self) -> Vec<AgentId> {
        let candidates: Vec<AgentId> = self
            .minds
            .iter()
            .filter(|(id, m)| !m.profile.controlled && self.bodies.get(*id).is_some_and(|b| b.alive))
            .map(|(id, _)| *id)
            .collect();
        let cap = self.config.max_planners_per_tick;
        if candidates.len() <= cap {
            return candidates;
        }
        let start = (self.tick as usize).wrapping_mul(cap) % candidates.len();
        let mut slots: Vec<AgentId> = candidates
            .iter()
            .cycle()
            .skip(start)
            .take(cap)
            .copied()
            .collect();
        slots.sort();
        slots
    }

    fn think_all(&mut self, slots: &[AgentId]) {
        let census = Census {
            bodies: &self.bodies,
            factions: &self.factions,
        };
        let snap = Snapshot {
            world: &self.world,
            bodies: &self.bodies,
            roster: &census,
            config: &self.config,
            tick: self.tick,
        };
        let bodies = &self.bodies;
        let think = |(id, mind): (&AgentId, &mut Mind)| {
            if let Some(me) = bodies.get(id) {
                mind.think(me, &snap, slots.binary_search(id).is_ok());
            }
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            let mut work: Vec<(&AgentId, &mut Mind)> = self.minds.iter_mut().collect();
            work.par_iter_mut().for_each(|(id, mind)| think((*id, &mut **mind)));
        }
        #[cfg(not(feature = "parallel"))]
        self.minds.iter_mut().for_each(think);
    }

    fn act_all(&mut self) {
        let tick = self.tick;
        let ids: Vec<AgentId> = self.minds.keys().copied().collect();
        for id in ids {
            let Some(mind) = self.minds.get_mut(&id) else {
                continue;
            };
            mind.brain.inbox.extend(self.bus.drain(id));
            let intent = mind.brain.queue.take_request();
            let swap = mind.brain.swap.take();

            let Some(body) = self.bodies.get_mut(&id).filter(|b| b.alive) else {
                continue;
            };
            if let (Some((a, b)), Some(formation)) = (swap, body.party.as_mut()) {
                formation.swap(a, b);
            }
            if !mind.profile.should_act(tick, id) {
                continue;
            }
            let Some(action) = intent else {
                continue;
            };

            let mut ctx = ActCtx {
                tick,
                world: &mut self.world,
                bodies: &mut self.bodies,
                bus: &mut self.bus,
                rng: &mut mind.brain.rng,
                config: &self.config,
                loot: &self.defs.loot,
            };
            let report = mind.brain.queue.execute(action, id, &mut ctx);
            if report.failed() {
                mind.brain
                    .trace
                    .push(TraceEvent::new(tick, "act.fail").with_a(id.0));
                tracing::debug!(agent = %id, ?action, fault = ?report.fault, "action failed");
            }
        }
    }

    /// Stable hash over the world, every body and every agent's RNG stream.
    pub fn world_hash(&self) -> u64 {
        let mut h = StableHasher::new();
        h.write_u64(self.tick).write_u64(self.world.state_hash());
        for (id, body) in &self.bodies {
            body.hash_into(&mut h);
            if let Some(mind) = self.minds.get(id) {
                h.write_u64(mind.brain.rng.state());
            }
        }
        h.finish()
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("agents", &self.bodies.len())
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}
