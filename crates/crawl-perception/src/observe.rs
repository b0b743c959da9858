use std::collections::{BTreeMap, BTreeSet};

use crawl_core::{AgentId, Facing, ThreatClass, Tile};
use crawl_world::{SpecialFlag, WorldView};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{hear, sniff, FovCache, HeardNoise, Noise, ScentTrace, Senses};

/// Classifies other agents from one observer's point of view (faction relations).
pub trait Roster {
    fn threat(&self, observer: AgentId, other: AgentId) -> ThreatClass;
}

impl<F> Roster for F
where
    F: Fn(AgentId, AgentId) -> ThreatClass,
{
    fn threat(&self, observer: AgentId, other: AgentId) -> ThreatClass {
        self(observer, other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeenAgent {
    pub agent: AgentId,
    /// Nearest visible cell of the agent's footprint.
    pub tile: Tile,
    pub threat: ThreatClass,
}

/// Everything one agent perceived in one tick.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Observations {
    pub tick: u64,
    pub origin: Tile,
    pub facing: Facing,
    pub visible_tiles: BTreeSet<Tile>,
    /// Ascending agent id.
    pub visible_agents: Vec<SeenAgent>,
    /// Loudest first.
    pub noises: Vec<HeardNoise>,
    pub specials: BTreeSet<(Tile, SpecialFlag)>,
    pub scent: Option<ScentTrace>,
}

impl Observations {
    pub fn hostiles(&self) -> impl Iterator<Item = &SeenAgent> {
        self.visible_agents
            .iter()
            .filter(|a| a.threat == ThreatClass::Hostile)
    }

    /// Nearest visible hostile; lower id wins ties.
    pub fn nearest_hostile(&self) -> Option<&SeenAgent> {
        self.hostiles()
            .min_by_key(|a| (self.origin.manhattan(a.tile), a.agent))
    }

    pub fn sees(&self, tile: Tile) -> bool {
        self.visible_tiles.contains(&tile)
    }
}

/// Input for one [`observe`] call.
#[derive(Debug, Clone, Copy)]
pub struct Observer {
    pub agent: AgentId,
    pub tile: Tile,
    pub facing: Facing,
    pub senses: Senses,
}

/// Sight, hearing and smell for one agent against the committed world.
///
/// A tile in the sight set is reported visible when it is lit or adjacent to the observer; dark
/// tiles further away stay unseen, and so do agents standing on them. `noises` carries the sounds
/// delivered to this agent this tick (events); static emitters are added from the world.
pub fn observe<W, R>(
    world: &W,
    roster: &R,
    observer: &Observer,
    noises: &[Noise],
    cache: &mut FovCache,
    tick: u64,
) -> Observations
where
    W: WorldView + ?Sized,
    R: Roster + ?Sized,
{
    let senses = &observer.senses;
    let origin = observer.tile;
    let sight = cache.get_or_compute(
        world,
        origin,
        observer.facing,
        senses.sight_radius,
        senses.cone,
    );

    let visible_tiles: BTreeSet<Tile> = sight
        .iter()
        .copied()
        .filter(|t| world.light(*t) > 0 || origin.manhattan(*t) <= 1)
        .collect();

    let mut agents: BTreeMap<AgentId, Tile> = BTreeMap::new();
    let mut specials = BTreeSet::new();
    for &tile in &visible_tiles {
        if let Some(other) = world.occupant(tile) {
            if other != observer.agent {
                let slot = agents.entry(other).or_insert(tile);
                if origin.manhattan(tile) < origin.manhattan(*slot) {
                    *slot = tile;
                }
            }
        }
        if let Some(state) = world.tile(tile) {
            for flag in state.flags() {
                specials.insert((tile, flag));
            }
        }
    }
    let visible_agents = agents
        .into_iter()
        .map(|(agent, tile)| SeenAgent {
            agent,
            tile,
            threat: roster.threat(observer.agent, agent),
        })
        .collect();

    let emitted: Vec<Noise> = world
        .noise_emitters()
        .iter()
        .map(|e| Noise {
            origin: e.tile,
            intensity: e.intensity,
            source: None,
        })
        .collect();
    let noises = hear(origin, observer.agent, senses, emitted.iter().chain(noises));

    let scent = if senses.smell {
        sniff(world, origin, observer.agent)
    } else {
        None
    };

    Observations {
        tick,
        origin,
        facing: observer.facing,
        visible_tiles,
        visible_agents,
        noises,
        specials,
        scent,
    }
}
