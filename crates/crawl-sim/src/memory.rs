//! Blackboard keys and the per-tick merge from observations and delivered events.

use std::collections::BTreeMap;

use crawl_core::{
    AgentId, BbKey, Blackboard, MemoryUpdate, Retention, Sighting, ThreatClass, Tile, TileSet,
};
use crawl_perception::Observations;
use crawl_world::{GridWorld, SpecialFlag};

use crate::{Action, Body, Event, SimConfig};

pub const TARGET: BbKey<Sighting> = BbKey::new(1);
/// Last known position of whatever the agent is afraid of.
pub const THREAT: BbKey<Tile> = BbKey::new(2);
pub const ENEMY_VISIBLE: BbKey<bool> = BbKey::new(3);
pub const LAST_ATTACKER: BbKey<AgentId> = BbKey::new(4);
pub const FEAR: BbKey<f32> = BbKey::new(5);
pub const ANGER: BbKey<f32> = BbKey::new(6);
pub const CURIOSITY: BbKey<f32> = BbKey::new(7);
pub const LAST_HP: BbKey<i64> = BbKey::new(8);
pub const NOISE: BbKey<Tile> = BbKey::new(9);
pub const SCENT: BbKey<Tile> = BbKey::new(10);
pub const KNOWN: BbKey<TileSet> = BbKey::new(11);
pub const DOORS: BbKey<TileSet> = BbKey::new(12);
pub const TRAPS: BbKey<TileSet> = BbKey::new(13);
pub const PITS: BbKey<TileSet> = BbKey::new(14);
pub const TELEPORTS: BbKey<TileSet> = BbKey::new(15);
pub const ITEMS: BbKey<TileSet> = BbKey::new(16);
pub const EXPLORE_GOAL: BbKey<Tile> = BbKey::new(17);
pub const HOME: BbKey<Tile> = BbKey::new(18);
pub const UNREACHABLE: BbKey<TileSet> = BbKey::new(19);
pub const MECHANISMS: BbKey<TileSet> = BbKey::new(20);

const CURIOSITY_PER_NOISE: f32 = 0.25;

/// Human-readable name for a key id, for inspection dumps and tree definitions.
pub fn key_name(id: u64) -> Option<&'static str> {
    Some(match id {
        1 => "target",
        2 => "threat",
        3 => "enemy_visible",
        4 => "last_attacker",
        5 => "fear",
        6 => "anger",
        7 => "curiosity",
        8 => "last_hp",
        9 => "noise",
        10 => "scent",
        11 => "known",
        12 => "doors",
        13 => "traps",
        14 => "pits",
        15 => "teleports",
        16 => "items",
        17 => "explore_goal",
        18 => "home",
        19 => "unreachable",
        20 => "mechanisms",
        _ => return None,
    })
}

pub fn key_id(name: &str) -> Option<u64> {
    (1..=20).find(|id| key_name(*id) == Some(name))
}

/// Build one tick's worth of writes. Nothing is applied here, so the result does not depend on
/// the order observations or events arrive in.
#[allow(clippy::too_many_arguments)]
pub fn remember(
    obs: &Observations,
    me: &Body,
    inbox: &[Event],
    world: &GridWorld,
    bodies: &BTreeMap<AgentId, Body>,
    blackboard: &Blackboard,
    config: &SimConfig,
    tick: u64,
) -> MemoryUpdate {
    let short = Retention::Ticks(config.short_term_horizon);
    let emotion = Retention::Ticks(config.emotion_horizon);
    let mut update = MemoryUpdate::new();

    for &tile in &obs.visible_tiles {
        update.insert_tile(KNOWN, tile, tick, Retention::Forever);
    }
    for &(tile, flag) in &obs.specials {
        let key = match flag {
            SpecialFlag::Door => DOORS,
            SpecialFlag::Trap => TRAPS,
            SpecialFlag::Pit => PITS,
            SpecialFlag::Teleport => TELEPORTS,
            SpecialFlag::Interactable => MECHANISMS,
            SpecialFlag::Item => continue,
        };
        update.insert_tile(key, tile, tick, Retention::Forever);
    }

    // Item knowledge is rebuilt wholesale so picked-up items drop out once seen gone.
    let mut items: TileSet = blackboard.get(ITEMS, tick).unwrap_or_default();
    items.retain(|t| !obs.visible_tiles.contains(t));
    items.extend(
        obs.specials
            .iter()
            .filter(|(_, flag)| *flag == SpecialFlag::Item)
            .map(|(tile, _)| *tile),
    );
    update.remember(ITEMS, items, tick, Retention::Forever);

    if let Some(target) = pick_target(obs, me, world, bodies) {
        update.remember(TARGET, target, tick, short);
        update.remember(THREAT, target.tile, tick, short);
        update.remember(ENEMY_VISIBLE, true, tick, Retention::Ticks(1));
    }

    if let Some(noise) = obs.noises.first() {
        update.remember(NOISE, noise.origin, tick, short);
        update.nudge(CURIOSITY, CURIOSITY_PER_NOISE, emotion);
    }
    if let Some(scent) = obs.scent {
        update.remember(SCENT, scent.tile, tick, short);
    }

    let hp = me.hp as i64;
    if let Some(last) = blackboard.get(LAST_HP, tick) {
        if hp < last && me.max_hp > 0 {
            let lost = (last - hp) as f32 / me.max_hp as f32;
            update.nudge(FEAR, lost * config.fear_per_damage, emotion);
            update.nudge(ANGER, lost * config.anger_per_damage, emotion);
        }
    }
    update.remember(LAST_HP, hp, tick, Retention::Forever);

    for event in inbox {
        if let Event::AgentDamaged {
            agent,
            by: Some(by),
            ..
        } = *event
        {
            if agent == me.id {
                update.remember(LAST_ATTACKER, by, tick, short);
            }
        }
    }
    update
}

/// Post-merge bookkeeping that removes facts invalidated by delivered events.
pub fn settle(blackboard: &mut Blackboard, inbox: &[Event], tick: u64) {
    for event in inbox {
        if let Event::AgentDown { agent, .. } = *event {
            if blackboard.get(TARGET, tick).is_some_and(|t| t.agent == agent) {
                blackboard.remove(TARGET);
            }
        }
    }
}

/// The visible hostile cheapest to engage: distance plus estimated attack ticks, id breaks ties.
fn pick_target(
    obs: &Observations,
    me: &Body,
    world: &GridWorld,
    bodies: &BTreeMap<AgentId, Body>,
) -> Option<Sighting> {
    obs.hostiles()
        .map(|seen| {
            let effort = Action::Attack { target: seen.agent }.cost(me, world, bodies);
            let score = me.distance_to(seen.tile) as f32 + effort;
            (score, seen)
        })
        .min_by(|(a, sa), (b, sb)| a.total_cmp(b).then(sa.agent.cmp(&sb.agent)))
        .map(|(_, seen)| Sighting {
            agent: seen.agent,
            tile: seen.tile,
            threat: ThreatClass::Hostile,
        })
}
