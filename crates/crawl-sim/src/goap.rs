//! GOAP fallback: world-state atoms read from an agent's memory and body, and the operator
//! library built from that agent's actions.

use std::collections::BTreeMap;

use crawl_core::{AgentId, Blackboard, Tile};
use crawl_goap::{GoapAction, GoapPlanner, GoapPlannerConfig, GoapState};
use crawl_perception::has_line_of_sight;
use crawl_world::GridWorld;
use serde::{Deserialize, Serialize};

use crate::memory::{TARGET, THREAT};
use crate::{Action, Body, SimConfig, Spell};

pub const ENEMY_KNOWN: GoapState = 1 << 0;
pub const ENEMY_ADJACENT: GoapState = 1 << 1;
pub const ENEMY_IN_RANGE: GoapState = 1 << 2;
pub const ENEMY_DEFEATED: GoapState = 1 << 3;
pub const SAFE: GoapState = 1 << 4;
pub const HEALTHY: GoapState = 1 << 5;
pub const HAS_POTION: GoapState = 1 << 6;
pub const HAS_MANA: GoapState = 1 << 7;

/// Distance from the last known threat that counts as safe.
pub const SAFE_DISTANCE: u32 = 6;
const HEALTHY_FRACTION: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    DefeatEnemy,
    Escape,
    Recover,
}

impl GoalKind {
    pub fn atoms(self) -> GoapState {
        match self {
            GoalKind::DefeatEnemy => ENEMY_DEFEATED,
            GoalKind::Escape => SAFE,
            GoalKind::Recover => HEALTHY,
        }
    }
}

/// Plan steps. Each maps onto a leaf behavior when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoapOp {
    Approach,
    Strike,
    Firebolt,
    Retreat,
    DrinkPotion,
    Mend,
}

/// Current atom state for `me` as it remembers the world at `tick`.
pub fn current_state(me: &Body, blackboard: &Blackboard, world: &GridWorld, tick: u64) -> GoapState {
    let mut state = 0;
    match blackboard.get(TARGET, tick) {
        Some(target) => {
            state |= ENEMY_KNOWN;
            let d = me.distance_to(target.tile);
            if d == 1 {
                state |= ENEMY_ADJACENT;
            }
            let range = Spell::Firebolt.range();
            if d <= range && has_line_of_sight(world, me.tile, target.tile, range as i32) {
                state |= ENEMY_IN_RANGE;
            }
        }
        None => state |= ENEMY_DEFEATED,
    }
    let safe = blackboard
        .get(THREAT, tick)
        .map(|t| me.distance_to(t) >= SAFE_DISTANCE)
        .unwrap_or(true);
    if safe {
        state |= SAFE;
    }
    if me.hp_fraction() >= HEALTHY_FRACTION {
        state |= HEALTHY;
    }
    if me.potions > 0 {
        state |= HAS_POTION;
    }
    let cheapest = me.spells.iter().map(|s| s.mana()).min();
    if cheapest.is_some_and(|m| me.available_mana(m)) {
        state |= HAS_MANA;
    }
    state
}

fn ticks(cost: f32) -> u32 {
    cost.ceil().max(1.0) as u32
}

/// Operators available to `me`, costed with the action library's estimates.
pub fn planner_for(
    me: &Body,
    target: Option<AgentId>,
    threat: Option<Tile>,
    world: &GridWorld,
    bodies: &BTreeMap<AgentId, Body>,
    config: &SimConfig,
) -> GoapPlanner<GoapOp> {
    let approach = target
        .and_then(|t| bodies.get(&t))
        .map(|b| me.distance_to_body(b).saturating_sub(1).max(1))
        .unwrap_or(4);
    let strike = target
        .map(|t| ticks(Action::Attack { target: t }.cost(me, world, bodies)))
        .unwrap_or(4);
    let retreat = threat
        .map(|t| SAFE_DISTANCE.saturating_sub(me.distance_to(t)).max(1))
        .unwrap_or(1);

    let mut ops = vec![
        GoapAction::new("approach", approach, GoapOp::Approach)
            .requires(ENEMY_KNOWN)
            .forbids(ENEMY_ADJACENT)
            .adds(ENEMY_ADJACENT | ENEMY_IN_RANGE)
            .removes(SAFE),
        GoapAction::new("strike", strike, GoapOp::Strike)
            .requires(ENEMY_ADJACENT)
            .adds(ENEMY_DEFEATED),
        GoapAction::new("retreat", retreat, GoapOp::Retreat)
            .forbids(SAFE)
            .adds(SAFE)
            .removes(ENEMY_ADJACENT),
    ];
    if me.potions > 0 {
        ops.push(
            GoapAction::new("drink_potion", 1, GoapOp::DrinkPotion)
                .requires(HAS_POTION)
                .adds(HEALTHY)
                .removes(HAS_POTION),
        );
    }
    if me.knows_spell(Spell::Firebolt) {
        let cast = Action::Cast {
            spell: Spell::Firebolt,
            target,
        };
        let volleys = target
            .and_then(|t| bodies.get(&t))
            .map(|b| (b.hp.max(1) as u32).div_ceil(5))
            .unwrap_or(1);
        ops.push(
            GoapAction::new(
                "firebolt",
                ticks(cast.cost(me, world, bodies)) * volleys,
                GoapOp::Firebolt,
            )
            .requires(ENEMY_IN_RANGE | HAS_MANA)
            .adds(ENEMY_DEFEATED),
        );
    }
    if me.knows_spell(Spell::Mend) {
        let mend = Action::Cast {
            spell: Spell::Mend,
            target: None,
        };
        ops.push(
            GoapAction::new("mend", ticks(mend.cost(me, world, bodies)), GoapOp::Mend)
                .requires(HAS_MANA)
                .adds(HEALTHY),
        );
    }
    GoapPlanner::new(ops).with_config(GoapPlannerConfig {
        max_expansions: config.goap_max_expansions,
    })
}
