//! The action library: one closed enum, each variant with a precondition check, a perform step
//! and a cost estimate.
//!
//! `perform` is the only code that mutates the world on an agent's behalf. It re-runs `check`
//! before touching anything, so an attempt that reports a fault leaves the world and every body
//! exactly as it found them.

use std::collections::BTreeMap;

use crawl_core::{
    ActionStatus, AgentId, DeterministicRng, Facing, Fault, Precondition, SplitMix64, Tile,
};
use crawl_perception::has_line_of_sight;
use crawl_world::{GridWorld, Item, WorldError, WorldView};
use serde::{Deserialize, Serialize};

use crate::{Body, Event, EventBus, LootTable, SimConfig};

/// HP restored by a potion.
pub const POTION_HEAL: i32 = 8;
pub const BASH_NOISE: u32 = 6;
pub const COMBAT_NOISE: u32 = 3;
pub const DOOR_NOISE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spell {
    /// Ranged damage; needs a sight line.
    Firebolt,
    /// Heals the caster (the most wounded member for a party).
    Mend,
}

impl Spell {
    pub fn mana(self) -> i32 {
        match self {
            Spell::Firebolt => 4,
            Spell::Mend => 3,
        }
    }

    /// Ticks spent casting; the effect lands on the last one.
    pub fn cast_ticks(self) -> u32 {
        match self {
            Spell::Firebolt => 2,
            Spell::Mend => 1,
        }
    }

    pub fn range(self) -> u32 {
        match self {
            Spell::Firebolt => 6,
            Spell::Mend => 0,
        }
    }

    fn power(self) -> (i32, i32) {
        match self {
            Spell::Firebolt => (4, 6),
            Spell::Mend => (5, 5),
        }
    }
}

/// Cooldown bucket. Cooldowns are tracked per `(agent, kind)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Move,
    Turn,
    StepBack,
    UseKey,
    UsePotion,
    Attack,
    Firebolt,
    Mend,
    Interact,
    Wait,
}

impl ActionKind {
    /// Minimum ticks between two successful uses; 1 allows every tick, 0 never blocks.
    pub fn cooldown(self) -> u32 {
        match self {
            ActionKind::Attack | ActionKind::UsePotion => 1,
            ActionKind::Firebolt => 4,
            ActionKind::Mend => 5,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Step the anchor onto an adjacent tile, turning to face it.
    Move { to: Tile },
    Turn { to: Facing },
    /// Back off one tile without turning.
    StepBack,
    /// Keys go on an adjacent locked door; potions need no target.
    Use { item: Item, target: Option<Tile> },
    Attack { target: AgentId },
    Cast { spell: Spell, target: Option<AgentId> },
    /// Pick up an item underfoot, work a door or a mechanism.
    Interact { tile: Tile },
    Wait,
}

/// Everything `perform` may touch. Built once per agent in the serialized act phase.
pub struct ActCtx<'a> {
    pub tick: u64,
    pub world: &'a mut GridWorld,
    pub bodies: &'a mut BTreeMap<AgentId, Body>,
    pub bus: &'a mut EventBus,
    pub rng: &'a mut SplitMix64,
    pub config: &'a SimConfig,
    pub loot: &'a BTreeMap<String, LootTable>,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Move { .. } => ActionKind::Move,
            Action::Turn { .. } => ActionKind::Turn,
            Action::StepBack => ActionKind::StepBack,
            Action::Use {
                item: Item::Key(_), ..
            } => ActionKind::UseKey,
            Action::Use {
                item: Item::Potion, ..
            } => ActionKind::UsePotion,
            Action::Attack { .. } => ActionKind::Attack,
            Action::Cast {
                spell: Spell::Firebolt,
                ..
            } => ActionKind::Firebolt,
            Action::Cast {
                spell: Spell::Mend, ..
            } => ActionKind::Mend,
            Action::Interact { .. } => ActionKind::Interact,
            Action::Wait => ActionKind::Wait,
        }
    }

    /// Whether the attempt would go through against the current world.
    pub fn check(
        &self,
        actor: &Body,
        world: &GridWorld,
        bodies: &BTreeMap<AgentId, Body>,
    ) -> Result<(), Precondition> {
        if !actor.alive {
            return Err(Precondition::ActorDown);
        }
        match *self {
            Action::Move { to } => {
                if !actor.tile.is_adjacent(to) {
                    return Err(Precondition::NotAdjacent);
                }
                check_step(actor, world, to)
            }
            Action::Turn { to } => {
                if actor.facing == to {
                    Err(Precondition::AlreadyThere)
                } else {
                    Ok(())
                }
            }
            Action::StepBack => check_step(actor, world, actor.tile.step(actor.facing.reverse())),
            Action::Use { item, target } => check_use(actor, world, item, target),
            Action::Attack { target } => {
                let other = living_target(actor, bodies, target)?;
                if actor.attack_range().is_none() {
                    return Err(Precondition::ActorDown);
                }
                if !actor.is_adjacent_to(other) {
                    return Err(Precondition::NotAdjacent);
                }
                Ok(())
            }
            Action::Cast { spell, target } => {
                if !actor.knows_spell(spell) {
                    return Err(Precondition::NothingToUse);
                }
                if !actor.available_mana(spell.mana()) {
                    return Err(Precondition::NotEnoughMana);
                }
                match spell {
                    Spell::Mend => {
                        if target.is_some_and(|t| t != actor.id) {
                            return Err(Precondition::OutOfRange);
                        }
                        if actor.hp >= actor.max_hp {
                            return Err(Precondition::AlreadyThere);
                        }
                        Ok(())
                    }
                    Spell::Firebolt => {
                        let id = target.ok_or(Precondition::TargetMissing)?;
                        let other = living_target(actor, bodies, id)?;
                        let range = spell.range();
                        if actor.distance_to_body(other) > range {
                            return Err(Precondition::OutOfRange);
                        }
                        if !has_line_of_sight(world, actor.tile, other.tile, range as i32) {
                            return Err(Precondition::NoLineOfSight);
                        }
                        Ok(())
                    }
                }
            }
            Action::Interact { tile } => check_interact(actor, world, tile),
            Action::Wait => Ok(()),
        }
    }

    /// Run one tick of the action. `progress` is the number of ticks already spent on this same
    /// action (multi-tick casts and bashes).
    pub fn perform(
        &self,
        actor: AgentId,
        ctx: &mut ActCtx<'_>,
        progress: u32,
    ) -> Result<ActionStatus, Fault> {
        let body = ctx
            .bodies
            .get(&actor)
            .cloned()
            .ok_or(Fault::PreconditionFailure(Precondition::ActorDown))?;
        self.check(&body, ctx.world, ctx.bodies)
            .map_err(Fault::PreconditionFailure)?;

        match *self {
            Action::Move { to } => {
                let facing = if body.is_party() {
                    body.facing
                } else {
                    Facing::toward(body.tile, to).unwrap_or(body.facing)
                };
                step_to(ctx, &body, to, facing)?;
                Ok(ActionStatus::Success)
            }
            Action::Turn { to } => {
                if let Some(b) = ctx.bodies.get_mut(&actor) {
                    b.facing = to;
                }
                Ok(ActionStatus::Success)
            }
            Action::StepBack => {
                let to = body.tile.step(body.facing.reverse());
                step_to(ctx, &body, to, body.facing)?;
                Ok(ActionStatus::Success)
            }
            Action::Use {
                item: Item::Key(key),
                target: Some(door),
            } => {
                ctx.world.unlock_door(door, key).map_err(world_fault)?;
                ctx.bus.publish(Event::DoorUnlocked { tile: door, by: actor });
                make_noise(ctx, door, DOOR_NOISE, actor);
                Ok(ActionStatus::Success)
            }
            Action::Use {
                item: Item::Key(_),
                target: None,
            } => Err(Fault::PreconditionFailure(Precondition::NothingToUse)),
            Action::Use {
                item: Item::Potion, ..
            } => {
                let healed = match ctx.bodies.get_mut(&actor) {
                    Some(b) => {
                        b.potions -= 1;
                        heal(b, POTION_HEAL)
                    }
                    None => 0,
                };
                ctx.bus.publish(Event::AgentHealed {
                    agent: actor,
                    amount: healed,
                });
                Ok(ActionStatus::Success)
            }
            Action::Attack { target } => {
                let (lo, hi) = body
                    .attack_range()
                    .ok_or(Fault::PreconditionFailure(Precondition::ActorDown))?;
                let amount = ctx.rng.range_inclusive(lo, hi);
                if let Some(other) = ctx.bodies.get(&target) {
                    let facing = Facing::toward(body.tile, other.tile).unwrap_or(body.facing);
                    if let Some(b) = ctx.bodies.get_mut(&actor) {
                        if !b.is_party() {
                            b.facing = facing;
                        }
                    }
                }
                make_noise(ctx, body.tile, COMBAT_NOISE, actor);
                apply_damage(ctx, target, Some(actor), amount);
                Ok(ActionStatus::Success)
            }
            Action::Cast { spell, target } => {
                if progress + 1 < spell.cast_ticks() {
                    return Ok(ActionStatus::Running);
                }
                if let Some(b) = ctx.bodies.get_mut(&actor) {
                    spend_mana(b, spell.mana());
                }
                ctx.bus.publish(Event::SpellCast {
                    agent: actor,
                    target,
                });
                let (lo, hi) = spell.power();
                let amount = ctx.rng.range_inclusive(lo, hi);
                match spell {
                    Spell::Firebolt => {
                        make_noise(ctx, body.tile, COMBAT_NOISE, actor);
                        if let Some(target) = target {
                            apply_damage(ctx, target, Some(actor), amount);
                        }
                    }
                    Spell::Mend => {
                        let healed = ctx.bodies.get_mut(&actor).map(|b| heal(b, amount));
                        ctx.bus.publish(Event::AgentHealed {
                            agent: actor,
                            amount: healed.unwrap_or(0),
                        });
                    }
                }
                Ok(ActionStatus::Success)
            }
            Action::Interact { tile } => interact(ctx, &body, tile),
            Action::Wait => Ok(ActionStatus::Success),
        }
    }

    /// Estimated effort in ticks, used by GOAP costs and target scoring.
    pub fn cost(&self, actor: &Body, world: &GridWorld, bodies: &BTreeMap<AgentId, Body>) -> f32 {
        match *self {
            Action::Move { to } => 1.0 + world.tile(to).map(|t| t.extra_cost as f32).unwrap_or(0.0),
            Action::Turn { .. } => 0.5,
            Action::StepBack => 1.5,
            Action::Use { .. } => 1.0,
            Action::Attack { target } => {
                let per_hit = actor.average_damage().max(0.5);
                let hp = bodies.get(&target).map(|b| b.hp.max(1)).unwrap_or(1);
                (hp as f32 / per_hit).ceil()
            }
            Action::Cast { spell, .. } => spell.cast_ticks() as f32 + spell.mana() as f32 / 4.0,
            Action::Interact { tile } => match world.door(tile) {
                Some(door) if door.is_locked() && !holds_key_for(actor, world, tile) => {
                    let strength = actor.strength.max(1);
                    door.durability.div_ceil(strength) as f32
                }
                _ => 1.0,
            },
            Action::Wait => 1.0,
        }
    }
}

fn living_target<'a>(
    actor: &Body,
    bodies: &'a BTreeMap<AgentId, Body>,
    target: AgentId,
) -> Result<&'a Body, Precondition> {
    if target == actor.id {
        return Err(Precondition::TargetMissing);
    }
    let other = bodies.get(&target).ok_or(Precondition::TargetMissing)?;
    if !other.alive {
        return Err(Precondition::TargetDown);
    }
    Ok(other)
}

fn check_step(actor: &Body, world: &GridWorld, to: Tile) -> Result<(), Precondition> {
    for cell in actor.footprint.swept(actor.tile, to) {
        if !world.in_bounds(cell) {
            return Err(Precondition::OutOfBounds);
        }
        if world.occupant(cell).is_some_and(|o| o != actor.id) {
            return Err(Precondition::Occupied);
        }
        if !world.is_walkable(cell) {
            return Err(Precondition::Blocked);
        }
    }
    Ok(())
}

fn holds_key_for(actor: &Body, world: &GridWorld, tile: Tile) -> bool {
    world
        .door(tile)
        .and_then(|d| d.lock)
        .is_some_and(|k| actor.keys.contains(&k))
}

fn check_use(
    actor: &Body,
    world: &GridWorld,
    item: Item,
    target: Option<Tile>,
) -> Result<(), Precondition> {
    match item {
        Item::Potion => {
            if actor.potions == 0 {
                return Err(Precondition::NothingToUse);
            }
            if actor.hp >= actor.max_hp {
                return Err(Precondition::AlreadyThere);
            }
            Ok(())
        }
        Item::Key(key) => {
            if !actor.keys.contains(&key) {
                return Err(Precondition::MissingKey);
            }
            let door_tile = target.ok_or(Precondition::NothingToUse)?;
            if actor.distance_to(door_tile) != 1 {
                return Err(Precondition::NotAdjacent);
            }
            let door = world.door(door_tile).ok_or(Precondition::NothingToUse)?;
            match door.lock {
                None => Err(Precondition::NothingToUse),
                Some(lock) if lock != key => Err(Precondition::MissingKey),
                Some(_) if door.open => Err(Precondition::NothingToUse),
                Some(_) => Ok(()),
            }
        }
    }
}

fn check_interact(actor: &Body, world: &GridWorld, tile: Tile) -> Result<(), Precondition> {
    let state = world.tile(tile).ok_or(Precondition::OutOfBounds)?;
    if actor.occupies(tile) {
        return match state.item {
            Some(_) => Ok(()),
            None => Err(Precondition::NothingToInteract),
        };
    }
    if actor.distance_to(tile) != 1 {
        return Err(Precondition::NotAdjacent);
    }
    if let Some(door) = state.door {
        if door.open {
            if world.occupant(tile).is_some() {
                return Err(Precondition::Occupied);
            }
            return Ok(());
        }
        if door.is_locked() {
            if holds_key_for(actor, world, tile) || actor.bashes_doors {
                return Ok(());
            }
            return Err(Precondition::MissingKey);
        }
        if !actor.opens_doors {
            return Err(Precondition::Blocked);
        }
        return Ok(());
    }
    if let Some(mech) = state.interactable {
        if let Some(door) = mech.target.and_then(|t| world.door(t)) {
            if door.is_locked() {
                return Err(Precondition::Blocked);
            }
            let closing = mech.active;
            if closing && mech.target.and_then(|t| world.occupant(t)).is_some() {
                return Err(Precondition::Occupied);
            }
        }
        return Ok(());
    }
    Err(Precondition::NothingToInteract)
}

fn world_fault(err: WorldError) -> Fault {
    let reason = match err {
        WorldError::OutOfBounds(_) => Precondition::OutOfBounds,
        WorldError::NoDoor(_) | WorldError::NoItem(_) => Precondition::NothingToUse,
        WorldError::NoInteractable(_) => Precondition::NothingToInteract,
        WorldError::Locked(_) | WorldError::WrongKey { .. } => Precondition::MissingKey,
        WorldError::Occupied { .. } => Precondition::Occupied,
        WorldError::NotWalkable(_) | WorldError::BadSize { .. } => Precondition::Blocked,
    };
    Fault::PreconditionFailure(reason)
}

fn make_noise(ctx: &mut ActCtx<'_>, origin: Tile, intensity: u32, source: AgentId) {
    ctx.bus.publish(Event::NoiseMade {
        origin,
        intensity,
        source: Some(source),
    });
}

fn heal(body: &mut Body, amount: i32) -> i32 {
    if let Some(formation) = body.party.as_mut() {
        let healed = formation.heal(amount);
        body.sync_party();
        return healed;
    }
    let before = body.hp;
    body.hp = (body.hp + amount).min(body.max_hp);
    body.hp - before
}

fn spend_mana(body: &mut Body, mana: i32) {
    match body.party.as_mut() {
        Some(formation) => {
            if let Some(slot) = formation.caster(mana) {
                formation.spend_mana(slot, mana);
            }
        }
        None => body.mana -= mana,
    }
}

/// Relocate the actor and resolve what it stepped on: scent, traps, teleport pads.
fn step_to(ctx: &mut ActCtx<'_>, body: &Body, to: Tile, facing: Facing) -> Result<(), Fault> {
    let from_cells = body.cells();
    let to_cells = body.cells_at(to);
    ctx.world
        .relocate(body.id, &from_cells, &to_cells)
        .map_err(world_fault)?;
    if let Some(b) = ctx.bodies.get_mut(&body.id) {
        b.tile = to;
        b.facing = facing;
    }
    for &cell in &to_cells {
        ctx.world.deposit_scent(cell, body.id, ctx.config.scent_deposit);
    }

    for &cell in &to_cells {
        if let Some(damage) = ctx.world.spring_trap(cell) {
            ctx.bus.publish(Event::TrapSprung {
                agent: body.id,
                tile: cell,
                damage,
            });
            make_noise(ctx, cell, COMBAT_NOISE, body.id);
            apply_damage(ctx, body.id, None, damage);
        }
    }

    let alive = ctx.bodies.get(&body.id).is_some_and(|b| b.alive);
    if !alive || !body.footprint.is_single() {
        return Ok(());
    }
    if let Some(dest) = ctx.world.tile(to).and_then(|t| t.teleport) {
        if ctx.world.is_free_for(dest, body.id) {
            ctx.world
                .relocate(body.id, &[to], &[dest])
                .map_err(world_fault)?;
            if let Some(b) = ctx.bodies.get_mut(&body.id) {
                b.tile = dest;
            }
            ctx.bus.publish(Event::Teleported {
                agent: body.id,
                from: to,
                to: dest,
            });
        }
    }
    Ok(())
}

/// Deal damage; on death vacate the tile, announce it and roll loot.
pub(crate) fn apply_damage(
    ctx: &mut ActCtx<'_>,
    target: AgentId,
    by: Option<AgentId>,
    amount: i32,
) {
    let Some(body) = ctx.bodies.get_mut(&target) else {
        return;
    };
    if !body.alive {
        return;
    }
    match body.party.as_mut() {
        Some(formation) => {
            formation.take_hit(amount, ctx.rng);
            body.sync_party();
        }
        None => body.hp -= amount,
    }
    let hp = body.hp;
    if hp <= 0 {
        body.alive = false;
    }
    let down = !body.alive;
    let tile = body.tile;
    let cells = body.cells();
    let loot = body.loot.clone();
    ctx.bus.publish(Event::AgentDamaged {
        agent: target,
        by,
        amount,
        hp,
    });
    if !down {
        return;
    }
    ctx.world.vacate(target, &cells);
    ctx.bus.publish(Event::AgentDown {
        agent: target,
        by,
        tile,
    });
    tracing::debug!(agent = %target, ?tile, "agent down");
    let Some(table) = loot.and_then(|name| ctx.loot.get(&name)) else {
        return;
    };
    for entry in table {
        if ctx.rng.next_f32_unit() < entry.chance {
            let free = ctx.world.tile(tile).is_some_and(|t| t.item.is_none());
            if free && ctx.world.place_item(tile, entry.item).is_ok() {
                ctx.bus.publish(Event::ItemDropped {
                    item: entry.item,
                    tile,
                });
            }
            break;
        }
    }
}

fn interact(ctx: &mut ActCtx<'_>, body: &Body, tile: Tile) -> Result<ActionStatus, Fault> {
    let actor = body.id;
    if body.occupies(tile) {
        let item = ctx.world.take_item(tile).map_err(world_fault)?;
        if let Some(b) = ctx.bodies.get_mut(&actor) {
            match item {
                Item::Key(key) => {
                    b.keys.insert(key);
                }
                Item::Potion => b.potions += 1,
            }
        }
        ctx.bus.publish(Event::ItemPicked {
            agent: actor,
            item,
            tile,
        });
        return Ok(ActionStatus::Success);
    }

    if let Some(door) = ctx.world.door(tile) {
        if door.open {
            ctx.world.set_door_open(tile, false).map_err(world_fault)?;
            ctx.bus.publish(Event::DoorClosed { tile, by: actor });
            make_noise(ctx, tile, DOOR_NOISE, actor);
            return Ok(ActionStatus::Success);
        }
        if door.is_locked() {
            if let Some(key) = door.lock.filter(|k| body.keys.contains(k)) {
                ctx.world.unlock_door(tile, key).map_err(world_fault)?;
                ctx.bus.publish(Event::DoorUnlocked { tile, by: actor });
                make_noise(ctx, tile, DOOR_NOISE, actor);
                return Ok(ActionStatus::Success);
            }
            let broke = ctx
                .world
                .bash_door(tile, body.strength)
                .map_err(world_fault)?;
            make_noise(ctx, tile, BASH_NOISE, actor);
            if broke {
                ctx.bus.publish(Event::DoorBroken { tile, by: actor });
                return Ok(ActionStatus::Success);
            }
            return Ok(ActionStatus::Running);
        }
        ctx.world.set_door_open(tile, true).map_err(world_fault)?;
        ctx.bus.publish(Event::DoorOpened { tile, by: actor });
        make_noise(ctx, tile, DOOR_NOISE, actor);
        return Ok(ActionStatus::Success);
    }

    let active = ctx.world.toggle_interactable(tile).map_err(world_fault)?;
    ctx.bus.publish(Event::InteractableToggled {
        tile,
        by: actor,
        active,
    });
    Ok(ActionStatus::Success)
}
