use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crawl_core::{AgentId, KeyId, StableHasher, Tile};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Door, Interactable, Item, NoiseEmitter, Scent, Terrain, TileState, Trap, WorldView};

/// Number of door/light changes remembered for FOV cache invalidation.
const VISUAL_LOG_LEN: usize = 256;

/// Rejected world mutation. A rejected call leaves the world untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("tile {0:?} is out of bounds")]
    OutOfBounds(Tile),
    #[error("no door at {0:?}")]
    NoDoor(Tile),
    #[error("door at {0:?} is locked")]
    Locked(Tile),
    #[error("key {key:?} does not fit the lock at {tile:?}")]
    WrongKey { tile: Tile, key: KeyId },
    #[error("tile {tile:?} is occupied by {by}")]
    Occupied { tile: Tile, by: AgentId },
    #[error("tile {0:?} is not walkable")]
    NotWalkable(Tile),
    #[error("no item at {0:?}")]
    NoItem(Tile),
    #[error("no interactable at {0:?}")]
    NoInteractable(Tile),
    #[error("grid of {width}×{height} is outside 1..=32768 per side")]
    BadSize { width: u64, height: u64 },
}

/// Largest side length a grid may have.
pub const MAX_SIDE: i32 = 1 << 15;

/// The tile grid: terrain, doors, traps, light, items, scent and blocking occupancy.
///
/// Single writer per tick (the act phase), many readers through [`WorldView`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridWorld {
    width: i32,
    height: i32,
    tiles: Vec<TileState>,
    #[cfg_attr(feature = "serde", serde(default))]
    emitters: Vec<NoiseEmitter>,
    #[cfg_attr(feature = "serde", serde(default))]
    generation: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    visual_generation: u64,
    // Rebuilt from agent positions on load.
    #[cfg_attr(feature = "serde", serde(skip))]
    occupancy: BTreeMap<Tile, AgentId>,
    #[cfg_attr(feature = "serde", serde(default))]
    scent: Vec<Scent>,
    #[cfg_attr(feature = "serde", serde(skip))]
    visual_log: VecDeque<(u64, Tile)>,
    #[cfg_attr(feature = "serde", serde(skip))]
    visual_log_floor: u64,
}

impl GridWorld {
    /// An all-floor grid. Sides are clamped into `1..=MAX_SIDE`; [`GridWorld::try_new`] refuses
    /// them instead.
    pub fn new(width: u32, height: u32) -> Self {
        let side = |n: u32| i32::try_from(n).map_or(MAX_SIDE, |n| n.clamp(1, MAX_SIDE));
        Self::sized(side(width), side(height))
    }

    pub fn try_new(width: u64, height: u64) -> Result<Self, WorldError> {
        let side = |n: u64| i32::try_from(n).ok().filter(|n| (1..=MAX_SIDE).contains(n));
        match (side(width), side(height)) {
            (Some(w), Some(h)) => Ok(Self::sized(w, h)),
            _ => Err(WorldError::BadSize { width, height }),
        }
    }

    fn sized(width: i32, height: i32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            tiles: vec![TileState::floor(); len],
            emitters: Vec::new(),
            generation: 0,
            visual_generation: 0,
            occupancy: BTreeMap::new(),
            scent: vec![Scent::default(); len],
            visual_log: VecDeque::new(),
            visual_log_floor: 0,
        }
    }

    /// Restore transient buffers after deserialization.
    pub fn rehydrate(&mut self) {
        let len = self.tiles.len();
        if self.scent.len() != len {
            self.scent = vec![Scent::default(); len];
        }
        self.visual_log.clear();
        self.visual_log_floor = self.visual_generation;
        self.occupancy.clear();
    }

    fn idx(&self, tile: Tile) -> Option<usize> {
        if !self.in_bounds(tile) {
            return None;
        }
        Some((tile.y * self.width + tile.x) as usize)
    }

    pub fn tile_mut(&mut self, tile: Tile) -> Result<&mut TileState, WorldError> {
        let idx = self.idx(tile).ok_or(WorldError::OutOfBounds(tile))?;
        Ok(&mut self.tiles[idx])
    }

    /// All in-bounds tiles in reading order.
    pub fn tiles(&self) -> impl Iterator<Item = (Tile, &TileState)> {
        let width = self.width;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, t)| (Tile::new(i as i32 % width, i as i32 / width), t))
    }

    fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn note_visual_change(&mut self, tile: Tile) {
        self.visual_generation = self.visual_generation.wrapping_add(1);
        if self.visual_log.len() == VISUAL_LOG_LEN {
            if let Some((generation, _)) = self.visual_log.pop_front() {
                self.visual_log_floor = generation;
            }
        }
        self.visual_log.push_back((self.visual_generation, tile));
    }

    // --- Construction-time edits (not generation-tracked) ---

    pub fn set_terrain(&mut self, tile: Tile, terrain: Terrain) -> Result<(), WorldError> {
        self.tile_mut(tile)?.terrain = terrain;
        Ok(())
    }

    pub fn register_noise_emitter(&mut self, tile: Tile, intensity: u32) -> Result<(), WorldError> {
        if !self.in_bounds(tile) {
            return Err(WorldError::OutOfBounds(tile));
        }
        self.emitters.push(NoiseEmitter { tile, intensity });
        Ok(())
    }

    // --- Doors ---

    pub fn door(&self, tile: Tile) -> Option<Door> {
        self.tile(tile)?.door
    }

    /// Open or close an unlocked door. Closing fails while someone stands in the doorway.
    pub fn set_door_open(&mut self, tile: Tile, open: bool) -> Result<(), WorldError> {
        let door = self.door(tile).ok_or(WorldError::NoDoor(tile))?;
        if door.is_locked() {
            return Err(WorldError::Locked(tile));
        }
        if !open {
            if let Some(by) = self.occupant(tile) {
                return Err(WorldError::Occupied { tile, by });
            }
        }
        if door.open == open {
            return Ok(());
        }
        if let Some(d) = self.tile_mut(tile)?.door.as_mut() {
            d.open = open;
        }
        self.bump_generation();
        self.note_visual_change(tile);
        Ok(())
    }

    /// Unlock a locked door with `key` and swing it open.
    pub fn unlock_door(&mut self, tile: Tile, key: KeyId) -> Result<(), WorldError> {
        let door = self.door(tile).ok_or(WorldError::NoDoor(tile))?;
        if let Some(lock) = door.lock {
            if lock != key {
                return Err(WorldError::WrongKey { tile, key });
            }
        }
        if let Some(d) = self.tile_mut(tile)?.door.as_mut() {
            d.lock = None;
            d.open = true;
        }
        self.bump_generation();
        self.note_visual_change(tile);
        Ok(())
    }

    /// Wear down a closed door; returns `true` once it breaks open.
    pub fn bash_door(&mut self, tile: Tile, force: u32) -> Result<bool, WorldError> {
        let door = self.door(tile).ok_or(WorldError::NoDoor(tile))?;
        if door.open {
            return Ok(true);
        }
        let remaining = door.durability.saturating_sub(force.max(1));
        let broke = remaining == 0;
        if let Some(d) = self.tile_mut(tile)?.door.as_mut() {
            d.durability = remaining;
            if broke {
                d.broken = true;
                d.open = true;
                d.lock = None;
            }
        }
        if broke {
            self.bump_generation();
            self.note_visual_change(tile);
        }
        Ok(broke)
    }

    // --- Traps, cost, light ---

    pub fn set_trap(&mut self, tile: Tile, trap: Option<Trap>) -> Result<(), WorldError> {
        self.tile_mut(tile)?.trap = trap;
        self.bump_generation();
        Ok(())
    }

    /// Trigger an armed trap; returns its damage and disarms it.
    pub fn spring_trap(&mut self, tile: Tile) -> Option<i32> {
        let trap = self.tile(tile)?.trap?;
        if !trap.armed {
            return None;
        }
        if let Ok(t) = self.tile_mut(tile) {
            t.trap = Some(Trap {
                armed: false,
                ..trap
            });
        }
        self.bump_generation();
        Some(trap.damage)
    }

    pub fn set_extra_cost(&mut self, tile: Tile, cost: u32) -> Result<(), WorldError> {
        let t = self.tile_mut(tile)?;
        if t.extra_cost == cost {
            return Ok(());
        }
        t.extra_cost = cost;
        self.bump_generation();
        Ok(())
    }

    pub fn set_light(&mut self, tile: Tile, light: u8) -> Result<(), WorldError> {
        let t = self.tile_mut(tile)?;
        if t.light == light {
            return Ok(());
        }
        t.light = light;
        self.note_visual_change(tile);
        Ok(())
    }

    // --- Items and mechanisms ---

    pub fn place_item(&mut self, tile: Tile, item: Item) -> Result<(), WorldError> {
        self.tile_mut(tile)?.item = Some(item);
        Ok(())
    }

    pub fn take_item(&mut self, tile: Tile) -> Result<Item, WorldError> {
        self.tile_mut(tile)?
            .item
            .take()
            .ok_or(WorldError::NoItem(tile))
    }

    pub fn set_interactable(
        &mut self,
        tile: Tile,
        interactable: Option<Interactable>,
    ) -> Result<(), WorldError> {
        self.tile_mut(tile)?.interactable = interactable;
        Ok(())
    }

    /// Flip a mechanism and drive its linked door. Nothing changes when the linked door cannot
    /// move (locked, or blocked while closing).
    pub fn toggle_interactable(&mut self, tile: Tile) -> Result<bool, WorldError> {
        let mech = self
            .tile(tile)
            .and_then(|t| t.interactable)
            .ok_or(WorldError::NoInteractable(tile))?;
        let active = !mech.active;
        if let Some(target) = mech.target {
            if self.door(target).is_some() {
                self.set_door_open(target, active)?;
            }
        }
        if let Some(m) = self.tile_mut(tile)?.interactable.as_mut() {
            m.active = active;
        }
        Ok(active)
    }

    // --- Occupancy ---

    /// Claim every cell of `cells` for `agent`. All-or-nothing.
    pub fn occupy(&mut self, agent: AgentId, cells: &[Tile]) -> Result<(), WorldError> {
        for &cell in cells {
            if !self.is_walkable(cell) {
                return Err(WorldError::NotWalkable(cell));
            }
            if let Some(by) = self.occupant(cell) {
                if by != agent {
                    return Err(WorldError::Occupied { tile: cell, by });
                }
            }
        }
        for &cell in cells {
            self.occupancy.insert(cell, agent);
        }
        Ok(())
    }

    pub fn vacate(&mut self, agent: AgentId, cells: &[Tile]) {
        for cell in cells {
            if self.occupancy.get(cell) == Some(&agent) {
                self.occupancy.remove(cell);
            }
        }
    }

    /// Move a footprint from `from` to `to` atomically.
    pub fn relocate(&mut self, agent: AgentId, from: &[Tile], to: &[Tile]) -> Result<(), WorldError> {
        for &cell in to {
            if !self.is_walkable(cell) {
                return Err(WorldError::NotWalkable(cell));
            }
            if let Some(by) = self.occupant(cell) {
                if by != agent {
                    return Err(WorldError::Occupied { tile: cell, by });
                }
            }
        }
        self.vacate(agent, from);
        for &cell in to {
            self.occupancy.insert(cell, agent);
        }
        Ok(())
    }

    pub fn occupants(&self) -> impl Iterator<Item = (Tile, AgentId)> + '_ {
        self.occupancy.iter().map(|(t, a)| (*t, *a))
    }

    // --- Scent ---

    pub fn deposit_scent(&mut self, tile: Tile, agent: AgentId, amount: f32) {
        if let Some(idx) = self.idx(tile) {
            let s = &mut self.scent[idx];
            s.strength = (s.strength + amount).min(1.0);
            s.source = Some(agent);
        }
    }

    /// Linear decay applied once per tick at the end of the act phase.
    pub fn decay_scent(&mut self, amount: f32) {
        for s in self.scent.iter_mut() {
            if s.strength <= 0.0 {
                continue;
            }
            s.strength = (s.strength - amount).max(0.0);
            if s.strength == 0.0 {
                s.source = None;
            }
        }
    }

    /// Stable hash over everything the act phase can change.
    pub fn state_hash(&self) -> u64 {
        let mut h = StableHasher::new();
        h.write_i64(self.width as i64).write_i64(self.height as i64);
        h.write_u64(self.generation).write_u64(self.visual_generation);
        for t in &self.tiles {
            h.write_u64(t.terrain as u64).write_u64(t.light as u64).write_u64(t.extra_cost as u64);
            match t.door {
                Some(d) => {
                    h.write_u64(1)
                        .write_bool(d.open)
                        .write_u64(d.lock.map(|k| k.0 as u64 + 1).unwrap_or(0))
                        .write_u64(d.durability as u64)
                        .write_bool(d.broken);
                }
                None => {
                    h.write_u64(0);
                }
            }
            match t.trap {
                Some(tr) => {
                    h.write_bool(tr.armed).write_i64(tr.damage as i64);
                }
                None => {
                    h.write_u64(2);
                }
            }
            h.write_u64(match t.item {
                None => 0,
                Some(Item::Potion) => 1,
                Some(Item::Key(k)) => 2 + k.0 as u64,
            });
            if let Some(m) = t.interactable {
                h.write_bool(m.active);
            }
        }
        for (tile, agent) in &self.occupancy {
            h.write_i64(tile.x as i64).write_i64(tile.y as i64).write_u64(agent.0);
        }
        for s in &self.scent {
            h.write_f32(s.strength);
        }
        h.finish()
    }
}

impl WorldView for GridWorld {
    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn tile(&self, tile: Tile) -> Option<&TileState> {
        self.idx(tile).map(|idx| &self.tiles[idx])
    }

    fn occupant(&self, tile: Tile) -> Option<AgentId> {
        self.occupancy.get(&tile).copied()
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn visual_generation(&self) -> u64 {
        self.visual_generation
    }

    fn visual_change_touches(&self, since: u64, tiles: &BTreeSet<Tile>) -> bool {
        if since >= self.visual_generation {
            return false;
        }
        if since < self.visual_log_floor {
            return true;
        }
        self.visual_log
            .iter()
            .filter(|(generation, _)| *generation > since)
            .any(|(_, tile)| tiles.contains(tile))
    }

    fn scent(&self, tile: Tile) -> Scent {
        self.idx(tile).map(|idx| self.scent[idx]).unwrap_or_default()
    }

    fn noise_emitters(&self) -> &[NoiseEmitter] {
        &self.emitters
    }
}
