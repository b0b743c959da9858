use std::collections::BTreeSet;

use crawl_core::{AgentId, KeyId, Tile, TileRect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A route from the agent's tile to a target, with the cumulative cost at every step.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Path {
    tiles: Vec<Tile>,
    /// `costs[i]` is the cost of reaching `tiles[i]`; `costs[0] == 0`.
    costs: Vec<u32>,
    /// World generation the path was computed against.
    generation: u64,
}

impl Path {
    pub(crate) fn new(tiles: Vec<Tile>, costs: Vec<u32>, generation: u64) -> Self {
        debug_assert_eq!(tiles.len(), costs.len());
        Self {
            tiles,
            costs,
            generation,
        }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn cost(&self) -> u32 {
        self.costs.last().copied().unwrap_or(0)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn start(&self) -> Option<Tile> {
        self.tiles.first().copied()
    }

    pub fn goal(&self) -> Option<Tile> {
        self.tiles.last().copied()
    }

    /// Number of steps (tiles after the start).
    pub fn steps(&self) -> usize {
        self.tiles.len().saturating_sub(1)
    }

    pub fn position_of(&self, tile: Tile) -> Option<usize> {
        self.tiles.iter().position(|t| *t == tile)
    }

    /// The tile to step onto next when standing on `tile`.
    pub fn next_after(&self, tile: Tile) -> Option<Tile> {
        let idx = self.position_of(tile)?;
        self.tiles.get(idx + 1).copied()
    }

    /// The remainder of the path starting at `tile`, with costs rebased to zero.
    pub fn suffix_from(&self, tile: Tile) -> Option<Path> {
        let idx = self.position_of(tile)?;
        let base = self.costs[idx];
        Some(Path {
            tiles: self.tiles[idx..].to_vec(),
            costs: self.costs[idx..].iter().map(|c| c - base).collect(),
            generation: self.generation,
        })
    }

    /// Replace the stretch up to `rejoin` with `detour` (which must start at this path's start
    /// and end at `rejoin`).
    pub(crate) fn splice(&self, detour: &Path, rejoin: usize) -> Path {
        let mut tiles = detour.tiles.clone();
        let mut costs = detour.costs.clone();
        let detour_cost = detour.cost();
        let base = self.costs[rejoin];
        for i in rejoin + 1..self.tiles.len() {
            tiles.push(self.tiles[i]);
            costs.push(detour_cost + (self.costs[i] - base));
        }
        Path {
            tiles,
            costs,
            generation: self.generation.min(detour.generation),
        }
    }
}

/// Rectangular body anchored at its top-left tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Footprint {
    pub width: u8,
    pub height: u8,
}

impl Default for Footprint {
    fn default() -> Self {
        Self::SINGLE
    }
}

impl Footprint {
    pub const SINGLE: Footprint = Footprint {
        width: 1,
        height: 1,
    };

    pub fn new(width: u8, height: u8) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn is_single(self) -> bool {
        self == Self::SINGLE
    }

    /// Cells covered when anchored at `anchor`, in reading order.
    pub fn cells(self, anchor: Tile) -> Vec<Tile> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for dy in 0..self.height as i32 {
            for dx in 0..self.width as i32 {
                out.push(anchor.offset(dx, dy));
            }
        }
        out
    }

    /// Every cell touched while stepping from `from` to `to`: the union of both placements.
    pub fn swept(self, from: Tile, to: Tile) -> BTreeSet<Tile> {
        self.cells(from).into_iter().chain(self.cells(to)).collect()
    }
}

/// Surcharges added on top of the unit step cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraversalCosts {
    /// Closed door the agent may open (or a locked one it holds the key for).
    pub try_open: u32,
    /// Locked door a hostile agent has to break.
    pub bash: u32,
    /// Known armed trap.
    pub trap_avoid: u32,
}

impl Default for TraversalCosts {
    fn default() -> Self {
        Self {
            try_open: 2,
            bash: 6,
            trap_avoid: 8,
        }
    }
}

/// Who is asking and what they may pass through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConstraints {
    /// The traveller; its own occupancy never blocks it.
    pub agent: Option<AgentId>,
    pub footprint: Footprint,
    pub can_open_doors: bool,
    pub hostile: bool,
    pub keys: BTreeSet<KeyId>,
    pub costs: TraversalCosts,
    /// Treat tiles held by other agents as walls (local replans around movers).
    pub avoid_occupied: bool,
    /// Restrict the search to this rectangle.
    pub window: Option<TileRect>,
}

impl Default for PathConstraints {
    fn default() -> Self {
        Self {
            agent: None,
            footprint: Footprint::SINGLE,
            can_open_doors: true,
            hostile: false,
            keys: BTreeSet::new(),
            costs: TraversalCosts::default(),
            avoid_occupied: false,
            window: None,
        }
    }
}

impl PathConstraints {
    pub fn for_agent(agent: AgentId) -> Self {
        Self {
            agent: Some(agent),
            ..Self::default()
        }
    }

    pub fn hostile(mut self, hostile: bool) -> Self {
        self.hostile = hostile;
        self
    }

    pub fn opens_doors(mut self, can_open: bool) -> Self {
        self.can_open_doors = can_open;
        self
    }

    pub fn with_keys(mut self, keys: impl IntoIterator<Item = KeyId>) -> Self {
        self.keys.extend(keys);
        self
    }

    pub fn with_footprint(mut self, footprint: Footprint) -> Self {
        self.footprint = footprint;
        self
    }

    pub fn with_costs(mut self, costs: TraversalCosts) -> Self {
        self.costs = costs;
        self
    }

    pub fn avoiding_occupants(mut self) -> Self {
        self.avoid_occupied = true;
        self
    }

    pub fn within(mut self, window: TileRect) -> Self {
        self.window = Some(window);
        self
    }
}
