use std::collections::BTreeSet;

use crawl_core::{Facing, Tile};
use crawl_world::WorldView;

use crate::{compute_fov, ConeShape};

#[derive(Debug, Clone, PartialEq)]
struct FovEntry {
    origin: Tile,
    facing: Facing,
    radius: i32,
    cone: ConeShape,
    visual_generation: u64,
    tiles: BTreeSet<Tile>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FovCacheStats {
    pub hits: u64,
    pub recomputes: u64,
}

/// One agent's last field of view, keyed by `(tile, facing)`.
///
/// Reused until the agent moves or turns, or a door/light change lands on a tile inside the cached
/// set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FovCache {
    entry: Option<FovEntry>,
    stats: FovCacheStats,
}

impl FovCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> FovCacheStats {
        self.stats
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// The last computed set, if any.
    pub fn last(&self) -> Option<&BTreeSet<Tile>> {
        self.entry.as_ref().map(|e| &e.tiles)
    }

    pub fn get_or_compute<W: WorldView + ?Sized>(
        &mut self,
        world: &W,
        origin: Tile,
        facing: Facing,
        radius: i32,
        cone: ConeShape,
    ) -> &BTreeSet<Tile> {
        let current = world.visual_generation();
        let reusable = self.entry.as_ref().is_some_and(|e| {
            e.origin == origin
                && e.facing == facing
                && e.radius == radius
                && e.cone == cone
                && !world.visual_change_touches(e.visual_generation, &e.tiles)
        });

        if reusable {
            self.stats.hits += 1;
        } else {
            self.entry = None;
        }
        let stats = &mut self.stats;
        let entry = self.entry.get_or_insert_with(|| {
            stats.recomputes += 1;
            FovEntry {
                origin,
                facing,
                radius,
                cone,
                visual_generation: current,
                tiles: compute_fov(world, origin, facing, radius, cone),
            }
        });
        entry.visual_generation = current;
        &entry.tiles
    }
}
