use std::collections::BTreeSet;

use crawl_core::{AgentId, Tile};

use crate::{NoiseEmitter, Scent, TileState};

/// Read-only world access shared by the pathfinder, perception and action checks.
///
/// During a tick every reader sees the world committed at the end of the previous tick; only the
/// act phase writes, through [`crate::GridWorld`]'s mutators.
pub trait WorldView {
    fn width(&self) -> i32;
    fn height(&self) -> i32;

    fn in_bounds(&self, tile: Tile) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width() && tile.y < self.height()
    }

    fn tile(&self, tile: Tile) -> Option<&TileState>;

    /// The blocking agent on `tile`, if any.
    fn occupant(&self, tile: Tile) -> Option<AgentId>;

    /// Bumped on every door, trap or tile-cost change. Paths computed against an older value are
    /// stale.
    fn generation(&self) -> u64;

    /// Bumped on every door or light change.
    fn visual_generation(&self) -> u64;

    /// Whether any door/light change since `since` touched one of `tiles`. Answers `true` when the
    /// change log no longer reaches back that far.
    fn visual_change_touches(&self, since: u64, tiles: &BTreeSet<Tile>) -> bool;

    fn scent(&self, tile: Tile) -> Scent;

    fn noise_emitters(&self) -> &[NoiseEmitter];

    /// Out-of-bounds tiles are opaque.
    fn is_opaque(&self, tile: Tile) -> bool {
        self.tile(tile).map(|t| t.is_opaque()).unwrap_or(true)
    }

    fn light(&self, tile: Tile) -> u8 {
        self.tile(tile).map(|t| t.light).unwrap_or(0)
    }

    fn is_walkable(&self, tile: Tile) -> bool {
        self.tile(tile).map(|t| t.is_walkable()).unwrap_or(false)
    }

    /// Walkable and not held by another blocking agent.
    fn is_free_for(&self, tile: Tile, agent: AgentId) -> bool {
        self.is_walkable(tile) && self.occupant(tile).map(|o| o == agent).unwrap_or(true)
    }
}
