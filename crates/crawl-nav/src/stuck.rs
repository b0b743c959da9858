use crawl_core::{Fault, Tile, TileRect};
use crawl_world::WorldView;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{find_path, Path, PathConstraints};

/// Counts consecutive ticks an agent spent trying to move without leaving its tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StuckTracker {
    last: Option<Tile>,
    stalled: u32,
}

impl StuckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the position after a movement attempt; returns the number of stalled ticks.
    pub fn record(&mut self, position: Tile) -> u32 {
        if self.last == Some(position) {
            self.stalled = self.stalled.saturating_add(1);
        } else {
            self.last = Some(position);
            self.stalled = 0;
        }
        self.stalled
    }

    pub fn is_stuck(&self, threshold: u32) -> bool {
        threshold > 0 && self.stalled >= threshold
    }

    pub fn stalled(&self) -> u32 {
        self.stalled
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.stalled = 0;
    }
}

/// Re-route around movers inside a `(2 * radius + 1)²` window around the path's start.
///
/// Tries to rejoin the path at the furthest tile still inside the window, treating occupied tiles
/// as walls, and splices the detour onto the untouched remainder. Returns
/// [`Fault::PathNotFound`] when no rejoin point in the window is reachable; callers fall back to a
/// full search.
pub fn local_replan<W: WorldView + ?Sized>(
    world: &W,
    path: &Path,
    radius: i32,
    constraints: &PathConstraints,
) -> Result<Path, Fault> {
    let start = path.start().ok_or(Fault::PathNotFound)?;
    let window = TileRect::around(start, radius.max(1));
    let local = constraints.clone().avoiding_occupants().within(window);

    let candidates: Vec<usize> = path
        .tiles()
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, t)| window.contains(**t))
        .map(|(i, _)| i)
        .collect();

    for &rejoin in candidates.iter().rev() {
        let target = path.tiles()[rejoin];
        if let Ok(detour) = find_path(world, start, target, &local) {
            tracing::debug!(
                target: "crawl_nav",
                ?start,
                ?target,
                detour = detour.steps(),
                "local replan"
            );
            return Ok(path.splice(&detour, rejoin));
        }
    }
    Err(Fault::PathNotFound)
}
