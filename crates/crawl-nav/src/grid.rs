use core::cmp::Ordering;
use std::collections::BinaryHeap;

use crawl_core::{Fault, Tile};
use crawl_world::{Terrain, WorldView};

use crate::{Path, PathConstraints};

#[derive(Debug)]
struct OpenNode {
    f: u32,
    /// Twice the area between the node and the from→to line; smaller hugs the line.
    deviation: u64,
    g: u32,
    cell: Tile,
    tie: u64,
}

impl OpenNode {
    fn key(&self) -> (u32, u64, u32, u64) {
        (self.f, self.deviation, self.g, self.tie)
    }
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap behave like a min-heap.
        other.key().cmp(&self.key())
    }
}

/// Surcharge for entering one cell, or `None` when the cell cannot be entered at all.
///
/// Door handling lives here rather than in a separate phase: a closed door the agent may open
/// costs `try_open`, a locked door costs `try_open` with the key, `bash` for a hostile agent
/// without it, and is impassable otherwise.
pub fn cell_cost<W: WorldView + ?Sized>(
    world: &W,
    cell: Tile,
    constraints: &PathConstraints,
) -> Option<u32> {
    if let Some(window) = constraints.window {
        if !window.contains(cell) {
            return None;
        }
    }
    let state = world.tile(cell)?;
    if state.terrain != Terrain::Floor {
        return None;
    }
    if constraints.avoid_occupied {
        if let Some(by) = world.occupant(cell) {
            if Some(by) != constraints.agent {
                return None;
            }
        }
    }

    let mut extra = state.extra_cost;
    if let Some(door) = state.door {
        if !door.open {
            let surcharge = match door.lock {
                Some(key) if constraints.keys.contains(&key) => constraints.costs.try_open,
                Some(_) if constraints.hostile => constraints.costs.bash,
                Some(_) => return None,
                None if constraints.can_open_doors => constraints.costs.try_open,
                None if constraints.hostile => constraints.costs.bash,
                None => return None,
            };
            extra = extra.saturating_add(surcharge);
        }
    }
    if state.trap.map(|t| t.armed).unwrap_or(false) {
        extra = extra.saturating_add(constraints.costs.trap_avoid);
    }
    Some(extra)
}

/// Cost of moving the footprint's anchor from `from` to the adjacent `to`: one plus the largest
/// surcharge among newly entered cells. Every swept cell must be enterable.
pub fn step_cost<W: WorldView + ?Sized>(
    world: &W,
    from: Tile,
    to: Tile,
    constraints: &PathConstraints,
) -> Option<u32> {
    if constraints.footprint.is_single() {
        return cell_cost(world, to, constraints).map(|c| c.saturating_add(1));
    }
    let occupied = constraints.footprint.cells(from);
    let mut worst = 0u32;
    for cell in constraints.footprint.swept(from, to) {
        if occupied.contains(&cell) {
            continue;
        }
        worst = worst.max(cell_cost(world, cell, constraints)?);
    }
    Some(worst.saturating_add(1))
}

/// Whether the whole footprint fits at `anchor`.
pub fn fits<W: WorldView + ?Sized>(world: &W, anchor: Tile, constraints: &PathConstraints) -> bool {
    constraints
        .footprint
        .cells(anchor)
        .into_iter()
        .all(|cell| cell_cost(world, cell, constraints).is_some())
}

/// Deterministic grid A* (Manhattan heuristic, N/E/S/W expansion). Ties on `f` prefer the node
/// closest to the straight line from `from` to `to`, then the smaller `g`, then insertion order.
pub fn find_path<W: WorldView + ?Sized>(
    world: &W,
    from: Tile,
    to: Tile,
    constraints: &PathConstraints,
) -> Result<Path, Fault> {
    let width = world.width();
    let height = world.height();
    let idx = |t: Tile| -> Option<usize> {
        if world.in_bounds(t) {
            Some((t.y * width + t.x) as usize)
        } else {
            None
        }
    };

    let start_idx = idx(from).ok_or(Fault::PathNotFound)?;
    let goal_idx = idx(to).ok_or(Fault::PathNotFound)?;
    if from == to {
        return Ok(Path::new(vec![from], vec![0], world.generation()));
    }
    if !fits(world, to, constraints) {
        return Err(Fault::PathNotFound);
    }

    let line = (
        (to.x - from.x) as i64,
        (to.y - from.y) as i64,
    );
    let deviation = |t: Tile| -> u64 {
        let dx = (t.x - from.x) as i64;
        let dy = (t.y - from.y) as i64;
        (dx * line.1 - dy * line.0).unsigned_abs()
    };

    let len = (width * height) as usize;
    let mut g_score = vec![u32::MAX; len];
    let mut came_from: Vec<Option<usize>> = vec![None; len];
    let mut open = BinaryHeap::<OpenNode>::new();
    let mut tie: u64 = 0;
    let mut expanded: usize = 0;

    g_score[start_idx] = 0;
    open.push(OpenNode {
        f: from.manhattan(to),
        deviation: 0,
        g: 0,
        cell: from,
        tie,
    });
    tie += 1;

    while let Some(node) = open.pop() {
        let Some(node_idx) = idx(node.cell) else {
            continue;
        };
        if node.g != g_score[node_idx] {
            // Stale heap entry.
            continue;
        }
        if node_idx == goal_idx {
            let mut cells = vec![node_idx];
            let mut current = node_idx;
            while let Some(prev) = came_from[current] {
                current = prev;
                cells.push(current);
            }
            cells.reverse();
            let tiles: Vec<Tile> = cells
                .iter()
                .map(|&i| Tile::new(i as i32 % width, i as i32 / width))
                .collect();
            let costs = cells.iter().map(|&i| g_score[i]).collect();
            tracing::trace!(
                target: "crawl_nav",
                ?from,
                ?to,
                expanded,
                cost = node.g,
                "path found"
            );
            return Ok(Path::new(tiles, costs, world.generation()));
        }
        expanded += 1;

        for n in node.cell.neighbors() {
            let Some(n_idx) = idx(n) else { continue };
            let Some(step) = step_cost(world, node.cell, n, constraints) else {
                continue;
            };
            let tentative_g = node.g.saturating_add(step);
            if tentative_g >= g_score[n_idx] {
                continue;
            }
            came_from[n_idx] = Some(node_idx);
            g_score[n_idx] = tentative_g;
            open.push(OpenNode {
                f: tentative_g.saturating_add(n.manhattan(to)),
                deviation: deviation(n),
                g: tentative_g,
                cell: n,
                tie,
            });
            tie += 1;
        }
    }

    tracing::debug!(target: "crawl_nav", ?from, ?to, expanded, "no path");
    Err(Fault::PathNotFound)
}

/// Cost estimate without materialising a route: the A* cost when reachable.
pub fn path_cost<W: WorldView + ?Sized>(
    world: &W,
    from: Tile,
    to: Tile,
    constraints: &PathConstraints,
) -> Option<u32> {
    find_path(world, from, to, constraints).ok().map(|p| p.cost())
}
