//! Recursive shadowcasting over the eight octants, filtered by a facing cone.

use std::collections::BTreeSet;

use crawl_core::{to_local, Facing, Tile};
use crawl_world::WorldView;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which part of the circle around the agent a sense covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConeShape {
    /// 90° cone: `forward >= |right|`.
    #[default]
    Forward,
    /// 180°: everything not behind the agent.
    HalfPlane,
    /// Full circle.
    Omni,
}

impl ConeShape {
    pub fn contains(self, origin: Tile, facing: Facing, tile: Tile) -> bool {
        if tile == origin {
            return true;
        }
        let (forward, right) = to_local(origin, facing, tile);
        match self {
            ConeShape::Forward => forward >= right.abs(),
            ConeShape::HalfPlane => forward >= 0,
            ConeShape::Omni => true,
        }
    }
}

// Octant transforms (xx, xy, yx, yy).
const OCTANTS: [(i32, i32, i32, i32); 8] = [
    (1, 0, 0, 1),
    (0, 1, 1, 0),
    (0, -1, 1, 0),
    (-1, 0, 0, 1),
    (-1, 0, 0, -1),
    (0, -1, -1, 0),
    (0, 1, -1, 0),
    (1, 0, 0, -1),
];

/// Tiles with an unobstructed sight line from `origin` within `radius` (Euclidean) and inside the
/// cone. Opaque tiles that stop sight are themselves included.
pub fn compute_fov<W: WorldView + ?Sized>(
    world: &W,
    origin: Tile,
    facing: Facing,
    radius: i32,
    cone: ConeShape,
) -> BTreeSet<Tile> {
    let mut lit = BTreeSet::new();
    if !world.in_bounds(origin) {
        return lit;
    }
    lit.insert(origin);
    let radius = radius.max(0);
    for &(xx, xy, yx, yy) in &OCTANTS {
        cast(
            world,
            origin,
            radius,
            1,
            1.0,
            0.0,
            (xx, xy, yx, yy),
            &mut lit,
        );
    }
    lit.retain(|t| cone.contains(origin, facing, *t));
    lit
}

#[allow(clippy::too_many_arguments)]
fn cast<W: WorldView + ?Sized>(
    world: &W,
    origin: Tile,
    radius: i32,
    row: i32,
    mut start: f32,
    end: f32,
    (xx, xy, yx, yy): (i32, i32, i32, i32),
    lit: &mut BTreeSet<Tile>,
) {
    if start < end {
        return;
    }
    let radius_sq = radius * radius;
    let mut new_start = 0.0;
    for j in row..=radius {
        let dy = -j;
        let mut blocked = false;
        for dx in -j..=0 {
            let tile = origin.offset(dx * xx + dy * xy, dx * yx + dy * yy);
            let l_slope = (dx as f32 - 0.5) / (dy as f32 + 0.5);
            let r_slope = (dx as f32 + 0.5) / (dy as f32 - 0.5);
            if start < r_slope {
                continue;
            }
            if end > l_slope {
                break;
            }
            if dx * dx + dy * dy <= radius_sq && world.in_bounds(tile) {
                lit.insert(tile);
            }
            let opaque = world.is_opaque(tile);
            if blocked {
                if opaque {
                    new_start = r_slope;
                } else {
                    blocked = false;
                    start = new_start;
                }
            } else if opaque && j < radius {
                blocked = true;
                cast(world, origin, radius, j + 1, start, l_slope, (xx, xy, yx, yy), lit);
                new_start = r_slope;
            }
        }
        if blocked {
            break;
        }
    }
}

/// Sight-line check between two tiles (used by ranged actions).
pub fn has_line_of_sight<W: WorldView + ?Sized>(world: &W, from: Tile, to: Tile, radius: i32) -> bool {
    if from == to {
        return true;
    }
    if from.manhattan(to) as i32 > radius * 2 {
        return false;
    }
    compute_fov(world, from, Facing::North, radius, ConeShape::Omni).contains(&to)
}
