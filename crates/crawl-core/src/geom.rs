#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Integer tile coordinate. `y` grows southwards (row index of the map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn step(self, facing: Facing) -> Self {
        let (dx, dy) = facing.delta();
        self.offset(dx, dy)
    }

    pub fn manhattan(self, other: Tile) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    pub fn is_adjacent(self, other: Tile) -> bool {
        self.manhattan(other) == 1
    }

    /// Neighbors in the fixed N, E, S, W order.
    pub fn neighbors(self) -> [Tile; 4] {
        Facing::ALL.map(|f| self.step(f))
    }
}

/// One of the four cardinal directions an agent can face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Facing {
    #[default]
    North,
    East,
    South,
    West,
}

impl Facing {
    pub const ALL: [Facing; 4] = [Facing::North, Facing::East, Facing::South, Facing::West];

    pub fn index(self) -> u8 {
        match self {
            Facing::North => 0,
            Facing::East => 1,
            Facing::South => 2,
            Facing::West => 3,
        }
    }

    pub fn from_index(index: u8) -> Self {
        Self::ALL[(index % 4) as usize]
    }

    pub fn turn_left(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    pub fn turn_right(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn reverse(self) -> Self {
        Self::from_index(self.index() + 2)
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Facing::North => (0, -1),
            Facing::East => (1, 0),
            Facing::South => (0, 1),
            Facing::West => (-1, 0),
        }
    }

    /// Dominant cardinal direction from `from` towards `to`. Ties prefer the
    /// horizontal axis; `None` when both tiles coincide.
    pub fn toward(from: Tile, to: Tile) -> Option<Self> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx == 0 && dy == 0 {
            return None;
        }
        Some(if dx.abs() >= dy.abs() {
            if dx > 0 {
                Facing::East
            } else {
                Facing::West
            }
        } else if dy > 0 {
            Facing::South
        } else {
            Facing::North
        })
    }
}

/// Convert a camera-local `(forward, right)` offset to a world tile.
pub fn to_world(origin: Tile, facing: Facing, forward: i32, right: i32) -> Tile {
    match facing {
        Facing::North => origin.offset(right, -forward),
        Facing::East => origin.offset(forward, right),
        Facing::South => origin.offset(-right, forward),
        Facing::West => origin.offset(-forward, -right),
    }
}

/// Inverse of [`to_world`]: the `(forward, right)` offset of `tile` as seen from `origin`.
pub fn to_local(origin: Tile, facing: Facing, tile: Tile) -> (i32, i32) {
    let dx = tile.x - origin.x;
    let dy = tile.y - origin.y;
    match facing {
        Facing::North => (-dy, dx),
        Facing::East => (dx, dy),
        Facing::South => (dy, -dx),
        Facing::West => (-dx, -dy),
    }
}

/// Axis-aligned tile rectangle, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileRect {
    pub min: Tile,
    pub max: Tile,
}

impl TileRect {
    pub fn around(center: Tile, radius: i32) -> Self {
        Self {
            min: center.offset(-radius, -radius),
            max: center.offset(radius, radius),
        }
    }

    pub fn contains(&self, tile: Tile) -> bool {
        tile.x >= self.min.x && tile.x <= self.max.x && tile.y >= self.min.y && tile.y <= self.max.y
    }
}
