//! Plain-text dungeon maps.
//!
//! | glyph | meaning |
//! |---|---|
//! | `#` | wall |
//! | `.` | floor (ambient light) |
//! | `,` | dark floor (light 0) |
//! | `+` | closed door |
//! | `L` | door locked with key 1 |
//! | `^` | armed trap (3 damage) |
//! | `O` | pit |
//! | `T` | teleport pad, paired with the next `T` in reading order |
//! | `k` | key 1 lying on the floor |
//! | `p` | potion lying on the floor |
//! | `/` | lever linked to the nearest door |
//! | `~` | noise emitter (intensity 4) |
//! | `*` | light source |
//!
//! A space is read as floor.

use crawl_core::{KeyId, Tile};
use thiserror::Error;

use crate::{
    Door, GridWorld, Interactable, InteractableKind, Item, Terrain, TileState, Trap, WorldError,
    WorldView,
};

pub const TRAP_DAMAGE: i32 = 3;
pub const EMITTER_INTENSITY: u32 = 4;
pub const LIGHT_SOURCE_LEVEL: u8 = 9;
const LIGHT_SOURCE_RADIUS: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("map has no rows")]
    Empty,
    #[error("row {row} has width {found}, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown glyph {glyph:?} at ({x}, {y})")]
    UnknownGlyph { glyph: char, x: usize, y: usize },
    #[error("teleport pad at {0:?} has no partner")]
    UnpairedTeleport(Tile),
    #[error(transparent)]
    Size(#[from] WorldError),
}

/// The 16×16 starter dungeon.
pub fn default_map() -> Vec<&'static str> {
    vec![
        "################",
        "#......#.......#",
        "#.####.#.#####.#",
        "#.#  #.#.#   #.#",
        "#.#  #...#   #.#",
        "#.#  #####   #.#",
        "#.#          #.#",
        "#.#   ###### #.#",
        "#.#   #    # #.#",
        "#.#   # ## # #.#",
        "#.#   # ## # #.#",
        "#.#   #    # #.#",
        "#.#   ###### #.#",
        "#.#          #.#",
        "#..............#",
        "################",
    ]
}

/// A small map exercising doors, keys, traps and mechanisms.
pub fn vault_map() -> Vec<&'static str> {
    vec![
        "############",
        "#k...#.....#",
        "#....L..p..#",
        "#.^..#.....#",
        "######+#####",
        "#..........#",
        "#.*...O..~.#",
        "#/.........#",
        "############",
    ]
}

pub fn parse_map<S: AsRef<str>>(rows: &[S]) -> Result<GridWorld, MapError> {
    let first = rows.first().ok_or(MapError::Empty)?;
    let width = first.as_ref().chars().count();
    if width == 0 {
        return Err(MapError::Empty);
    }
    for (row, line) in rows.iter().enumerate() {
        let found = line.as_ref().chars().count();
        if found != width {
            return Err(MapError::Ragged {
                row,
                expected: width,
                found,
            });
        }
    }

    let mut world = GridWorld::try_new(width as u64, rows.len() as u64)?;
    let mut teleports: Vec<Tile> = Vec::new();
    let mut levers: Vec<Tile> = Vec::new();
    let mut lights: Vec<Tile> = Vec::new();

    for (y, line) in rows.iter().enumerate() {
        for (x, glyph) in line.as_ref().chars().enumerate() {
            let tile = Tile::new(x as i32, y as i32);
            let mut state = TileState::floor();
            match glyph {
                '.' | ' ' => {}
                '#' => state = TileState::wall(),
                ',' => state.light = 0,
                '+' => state.door = Some(Door::closed()),
                'L' => state.door = Some(Door::locked(KeyId(1))),
                '^' => {
                    state.trap = Some(Trap {
                        armed: true,
                        damage: TRAP_DAMAGE,
                    })
                }
                'O' => state.terrain = Terrain::Pit,
                'T' => teleports.push(tile),
                'k' => state.item = Some(Item::Key(KeyId(1))),
                'p' => state.item = Some(Item::Potion),
                '/' => levers.push(tile),
                '~' => {
                    // Emitters go on after the tile is written.
                }
                '*' => lights.push(tile),
                other => return Err(MapError::UnknownGlyph { glyph: other, x, y }),
            }
            if let Ok(slot) = world.tile_mut(tile) {
                *slot = state;
            }
            if glyph == '~' {
                let _ = world.register_noise_emitter(tile, EMITTER_INTENSITY);
            }
        }
    }

    for pair in teleports.chunks(2) {
        match *pair {
            [a, b] => {
                if let Ok(t) = world.tile_mut(a) {
                    t.teleport = Some(b);
                }
                if let Ok(t) = world.tile_mut(b) {
                    t.teleport = Some(a);
                }
            }
            [lone] => return Err(MapError::UnpairedTeleport(lone)),
            _ => {}
        }
    }

    let doors: Vec<Tile> = world
        .tiles()
        .filter(|(_, t)| t.door.is_some())
        .map(|(tile, _)| tile)
        .collect();
    for lever in levers {
        // Nearest door by Manhattan distance; reading order breaks ties.
        let target = doors.iter().copied().min_by_key(|d| (lever.manhattan(*d), d.y, d.x));
        if let Ok(t) = world.tile_mut(lever) {
            t.interactable = Some(Interactable {
                kind: InteractableKind::Lever,
                active: false,
                target,
            });
        }
    }

    for source in lights {
        for dy in -LIGHT_SOURCE_RADIUS..=LIGHT_SOURCE_RADIUS {
            for dx in -LIGHT_SOURCE_RADIUS..=LIGHT_SOURCE_RADIUS {
                let t = source.offset(dx, dy);
                let d = source.manhattan(t) as i32;
                if d > LIGHT_SOURCE_RADIUS || !world.in_bounds(t) {
                    continue;
                }
                let level = LIGHT_SOURCE_LEVEL.saturating_sub((d * 2) as u8);
                if let Ok(state) = world.tile_mut(t) {
                    state.light = state.light.max(level);
                }
            }
        }
    }

    Ok(world)
}

/// Render the static layout back to glyphs (doors show their current state).
pub fn render_map(world: &GridWorld) -> Vec<String> {
    let mut rows = vec![String::with_capacity(world.width() as usize); world.height() as usize];
    for (tile, state) in world.tiles() {
        let glyph = match (state.terrain, state.door, state.item) {
            (Terrain::Wall, _, _) => '#',
            (Terrain::Pit, _, _) => 'O',
            (_, Some(d), _) if d.is_locked() => 'L',
            (_, Some(d), _) if !d.open => '+',
            (_, Some(_), _) => '\'',
            (_, _, Some(Item::Potion)) => 'p',
            (_, _, Some(Item::Key(_))) => 'k',
            _ if state.trap.map(|t| t.armed).unwrap_or(false) => '^',
            _ if state.teleport.is_some() => 'T',
            _ if state.interactable.is_some() => '/',
            _ if world.occupant(tile).is_some() => '@',
            _ if state.light == 0 => ',',
            _ => '.',
        };
        rows[tile.y as usize].push(glyph);
    }
    rows
}
