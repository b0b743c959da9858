//! Grid world model for the dungeon agent simulation.
//!
//! Tile occupancy, door/trap/teleport state, light, items, scent and static noise emitters.
//! Readers go through [`WorldView`]; the act phase mutates a [`GridWorld`] directly. Door, trap and
//! cost changes bump the generation counter that invalidates cached paths; door and light changes
//! are also logged for field-of-view cache invalidation.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod ascii;
pub mod grid;
pub mod tile;
pub mod view;

pub use ascii::{default_map, parse_map, render_map, vault_map, MapError};
pub use grid::{GridWorld, WorldError, MAX_SIDE};
pub use tile::{
    Door, Interactable, InteractableKind, Item, NoiseEmitter, Scent, SpecialFlag, Terrain,
    TileState, Trap,
};
pub use view::WorldView;
