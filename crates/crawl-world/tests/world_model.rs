use std::collections::BTreeSet;

use crawl_core::{AgentId, KeyId, Tile};
use crawl_world::{
    default_map, parse_map, render_map, vault_map, GridWorld, Interactable, InteractableKind, Item,
    MapError, Trap, WorldError, WorldView, MAX_SIDE,
};

#[test]
fn default_map_parses_with_walls_on_the_border() {
    let world = parse_map(&default_map()).expect("default map parses");
    assert_eq!(world.width(), 16);
    assert_eq!(world.height(), 16);
    assert!(world.is_opaque(Tile::new(0, 0)));
    assert!(world.is_walkable(Tile::new(1, 1)));
    // Out of bounds reads as a wall.
    assert!(world.is_opaque(Tile::new(-1, 3)));
    assert!(!world.is_walkable(Tile::new(16, 3)));
}

#[test]
fn ragged_and_unknown_maps_are_rejected() {
    assert_eq!(
        parse_map(&["###", "##"]).unwrap_err(),
        MapError::Ragged {
            row: 1,
            expected: 3,
            found: 2
        }
    );
    assert!(matches!(
        parse_map(&["#?#"]).unwrap_err(),
        MapError::UnknownGlyph { glyph: '?', x: 1, y: 0 }
    ));
    assert!(matches!(
        parse_map(&["#T.#"]).unwrap_err(),
        MapError::UnpairedTeleport(_)
    ));
}

#[test]
fn door_changes_bump_generation_and_visual_log() {
    let mut world = parse_map(&vault_map()).expect("vault parses");
    let door = Tile::new(6, 4);
    let g0 = world.generation();
    let v0 = world.visual_generation();

    world.set_door_open(door, true).expect("door opens");
    assert_eq!(world.generation(), g0 + 1);
    assert!(world.visual_change_touches(v0, &BTreeSet::from([door])));
    assert!(!world.visual_change_touches(v0, &BTreeSet::from([Tile::new(1, 1)])));

    // Re-opening an open door is a no-op.
    world.set_door_open(door, true).expect("no-op");
    assert_eq!(world.generation(), g0 + 1);
}

#[test]
fn locked_door_needs_the_right_key() {
    let mut world = parse_map(&vault_map()).expect("vault parses");
    let door = Tile::new(5, 2);
    let before = world.clone();

    assert_eq!(world.set_door_open(door, true), Err(WorldError::Locked(door)));
    assert_eq!(
        world.unlock_door(door, KeyId(7)),
        Err(WorldError::WrongKey { tile: door, key: KeyId(7) })
    );
    assert_eq!(world, before, "rejected mutations leave the world untouched");

    world.unlock_door(door, KeyId(1)).expect("key fits");
    assert!(world.door(door).map(|d| d.open).unwrap_or(false));
    assert!(world.generation() > before.generation());
}

#[test]
fn bashing_breaks_the_door_after_enough_force() {
    let mut world = parse_map(&vault_map()).expect("vault parses");
    let door = Tile::new(5, 2);
    assert_eq!(world.bash_door(door, 4), Ok(false));
    assert_eq!(world.bash_door(door, 4), Ok(true));
    let d = world.door(door).expect("door");
    assert!(d.open && d.broken && d.lock.is_none());
}

#[test]
fn occupancy_is_exclusive_and_all_or_nothing() {
    let mut world = GridWorld::new(4, 4);
    let a = AgentId(1);
    let b = AgentId(2);
    world.occupy(a, &[Tile::new(1, 1)]).expect("free");
    assert_eq!(
        world.occupy(b, &[Tile::new(0, 0), Tile::new(1, 1)]),
        Err(WorldError::Occupied { tile: Tile::new(1, 1), by: a })
    );
    assert_eq!(world.occupant(Tile::new(0, 0)), None);

    world
        .relocate(a, &[Tile::new(1, 1)], &[Tile::new(2, 1)])
        .expect("move");
    assert_eq!(world.occupant(Tile::new(1, 1)), None);
    assert_eq!(world.occupant(Tile::new(2, 1)), Some(a));
    assert_eq!(world.occupants().collect::<Vec<_>>(), vec![(Tile::new(2, 1), a)]);
}

#[test]
fn lever_drives_the_nearest_door() {
    let mut world = parse_map(&vault_map()).expect("vault parses");
    let lever = Tile::new(1, 7);
    assert_eq!(world.toggle_interactable(lever), Ok(true));
    assert!(world.door(Tile::new(6, 4)).map(|d| d.open).unwrap_or(false));
    assert_eq!(world.toggle_interactable(lever), Ok(false));
    assert!(!world.door(Tile::new(6, 4)).map(|d| d.open).unwrap_or(true));
}

#[test]
fn placed_button_opens_its_target_door() {
    let mut world = parse_map(&vault_map()).expect("vault parses");
    let button = Tile::new(2, 2);
    world
        .set_interactable(
            button,
            Some(Interactable {
                kind: InteractableKind::Button,
                active: false,
                target: Some(Tile::new(6, 4)),
            }),
        )
        .expect("in bounds");
    assert_eq!(world.toggle_interactable(button), Ok(true));
    assert!(world.door(Tile::new(6, 4)).map(|d| d.open).unwrap_or(false));
}

#[test]
fn traps_fire_once_and_change_the_layout() {
    let mut world = GridWorld::new(3, 3);
    let at = Tile::new(1, 1);
    let g0 = world.generation();
    world
        .set_trap(at, Some(Trap { armed: true, damage: 4 }))
        .expect("in bounds");
    assert!(world.generation() > g0);
    assert_eq!(world.spring_trap(at), Some(4));
    assert_eq!(world.spring_trap(at), None);
    assert!(world.set_trap(Tile::new(5, 5), None).is_err());
}

#[test]
fn items_can_be_taken_once() {
    let mut world = parse_map(&vault_map()).expect("vault parses");
    assert_eq!(world.take_item(Tile::new(1, 1)), Ok(Item::Key(KeyId(1))));
    assert_eq!(world.take_item(Tile::new(1, 1)), Err(WorldError::NoItem(Tile::new(1, 1))));
}

#[test]
fn scent_decays_to_nothing() {
    let mut world = GridWorld::new(3, 1);
    world.deposit_scent(Tile::new(1, 0), AgentId(4), 0.5);
    world.decay_scent(0.2);
    assert!((world.scent(Tile::new(1, 0)).strength - 0.3).abs() < 1e-6);
    world.decay_scent(0.5);
    assert_eq!(world.scent(Tile::new(1, 0)).source, None);
}

#[test]
fn state_hash_tracks_mutations() {
    let mut world = parse_map(&vault_map()).expect("vault parses");
    let h0 = world.state_hash();
    assert_eq!(h0, parse_map(&vault_map()).expect("vault parses").state_hash());
    world.set_door_open(Tile::new(6, 4), true).expect("opens");
    assert_ne!(h0, world.state_hash());
}

#[test]
fn render_roundtrips_static_layout() {
    let world = parse_map(&default_map()).expect("parses");
    let rendered = render_map(&world);
    assert_eq!(rendered[0], "################");
    assert_eq!(rendered[1], "#......#.......#");
}

#[test]
fn oversized_grids_are_refused_or_clamped() {
    assert_eq!(
        GridWorld::try_new(u64::from(u32::MAX), 4).err(),
        Some(WorldError::BadSize {
            width: u64::from(u32::MAX),
            height: 4
        })
    );
    assert!(GridWorld::try_new(0, 4).is_err());
    assert!(GridWorld::try_new(8, 4).is_ok());

    let clamped = GridWorld::new(u32::MAX, 0);
    assert_eq!(clamped.width(), MAX_SIDE);
    assert_eq!(clamped.height(), 1);
}
