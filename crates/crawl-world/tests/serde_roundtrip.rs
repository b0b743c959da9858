#![cfg(feature = "serde")]

use crawl_core::Tile;
use crawl_world::{parse_map, vault_map, GridWorld, WorldView};

#[test]
fn world_survives_json_and_rehydrates() {
    let mut world = parse_map(&vault_map()).expect("vault parses");
    world.set_door_open(Tile::new(6, 4), true).expect("opens");
    world.deposit_scent(Tile::new(1, 1), crawl_core::AgentId(2), 0.5);
    world.occupy(crawl_core::AgentId(2), &[Tile::new(2, 1)]).expect("free");

    let json = serde_json::to_string(&world).expect("serialize");
    let mut back: GridWorld = serde_json::from_str(&json).expect("deserialize");
    back.rehydrate();

    assert_eq!(back.generation(), world.generation());
    assert!(back.door(Tile::new(6, 4)).map(|d| d.open).unwrap_or(false));
    assert_eq!(back.scent(Tile::new(1, 1)).strength, 0.5);
    // Occupancy is rebuilt by whoever reloads the agents.
    assert_eq!(back.occupant(Tile::new(2, 1)), None);
}
