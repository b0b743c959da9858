use crawl_core::{AgentId, Fault, KeyId, Tile};
use crawl_nav::{find_path, Footprint, PathConstraints, TraversalCosts};
use crawl_world::{parse_map, GridWorld, WorldView};

fn walker() -> PathConstraints {
    PathConstraints::for_agent(AgentId(1))
}

#[test]
fn finds_path_around_blockers() {
    let world = parse_map(&["#####", "#.#.#", "#...#", "#.#.#", "#####"]).expect("map");
    let path = find_path(&world, Tile::new(1, 1), Tile::new(3, 3), &walker()).expect("path");

    assert_eq!(path.start(), Some(Tile::new(1, 1)));
    assert_eq!(path.goal(), Some(Tile::new(3, 3)));
    assert_eq!(path.cost(), 4);
    for pair in path.tiles().windows(2) {
        assert!(pair[0].is_adjacent(pair[1]));
        assert!(world.is_walkable(pair[1]));
    }
}

#[test]
fn ties_hug_the_straight_line() {
    let world = GridWorld::new(3, 3);
    let path = find_path(&world, Tile::new(0, 0), Tile::new(2, 2), &walker()).expect("path");
    assert_eq!(
        path.tiles(),
        &[
            Tile::new(0, 0),
            Tile::new(1, 0),
            Tile::new(1, 1),
            Tile::new(2, 1),
            Tile::new(2, 2),
        ]
    );
}

#[test]
fn is_deterministic_for_same_input() {
    let world = parse_map(&crawl_world::default_map()).expect("map");
    let a = find_path(&world, Tile::new(1, 1), Tile::new(14, 14), &walker()).expect("path");
    let b = find_path(&world, Tile::new(1, 1), Tile::new(14, 14), &walker()).expect("path");
    assert_eq!(a, b);
}

#[test]
fn same_tile_is_an_empty_path() {
    let world = GridWorld::new(2, 2);
    let path = find_path(&world, Tile::new(1, 1), Tile::new(1, 1), &walker()).expect("path");
    assert_eq!(path.steps(), 0);
    assert_eq!(path.cost(), 0);
}

#[test]
fn unreachable_and_out_of_bounds_are_path_not_found() {
    let world = parse_map(&["#####", "#.#.#", "#####"]).expect("map");
    assert_eq!(
        find_path(&world, Tile::new(1, 1), Tile::new(3, 1), &walker()),
        Err(Fault::PathNotFound)
    );
    assert_eq!(
        find_path(&world, Tile::new(1, 1), Tile::new(9, 9), &walker()),
        Err(Fault::PathNotFound)
    );
}

const DOOR_LOOP: [&str; 5] = ["#####", "#.+.#", "#.#.#", "#...#", "#####"];

#[test]
fn closed_door_costs_a_try_open_penalty() {
    let world = parse_map(&DOOR_LOOP).expect("map");
    let from = Tile::new(1, 1);
    let to = Tile::new(3, 1);

    let through = find_path(&world, from, to, &walker()).expect("path");
    assert_eq!(through.tiles(), &[from, Tile::new(2, 1), to]);
    assert_eq!(through.cost(), 2 + TraversalCosts::default().try_open);

    let pricey = walker().with_costs(TraversalCosts {
        try_open: 10,
        ..TraversalCosts::default()
    });
    let around = find_path(&world, from, to, &pricey).expect("path");
    assert_eq!(around.cost(), 6);
    assert!(!around.tiles().contains(&Tile::new(2, 1)));

    let no_hands = walker().opens_doors(false);
    assert_eq!(find_path(&world, from, to, &no_hands).map(|p| p.cost()), Ok(6));
}

#[test]
fn locked_door_needs_a_key_or_a_hostile_bash() {
    let world = parse_map(&["#####", "#.L.#", "#####"]).expect("map");
    let from = Tile::new(1, 1);
    let to = Tile::new(3, 1);
    let costs = TraversalCosts::default();

    assert_eq!(find_path(&world, from, to, &walker()), Err(Fault::PathNotFound));
    assert_eq!(
        find_path(&world, from, to, &walker().with_keys([KeyId(1)])).map(|p| p.cost()),
        Ok(2 + costs.try_open)
    );
    assert_eq!(
        find_path(&world, from, to, &walker().hostile(true)).map(|p| p.cost()),
        Ok(2 + costs.bash)
    );
    assert_eq!(
        find_path(&world, from, to, &walker().with_keys([KeyId(3)])),
        Err(Fault::PathNotFound)
    );
}

#[test]
fn armed_traps_are_avoided_when_cheaper() {
    let world = parse_map(&["#####", "#.^.#", "#...#", "#####"]).expect("map");
    let path = find_path(&world, Tile::new(1, 1), Tile::new(3, 1), &walker()).expect("path");
    assert!(!path.tiles().contains(&Tile::new(2, 1)));
    assert_eq!(path.cost(), 4);
}

#[test]
fn large_footprint_checks_every_swept_cell() {
    let wide_gap = [
        "#######", "#..#..#", "#.....#", "#.....#", "#..#..#", "#######",
    ];
    let narrow_gap = [
        "#######", "#..#..#", "#.....#", "#..#..#", "#..#..#", "#######",
    ];
    let big = walker().with_footprint(Footprint::new(2, 2));
    let from = Tile::new(1, 1);
    let to = Tile::new(4, 1);

    let world = parse_map(&wide_gap).expect("map");
    let path = find_path(&world, from, to, &big).expect("2x2 fits through a 2-tall gap");
    for anchor in path.tiles() {
        for cell in Footprint::new(2, 2).cells(*anchor) {
            assert!(world.is_walkable(cell), "{cell:?} blocked");
        }
    }

    let world = parse_map(&narrow_gap).expect("map");
    assert_eq!(find_path(&world, from, to, &big), Err(Fault::PathNotFound));
    assert!(find_path(&world, from, to, &walker()).is_ok());
}

#[test]
fn occupants_only_block_when_asked() {
    let mut world = GridWorld::new(3, 1);
    world.occupy(AgentId(7), &[Tile::new(1, 0)]).expect("occupy");
    let from = Tile::new(0, 0);
    let to = Tile::new(2, 0);
    assert!(find_path(&world, from, to, &walker()).is_ok());
    assert_eq!(
        find_path(&world, from, to, &walker().avoiding_occupants()),
        Err(Fault::PathNotFound)
    );
}
