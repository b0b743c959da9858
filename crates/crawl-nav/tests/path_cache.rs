use crawl_core::{AgentId, Tile};
use crawl_nav::{local_replan, find_path, PathCache, PathConstraints, StuckTracker};
use crawl_world::{parse_map, GridWorld, WorldView};

#[test]
fn cached_path_is_reused_from_any_tile_along_it() {
    let world = parse_map(&crawl_world::default_map()).expect("map");
    let agent = AgentId(3);
    let constraints = PathConstraints::for_agent(agent);
    let mut cache = PathCache::new();

    let first = cache
        .route(&world, agent, Tile::new(1, 1), Tile::new(6, 1), &constraints)
        .expect("path");
    let midway = first.tiles()[2];
    let second = cache
        .route(&world, agent, midway, Tile::new(6, 1), &constraints)
        .expect("path");

    assert_eq!(second.start(), Some(midway));
    assert_eq!(second.goal(), first.goal());
    assert_eq!(second.cost(), first.cost() - 2);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().misses, 1);
}

#[test]
fn door_change_discards_cached_path_on_next_lookup() {
    let mut world = parse_map(&["#####", "#.+.#", "#.#.#", "#...#", "#####"]).expect("map");
    let agent = AgentId(1);
    let target = Tile::new(3, 1);
    let mut cache = PathCache::new();

    let before = cache
        .route(&world, agent, Tile::new(1, 1), target, &PathConstraints::for_agent(agent))
        .expect("through the door");
    assert!(before.tiles().contains(&Tile::new(2, 1)));
    let generation = world.generation();

    world.set_door_open(Tile::new(2, 1), true).expect("opens");
    assert_eq!(world.generation(), generation + 1);

    // Still stored until someone asks for it.
    assert_eq!(cache.len(), 1);
    assert!(cache.lookup(agent, target, world.generation()).is_none());
    assert_eq!(cache.stats().stale_discards, 1);
    assert!(cache.is_empty());
}

#[test]
fn forgetting_an_agent_drops_only_its_entries() {
    let world = GridWorld::new(4, 4);
    let mut cache = PathCache::new();
    for id in [1, 2] {
        let agent = AgentId(id);
        cache
            .route(&world, agent, Tile::new(0, 0), Tile::new(3, 3), &PathConstraints::for_agent(agent))
            .expect("path");
    }
    cache.forget_agent(AgentId(1));
    let keys: Vec<_> = cache.keys().collect();
    assert_eq!(keys, vec![(AgentId(2), Tile::new(3, 3), world.generation())]);
}

#[test]
fn stuck_tracker_counts_stalled_ticks() {
    let mut tracker = StuckTracker::new();
    assert_eq!(tracker.record(Tile::new(1, 1)), 0);
    assert_eq!(tracker.record(Tile::new(1, 1)), 1);
    assert_eq!(tracker.record(Tile::new(1, 1)), 2);
    assert!(tracker.is_stuck(2));
    assert_eq!(tracker.record(Tile::new(2, 1)), 0);
    assert!(!tracker.is_stuck(2));
}

#[test]
fn local_replan_detours_around_a_mover_and_rejoins() {
    let mut world = parse_map(&["#######", "#.....#", "#.....#", "#.....#", "#######"]).expect("map");
    let agent = AgentId(1);
    let constraints = PathConstraints::for_agent(agent);
    let path = find_path(&world, Tile::new(1, 2), Tile::new(5, 2), &constraints).expect("path");
    assert_eq!(path.cost(), 4);

    world.occupy(AgentId(9), &[Tile::new(2, 2)]).expect("blocker");
    let detour = local_replan(&world, &path, 2, &constraints).expect("detour");

    assert!(!detour.tiles().contains(&Tile::new(2, 2)));
    assert_eq!(detour.start(), Some(Tile::new(1, 2)));
    assert_eq!(detour.goal(), Some(Tile::new(5, 2)));
    assert_eq!(detour.cost(), 6);
    for pair in detour.tiles().windows(2) {
        assert!(pair[0].is_adjacent(pair[1]));
    }
}
