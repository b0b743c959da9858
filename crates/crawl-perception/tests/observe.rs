use crawl_core::{AgentId, Facing, ThreatClass, Tile};
use crawl_perception::{
    hear, observe, perceived_intensity, sniff, ConeShape, FovCache, Noise, Observer, Senses,
};
use crawl_world::{parse_map, GridWorld, SpecialFlag};

fn everyone_hostile(_: AgentId, _: AgentId) -> ThreatClass {
    ThreatClass::Hostile
}

fn omni() -> Senses {
    Senses {
        sight_radius: 6,
        cone: ConeShape::Omni,
        hearing_radius: 8,
        hearing_threshold: 0.5,
        smell: true,
    }
}

#[test]
fn sees_lit_agents_and_special_tiles() {
    let mut world = parse_map(&["#######", "#.....#", "#..^..#", "#.,,,.#", "#######"]).expect("map");
    let me = AgentId(1);
    world.occupy(me, &[Tile::new(1, 1)]).expect("me");
    world.occupy(AgentId(2), &[Tile::new(5, 1)]).expect("lit foe");
    world.occupy(AgentId(3), &[Tile::new(4, 3)]).expect("foe in the dark");

    let observer = Observer {
        agent: me,
        tile: Tile::new(1, 1),
        facing: Facing::East,
        senses: omni(),
    };
    let mut cache = FovCache::new();
    let obs = observe(&world, &everyone_hostile, &observer, &[], &mut cache, 7);

    assert_eq!(obs.tick, 7);
    let ids: Vec<_> = obs.visible_agents.iter().map(|a| a.agent).collect();
    assert_eq!(ids, vec![AgentId(2)]);
    assert_eq!(obs.nearest_hostile().map(|a| a.tile), Some(Tile::new(5, 1)));
    assert!(obs.specials.contains(&(Tile::new(3, 2), SpecialFlag::Trap)));
    assert!(!obs.sees(Tile::new(3, 3)), "dark and not adjacent");
}

#[test]
fn adjacent_dark_tiles_are_felt() {
    let world = parse_map(&["#####", "#,,,#", "#####"]).expect("map");
    let observer = Observer {
        agent: AgentId(1),
        tile: Tile::new(1, 1),
        facing: Facing::East,
        senses: omni(),
    };
    let obs = observe(&world, &everyone_hostile, &observer, &[], &mut FovCache::new(), 0);
    assert!(obs.sees(Tile::new(2, 1)));
    assert!(!obs.sees(Tile::new(3, 1)));
}

#[test]
fn hearing_falls_off_linearly_and_ignores_own_noise() {
    let noise = Noise {
        origin: Tile::new(4, 0),
        intensity: 4,
        source: Some(AgentId(2)),
    };
    assert_eq!(perceived_intensity(Tile::new(0, 0), &noise, 8), 2.0);
    assert_eq!(perceived_intensity(Tile::new(0, 0), &noise, 4), 0.0);

    let senses = omni();
    let own = Noise {
        source: Some(AgentId(1)),
        ..noise
    };
    let faint = Noise {
        origin: Tile::new(7, 0),
        intensity: 1,
        source: None,
    };
    let heard = hear(Tile::new(0, 0), AgentId(1), &senses, [noise, own, faint].iter());
    assert_eq!(heard.len(), 1);
    assert_eq!(heard[0].source, Some(AgentId(2)));
}

#[test]
fn static_emitters_are_heard_through_walls() {
    let world = parse_map(&["#######", "#.#.~.#", "#######"]).expect("map");
    let observer = Observer {
        agent: AgentId(1),
        tile: Tile::new(1, 1),
        facing: Facing::West,
        senses: omni(),
    };
    let obs = observe(&world, &everyone_hostile, &observer, &[], &mut FovCache::new(), 0);
    assert_eq!(obs.noises.len(), 1);
    assert_eq!(obs.noises[0].origin, Tile::new(4, 1));
}

#[test]
fn strongest_foreign_scent_wins() {
    let mut world = GridWorld::new(3, 3);
    world.deposit_scent(Tile::new(1, 0), AgentId(5), 0.4);
    world.deposit_scent(Tile::new(2, 1), AgentId(6), 0.7);
    world.deposit_scent(Tile::new(1, 2), AgentId(1), 0.9);

    let trace = sniff(&world, Tile::new(1, 1), AgentId(1)).expect("scent");
    assert_eq!(trace.tile, Tile::new(2, 1));
    assert_eq!(trace.source, AgentId(6));
}
