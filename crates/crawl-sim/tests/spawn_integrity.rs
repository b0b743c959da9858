use crawl_core::{AgentId, Facing, SimError, Tile};
use crawl_sim::{Definitions, SimConfig, Simulation};
use crawl_world::{parse_map, GridWorld, WorldView};

const BROKEN: &str = r#"
factions: [monsters]
creatures:
  lost: { faction: nowhere, behavior: idler }
  mute: { behavior: silence }
  garbled: { behavior: garbled }
  backwards: { behavior: backwards }
  fine: { behavior: idler }
behaviors:
  idler:
    name: idler
    root:
      selector:
        reactive: true
        children:
          - leaf: { name: wait, branch: idle }
  garbled:
    name: garbled
    root:
      selector:
        reactive: true
        children:
          - leaf: { name: recite_poetry, branch: idle }
  backwards:
    name: backwards
    root:
      selector:
        reactive: true
        children:
          - leaf: { name: wander, branch: idle }
          - leaf: { name: flee, branch: survive }
"#;

fn sim() -> Simulation {
    let defs = Definitions::from_yaml_str(BROKEN).expect("definitions parse");
    Simulation::new(SimConfig::default(), defs, GridWorld::new(6, 6))
}

fn what(err: SimError) -> String {
    match err {
        SimError::DataIntegrity { what, .. } => what,
        other => panic!("expected a data integrity error, got {other}"),
    }
}

#[test]
fn unresolvable_references_fail_only_that_spawn() {
    let mut sim = sim();
    let at = Tile::new(2, 2);

    assert_eq!(what(sim.spawn("dragon", at, Facing::North).expect_err("unknown")), "creature");
    assert_eq!(what(sim.spawn("lost", at, Facing::North).expect_err("faction")), "faction");
    assert_eq!(what(sim.spawn("mute", at, Facing::North).expect_err("preset")), "behavior");
    assert_eq!(
        what(sim.spawn("garbled", at, Facing::North).expect_err("leaf")),
        "behavior tree"
    );
    assert_eq!(
        what(sim.spawn("backwards", at, Facing::North).expect_err("priority order")),
        "behavior tree"
    );
    assert_eq!(sim.agents().count(), 0);
    assert_eq!(sim.world().occupant(at), None);

    // Failed spawns do not burn ids.
    let id = sim.spawn("fine", at, Facing::North).expect("spawns");
    assert_eq!(id, AgentId(1));
}

#[test]
fn spawning_into_a_wall_or_onto_someone_is_rejected() {
    let defs = Definitions::from_yaml_str(BROKEN).expect("definitions parse");
    let world = parse_map(&["####", "#..#", "####"]).expect("map");
    let mut sim = Simulation::new(SimConfig::default(), defs, world);

    assert_eq!(what(sim.spawn("fine", Tile::new(0, 0), Facing::East).expect_err("wall")), "spawn");
    let first = sim.spawn("fine", Tile::new(1, 1), Facing::East).expect("floor");
    assert_eq!(what(sim.spawn("fine", Tile::new(1, 1), Facing::East).expect_err("taken")), "spawn");
    assert_eq!(sim.world().occupant(Tile::new(1, 1)), Some(first));
}

#[test]
fn queued_spawns_that_fail_are_counted_and_skipped() {
    let mut sim = sim();
    let keeper = sim.spawn("fine", Tile::new(0, 0), Facing::East).expect("spawns");
    sim.request_spawn("dragon", Tile::new(3, 3), Facing::West);
    sim.request_spawn("fine", Tile::new(4, 4), Facing::West);

    assert!(sim.step());
    assert_eq!(sim.spawn_failures(), 1);
    assert_eq!(sim.agents().count(), 2);
    assert!(sim.body(keeper).expect("keeper").alive);
    assert_eq!(sim.world().occupant(Tile::new(4, 4)), Some(AgentId(2)));
}

#[test]
fn commands_for_tree_driven_agents_are_refused() {
    let mut sim = sim();
    let id = sim.spawn("fine", Tile::new(1, 1), Facing::East).expect("spawns");
    let err = sim
        .submit(id, crawl_sim::Command::Forward)
        .expect_err("not controlled");
    assert_eq!(what(err), "command");
}
