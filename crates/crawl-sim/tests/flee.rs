use crawl_bt::Branch;
use crawl_core::{ActionStatus, Facing, Tile};
use crawl_sim::memory::FEAR;
use crawl_sim::{Action, CreatureDef, Definitions, SimConfig, Simulation};
use crawl_world::GridWorld;

/// A goblin pinned against a brute that hits for 3 every tick.
fn cornered() -> (Simulation, crawl_core::AgentId, crawl_core::AgentId) {
    let mut defs = Definitions::builtin().expect("builtin definitions");
    defs.creatures.insert(
        "brute".to_string(),
        CreatureDef {
            hp: 50,
            min_atk: 3,
            max_atk: 3,
            faction: "party".to_string(),
            behavior: Some("berserker".to_string()),
            ..CreatureDef::default()
        },
    );
    let mut sim = Simulation::new(SimConfig::default().with_seed(11), defs, GridWorld::new(9, 5));
    let goblin = sim
        .spawn("goblin", Tile::new(2, 2), Facing::East)
        .expect("spawn goblin");
    let brute = sim
        .spawn("brute", Tile::new(3, 2), Facing::West)
        .expect("spawn brute");
    (sim, goblin, brute)
}

#[test]
fn sustained_damage_flips_the_goblin_from_attack_to_survive() {
    let (mut sim, goblin, brute) = cornered();

    sim.run(2);
    let mind = sim.mind(goblin).expect("goblin");
    assert_eq!(mind.active_branch(), Some(Branch::Attack));
    assert!(mind.brain.blackboard.scalar(FEAR, sim.tick()) <= 0.8);
    assert_eq!(sim.body(goblin).expect("goblin").hp, 4);

    let threat = sim.body(brute).expect("brute").tile;
    let before = sim.body(goblin).expect("goblin").tile;

    sim.run(1);
    let mind = sim.mind(goblin).expect("goblin");
    assert_eq!(mind.active_branch(), Some(Branch::Survive));
    assert!(mind.brain.blackboard.scalar(FEAR, sim.tick()) > 0.8);

    let report = mind.brain.queue.last().expect("acted");
    assert_eq!(report.status, ActionStatus::Success);
    let Action::Move { to } = report.action else {
        panic!("expected a move, got {:?}", report.action);
    };
    assert!(to.manhattan(threat) > before.manhattan(threat));
    assert_eq!(sim.body(goblin).expect("goblin").tile, to);
    assert!(mind.brain.trace.contains_tag("bt.branch"));
}

#[test]
fn fleeing_goblin_escapes_the_brute_swing() {
    let (mut sim, goblin, _) = cornered();
    sim.run(3);
    // The brute committed to a swing against the goblin's old tile; the goblin acts first.
    assert_eq!(sim.body(goblin).expect("goblin").hp, 4);
    assert!(sim.body(goblin).expect("goblin").alive);
}
