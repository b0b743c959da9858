use crawl_core::{AgentId, Tile};
use crawl_nav::{find_path, step_cost, PathConstraints, TraversalCosts};
use crawl_world::{Door, GridWorld, Terrain, WorldView};
use proptest::prelude::*;

const SIZE: i32 = 8;

fn build(cells: &[u8]) -> GridWorld {
    let mut world = GridWorld::new(SIZE as u32, SIZE as u32);
    for (i, kind) in cells.iter().enumerate() {
        let tile = Tile::new(i as i32 % SIZE, i as i32 / SIZE);
        match kind {
            0 | 1 => world.set_terrain(tile, Terrain::Wall).expect("in bounds"),
            2 => world.tile_mut(tile).expect("in bounds").door = Some(Door::closed()),
            3 => world.set_extra_cost(tile, 2).expect("in bounds"),
            4 => world.set_extra_cost(tile, 5).expect("in bounds"),
            _ => {}
        }
    }
    world
}

/// Bellman-Ford style relaxation with its own cost rule.
fn brute_force(world: &GridWorld, from: Tile, to: Tile, try_open: u32) -> Option<u32> {
    let enter = |t: Tile| -> Option<u32> {
        let s = world.tile(t)?;
        if s.terrain != Terrain::Floor {
            return None;
        }
        let door = match s.door {
            Some(d) if !d.open => try_open,
            _ => 0,
        };
        Some(1 + s.extra_cost + door)
    };

    let n = (SIZE * SIZE) as usize;
    let idx = |t: Tile| (t.y * SIZE + t.x) as usize;
    let mut dist = vec![u32::MAX; n];
    dist[idx(from)] = 0;
    loop {
        let mut changed = false;
        for y in 0..SIZE {
            for x in 0..SIZE {
                let t = Tile::new(x, y);
                if dist[idx(t)] == u32::MAX {
                    continue;
                }
                for d in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
                    let nb = t.offset(d.0, d.1);
                    if !world.in_bounds(nb) {
                        continue;
                    }
                    if let Some(c) = enter(nb) {
                        let cand = dist[idx(t)] + c;
                        if cand < dist[idx(nb)] {
                            dist[idx(nb)] = cand;
                            changed = true;
                        }
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
    if from == to {
        return Some(0);
    }
    match dist[idx(to)] {
        u32::MAX => None,
        d => Some(d),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn astar_cost_equals_brute_force(
        cells in prop::collection::vec(0u8..10, (SIZE * SIZE) as usize),
        a in 0..SIZE * SIZE,
        b in 0..SIZE * SIZE,
    ) {
        let world = build(&cells);
        let from = Tile::new(a % SIZE, a / SIZE);
        let to = Tile::new(b % SIZE, b / SIZE);
        let constraints = PathConstraints::for_agent(AgentId(1));
        let try_open = TraversalCosts::default().try_open;

        let found = find_path(&world, from, to, &constraints);
        let expected = if from != to && world.tile(to).map(|t| t.terrain != Terrain::Floor).unwrap_or(true) {
            None
        } else {
            brute_force(&world, from, to, try_open)
        };
        prop_assert_eq!(found.as_ref().ok().map(|p| p.cost()), expected);

        if let Ok(path) = found {
            let mut total = 0;
            for pair in path.tiles().windows(2) {
                prop_assert!(pair[0].is_adjacent(pair[1]));
                total += step_cost(&world, pair[0], pair[1], &constraints).expect("legal step");
            }
            prop_assert_eq!(total, path.cost());

            let again = find_path(&world, from, to, &constraints).expect("same result");
            prop_assert_eq!(again.tiles(), path.tiles());
        }
    }
}
