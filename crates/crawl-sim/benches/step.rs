use crawl_core::{Facing, Tile};
use crawl_sim::{Definitions, SimConfig, Simulation};
use crawl_world::GridWorld;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

const KINDS: [&str; 4] = ["goblin", "orc", "rat", "scavenger"];

/// An open hall with `count` creatures on a lattice, facing alternating directions.
fn crowded_hall(count: usize, max_planners: usize) -> Simulation {
    let config = SimConfig {
        max_planners_per_tick: max_planners,
        ..SimConfig::default()
    }
    .with_seed(17);
    let defs = Definitions::builtin().expect("builtin definitions");
    let mut sim = Simulation::new(config, defs, GridWorld::new(48, 48));
    for i in 0..count {
        let tile = Tile::new(1 + (i as i32 % 16) * 3, 1 + (i as i32 / 16) * 3);
        let facing = Facing::ALL[i % 4];
        sim.spawn(KINDS[i % KINDS.len()], tile, facing).expect("spawn");
    }
    sim
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("crawl-sim/step");

    for count in [16, 64, 200] {
        group.bench_function(format!("agents_{count}"), |b| {
            b.iter_batched(
                || crowded_hall(count, 64),
                |mut sim| {
                    sim.run(10);
                    black_box(sim.world_hash())
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.bench_function("agents_200_capped_16", |b| {
        b.iter_batched(
            || crowded_hall(200, 16),
            |mut sim| {
                sim.run(10);
                black_box(sim.world_hash())
            },
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_step);
criterion_main!(benches);
