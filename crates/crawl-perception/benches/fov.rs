use crawl_core::{Facing, Tile};
use crawl_perception::{compute_fov, ConeShape, FovCache};
use crawl_world::{default_map, parse_map, GridWorld};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_fov(c: &mut Criterion) {
    let dungeon = parse_map(&default_map()).expect("map");
    let hall = GridWorld::new(64, 64);

    let mut group = c.benchmark_group("crawl-perception/fov");

    group.bench_function("default_map_forward", |b| {
        b.iter(|| {
            let seen = compute_fov(&dungeon, Tile::new(1, 14), Facing::East, 8, ConeShape::Forward);
            black_box(seen.len());
        })
    });

    group.bench_function("open_hall_omni_r16", |b| {
        b.iter(|| {
            let seen = compute_fov(&hall, Tile::new(32, 32), Facing::North, 16, ConeShape::Omni);
            black_box(seen.len());
        })
    });

    let mut cache = FovCache::new();
    group.bench_function("open_hall_cached", |b| {
        b.iter(|| {
            let seen =
                cache.get_or_compute(&hall, Tile::new(32, 32), Facing::North, 16, ConeShape::Omni);
            black_box(seen.len());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_fov);
criterion_main!(benches);
