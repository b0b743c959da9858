use crawl_bt::{BtStatus, Branch, Cursor, LeafHandler, NodeId, Tree, TreeBuilder};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

struct Alternating {
    tick: u64,
}

impl LeafHandler<u32> for Alternating {
    fn tick(&mut self, _node: NodeId, leaf: &u32) -> BtStatus {
        match (*leaf as u64 + self.tick) % 3 {
            0 => BtStatus::Failure,
            1 => BtStatus::Running,
            _ => BtStatus::Success,
        }
    }

    fn cancel(&mut self, _node: NodeId, _leaf: &u32) {}
}

fn wide_tree(branches: u32, depth: u32) -> Tree<u32> {
    let mut b = TreeBuilder::new("bench");
    let mut tops = Vec::new();
    for (i, branch) in Branch::ALL.iter().cycle().take(branches as usize).enumerate() {
        let leaves: Vec<_> = (0..depth).map(|d| b.leaf(i as u32 * 31 + d)).collect();
        let seq = b.reactive_sequence(leaves);
        b.label(seq, *branch);
        tops.push(seq);
    }
    let root = b.reactive_selector(tops);
    b.build(root).expect("tree")
}

fn bench_tick(c: &mut Criterion) {
    let tree = wide_tree(5, 6);
    let mut group = c.benchmark_group("crawl-bt/tick");

    group.bench_function("reevaluate", |b| {
        let mut cursor = Cursor::new();
        let mut handler = Alternating { tick: 0 };
        b.iter(|| {
            handler.tick += 1;
            let r = tree.tick(&mut cursor, &mut handler, handler.tick);
            black_box(r.status);
        })
    });

    group.bench_function("resume", |b| {
        let mut cursor = Cursor::new();
        let mut handler = Alternating { tick: 0 };
        b.iter(|| {
            handler.tick += 1;
            let r = match tree.resume(&mut cursor, &mut handler, handler.tick) {
                Some(r) => r,
                None => tree.tick(&mut cursor, &mut handler, handler.tick),
            };
            black_box(r.status);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
