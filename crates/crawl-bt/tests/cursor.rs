use std::collections::{BTreeMap, BTreeSet};

use crawl_bt::{BtStatus, Branch, Cursor, Decorator, LeafHandler, NodeId, Tree, TreeBuilder};

#[derive(Debug, Default)]
struct Script {
    status: BTreeMap<&'static str, BtStatus>,
    keys: BTreeSet<u64>,
    ticked: Vec<&'static str>,
    cancelled: Vec<&'static str>,
}

impl Script {
    fn set(&mut self, leaf: &'static str, status: BtStatus) {
        self.status.insert(leaf, status);
    }

    fn take_ticked(&mut self) -> Vec<&'static str> {
        std::mem::take(&mut self.ticked)
    }
}

impl LeafHandler<&'static str> for Script {
    fn tick(&mut self, _node: NodeId, leaf: &&'static str) -> BtStatus {
        self.ticked.push(leaf);
        self.status.get(leaf).copied().unwrap_or(BtStatus::Failure)
    }

    fn cancel(&mut self, _node: NodeId, leaf: &&'static str) {
        self.cancelled.push(leaf);
    }

    fn has_key(&self, key: u64) -> bool {
        self.keys.contains(&key)
    }
}

fn single(kind: Decorator, leaf: &'static str) -> Tree<&'static str> {
    let mut b = TreeBuilder::new("single");
    let l = b.leaf(leaf);
    let root = b.decorate(kind, l);
    b.build(root).expect("tree")
}

/// survive: scared -> flee ; explore
fn priority_tree() -> Tree<&'static str> {
    let mut b = TreeBuilder::new("priority");
    let scared = b.leaf("scared");
    let flee = b.leaf("flee");
    let survive = b.sequence(vec![scared, flee]);
    b.label(survive, Branch::Survive);
    let explore = b.leaf("explore");
    b.label(explore, Branch::Explore);
    let root = b.reactive_selector(vec![survive, explore]);
    b.build(root).expect("tree")
}

#[test]
fn sequence_resumes_at_running_child() {
    let mut b = TreeBuilder::new("seq");
    let a = b.leaf("a");
    let bb = b.leaf("b");
    let c = b.leaf("c");
    let root = b.sequence(vec![a, bb, c]);
    let tree = b.build(root).expect("tree");

    let mut script = Script::default();
    script.set("a", BtStatus::Success);
    script.set("b", BtStatus::Running);
    let mut cursor = Cursor::new();

    let r = tree.tick(&mut cursor, &mut script, 0);
    assert_eq!(r.status, BtStatus::Running);
    assert_eq!(script.take_ticked(), vec!["a", "b"]);
    assert_eq!(cursor.path(), &[root, bb]);
    assert_eq!(cursor.running(), Some(bb));

    tree.tick(&mut cursor, &mut script, 1);
    assert_eq!(script.take_ticked(), vec!["b"]);

    script.set("b", BtStatus::Success);
    script.set("c", BtStatus::Success);
    let r = tree.tick(&mut cursor, &mut script, 2);
    assert_eq!(r.status, BtStatus::Success);
    assert_eq!(script.take_ticked(), vec!["b", "c"]);
    assert!(cursor.is_idle());
    assert!(script.cancelled.is_empty());
}

#[test]
fn selector_returns_first_non_failure() {
    let mut b = TreeBuilder::new("sel");
    let x = b.leaf("x");
    let y = b.leaf("y");
    let z = b.leaf("z");
    let root = b.selector(vec![x, y, z]);
    let tree = b.build(root).expect("tree");

    let mut script = Script::default();
    script.set("y", BtStatus::Success);
    let r = tree.tick(&mut Cursor::new(), &mut script, 0);
    assert_eq!(r.status, BtStatus::Success);
    assert_eq!(script.take_ticked(), vec!["x", "y"]);
}

#[test]
fn higher_priority_branch_preempts_and_cancels_running_leaf() {
    let tree = priority_tree();
    let mut script = Script::default();
    script.set("explore", BtStatus::Running);
    script.set("flee", BtStatus::Running);
    let mut cursor = Cursor::new();

    let r = tree.tick(&mut cursor, &mut script, 0);
    assert_eq!(r.branch, Some(Branch::Explore));
    assert_eq!(cursor.active_branch(), Some(Branch::Explore));

    script.set("scared", BtStatus::Success);
    let r = tree.tick(&mut cursor, &mut script, 1);
    assert_eq!(r.branch, Some(Branch::Survive));
    assert_eq!(r.previous_branch, Some(Branch::Explore));
    assert!(r.branch_changed());
    assert_eq!(script.cancelled, vec!["explore"]);
    assert_eq!(r.cancelled.len(), 1);
    assert_eq!(tree.leaf(cursor.running().expect("running")), Some(&"flee"));
}

#[test]
fn resume_skips_higher_priority_checks() {
    let tree = priority_tree();
    let mut script = Script::default();
    script.set("explore", BtStatus::Running);
    let mut cursor = Cursor::new();
    tree.tick(&mut cursor, &mut script, 0);
    script.take_ticked();

    script.set("scared", BtStatus::Success);
    let r = tree.resume(&mut cursor, &mut script, 1).expect("running");
    assert_eq!(script.take_ticked(), vec!["explore"]);
    assert_eq!(r.branch, Some(Branch::Explore));
    assert!(script.cancelled.is_empty());

    assert!(tree.resume(&mut Cursor::new(), &mut script, 1).is_none());
}

#[test]
fn time_limit_fails_after_n_running_ticks_and_cancels() {
    let tree = single(Decorator::TimeLimit(2), "walk");
    let mut script = Script::default();
    script.set("walk", BtStatus::Running);
    let mut cursor = Cursor::new();

    assert_eq!(tree.tick(&mut cursor, &mut script, 0).status, BtStatus::Running);
    assert_eq!(cursor.timers().get(&tree.root()), Some(&1));
    assert_eq!(tree.tick(&mut cursor, &mut script, 1).status, BtStatus::Running);
    let r = tree.tick(&mut cursor, &mut script, 2);
    assert_eq!(r.status, BtStatus::Failure);
    assert_eq!(script.take_ticked(), vec!["walk", "walk"]);
    assert_eq!(script.cancelled, vec!["walk"]);
    assert!(cursor.is_idle());
    assert!(cursor.timers().is_empty());
}

#[test]
fn until_success_retries_on_following_ticks() {
    let tree = single(Decorator::UntilSuccess, "pick_lock");
    let mut script = Script::default();
    let mut cursor = Cursor::new();

    let r = tree.tick(&mut cursor, &mut script, 0);
    assert_eq!(r.status, BtStatus::Running);
    assert_eq!(cursor.running(), Some(tree.root()));

    script.set("pick_lock", BtStatus::Success);
    assert_eq!(tree.tick(&mut cursor, &mut script, 1).status, BtStatus::Success);
    assert_eq!(script.take_ticked().len(), 2);
}

#[test]
fn until_fail_and_inverter() {
    let tree = single(Decorator::UntilFail, "swing");
    let mut script = Script::default();
    script.set("swing", BtStatus::Success);
    let mut cursor = Cursor::new();
    assert_eq!(tree.tick(&mut cursor, &mut script, 0).status, BtStatus::Running);
    script.set("swing", BtStatus::Failure);
    assert_eq!(tree.tick(&mut cursor, &mut script, 1).status, BtStatus::Success);

    let tree = single(Decorator::Inverter, "swing");
    assert_eq!(tree.tick(&mut Cursor::new(), &mut script, 0).status, BtStatus::Success);
}

#[test]
fn blackboard_key_gates_the_child() {
    let tree = single(Decorator::WithBlackboardKey(42), "chase");
    let mut script = Script::default();
    script.set("chase", BtStatus::Success);

    assert_eq!(tree.tick(&mut Cursor::new(), &mut script, 0).status, BtStatus::Failure);
    assert!(script.take_ticked().is_empty());

    script.keys.insert(42);
    assert_eq!(tree.tick(&mut Cursor::new(), &mut script, 0).status, BtStatus::Success);
}

#[test]
fn cooldown_blocks_reentry_for_n_ticks() {
    let tree = single(Decorator::Cooldown(3), "shout");
    let mut script = Script::default();
    script.set("shout", BtStatus::Success);
    let mut cursor = Cursor::new();

    assert_eq!(tree.tick(&mut cursor, &mut script, 10).status, BtStatus::Success);
    assert_eq!(cursor.cooldowns().get(&tree.root()), Some(&13));
    assert_eq!(tree.tick(&mut cursor, &mut script, 11).status, BtStatus::Failure);
    assert_eq!(tree.tick(&mut cursor, &mut script, 12).status, BtStatus::Failure);
    assert_eq!(tree.tick(&mut cursor, &mut script, 13).status, BtStatus::Success);
    assert_eq!(script.take_ticked(), vec!["shout", "shout"]);
}

#[test]
fn abort_cancels_and_resets() {
    let tree = priority_tree();
    let mut script = Script::default();
    script.set("explore", BtStatus::Running);
    let mut cursor = Cursor::new();
    tree.tick(&mut cursor, &mut script, 0);

    assert!(tree.abort(&mut cursor, &mut script).is_some());
    assert_eq!(script.cancelled, vec!["explore"]);
    assert!(cursor.is_idle());
    assert!(cursor.reaction_elapsed(1, 100));
}

#[test]
fn reaction_interval_gates_reevaluation() {
    let tree = priority_tree();
    let mut script = Script::default();
    script.set("explore", BtStatus::Running);
    let mut cursor = Cursor::new();
    assert!(cursor.reaction_elapsed(0, 3));
    tree.tick(&mut cursor, &mut script, 5);
    assert!(!cursor.reaction_elapsed(7, 3));
    assert!(cursor.reaction_elapsed(8, 3));
}

#[test]
fn invalid_cursor_path_restarts_from_root() {
    let tree = priority_tree();
    let mut script = Script::default();
    script.set("explore", BtStatus::Running);
    let mut cursor = Cursor::new();
    tree.tick(&mut cursor, &mut script, 0);

    let other = {
        let mut b = TreeBuilder::new("other");
        let only = b.leaf("explore");
        let extra = b.leaf("x");
        let root = b.sequence(vec![extra, only]);
        b.build(root).expect("tree")
    };
    // A cursor from a different tree is discarded instead of followed.
    let r = other.tick(&mut cursor, &mut script, 1);
    assert_eq!(r.status, BtStatus::Failure);
    assert!(cursor.is_idle());
}
