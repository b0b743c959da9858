use crawl_core::{AgentId, BbKey, Blackboard, MemoryUpdate, Retention, Sighting, ThreatClass, Tile};

const LAST_SEEN: BbKey<Sighting> = BbKey::new(1);
const FEAR: BbKey<f32> = BbKey::new(2);
const KNOWN_DOORS: BbKey<crawl_core::TileSet> = BbKey::new(3);
const HOME: BbKey<Tile> = BbKey::new(4);

fn sighting(x: i32) -> Sighting {
    Sighting {
        agent: AgentId(9),
        tile: Tile::new(x, 0),
        threat: ThreatClass::Hostile,
    }
}

#[test]
fn fact_is_absent_once_age_reaches_horizon() {
    let mut bb = Blackboard::new();
    let mut update = MemoryUpdate::new();
    update.remember(LAST_SEEN, sighting(1), 10, Retention::Ticks(5));
    bb.apply(update, 10);

    assert_eq!(bb.get(LAST_SEEN, 14), Some(sighting(1)));
    // Reads apply the forget check even before the next update runs.
    assert_eq!(bb.get(LAST_SEEN, 15), None);

    let report = bb.apply(MemoryUpdate::new(), 15);
    assert_eq!(report.evicted, 1);
    assert!(bb.is_empty());
}

#[test]
fn older_observation_never_overwrites_newer() {
    let mut bb = Blackboard::new();
    let mut newer = MemoryUpdate::new();
    newer.remember(LAST_SEEN, sighting(7), 20, Retention::Ticks(50));
    bb.apply(newer, 20);

    let mut older = MemoryUpdate::new();
    older.remember(LAST_SEEN, sighting(3), 18, Retention::Ticks(50));
    let report = bb.apply(older, 21);

    assert_eq!(report.rejected_stale, 1);
    assert_eq!(bb.get(LAST_SEEN, 21).map(|s| s.tile), Some(Tile::new(7, 0)));
}

#[test]
fn scalar_increments_are_summed_then_clamped_then_decayed_once() {
    let mut a = Blackboard::new();
    let mut b = Blackboard::new();

    let mut ua = MemoryUpdate::new();
    ua.nudge(FEAR, 0.7, Retention::Ticks(10))
        .nudge(FEAR, 0.6, Retention::Ticks(10))
        .nudge(FEAR, -0.2, Retention::Ticks(10));
    let mut ub = MemoryUpdate::new();
    ub.nudge(FEAR, -0.2, Retention::Ticks(10))
        .nudge(FEAR, 0.6, Retention::Ticks(10))
        .nudge(FEAR, 0.7, Retention::Ticks(10));

    a.apply(ua, 1);
    b.apply(ub, 1);

    let fa = a.scalar(FEAR, 1);
    assert!((fa - 0.9).abs() < 1e-5, "got {fa}");
    assert_eq!(fa, b.scalar(FEAR, 1));
}

#[test]
fn scalar_falls_linearly_to_zero_and_is_forgotten() {
    let mut bb = Blackboard::new();
    let mut up = MemoryUpdate::new();
    up.nudge(FEAR, 0.5, Retention::Ticks(4));
    bb.apply(up, 0);
    assert!((bb.scalar(FEAR, 0) - 0.25).abs() < 1e-6);

    bb.apply(MemoryUpdate::new(), 1);
    assert!(bb.scalar(FEAR, 1).abs() < 1e-6);
    assert!(!bb.contains(FEAR, 1));
}

#[test]
fn long_term_tile_sets_accumulate_and_persist() {
    let mut bb = Blackboard::new();
    let mut up = MemoryUpdate::new();
    up.insert_tile(KNOWN_DOORS, Tile::new(2, 3), 1, Retention::Forever)
        .insert_tile(KNOWN_DOORS, Tile::new(5, 1), 1, Retention::Forever);
    bb.apply(up, 1);
    bb.apply(MemoryUpdate::new(), 10_000);

    let doors = bb.get(KNOWN_DOORS, 10_000).unwrap_or_default();
    assert_eq!(doors.len(), 2);
    assert!(doors.contains(&Tile::new(5, 1)));
}

#[test]
fn confidence_falls_off_linearly() {
    let mut bb = Blackboard::new();
    bb.set(HOME, Tile::new(1, 1), 0, Retention::Ticks(10));
    assert_eq!(bb.confidence(HOME, 0), 1.0);
    assert!((bb.confidence(HOME, 5) - 0.5).abs() < 1e-6);
    assert_eq!(bb.confidence(HOME, 10), 0.0);
}

#[test]
#[should_panic(expected = "blackboard type mismatch")]
fn blackboard_type_mismatch_panics() {
    let mut bb = Blackboard::new();
    bb.set(BbKey::<bool>::new(1), true, 0, Retention::Forever);
    let _ = bb.get(BbKey::<i64>::new(1), 0);
}
