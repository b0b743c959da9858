use crawl_goap::{goal_met, GoapAction, GoapPlanner, GoapPlannerConfig, GoapState};

const ENEMY_VISIBLE: GoapState = 1 << 0;
const ENEMY_ADJACENT: GoapState = 1 << 1;
const ENEMY_DEFEATED: GoapState = 1 << 2;
const HAS_MANA: GoapState = 1 << 3;
const ESCAPED: GoapState = 1 << 4;
const HAS_KEY: GoapState = 1 << 5;
const DOOR_OPEN: GoapState = 1 << 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Approach,
    Strike,
    Firebolt,
    Retreat,
    Unlock,
    Bash,
    Leave,
}

fn library() -> Vec<GoapAction<Step>> {
    vec![
        GoapAction::new("approach", 2, Step::Approach)
            .requires(ENEMY_VISIBLE)
            .forbids(ENEMY_ADJACENT)
            .adds(ENEMY_ADJACENT),
        GoapAction::new("strike", 1, Step::Strike)
            .requires(ENEMY_ADJACENT)
            .adds(ENEMY_DEFEATED),
        GoapAction::new("firebolt", 4, Step::Firebolt)
            .requires(ENEMY_VISIBLE | HAS_MANA)
            .adds(ENEMY_DEFEATED)
            .removes(HAS_MANA),
        GoapAction::new("retreat", 3, Step::Retreat)
            .requires(ENEMY_VISIBLE)
            .adds(ESCAPED)
            .removes(ENEMY_VISIBLE | ENEMY_ADJACENT),
        GoapAction::new("unlock", 1, Step::Unlock)
            .requires(HAS_KEY)
            .forbids(DOOR_OPEN)
            .adds(DOOR_OPEN),
        GoapAction::new("bash", 5, Step::Bash)
            .forbids(DOOR_OPEN)
            .adds(DOOR_OPEN),
        GoapAction::new("leave", 1, Step::Leave)
            .requires(DOOR_OPEN)
            .adds(ESCAPED),
    ]
}

#[test]
fn satisfied_goal_yields_empty_plan() {
    let planner = GoapPlanner::new(library());
    let plan = planner.plan(ENEMY_DEFEATED, ENEMY_DEFEATED).expect("plan");
    assert!(plan.is_empty());
}

#[test]
fn cheapest_plan_wins() {
    let planner = GoapPlanner::new(library());
    let plan = planner
        .plan(ENEMY_VISIBLE | HAS_MANA, ENEMY_DEFEATED)
        .expect("plan");
    // approach + strike (3) beats firebolt (4).
    assert_eq!(plan.steps, vec![Step::Approach, Step::Strike]);

    let plan = planner
        .plan(ENEMY_VISIBLE | ENEMY_ADJACENT, ENEMY_DEFEATED)
        .expect("plan");
    assert_eq!(plan.steps, vec![Step::Strike]);
}

#[test]
fn forbidden_atoms_block_actions() {
    let planner = GoapPlanner::new(library());
    // Without the key the door must be bashed.
    let plan = planner.plan(0, ESCAPED).expect("plan");
    assert_eq!(plan.steps, vec![Step::Bash, Step::Leave]);

    let plan = planner.plan(HAS_KEY, ESCAPED).expect("plan");
    assert_eq!(plan.steps, vec![Step::Unlock, Step::Leave]);

    let plan = planner.plan(ENEMY_VISIBLE, ESCAPED).expect("plan");
    assert_eq!(plan.steps, vec![Step::Retreat]);
}

#[test]
fn unreachable_goal_returns_none() {
    let planner = GoapPlanner::new(library());
    let (plan, stats) = planner.plan_with_stats(0, ENEMY_DEFEATED);
    assert!(plan.is_none());
    assert!(!stats.budget_exhausted);
    assert!(stats.expansions > 0);
}

#[test]
fn expansion_budget_is_enforced() {
    let planner = GoapPlanner::new(library()).with_config(GoapPlannerConfig { max_expansions: 1 });
    let (plan, stats) = planner.plan_with_stats(0, ESCAPED);
    assert!(plan.is_none());
    assert!(stats.budget_exhausted);
}

#[test]
fn plans_are_deterministic_and_replay_to_the_goal() {
    let planner = GoapPlanner::new(library());
    let start = ENEMY_VISIBLE | HAS_KEY;
    let goal = ENEMY_DEFEATED | ESCAPED;
    let (a, _) = planner.search(start, goal);
    let (b, _) = planner.search(start, goal);
    let steps = a.expect("plan");
    assert_eq!(Some(steps.clone()), b);

    let mut state = start;
    for idx in &steps {
        let action = &planner.actions()[*idx];
        assert!(action.is_applicable(state), "{} not applicable", action.name);
        state = action.apply(state);
    }
    assert!(goal_met(state, goal));
    assert_eq!(planner.plan_cost(start, &steps), Some(5));
}
