//! The closed set of behavior-tree leaves and the handler that runs them for one agent.
//!
//! Condition leaves read the blackboard and answer Success or Failure. Action leaves record at
//! most one intent in the agent's action queue and report Running while they have something to
//! do; the intent is performed later, in the serialized act phase.

use std::collections::{BTreeMap, BTreeSet};

use crawl_bt::{BtStatus, LeafHandler, LeafRegistry, NodeId, TreeError};
use crawl_core::{
    ActionStatus, AgentId, DeterministicRng, Facing, Retention, TileSet, Tile, TraceEvent,
};
use crawl_goap::{GoapPlanKey, GoapStep};
use crawl_nav::{local_replan, PathConstraints};
use crawl_world::{GridWorld, Item, WorldView};

use crate::memory::{
    self, ANGER, ENEMY_VISIBLE, EXPLORE_GOAL, FEAR, HOME, ITEMS, KNOWN, LAST_ATTACKER, NOISE, PITS,
    SCENT, TARGET, THREAT, TRAPS, UNREACHABLE,
};
use crate::{goap, Action, ActionKind, Body, Brain, GoalKind, GoapOp, SimConfig, Spell, Travel};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Leaf {
    FearAbove(f32),
    AngerAbove(f32),
    HpBelow(f32),
    EnemyVisible,
    EnemyKnown,
    EnemyAdjacent,
    NoiseHeard,
    ScentFresh,
    HasPotion,
    HasMana(i32),
    ItemKnown,
    Attack,
    Firebolt,
    Mend,
    DrinkPotion,
    Chase,
    Flee { distance: u32 },
    Explore,
    Investigate,
    FollowScent,
    FetchItem,
    Guard,
    StepBack,
    Wander,
    Wait,
    Plan(GoalKind),
}

/// Maps preset leaf names onto [`Leaf`]. `fear_above` without a threshold uses the configured
/// flee threshold.
#[derive(Debug, Clone, Copy)]
pub struct LeafLibrary {
    pub flee_threshold: f32,
}

impl LeafLibrary {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            flee_threshold: config.flee_fear_threshold,
        }
    }
}

fn param(leaf: &str, params: &BTreeMap<String, f32>, name: &str) -> Result<f32, TreeError> {
    params.get(name).copied().ok_or_else(|| TreeError::BadLeafParams {
        leaf: leaf.to_string(),
        detail: format!("missing `{name}`"),
    })
}

fn unit(leaf: &str, value: f32) -> Result<f32, TreeError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(TreeError::BadLeafParams {
            leaf: leaf.to_string(),
            detail: format!("{value} is outside [0, 1]"),
        })
    }
}

impl LeafRegistry<Leaf> for LeafLibrary {
    fn leaf(&self, name: &str, params: &BTreeMap<String, f32>) -> Result<Leaf, TreeError> {
        Ok(match name {
            "fear_above" => {
                let t = params.get("threshold").copied().unwrap_or(self.flee_threshold);
                Leaf::FearAbove(unit(name, t)?)
            }
            "anger_above" => Leaf::AngerAbove(unit(name, param(name, params, "threshold")?)?),
            "hp_below" => Leaf::HpBelow(unit(name, param(name, params, "fraction")?)?),
            "enemy_visible" => Leaf::EnemyVisible,
            "enemy_known" => Leaf::EnemyKnown,
            "enemy_adjacent" => Leaf::EnemyAdjacent,
            "noise_heard" => Leaf::NoiseHeard,
            "scent_fresh" => Leaf::ScentFresh,
            "has_potion" => Leaf::HasPotion,
            "has_mana" => Leaf::HasMana(param(name, params, "amount")?.max(0.0) as i32),
            "item_known" => Leaf::ItemKnown,
            "attack" => Leaf::Attack,
            "firebolt" => Leaf::Firebolt,
            "mend" => Leaf::Mend,
            "drink_potion" => Leaf::DrinkPotion,
            "chase" => Leaf::Chase,
            "flee" => Leaf::Flee {
                distance: params
                    .get("distance")
                    .copied()
                    .unwrap_or(goap::SAFE_DISTANCE as f32)
                    .max(1.0) as u32,
            },
            "explore" => Leaf::Explore,
            "investigate" => Leaf::Investigate,
            "follow_scent" => Leaf::FollowScent,
            "fetch_item" => Leaf::FetchItem,
            "guard" => Leaf::Guard,
            "step_back" => Leaf::StepBack,
            "wander" => Leaf::Wander,
            "wait" => Leaf::Wait,
            "plan_defeat_enemy" => Leaf::Plan(GoalKind::DefeatEnemy),
            "plan_escape" => Leaf::Plan(GoalKind::Escape),
            "plan_recover" => Leaf::Plan(GoalKind::Recover),
            other => return Err(TreeError::UnknownLeaf(other.to_string())),
        })
    }

    fn key(&self, name: &str) -> Option<u64> {
        memory::key_id(name)
    }
}

/// Runs leaves for one agent against the frozen world of this tick.
pub struct Thinker<'a> {
    pub brain: &'a mut Brain,
    pub me: &'a Body,
    pub world: &'a GridWorld,
    pub bodies: &'a BTreeMap<AgentId, Body>,
    pub config: &'a SimConfig,
    pub tick: u64,
}

impl LeafHandler<Leaf> for Thinker<'_> {
    fn tick(&mut self, _node: NodeId, leaf: &Leaf) -> BtStatus {
        self.run(*leaf)
    }

    fn cancel(&mut self, node: NodeId, _leaf: &Leaf) {
        self.brain.queue.cancel();
        self.brain.travel = None;
        self.brain.stuck.reset();
        self.brain
            .trace
            .push(TraceEvent::new(self.tick, "bt.cancel").with_a(node.0 as u64));
    }

    fn has_key(&self, key: u64) -> bool {
        self.brain
            .blackboard
            .iter()
            .any(|(id, fact)| id == key && !fact.is_forgotten(self.tick))
    }
}

fn status(ok: bool) -> BtStatus {
    if ok {
        BtStatus::Success
    } else {
        BtStatus::Failure
    }
}

impl Thinker<'_> {
    pub fn run(&mut self, leaf: Leaf) -> BtStatus {
        let bb = &self.brain.blackboard;
        let tick = self.tick;
        match leaf {
            Leaf::FearAbove(t) => status(bb.scalar(FEAR, tick) > t),
            Leaf::AngerAbove(t) => status(bb.scalar(ANGER, tick) > t),
            Leaf::HpBelow(f) => status(self.me.hp_fraction() < f),
            Leaf::EnemyVisible => status(bb.get(ENEMY_VISIBLE, tick).unwrap_or(false)),
            Leaf::EnemyKnown => status(bb.contains(TARGET, tick)),
            Leaf::EnemyAdjacent => status(
                bb.get(TARGET, tick)
                    .is_some_and(|t| self.me.distance_to(t.tile) == 1),
            ),
            Leaf::NoiseHeard => status(bb.contains(NOISE, tick)),
            Leaf::ScentFresh => status(bb.contains(SCENT, tick)),
            Leaf::HasPotion => status(self.me.potions > 0),
            Leaf::HasMana(m) => status(self.me.available_mana(m)),
            Leaf::ItemKnown => status(bb.get(ITEMS, tick).is_some_and(|s| !s.is_empty())),
            Leaf::Attack => self.attack(),
            Leaf::Firebolt => self.firebolt(),
            Leaf::Mend => self.once(
                Action::Cast {
                    spell: Spell::Mend,
                    target: None,
                },
            ),
            Leaf::DrinkPotion => self.once(Action::Use {
                item: Item::Potion,
                target: None,
            }),
            Leaf::Chase => self.chase(),
            Leaf::Flee { distance } => self.flee(distance),
            Leaf::Explore => self.explore(),
            Leaf::Investigate => self.investigate(),
            Leaf::FollowScent => self.follow_scent(),
            Leaf::FetchItem => self.fetch_item(),
            Leaf::Guard => self.guard(),
            Leaf::StepBack => self.once(Action::StepBack),
            Leaf::Wander => self.wander(),
            Leaf::Wait => {
                self.intend(Action::Wait);
                BtStatus::Running
            }
            Leaf::Plan(goal) => self.plan(goal),
        }
    }

    fn intend(&mut self, action: Action) -> bool {
        self.brain.queue.request(action)
    }

    /// Request `action` if it would pass its check right now.
    fn try_intend(&mut self, action: Action) -> bool {
        let ok = self
            .brain
            .queue
            .check(&action, self.me, self.world, self.bodies)
            .is_ok();
        ok && self.intend(action)
    }

    /// The same kind of action went through last tick.
    fn just_did(&self, kind: ActionKind) -> bool {
        self.brain.queue.last().is_some_and(|r| {
            r.tick + 1 == self.tick && r.status == ActionStatus::Success && r.action.kind() == kind
        })
    }

    /// One-shot action: Running while requested, Success once it went through.
    fn once(&mut self, action: Action) -> BtStatus {
        if self.just_did(action.kind()) {
            return BtStatus::Success;
        }
        if self.try_intend(action) {
            BtStatus::Running
        } else {
            BtStatus::Failure
        }
    }

    fn target(&self) -> Option<(AgentId, Tile)> {
        self.brain
            .blackboard
            .get(TARGET, self.tick)
            .map(|s| (s.agent, s.tile))
    }

    fn forget_target(&mut self) {
        self.brain.blackboard.remove(TARGET);
    }

    fn attack(&mut self) -> BtStatus {
        let Some((target, _)) = self.target() else {
            return BtStatus::Failure;
        };
        if !self.bodies.get(&target).is_some_and(|b| b.alive) {
            self.forget_target();
            return BtStatus::Success;
        }
        if self.try_intend(Action::Attack { target }) {
            BtStatus::Running
        } else {
            BtStatus::Failure
        }
    }

    fn firebolt(&mut self) -> BtStatus {
        let Some((target, _)) = self.target() else {
            return BtStatus::Failure;
        };
        if !self.bodies.get(&target).is_some_and(|b| b.alive) {
            self.forget_target();
            return BtStatus::Success;
        }
        let cast = Action::Cast {
            spell: Spell::Firebolt,
            target: Some(target),
        };
        // Keep casting what is already in flight even though the cooldown has not started yet.
        let casting = self.brain.queue.in_flight().is_some_and(|f| f.action == cast);
        if casting || self.try_intend(cast) {
            self.intend(cast);
            BtStatus::Running
        } else {
            BtStatus::Failure
        }
    }

    fn chase(&mut self) -> BtStatus {
        let Some((target, tile)) = self.target() else {
            return BtStatus::Failure;
        };
        if self.me.distance_to(tile) <= 1 {
            let there = self
                .bodies
                .get(&target)
                .is_some_and(|b| b.alive && b.occupies(tile));
            if !there {
                // Reached the last sighting and nobody is there.
                self.forget_target();
                return BtStatus::Failure;
            }
            return BtStatus::Success;
        }
        self.travel(tile, true)
    }

    fn flee(&mut self, distance: u32) -> BtStatus {
        let bb = &self.brain.blackboard;
        let threat = bb.get(THREAT, self.tick).or_else(|| {
            bb.get(LAST_ATTACKER, self.tick)
                .and_then(|a| self.bodies.get(&a))
                .map(|b| b.tile)
        });
        let Some(threat) = threat else {
            return BtStatus::Failure;
        };
        let here = self.me.distance_to(threat);
        if here >= distance {
            return BtStatus::Success;
        }
        let traps = self.known(TRAPS);
        let best = Facing::ALL
            .into_iter()
            .map(|f| self.me.tile.step(f))
            .filter(|t| !traps.contains(t))
            .filter(|t| {
                self.brain
                    .queue
                    .check(&Action::Move { to: *t }, self.me, self.world, self.bodies)
                    .is_ok()
            })
            .map(|t| (t.manhattan(threat), t))
            .filter(|(d, _)| *d > here)
            .max_by(|(da, ta), (db, tb)| da.cmp(db).then(tb.cmp(ta)));
        match best {
            Some((_, to)) => {
                self.intend(Action::Move { to });
                BtStatus::Running
            }
            None => BtStatus::Failure,
        }
    }

    fn known(&self, key: crawl_core::BbKey<TileSet>) -> TileSet {
        self.brain.blackboard.get(key, self.tick).unwrap_or_default()
    }

    /// Known passable tiles with an unknown in-bounds neighbour.
    fn frontier(&self) -> BTreeSet<Tile> {
        let known = self.known(KNOWN);
        let pits = self.known(PITS);
        let unreachable = self.known(UNREACHABLE);
        known
            .iter()
            .copied()
            .filter(|t| !pits.contains(t) && !unreachable.contains(t))
            .filter(|t| {
                self.world
                    .tile(*t)
                    .is_some_and(|s| s.is_walkable() || s.door.is_some())
            })
            .filter(|t| {
                t.neighbors()
                    .into_iter()
                    .any(|n| self.world.in_bounds(n) && !known.contains(&n))
            })
            .collect()
    }

    fn explore(&mut self) -> BtStatus {
        let frontier = self.frontier();
        let here = self.me.tile;
        let current = self
            .brain
            .blackboard
            .get(EXPLORE_GOAL, self.tick)
            .filter(|g| frontier.contains(g) && *g != here);
        let goal = current.or_else(|| {
            frontier
                .iter()
                .copied()
                .filter(|t| *t != here)
                .min_by_key(|t| (here.manhattan(*t), t.y, t.x))
        });
        let Some(goal) = goal else {
            return BtStatus::Failure;
        };
        self.brain
            .blackboard
            .set(EXPLORE_GOAL, goal, self.tick, Retention::Forever);
        match self.travel(goal, false) {
            BtStatus::Failure => {
                self.mark_unreachable(goal);
                BtStatus::Failure
            }
            BtStatus::Success => BtStatus::Running,
            running => running,
        }
    }

    fn mark_unreachable(&mut self, tile: Tile) {
        let mut set = self.known(UNREACHABLE);
        set.insert(tile);
        let horizon = Retention::Ticks(self.config.short_term_horizon);
        self.brain.blackboard.set(UNREACHABLE, set, self.tick, horizon);
        self.brain.blackboard.remove(EXPLORE_GOAL);
    }

    fn investigate(&mut self) -> BtStatus {
        let Some(origin) = self.brain.blackboard.get(NOISE, self.tick) else {
            return BtStatus::Failure;
        };
        match self.travel(origin, true) {
            BtStatus::Success => {
                self.brain.blackboard.remove(NOISE);
                BtStatus::Success
            }
            BtStatus::Failure => {
                self.brain.blackboard.remove(NOISE);
                BtStatus::Failure
            }
            running => running,
        }
    }

    fn follow_scent(&mut self) -> BtStatus {
        let Some(tile) = self.brain.blackboard.get(SCENT, self.tick) else {
            return BtStatus::Failure;
        };
        if tile == self.me.tile {
            return BtStatus::Success;
        }
        if self.try_intend(Action::Move { to: tile }) {
            BtStatus::Running
        } else {
            BtStatus::Failure
        }
    }

    fn fetch_item(&mut self) -> BtStatus {
        let here = self.me.tile;
        let Some(item) = self
            .known(ITEMS)
            .into_iter()
            .min_by_key(|t| (here.manhattan(*t), t.y, t.x))
        else {
            return BtStatus::Failure;
        };
        if self.me.occupies(item) {
            return if self.try_intend(Action::Interact { tile: item }) {
                BtStatus::Running
            } else {
                BtStatus::Failure
            };
        }
        match self.travel(item, false) {
            BtStatus::Success => BtStatus::Running,
            other => other,
        }
    }

    fn guard(&mut self) -> BtStatus {
        let home = self
            .brain
            .blackboard
            .get(HOME, self.tick)
            .unwrap_or(self.me.tile);
        if self.me.tile != home {
            return match self.travel(home, false) {
                BtStatus::Failure => {
                    self.intend(Action::Wait);
                    BtStatus::Running
                }
                _ => BtStatus::Running,
            };
        }
        let facing = self
            .brain
            .blackboard
            .get(THREAT, self.tick)
            .or_else(|| self.brain.blackboard.get(NOISE, self.tick))
            .and_then(|t| Facing::toward(self.me.tile, t));
        match facing {
            Some(to) if to != self.me.facing => {
                self.intend(Action::Turn { to });
            }
            _ => {
                self.intend(Action::Wait);
            }
        }
        BtStatus::Running
    }

    fn wander(&mut self) -> BtStatus {
        let options: Vec<Tile> = Facing::ALL
            .into_iter()
            .map(|f| self.me.tile.step(f))
            .filter(|t| {
                self.brain
                    .queue
                    .check(&Action::Move { to: *t }, self.me, self.world, self.bodies)
                    .is_ok()
            })
            .collect();
        let pick = self.brain.rng.pick_index(options.len());
        match pick.and_then(|i| options.get(i)) {
            Some(&to) => self.intend(Action::Move { to }),
            None => self.intend(Action::Wait),
        };
        BtStatus::Running
    }

    /// One step toward `goal` through the path cache. Doors on the way are opened, unlocked or
    /// bashed before stepping through.
    fn travel(&mut self, goal: Tile, stop_adjacent: bool) -> BtStatus {
        let me = self.me;
        let arrived = if stop_adjacent {
            me.distance_to(goal) <= 1
        } else {
            me.tile == goal
        };
        if arrived {
            self.brain.travel = None;
            self.brain.stuck.reset();
            return BtStatus::Success;
        }

        let constraints = PathConstraints::for_agent(me.id)
            .hostile(me.bashes_doors)
            .opens_doors(me.opens_doors)
            .with_keys(me.keys.iter().copied())
            .with_footprint(me.footprint)
            .with_costs(self.config.traversal_costs());

        let mut path = match self
            .brain
            .paths
            .route(self.world, me.id, me.tile, goal, &constraints)
        {
            Ok(path) => path,
            Err(fault) => {
                tracing::trace!(agent = %me.id, ?goal, ?fault, "no route");
                self.brain
                    .trace
                    .push(TraceEvent::new(self.tick, "nav.fail").with_a(me.id.0));
                self.brain.travel = None;
                return BtStatus::Failure;
            }
        };

        if self.brain.stuck.is_stuck(self.config.stuck_ticks) {
            match local_replan(self.world, &path, self.config.local_replan_radius, &constraints) {
                Ok(detour) => {
                    self.brain.paths.insert(me.id, goal, detour.clone());
                    path = detour;
                }
                Err(_) => {
                    self.brain.paths.forget_agent(me.id);
                }
            }
            self.brain.stuck.reset();
            self.brain
                .trace
                .push(TraceEvent::new(self.tick, "nav.replan").with_a(me.id.0));
        }

        self.brain.travel = Some(Travel {
            target: goal,
            generation: path.generation(),
        });
        let Some(next) = path.next_after(me.tile) else {
            return BtStatus::Success;
        };
        if stop_adjacent && next == goal {
            return BtStatus::Success;
        }

        // Doors are worked from the neighbouring tile before stepping through.
        let door = me
            .cells_at(next)
            .into_iter()
            .filter(|c| !me.occupies(*c))
            .find(|c| self.world.door(*c).is_some_and(|d| !d.open));
        if let Some(door_tile) = door {
            self.brain.stuck.reset();
            let key = self
                .world
                .door(door_tile)
                .and_then(|d| d.lock)
                .filter(|k| me.keys.contains(k));
            let action = match key {
                Some(key) => Action::Use {
                    item: Item::Key(key),
                    target: Some(door_tile),
                },
                None => Action::Interact { tile: door_tile },
            };
            let in_flight = self.brain.queue.in_flight().is_some_and(|f| f.action == action);
            return if in_flight || self.try_intend(action) {
                self.intend(action);
                BtStatus::Running
            } else {
                BtStatus::Failure
            };
        }

        let step = Action::Move { to: next };
        match self.brain.queue.check(&step, me, self.world, self.bodies) {
            Ok(()) => {
                self.brain.stuck.reset();
                self.intend(step);
                BtStatus::Running
            }
            Err(crawl_core::Precondition::Occupied) => {
                // Blocked by a mover: hold and count toward a local replan.
                self.brain.stuck.record(me.tile);
                self.intend(Action::Wait);
                BtStatus::Running
            }
            Err(reason) => {
                tracing::trace!(agent = %me.id, ?next, ?reason, "step rejected");
                self.brain.paths.forget_agent(me.id);
                BtStatus::Failure
            }
        }
    }

    /// Drive the GOAP policy toward `goal` and run the step it picks.
    pub fn plan(&mut self, goal: GoalKind) -> BtStatus {
        let target = self.target().map(|(a, _)| a);
        let threat = self.brain.blackboard.get(THREAT, self.tick);
        let planner = goap::planner_for(self.me, target, threat, self.world, self.bodies, self.config);
        let key = GoapPlanKey {
            start: goap::current_state(self.me, &self.brain.blackboard, self.world, self.tick),
            goal: goal.atoms(),
            signature: self.world.generation(),
        };
        let calls = self.brain.goap.plan_calls();
        let step = self.brain.goap.next_step(&planner, key, self.tick);
        if self.brain.goap.plan_calls() != calls {
            let len = self.brain.goap.current_plan().map(|p| p.len()).unwrap_or(0);
            self.brain.trace.push(
                TraceEvent::new(self.tick, "goap.plan")
                    .with_a(key.start)
                    .with_b(len as u64),
            );
        }
        match step {
            GoapStep::Done => BtStatus::Success,
            GoapStep::NoPlan | GoapStep::Exhausted => BtStatus::Failure,
            GoapStep::Step(op) => {
                let leaf = match op {
                    GoapOp::Approach => Leaf::Chase,
                    GoapOp::Strike => Leaf::Attack,
                    GoapOp::Firebolt => Leaf::Firebolt,
                    GoapOp::Retreat => Leaf::Flee {
                        distance: goap::SAFE_DISTANCE,
                    },
                    GoapOp::DrinkPotion => Leaf::DrinkPotion,
                    GoapOp::Mend => Leaf::Mend,
                };
                match self.run(leaf) {
                    // A finished step is progress; the policy moves on next tick.
                    BtStatus::Success => BtStatus::Running,
                    other => other,
                }
            }
        }
    }
}
