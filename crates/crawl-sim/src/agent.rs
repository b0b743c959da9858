//! Per-agent runtime state and the think phase.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crawl_bt::{Branch, Cursor, Tree};
use crawl_core::{to_world, AgentId, Blackboard, SplitMix64, Tile, TraceEvent, TraceLog};
use crawl_goap::{GoapPlanPolicy, GoapPlanPolicyConfig};
use crawl_nav::{PathCache, StuckTracker};
use crawl_perception::{observe, FovCache, Noise, Observations, Observer, Roster, Senses};
use crawl_world::{GridWorld, Item, WorldView};
use serde::{Deserialize, Serialize};

use crate::leaves::{Leaf, Thinker};
use crate::memory;
use crate::{Action, ActionQueue, Body, Event, GoalKind, GoapOp, SimConfig, Slot, Spell};

/// Everything about an agent that comes from its definition rather than from play.
#[derive(Debug, Clone)]
pub struct Profile {
    pub kind: String,
    pub tree: Option<Arc<Tree<Leaf>>>,
    pub goal: Option<GoalKind>,
    pub reaction_ticks: u32,
    pub act_every_ticks: u32,
    pub senses: Senses,
    /// Driven by submitted commands instead of a tree.
    pub controlled: bool,
}

impl Profile {
    /// Slow creatures act on a fixed phase derived from their id, so equal-speed agents spread
    /// out over the cycle.
    pub fn should_act(&self, tick: u64, agent: AgentId) -> bool {
        let every = self.act_every_ticks.max(1) as u64;
        let offset = agent.stable_id() % every;
        (tick + offset) % every == 0
    }
}

/// Where the agent is currently headed and the world generation its route was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Travel {
    pub target: Tile,
    pub generation: u64,
}

/// Player (or scripted) input for a controlled agent, relative to its facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Forward,
    StepBack,
    StrafeLeft,
    StrafeRight,
    TurnLeft,
    TurnRight,
    /// Attack `target`, or whoever stands in front.
    Attack { target: Option<AgentId> },
    /// Cast at `target`, or at the first agent ahead within range.
    Cast { spell: Spell, target: Option<AgentId> },
    Use { item: Item, target: Option<Tile> },
    /// Pick up what lies underfoot, else work whatever is in front.
    Interact,
    Wait,
    /// Reorder two formation slots. Takes no time.
    Swap { a: Slot, b: Slot },
}

impl Command {
    /// The action this command stands for, given where `me` is. `None` for formation swaps.
    pub fn to_action(self, me: &Body, world: &GridWorld) -> Option<Action> {
        let ahead = me.tile.step(me.facing);
        Some(match self {
            Command::Forward => Action::Move {
                to: to_world(me.tile, me.facing, 1, 0),
            },
            Command::StepBack => Action::StepBack,
            Command::StrafeLeft => Action::Move {
                to: to_world(me.tile, me.facing, 0, -1),
            },
            Command::StrafeRight => Action::Move {
                to: to_world(me.tile, me.facing, 0, 1),
            },
            Command::TurnLeft => Action::Turn {
                to: me.facing.turn_left(),
            },
            Command::TurnRight => Action::Turn {
                to: me.facing.turn_right(),
            },
            Command::Attack { target } => match target.or_else(|| world.occupant(ahead)) {
                Some(target) => Action::Attack { target },
                None => Action::Wait,
            },
            Command::Cast { spell, target } => {
                let target = match spell {
                    Spell::Firebolt => target.or_else(|| first_ahead(me, world, spell.range())),
                    Spell::Mend => None,
                };
                Action::Cast { spell, target }
            }
            Command::Use { item, target } => Action::Use { item, target },
            Command::Interact => {
                let underfoot = world.tile(me.tile).is_some_and(|t| t.item.is_some());
                Action::Interact {
                    tile: if underfoot { me.tile } else { ahead },
                }
            }
            Command::Wait => Action::Wait,
            Command::Swap { .. } => return None,
        })
    }
}

fn first_ahead(me: &Body, world: &GridWorld, range: u32) -> Option<AgentId> {
    let mut tile = me.tile;
    for _ in 0..range {
        tile = tile.step(me.facing);
        if world.is_opaque(tile) {
            return None;
        }
        if let Some(agent) = world.occupant(tile).filter(|a| *a != me.id) {
            return Some(agent);
        }
    }
    None
}

/// An agent's private state: memory, action slot, RNG stream and per-agent caches.
#[derive(Debug, Clone)]
pub struct Brain {
    pub blackboard: Blackboard,
    pub queue: ActionQueue,
    pub rng: SplitMix64,
    pub trace: TraceLog,
    pub paths: PathCache,
    pub fov: FovCache,
    pub stuck: StuckTracker,
    pub travel: Option<Travel>,
    pub goap: GoapPlanPolicy<GoapOp>,
    /// Events drained in the last act phase, consumed by the next think.
    pub inbox: Vec<Event>,
    pub observations: Observations,
    pub commands: VecDeque<Command>,
    /// Formation swap waiting for the act phase.
    pub swap: Option<(Slot, Slot)>,
    pub fov_overlay: bool,
}

impl Brain {
    pub fn new(agent: AgentId, config: &SimConfig) -> Self {
        let trace = if config.trace_enabled {
            TraceLog::with_capacity(config.trace_capacity)
        } else {
            TraceLog::disabled()
        };
        Self {
            blackboard: Blackboard::new(),
            queue: ActionQueue::new(),
            rng: SplitMix64::for_agent(config.seed, agent.stable_id()),
            trace,
            paths: PathCache::new(),
            fov: FovCache::new(),
            stuck: StuckTracker::new(),
            travel: None,
            goap: GoapPlanPolicy::new(GoapPlanPolicyConfig {
                min_replan_interval_ticks: config.goap_min_replan_ticks,
                ..GoapPlanPolicyConfig::default()
            }),
            inbox: Vec::new(),
            observations: Observations::default(),
            commands: VecDeque::new(),
            swap: None,
            fov_overlay: false,
        }
    }
}

/// The committed state every agent thinks against during one tick.
pub struct Snapshot<'a, R: ?Sized> {
    pub world: &'a GridWorld,
    pub bodies: &'a BTreeMap<AgentId, Body>,
    pub roster: &'a R,
    pub config: &'a SimConfig,
    pub tick: u64,
}

#[derive(Debug, Clone)]
pub struct Mind {
    pub profile: Profile,
    pub cursor: Cursor,
    pub brain: Brain,
}

impl Mind {
    pub fn new(agent: AgentId, profile: Profile, config: &SimConfig) -> Self {
        Self {
            profile,
            cursor: Cursor::new(),
            brain: Brain::new(agent, config),
        }
    }

    pub fn active_branch(&self) -> Option<Branch> {
        self.cursor.active_branch()
    }

    /// Perceive, update memory and pick at most one intent for this tick.
    ///
    /// Reads only the snapshot and writes only this mind. `planner_slot` says whether the agent
    /// may run a full tree re-evaluation this tick; without one it resumes its running branch.
    pub fn think<R>(&mut self, me: &Body, snap: &Snapshot<'_, R>, planner_slot: bool)
    where
        R: Roster + ?Sized,
    {
        if !me.alive {
            return;
        }
        let tick = snap.tick;
        self.perceive(me, snap);

        if self.profile.controlled {
            self.obey(me, snap.world, tick);
            return;
        }

        let Mind {
            profile,
            cursor,
            brain,
        } = self;

        let mut thinker = Thinker {
            brain,
            me,
            world: snap.world,
            bodies: snap.bodies,
            config: snap.config,
            tick,
        };

        let failed_last_tick = tick > 0 && thinker.brain.queue.failed_at(tick - 1);
        if failed_last_tick {
            if let Some(tree) = &profile.tree {
                tree.abort(cursor, &mut thinker);
            }
            thinker.brain.travel = None;
            thinker.brain.goap.invalidate();
            thinker.brain.trace.push(TraceEvent::new(tick, "act.replan"));
        }

        let Some(tree) = profile.tree.clone() else {
            if let Some(goal) = profile.goal {
                thinker.plan(goal);
            }
            return;
        };

        let full = planner_slot && cursor.reaction_elapsed(tick, profile.reaction_ticks);
        let report = if full {
            Some(tree.tick(cursor, &mut thinker, tick))
        } else {
            tree.resume(cursor, &mut thinker, tick)
        };
        let Some(report) = report else {
            thinker.brain.queue.request(Action::Wait);
            return;
        };

        if report.status == crawl_bt::BtStatus::Failure {
            if let Some(goal) = profile.goal {
                thinker.plan(goal);
            }
        }
        if report.branch_changed() {
            let rank = report.branch.map(|b| b.rank() as u64).unwrap_or(u64::MAX);
            thinker
                .brain
                .trace
                .push(TraceEvent::new(tick, "bt.branch").with_a(rank));
            tracing::trace!(
                agent = %me.id,
                from = report.previous_branch.map(Branch::name),
                to = report.branch.map(Branch::name),
                "branch change"
            );
        }
    }

    fn perceive<R>(&mut self, me: &Body, snap: &Snapshot<'_, R>)
    where
        R: Roster + ?Sized,
    {
        let tick = snap.tick;
        let brain = &mut self.brain;
        let noises: Vec<Noise> = brain
            .inbox
            .iter()
            .filter_map(Event::noise)
            .filter(|n| n.source != Some(me.id))
            .collect();
        let observer = Observer {
            agent: me.id,
            tile: me.tile,
            facing: me.facing,
            senses: self.profile.senses,
        };
        let obs = observe(snap.world, snap.roster, &observer, &noises, &mut brain.fov, tick);
        let update = memory::remember(
            &obs,
            me,
            &brain.inbox,
            snap.world,
            snap.bodies,
            &brain.blackboard,
            snap.config,
            tick,
        );
        brain.blackboard.apply(update, tick);
        memory::settle(&mut brain.blackboard, &brain.inbox, tick);
        brain.inbox.clear();
        brain.observations = obs;
    }

    fn obey(&mut self, me: &Body, world: &GridWorld, tick: u64) {
        let Some(command) = self.brain.commands.pop_front() else {
            return;
        };
        self.brain
            .trace
            .push(TraceEvent::new(tick, "command").with_a(me.id.0));
        match command {
            Command::Swap { a, b } => self.brain.swap = Some((a, b)),
            other => {
                if let Some(action) = other.to_action(me, world) {
                    self.brain.queue.request(action);
                }
            }
        }
    }
}
