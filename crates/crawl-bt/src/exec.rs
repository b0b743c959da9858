use std::collections::{BTreeMap, BTreeSet};

use crate::{BtStatus, Branch, Cursor, Decorator, Node, NodeId, Tree};

/// Executes leaves on behalf of one agent.
pub trait LeafHandler<L> {
    fn tick(&mut self, node: NodeId, leaf: &L) -> BtStatus;

    /// A leaf that was Running is no longer wanted (preempted by a higher-priority branch, timed
    /// out, or aborted). Must leave world and agent state consistent.
    fn cancel(&mut self, node: NodeId, leaf: &L);

    /// Backs the `WithBlackboardKey` decorator.
    fn has_key(&self, _key: u64) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Reactive composites re-check from their first child.
    Reevaluate,
    /// Every composite continues at the child on the cursor path.
    Resume,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub status: BtStatus,
    /// Outermost labelled node that did not fail this tick.
    pub branch: Option<Branch>,
    pub previous_branch: Option<Branch>,
    /// Node left Running, if any (normally a leaf; a retrying decorator otherwise).
    pub running: Option<NodeId>,
    /// Leaves that were Running and got cancelled this tick, ascending.
    pub cancelled: Vec<NodeId>,
    /// Leaves ticked this tick, in tick order.
    pub ticked: Vec<NodeId>,
}

impl TickReport {
    pub fn branch_changed(&self) -> bool {
        self.branch != self.previous_branch
    }
}

struct Eval<'a, L, H: ?Sized> {
    tree: &'a Tree<L>,
    handler: &'a mut H,
    mode: Mode,
    tick: u64,
    prev_path: &'a [NodeId],
    prev_timers: &'a BTreeMap<NodeId, u32>,
    timers: BTreeMap<NodeId, u32>,
    cooldowns: &'a mut BTreeMap<NodeId, u64>,
    path: Vec<NodeId>,
    finished: BTreeSet<NodeId>,
    started: BTreeSet<NodeId>,
    ticked: Vec<NodeId>,
    branch: Option<Branch>,
}

impl<L, H> Eval<'_, L, H>
where
    H: LeafHandler<L> + ?Sized,
{
    fn on_prev_path(&self, id: NodeId) -> bool {
        self.prev_path.contains(&id)
    }

    /// Index of the child this composite was running last tick.
    fn resume_index(&self, id: NodeId, children: &[NodeId]) -> Option<usize> {
        let at = self.prev_path.iter().position(|n| *n == id)?;
        let next = self.prev_path.get(at + 1)?;
        children.iter().position(|c| c == next)
    }

    fn eval(&mut self, id: NodeId) -> BtStatus {
        let tree = self.tree;
        let mark = self.path.len();
        let status = match tree.node(id) {
            None => BtStatus::Failure,
            Some(Node::Leaf(leaf)) => {
                let status = self.handler.tick(id, leaf);
                self.ticked.push(id);
                if status == BtStatus::Running {
                    self.started.insert(id);
                } else {
                    self.finished.insert(id);
                }
                status
            }
            Some(Node::Selector { children, reactive }) => {
                let start = self.start_index(id, children, *reactive);
                let mut result = BtStatus::Failure;
                for &child in &children[start..] {
                    let s = self.eval(child);
                    if s != BtStatus::Failure {
                        result = s;
                        break;
                    }
                }
                result
            }
            Some(Node::Sequence { children, reactive }) => {
                let start = self.start_index(id, children, *reactive);
                let mut result = BtStatus::Success;
                for &child in &children[start..] {
                    let s = self.eval(child);
                    if s != BtStatus::Success {
                        result = s;
                        break;
                    }
                }
                result
            }
            Some(Node::Decorator { kind, child }) => self.decorate(id, *kind, *child),
        };

        if status == BtStatus::Running {
            self.path.push(id);
        } else {
            self.path.truncate(mark);
        }
        if status != BtStatus::Failure {
            if let Some(branch) = tree.branch(id) {
                self.branch = Some(branch);
            }
        }
        status
    }

    fn start_index(&self, id: NodeId, children: &[NodeId], reactive: bool) -> usize {
        if reactive && self.mode == Mode::Reevaluate {
            return 0;
        }
        self.resume_index(id, children).unwrap_or(0)
    }

    fn decorate(&mut self, id: NodeId, kind: Decorator, child: NodeId) -> BtStatus {
        match kind {
            Decorator::Inverter => self.eval(child).invert(),
            Decorator::UntilSuccess => match self.eval(child) {
                BtStatus::Success => BtStatus::Success,
                _ => BtStatus::Running,
            },
            Decorator::UntilFail => match self.eval(child) {
                BtStatus::Failure => BtStatus::Success,
                _ => BtStatus::Running,
            },
            Decorator::TimeLimit(limit) => {
                let elapsed = if self.on_prev_path(id) {
                    self.prev_timers.get(&id).copied().unwrap_or(0)
                } else {
                    0
                };
                if elapsed >= limit {
                    return BtStatus::Failure;
                }
                let s = self.eval(child);
                if s == BtStatus::Running {
                    self.timers.insert(id, elapsed + 1);
                }
                s
            }
            Decorator::WithBlackboardKey(key) => {
                if self.handler.has_key(key) {
                    self.eval(child)
                } else {
                    BtStatus::Failure
                }
            }
            Decorator::Cooldown(ticks) => {
                if self.cooldowns.get(&id).is_some_and(|ready| *ready > self.tick) {
                    return BtStatus::Failure;
                }
                let s = self.eval(child);
                if s.is_done() {
                    self.cooldowns.insert(id, self.tick + ticks as u64);
                }
                s
            }
        }
    }
}

impl<L> Tree<L> {
    /// Full evaluation from the root: reactive composites re-check higher-priority children.
    pub fn tick<H>(&self, cursor: &mut Cursor, handler: &mut H, tick: u64) -> TickReport
    where
        H: LeafHandler<L> + ?Sized,
    {
        cursor.last_evaluated = Some(tick);
        self.run(cursor, handler, tick, Mode::Reevaluate)
    }

    /// Continue along the cursor path without re-checking earlier children. `None` when idle.
    pub fn resume<H>(&self, cursor: &mut Cursor, handler: &mut H, tick: u64) -> Option<TickReport>
    where
        H: LeafHandler<L> + ?Sized,
    {
        if cursor.is_idle() {
            return None;
        }
        Some(self.run(cursor, handler, tick, Mode::Resume))
    }

    /// Cancel whatever is running and reset the cursor.
    pub fn abort<H>(&self, cursor: &mut Cursor, handler: &mut H) -> Option<NodeId>
    where
        H: LeafHandler<L> + ?Sized,
    {
        let running = cursor.running();
        let cancelled = running.and_then(|id| self.leaf(id).map(|leaf| (id, leaf)));
        if let Some((id, leaf)) = cancelled {
            handler.cancel(id, leaf);
        }
        cursor.reset();
        cancelled.map(|(id, _)| id)
    }

    fn run<H>(&self, cursor: &mut Cursor, handler: &mut H, tick: u64, mode: Mode) -> TickReport
    where
        H: LeafHandler<L> + ?Sized,
    {
        if !self.is_valid_path(&cursor.path) {
            cursor.path.clear();
            cursor.timers.clear();
        }
        let prev_path = std::mem::take(&mut cursor.path);
        let prev_timers = std::mem::take(&mut cursor.timers);
        let previous_branch = cursor.active_branch;

        let mut eval = Eval {
            tree: self,
            handler,
            mode,
            tick,
            prev_path: &prev_path,
            prev_timers: &prev_timers,
            timers: BTreeMap::new(),
            cooldowns: &mut cursor.cooldowns,
            path: Vec::new(),
            finished: BTreeSet::new(),
            started: BTreeSet::new(),
            ticked: Vec::new(),
            branch: None,
        };
        let status = eval.eval(self.root());

        let mut path = std::mem::take(&mut eval.path);
        path.reverse();
        let running = path.last().copied();
        let running_leaf = running.filter(|id| self.leaf(*id).is_some());

        let mut stale: BTreeSet<NodeId> = std::mem::take(&mut eval.started);
        if let Some(prev) = prev_path.last().copied() {
            if self.leaf(prev).is_some() {
                stale.insert(prev);
            }
        }
        let cancelled: Vec<NodeId> = stale
            .into_iter()
            .filter(|id| !eval.finished.contains(id) && Some(*id) != running_leaf)
            .collect();
        for id in &cancelled {
            if let Some(leaf) = self.leaf(*id) {
                eval.handler.cancel(*id, leaf);
            }
        }

        let branch = eval.branch;
        let ticked = std::mem::take(&mut eval.ticked);
        let timers = std::mem::take(&mut eval.timers);
        cursor.cooldowns.retain(|_, ready| *ready > tick);

        cursor.timers = timers;
        cursor.path = path;
        cursor.active_branch = if status == BtStatus::Running {
            branch
        } else {
            None
        };
        cursor.last_status = Some(status);

        TickReport {
            status,
            branch,
            previous_branch,
            running,
            cancelled,
            ticked,
        }
    }
}
