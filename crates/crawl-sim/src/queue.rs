use std::collections::BTreeMap;

use crawl_core::{ActionStatus, AgentId, Fault, Precondition};
use crawl_world::GridWorld;
use serde::{Deserialize, Serialize};

use crate::{ActCtx, Action, ActionKind, Body};

/// A multi-tick action and the ticks already spent on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlight {
    pub action: Action,
    pub progress: u32,
}

/// What happened to the last attempted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    pub tick: u64,
    pub action: Action,
    pub status: ActionStatus,
    #[serde(default)]
    pub fault: Option<Fault>,
}

impl ActionReport {
    pub fn failed(&self) -> bool {
        self.status == ActionStatus::Failure
    }
}

/// One agent's action slot: the intent chosen this tick, the in-flight multi-tick action and
/// per-kind cooldowns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionQueue {
    cooldowns: BTreeMap<ActionKind, u32>,
    in_flight: Option<InFlight>,
    #[serde(skip)]
    requested: Option<Action>,
    last: Option<ActionReport>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick every cooldown down by one, selected or not.
    pub fn begin_tick(&mut self) {
        for remaining in self.cooldowns.values_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        self.cooldowns.retain(|_, remaining| *remaining > 0);
    }

    /// Record the intent for this tick. The first request wins; returns whether this one did.
    pub fn request(&mut self, action: Action) -> bool {
        if self.requested.is_some() {
            return false;
        }
        self.requested = Some(action);
        true
    }

    pub fn requested(&self) -> Option<&Action> {
        self.requested.as_ref()
    }

    pub fn take_request(&mut self) -> Option<Action> {
        self.requested.take()
    }

    /// Abandon the in-flight action. Nothing it has not yet committed is applied.
    pub fn cancel(&mut self) {
        self.in_flight = None;
    }

    pub fn in_flight(&self) -> Option<&InFlight> {
        self.in_flight.as_ref()
    }

    pub fn cooldown(&self, kind: ActionKind) -> u32 {
        self.cooldowns.get(&kind).copied().unwrap_or(0)
    }

    pub fn cooldowns(&self) -> &BTreeMap<ActionKind, u32> {
        &self.cooldowns
    }

    pub fn last(&self) -> Option<&ActionReport> {
        self.last.as_ref()
    }

    /// The action attempted in `tick` failed.
    pub fn failed_at(&self, tick: u64) -> bool {
        self.last.is_some_and(|r| r.tick == tick && r.failed())
    }

    pub fn check(
        &self,
        action: &Action,
        actor: &Body,
        world: &GridWorld,
        bodies: &BTreeMap<AgentId, Body>,
    ) -> Result<(), Precondition> {
        if self.cooldown(action.kind()) > 0 {
            return Err(Precondition::OnCooldown);
        }
        action.check(actor, world, bodies)
    }

    /// The single `perform` call for this agent this tick.
    ///
    /// A different action than the in-flight one starts from scratch. A precondition failure on
    /// an action that already spent ticks means the world moved under it and is reported as
    /// [`Fault::InvalidatedPlan`].
    pub fn execute(&mut self, action: Action, actor: AgentId, ctx: &mut ActCtx<'_>) -> ActionReport {
        let progress = match self.in_flight {
            Some(f) if f.action == action => f.progress,
            _ => 0,
        };
        let kind = action.kind();

        let result = if self.cooldown(kind) > 0 {
            Err(Fault::PreconditionFailure(Precondition::OnCooldown))
        } else {
            action.perform(actor, ctx, progress)
        };

        let report = match result {
            Ok(ActionStatus::Running) => {
                self.in_flight = Some(InFlight {
                    action,
                    progress: progress + 1,
                });
                ActionReport {
                    tick: ctx.tick,
                    action,
                    status: ActionStatus::Running,
                    fault: None,
                }
            }
            Ok(status) => {
                self.in_flight = None;
                if status == ActionStatus::Success && kind.cooldown() > 0 {
                    self.cooldowns.insert(kind, kind.cooldown());
                }
                ActionReport {
                    tick: ctx.tick,
                    action,
                    status,
                    fault: None,
                }
            }
            Err(fault) => {
                self.in_flight = None;
                let fault = match fault {
                    Fault::PreconditionFailure(_) if progress > 0 => Fault::InvalidatedPlan,
                    other => other,
                };
                ActionReport {
                    tick: ctx.tick,
                    action,
                    status: ActionStatus::Failure,
                    fault: Some(fault),
                }
            }
        };
        self.last = Some(report);
        report
    }
}
