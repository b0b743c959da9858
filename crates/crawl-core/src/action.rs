#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of one `perform` call or one behavior-tree node tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ActionStatus {
    Running,
    Success,
    Failure,
}

impl ActionStatus {
    pub fn is_done(self) -> bool {
        self != ActionStatus::Running
    }
}

/// Why an in-simulation attempt did not go through.
///
/// These are expected conditions recovered within one tick by the planner and action queue; they
/// are recorded, not raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Fault {
    /// An action's `check` rejected the attempt.
    PreconditionFailure(Precondition),
    /// The world changed under a running action (door closed mid-approach, target gone).
    InvalidatedPlan,
    /// No route between the requested tiles.
    PathNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Precondition {
    ActorDown,
    NotAdjacent,
    Blocked,
    Occupied,
    OutOfBounds,
    TargetMissing,
    TargetDown,
    OnCooldown,
    NotEnoughMana,
    OutOfRange,
    NoLineOfSight,
    NothingToUse,
    NothingToInteract,
    MissingKey,
    AlreadyThere,
}
