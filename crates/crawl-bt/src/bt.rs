#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BtStatus {
    Running,
    Success,
    Failure,
}

impl BtStatus {
    pub fn is_done(self) -> bool {
        self != BtStatus::Running
    }

    pub fn invert(self) -> Self {
        match self {
            BtStatus::Running => BtStatus::Running,
            BtStatus::Success => BtStatus::Failure,
            BtStatus::Failure => BtStatus::Success,
        }
    }
}

impl From<crawl_core::ActionStatus> for BtStatus {
    fn from(value: crawl_core::ActionStatus) -> Self {
        match value {
            crawl_core::ActionStatus::Running => BtStatus::Running,
            crawl_core::ActionStatus::Success => BtStatus::Success,
            crawl_core::ActionStatus::Failure => BtStatus::Failure,
        }
    }
}

/// Top-level behavior families, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Branch {
    Survive,
    Attack,
    Defend,
    Explore,
    Idle,
}

impl Branch {
    pub const ALL: [Branch; 5] = [
        Branch::Survive,
        Branch::Attack,
        Branch::Defend,
        Branch::Explore,
        Branch::Idle,
    ];

    /// 0 for the highest priority.
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Branch::Survive => "survive",
            Branch::Attack => "attack",
            Branch::Defend => "defend",
            Branch::Explore => "explore",
            Branch::Idle => "idle",
        }
    }
}
