use thiserror::Error;

/// Conditions that escalate past the simulation tick.
///
/// In-simulation conditions (precondition failures, invalidated plans, unreachable tiles) are
/// [`crate::Fault`] values handled locally and never become a `SimError`.
#[derive(Debug, Error)]
pub enum SimError {
    /// Malformed or missing behavior/faction/loot definition referenced at spawn. Fatal for that
    /// spawn only.
    #[error("data integrity error in {what}: {detail}")]
    DataIntegrity { what: String, detail: String },

    /// Two replays with identical seed and inputs diverged. Always a defect.
    #[error("determinism violation at tick {tick}: expected world hash {expected:#018x}, got {actual:#018x}")]
    DeterminismViolation { tick: u64, expected: u64, actual: u64 },

    #[error("save data error: {0}")]
    Save(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SimError {
    pub fn data_integrity(what: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::DataIntegrity {
            what: what.into(),
            detail: detail.into(),
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
