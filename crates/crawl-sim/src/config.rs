//! Simulation tuning, loaded from YAML.

use std::path::Path;

use crawl_core::SimResult;
use crawl_nav::TraversalCosts;
use crawl_perception::{ConeShape, Senses};
use serde::{Deserialize, Serialize};

/// Scheduler and subsystem tuning. Every field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Dungeon seed; every agent RNG stream derives from it.
    pub seed: u64,
    /// Agents allowed a full tree re-evaluation per tick. The rest resume or wait.
    pub max_planners_per_tick: usize,
    /// Minimum ticks between full re-evaluations for creatures that do not set their own.
    pub default_reaction_ticks: u32,
    /// Ticks without progress before a windowed local replan.
    pub stuck_ticks: u32,
    pub local_replan_radius: i32,
    pub door_try_open_cost: u32,
    pub door_bash_cost: u32,
    pub trap_avoid_cost: u32,
    pub fov_radius: i32,
    pub fov_cone: ConeShape,
    pub hearing_radius: u32,
    pub hearing_threshold: f32,
    /// Scent left on a tile by each step.
    pub scent_deposit: f32,
    /// Scent lost by every tile per tick.
    pub scent_decay: f32,
    /// Forget horizon for sightings, noises and other short-term facts.
    pub short_term_horizon: u64,
    /// Ticks for a full-strength emotion to decay to zero.
    pub emotion_horizon: u64,
    pub flee_fear_threshold: f32,
    /// Fear gained per point of max-HP fraction lost.
    pub fear_per_damage: f32,
    /// Anger gained per point of max-HP fraction lost.
    pub anger_per_damage: f32,
    pub trace_enabled: bool,
    pub trace_capacity: usize,
    pub goap_max_expansions: usize,
    /// Ticks between GOAP replans caused by state drift.
    pub goap_min_replan_ticks: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_planners_per_tick: 64,
            default_reaction_ticks: 1,
            stuck_ticks: 3,
            local_replan_radius: 3,
            door_try_open_cost: TraversalCosts::default().try_open,
            door_bash_cost: TraversalCosts::default().bash,
            trap_avoid_cost: TraversalCosts::default().trap_avoid,
            fov_radius: 6,
            fov_cone: ConeShape::Forward,
            hearing_radius: 8,
            hearing_threshold: 0.5,
            scent_deposit: 0.5,
            scent_decay: 0.05,
            short_term_horizon: 20,
            emotion_horizon: 20,
            flee_fear_threshold: 0.8,
            fear_per_damage: 2.0,
            anger_per_damage: 1.0,
            trace_enabled: true,
            trace_capacity: 64,
            goap_max_expansions: 2048,
            goap_min_replan_ticks: 2,
        }
    }
}

impl SimConfig {
    pub fn load(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> SimResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_yaml_str(content: &str) -> SimResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn traversal_costs(&self) -> TraversalCosts {
        TraversalCosts {
            try_open: self.door_try_open_cost,
            bash: self.door_bash_cost,
            trap_avoid: self.trap_avoid_cost,
        }
    }

    /// Senses for creatures that do not override them.
    pub fn default_senses(&self) -> Senses {
        Senses {
            sight_radius: self.fov_radius,
            cone: self.fov_cone,
            hearing_radius: self.hearing_radius,
            hearing_threshold: self.hearing_threshold,
            smell: false,
        }
    }
}
