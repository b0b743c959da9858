//! Replay a scenario twice from scratch and compare world hashes tick by tick.

use crawl_core::{AgentId, SimError, SimResult};
use serde::{Deserialize, Serialize};

use crate::{Command, Simulation};

/// A command submitted right before `tick` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayInput {
    pub tick: u64,
    pub agent: AgentId,
    pub command: Command,
}

/// Builds a fresh simulation for every run, so two runs share nothing but the builder.
pub struct ReplayHarness<F> {
    build: F,
    inputs: Vec<ReplayInput>,
}

impl<F> ReplayHarness<F>
where
    F: Fn() -> SimResult<Simulation>,
{
    pub fn new(build: F) -> Self {
        Self {
            build,
            inputs: Vec::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = ReplayInput>) -> Self {
        self.inputs.extend(inputs);
        self.inputs.sort_by_key(|i| i.tick);
        self
    }

    /// World hash after each of `ticks` ticks.
    pub fn record(&self, ticks: u64) -> SimResult<Vec<u64>> {
        let mut sim = (self.build)()?;
        let mut hashes = Vec::with_capacity(ticks as usize);
        for _ in 0..ticks {
            let now = sim.tick();
            for input in self.inputs.iter().filter(|i| i.tick == now) {
                sim.submit(input.agent, input.command)?;
            }
            sim.step_once();
            hashes.push(sim.world_hash());
        }
        Ok(hashes)
    }

    /// Two independent runs; the final hash when they agree on every tick.
    pub fn run(&self, ticks: u64) -> SimResult<u64> {
        let expected = self.record(ticks)?;
        let actual = self.record(ticks)?;
        let result = compare(&expected, &actual);
        debug_assert!(result.is_ok(), "replay diverged: {result:?}");
        result?;
        Ok(expected.last().copied().unwrap_or_default())
    }
}

/// First tick where two hash sequences disagree, as a [`SimError::DeterminismViolation`].
pub fn compare(expected: &[u64], actual: &[u64]) -> SimResult<()> {
    let diverged = expected
        .iter()
        .zip(actual)
        .enumerate()
        .find(|(_, (e, a))| e != a);
    if let Some((tick, (&expected, &actual))) = diverged {
        tracing::error!(tick, expected, actual, "determinism violation");
        return Err(SimError::DeterminismViolation {
            tick: tick as u64,
            expected,
            actual,
        });
    }
    if expected.len() != actual.len() {
        let tick = expected.len().min(actual.len()) as u64;
        tracing::error!(tick, "replays ran for different lengths");
        return Err(SimError::DeterminismViolation {
            tick,
            expected: 0,
            actual: 0,
        });
    }
    Ok(())
}
