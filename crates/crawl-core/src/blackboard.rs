//! Per-agent decaying memory.
//!
//! Every fact carries the tick it was stamped at and a retention horizon. Discrete facts fall off
//! linearly in confidence and are forgotten once their age reaches the horizon; scalar facts
//! (fear, anger, curiosity) lose `dt / horizon` of their value per tick and are forgotten at zero.
//! Reads apply the forget check for the tick being read, so a stale fact is never observed even
//! if the owning agent skipped its update.

use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{AgentId, ThreatClass, Tile};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BbKey<T: 'static> {
    id: u64,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BbKey<T> {}

impl<T: 'static> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BbKey<T> {
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    pub fn id(self) -> u64 {
        self.id
    }
}

/// A remembered sighting of another agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sighting {
    pub agent: AgentId,
    pub tile: Tile,
    pub threat: ThreatClass,
}

pub type TileSet = BTreeSet<Tile>;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "value", rename_all = "snake_case"))]
pub enum FactValue {
    Flag(bool),
    Count(i64),
    Scalar(f32),
    Tile(Tile),
    Agent(AgentId),
    Sighting(Sighting),
    Tiles(TileSet),
}

/// Conversion between a concrete Rust type and the stored [`FactValue`].
pub trait FactType: Sized + 'static {
    fn into_value(self) -> FactValue;
    fn from_value(value: &FactValue) -> Option<Self>;
}

macro_rules! fact_type {
    ($ty:ty, $variant:ident) => {
        impl FactType for $ty {
            fn into_value(self) -> FactValue {
                FactValue::$variant(self)
            }

            fn from_value(value: &FactValue) -> Option<Self> {
                match value {
                    FactValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

fact_type!(bool, Flag);
fact_type!(i64, Count);
fact_type!(f32, Scalar);
fact_type!(Tile, Tile);
fact_type!(AgentId, Agent);
fact_type!(Sighting, Sighting);
fact_type!(TileSet, Tiles);

/// How long a fact survives without being refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Retention {
    /// Long-term knowledge (door, lever, trap and secret locations).
    #[default]
    Forever,
    /// Falls linearly to zero over `n` ticks, then is forgotten.
    Ticks(u64),
}

impl Retention {
    fn horizon(self) -> Option<u64> {
        match self {
            Retention::Forever => None,
            Retention::Ticks(n) => Some(n.max(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fact {
    pub value: FactValue,
    pub stamped_at: u64,
    pub retention: Retention,
}

impl Fact {
    pub fn age(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.stamped_at)
    }

    /// Whether the forget horizon has been reached at `tick`.
    pub fn is_forgotten(&self, tick: u64) -> bool {
        match (&self.value, self.retention.horizon()) {
            (FactValue::Scalar(v), _) => *v <= 0.0,
            (_, Some(horizon)) => self.age(tick) >= horizon,
            (_, None) => false,
        }
    }

    /// Linear confidence in `[0, 1]`: 1 when fresh, 0 at the horizon.
    pub fn confidence(&self, tick: u64) -> f32 {
        match self.retention.horizon() {
            None => 1.0,
            Some(horizon) => {
                let age = self.age(tick).min(horizon) as f32;
                1.0 - age / horizon as f32
            }
        }
    }
}

/// A batch of writes produced from one tick of observations.
///
/// Collected first and applied in one pass by [`Blackboard::apply`], so the result does not depend
/// on the order in which observations were produced.
#[derive(Debug, Clone, Default)]
pub struct MemoryUpdate {
    writes: Vec<(u64, Fact)>,
    inserts: Vec<(u64, Tile, u64, Retention)>,
    deltas: BTreeMap<u64, (f32, Retention)>,
}

impl MemoryUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.inserts.is_empty() && self.deltas.is_empty()
    }

    /// Record a fact observed at `stamped_at`. Older-than-stored writes are dropped on apply.
    pub fn remember<T: FactType>(
        &mut self,
        key: BbKey<T>,
        value: T,
        stamped_at: u64,
        retention: Retention,
    ) -> &mut Self {
        self.writes.push((
            key.id,
            Fact {
                value: value.into_value(),
                stamped_at,
                retention,
            },
        ));
        self
    }

    /// Add one tile to a set-valued fact.
    pub fn insert_tile(
        &mut self,
        key: BbKey<TileSet>,
        tile: Tile,
        stamped_at: u64,
        retention: Retention,
    ) -> &mut Self {
        self.inserts.push((key.id, tile, stamped_at, retention));
        self
    }

    /// Accumulate an additive change to a bounded scalar. Deltas for the same key are summed
    /// before clamping.
    pub fn nudge(&mut self, key: BbKey<f32>, delta: f32, retention: Retention) -> &mut Self {
        let entry = self.deltas.entry(key.id).or_insert((0.0, retention));
        entry.0 += delta;
        entry.1 = retention;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyReport {
    pub evicted: usize,
    pub merged: usize,
    pub rejected_stale: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Blackboard {
    facts: BTreeMap<u64, Fact>,
    last_applied: Option<u64>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.facts.clear();
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Tick of the last [`Blackboard::apply`], if any.
    pub fn last_applied(&self) -> Option<u64> {
        self.last_applied
    }

    /// Merge one tick of observations.
    ///
    /// Order within the pass is fixed: forget facts whose age reached their horizon, merge
    /// writes (never older over newer), add the summed scalar deltas and clamp to `[0, 1]`, then
    /// run one decay pass over every scalar.
    pub fn apply(&mut self, update: MemoryUpdate, tick: u64) -> ApplyReport {
        let mut report = ApplyReport::default();

        let before = self.facts.len();
        self.facts.retain(|_, fact| !fact.is_forgotten(tick));
        report.evicted = before - self.facts.len();

        for (id, fact) in update.writes {
            if fact.is_forgotten(tick) {
                report.rejected_stale += 1;
                continue;
            }
            match self.facts.get(&id) {
                Some(existing) if existing.stamped_at > fact.stamped_at => {
                    report.rejected_stale += 1;
                }
                _ => {
                    self.facts.insert(id, fact);
                    report.merged += 1;
                }
            }
        }

        for (id, tile, stamped_at, retention) in update.inserts {
            let entry = self.facts.entry(id).or_insert_with(|| Fact {
                value: FactValue::Tiles(TileSet::new()),
                stamped_at,
                retention,
            });
            if let FactValue::Tiles(set) = &mut entry.value {
                set.insert(tile);
                entry.stamped_at = entry.stamped_at.max(stamped_at);
                report.merged += 1;
            }
        }

        for (id, (delta, retention)) in update.deltas {
            let entry = self.facts.entry(id).or_insert_with(|| Fact {
                value: FactValue::Scalar(0.0),
                stamped_at: tick,
                retention,
            });
            if let FactValue::Scalar(v) = &mut entry.value {
                *v = (*v + delta).clamp(0.0, 1.0);
                if delta > 0.0 {
                    entry.stamped_at = tick;
                }
                entry.retention = retention;
            }
        }

        let elapsed = match self.last_applied {
            Some(last) => tick.saturating_sub(last),
            None => 1,
        };
        for fact in self.facts.values_mut() {
            let Some(horizon) = fact.retention.horizon() else {
                continue;
            };
            if let FactValue::Scalar(v) = &mut fact.value {
                let step = elapsed as f32 / horizon as f32;
                *v = (*v - step).clamp(0.0, 1.0);
            }
        }
        self.facts.retain(|_, fact| !matches!(fact.value, FactValue::Scalar(v) if v <= 0.0));

        self.last_applied = Some(tick);
        report
    }

    pub fn contains<T: FactType>(&self, key: BbKey<T>, tick: u64) -> bool {
        self.fact(key.id, tick).is_some()
    }

    /// Read a fact as of `tick`; facts past their horizon read as absent.
    pub fn get<T: FactType>(&self, key: BbKey<T>, tick: u64) -> Option<T> {
        let fact = self.fact(key.id, tick)?;
        T::from_value(&fact.value).or_else(|| {
            panic!(
                "blackboard type mismatch for key id={} (stored {:?})",
                key.id, fact.value
            )
        })
    }

    /// Bounded scalar read; an absent scalar reads as zero.
    pub fn scalar(&self, key: BbKey<f32>, tick: u64) -> f32 {
        self.get(key, tick).unwrap_or(0.0)
    }

    pub fn confidence<T: FactType>(&self, key: BbKey<T>, tick: u64) -> f32 {
        self.fact(key.id, tick)
            .map(|f| f.confidence(tick))
            .unwrap_or(0.0)
    }

    pub fn stamped_at<T: FactType>(&self, key: BbKey<T>, tick: u64) -> Option<u64> {
        self.fact(key.id, tick).map(|f| f.stamped_at)
    }

    /// Immediate write, bypassing the batched merge. Used by leaves recording their own
    /// decisions (e.g. the current target) rather than observations.
    pub fn set<T: FactType>(&mut self, key: BbKey<T>, value: T, tick: u64, retention: Retention) {
        self.facts.insert(
            key.id,
            Fact {
                value: value.into_value(),
                stamped_at: tick,
                retention,
            },
        );
    }

    pub fn remove<T: FactType>(&mut self, key: BbKey<T>) -> Option<T> {
        let fact = self.facts.remove(&key.id)?;
        T::from_value(&fact.value)
    }

    /// Raw facts in key order, for inspection and save files.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Fact)> {
        self.facts.iter().map(|(id, fact)| (*id, fact))
    }

    fn fact(&self, id: u64, tick: u64) -> Option<&Fact> {
        self.facts.get(&id).filter(|f| !f.is_forgotten(tick))
    }
}
