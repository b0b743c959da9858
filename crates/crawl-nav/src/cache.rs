use std::collections::BTreeMap;

use crawl_core::{AgentId, Fault, Tile};
use crawl_world::WorldView;

use crate::{find_path, Path, PathConstraints};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped on lookup because the world generation moved past them.
    pub stale_discards: u64,
}

/// Per-agent path cache keyed by `(agent, target)`.
///
/// Entries remember the world generation they were computed against. A lookup against a newer
/// generation discards the entry; nothing sweeps the cache eagerly.
#[derive(Debug, Clone, Default)]
pub struct PathCache {
    entries: BTreeMap<(AgentId, Tile), Path>,
    stats: PathCacheStats,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> PathCacheStats {
        self.stats
    }

    /// The cached path for `(agent, target)` if it is still current for `generation`.
    pub fn lookup(&mut self, agent: AgentId, target: Tile, generation: u64) -> Option<&Path> {
        let key = (agent, target);
        let stale = self
            .entries
            .get(&key)
            .map(|p| p.generation() != generation)?;
        if stale {
            self.entries.remove(&key);
            self.stats.stale_discards += 1;
            return None;
        }
        self.entries.get(&key)
    }

    pub fn insert(&mut self, agent: AgentId, target: Tile, path: Path) {
        self.entries.insert((agent, target), path);
    }

    /// Cached route from `from` to `target`, or a fresh search when the entry is missing, stale or
    /// does not pass through `from`.
    pub fn route<W: WorldView + ?Sized>(
        &mut self,
        world: &W,
        agent: AgentId,
        from: Tile,
        target: Tile,
        constraints: &PathConstraints,
    ) -> Result<Path, Fault> {
        let generation = world.generation();
        if let Some(suffix) = self
            .lookup(agent, target, generation)
            .and_then(|p| p.suffix_from(from))
        {
            self.stats.hits += 1;
            return Ok(suffix);
        }
        self.stats.misses += 1;
        let path = find_path(world, from, target, constraints)?;
        self.insert(agent, target, path.clone());
        Ok(path)
    }

    /// Drop every entry owned by `agent` (despawn, death, forced replan).
    pub fn forget_agent(&mut self, agent: AgentId) {
        self.entries.retain(|(owner, _), _| *owner != agent);
    }

    /// `(agent, target, generation)` for every entry, in key order.
    pub fn keys(&self) -> impl Iterator<Item = (AgentId, Tile, u64)> + '_ {
        self.entries
            .iter()
            .map(|((agent, target), path)| (*agent, *target, path.generation()))
    }
}
