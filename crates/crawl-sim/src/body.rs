use std::collections::BTreeSet;

use crawl_core::{AgentId, FactionId, Facing, KeyId, StableHasher, Tile};
use crawl_nav::Footprint;
use serde::{Deserialize, Serialize};

use crate::{Formation, Spell};

/// An agent's public physical state: what renderers read and what actions change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: AgentId,
    /// Creature definition this agent was spawned from.
    pub kind: String,
    pub tile: Tile,
    pub facing: Facing,
    #[serde(default = "single_footprint")]
    pub footprint: Footprint,
    pub hp: i32,
    pub max_hp: i32,
    #[serde(default)]
    pub mana: i32,
    #[serde(default)]
    pub max_mana: i32,
    pub min_atk: i32,
    pub max_atk: i32,
    /// Force applied per bash against a door.
    #[serde(default = "default_strength")]
    pub strength: u32,
    #[serde(default)]
    pub faction: FactionId,
    #[serde(default)]
    pub keys: BTreeSet<KeyId>,
    #[serde(default)]
    pub potions: u32,
    #[serde(default = "default_alive")]
    pub alive: bool,
    #[serde(default = "default_alive")]
    pub opens_doors: bool,
    #[serde(default)]
    pub bashes_doors: bool,
    #[serde(default)]
    pub spells: Vec<Spell>,
    #[serde(default)]
    pub loot: Option<String>,
    #[serde(default)]
    pub party: Option<Formation>,
}

fn single_footprint() -> Footprint {
    Footprint::SINGLE
}

fn default_strength() -> u32 {
    2
}

fn default_alive() -> bool {
    true
}

impl Body {
    pub fn cells(&self) -> Vec<Tile> {
        self.footprint.cells(self.tile)
    }

    pub fn cells_at(&self, anchor: Tile) -> Vec<Tile> {
        self.footprint.cells(anchor)
    }

    pub fn occupies(&self, tile: Tile) -> bool {
        self.cells().contains(&tile)
    }

    /// Smallest Manhattan distance between any of our cells and `tile`.
    pub fn distance_to(&self, tile: Tile) -> u32 {
        self.cells()
            .into_iter()
            .map(|c| c.manhattan(tile))
            .min()
            .unwrap_or(u32::MAX)
    }

    /// Smallest Manhattan distance between the two footprints.
    pub fn distance_to_body(&self, other: &Body) -> u32 {
        other
            .cells()
            .into_iter()
            .map(|c| self.distance_to(c))
            .min()
            .unwrap_or(u32::MAX)
    }

    /// Some cell of `other` shares an edge with some cell of ours.
    pub fn is_adjacent_to(&self, other: &Body) -> bool {
        self.distance_to_body(other) == 1
    }

    pub fn is_party(&self) -> bool {
        self.party.is_some()
    }

    /// Attack roll bounds, taken from the front-row fighter for a party.
    pub fn attack_range(&self) -> Option<(i32, i32)> {
        match &self.party {
            None => Some((self.min_atk, self.max_atk)),
            Some(formation) => {
                let slot = formation.melee_member()?;
                formation.member(slot).map(|m| (m.min_atk, m.max_atk))
            }
        }
    }

    pub fn average_damage(&self) -> f32 {
        self.attack_range()
            .map(|(lo, hi)| (lo + hi.max(lo)) as f32 / 2.0)
            .unwrap_or(0.0)
    }

    pub fn available_mana(&self, needed: i32) -> bool {
        match &self.party {
            None => self.mana >= needed,
            Some(formation) => formation.caster(needed).is_some(),
        }
    }

    pub fn knows_spell(&self, spell: Spell) -> bool {
        self.spells.contains(&spell)
    }

    /// HP as a fraction of max, 0 for a body without HP.
    pub fn hp_fraction(&self) -> f32 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        (self.hp.max(0) as f32) / self.max_hp as f32
    }

    /// Refresh aggregate HP from party members.
    pub fn sync_party(&mut self) {
        if let Some(formation) = &self.party {
            self.hp = formation.total_hp();
            self.max_hp = formation.total_max_hp();
            if formation.is_down() {
                self.alive = false;
            }
        }
    }

    pub(crate) fn hash_into(&self, h: &mut StableHasher) {
        h.write_u64(self.id.0)
            .write_i64(self.tile.x as i64)
            .write_i64(self.tile.y as i64)
            .write_u64(self.facing.index() as u64)
            .write_i64(self.hp as i64)
            .write_i64(self.mana as i64)
            .write_bool(self.alive)
            .write_u64(self.potions as u64);
        for key in &self.keys {
            h.write_u64(key.0 as u64);
        }
        if let Some(formation) = &self.party {
            for (slot, member) in formation.members() {
                h.write_u64(slot as u64).write_i64(member.hp as i64).write_i64(member.mana as i64);
            }
        }
    }
}
