//! Creature, faction, loot and behavior definitions.
//!
//! Loaded from YAML by an outside collaborator and handed over as plain data. Structural lint is
//! not done here; names that cannot be resolved when an agent spawns are reported as
//! [`SimError::DataIntegrity`] for that spawn.

use std::collections::BTreeMap;
use std::path::Path;

use crawl_bt::TreeDef;
use crawl_core::{FactionId, KeyId, SimError, SimResult, ThreatClass};
use crawl_nav::Footprint;
use crawl_perception::Senses;
use crawl_world::Item;
use serde::{Deserialize, Serialize};

use crate::{GoalKind, Spell};

const BUILTIN: &str = include_str!("../data/dungeon.yaml");

/// Stats and wiring for one kind of creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatureDef {
    pub hp: i32,
    pub mana: i32,
    pub min_atk: i32,
    pub max_atk: i32,
    /// Acts on one tick out of every `act_every_ticks` (1 = every tick).
    pub act_every_ticks: u32,
    pub faction: String,
    /// Behavior preset; `None` runs the GOAP goal alone.
    pub behavior: Option<String>,
    /// GOAP goal used when no tree branch applies (or always, without a preset).
    pub goal: Option<GoalKind>,
    /// Minimum ticks between full tree re-evaluations; the config default when absent.
    pub reaction_ticks: Option<u32>,
    pub senses: Option<Senses>,
    pub footprint: Footprint,
    pub strength: u32,
    pub opens_doors: bool,
    pub bashes_doors: bool,
    pub keys: Vec<KeyId>,
    pub potions: u32,
    pub spells: Vec<Spell>,
    pub loot: Option<String>,
}

impl Default for CreatureDef {
    fn default() -> Self {
        Self {
            hp: 10,
            mana: 0,
            min_atk: 1,
            max_atk: 3,
            act_every_ticks: 1,
            faction: "monsters".to_string(),
            behavior: None,
            goal: None,
            reaction_ticks: None,
            senses: None,
            footprint: Footprint::SINGLE,
            strength: 2,
            opens_doors: true,
            bashes_doors: false,
            keys: Vec::new(),
            potions: 0,
            spells: Vec::new(),
            loot: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    pub item: Item,
    /// Drop probability in `[0, 1]`. Entries are rolled in order; the first hit drops.
    pub chance: f32,
}

pub type LootTable = Vec<LootEntry>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Definitions {
    pub creatures: BTreeMap<String, CreatureDef>,
    /// Faction names; the position is the [`FactionId`].
    pub factions: Vec<String>,
    /// `relations[a][b]`: how members of `a` classify members of `b`.
    pub relations: BTreeMap<String, BTreeMap<String, ThreatClass>>,
    pub loot: BTreeMap<String, LootTable>,
    pub behaviors: BTreeMap<String, TreeDef>,
}

impl Definitions {
    /// The stock bestiary shipped with the crate.
    pub fn builtin() -> SimResult<Self> {
        Self::from_yaml_str(BUILTIN)
    }

    /// Trees and loot items are written as single-key maps (`selector: {..}`, `key: 1`), not
    /// YAML tags.
    pub fn from_yaml_str(content: &str) -> SimResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let de = serde_yaml::Deserializer::from_str(content);
        Ok(serde_yaml::with::singleton_map_recursive::deserialize(de)?)
    }

    /// Inverse of [`Definitions::from_yaml_str`].
    pub fn to_yaml_string(&self) -> SimResult<String> {
        let mut out = Vec::new();
        let mut ser = serde_yaml::Serializer::new(&mut out);
        serde_yaml::with::singleton_map_recursive::serialize(self, &mut ser)?;
        String::from_utf8(out).map_err(|e| SimError::data_integrity("definitions", e.to_string()))
    }

    pub fn load(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn creature(&self, name: &str) -> SimResult<&CreatureDef> {
        self.creatures
            .get(name)
            .ok_or_else(|| SimError::data_integrity("creature", format!("unknown creature `{name}`")))
    }

    pub fn faction_id(&self, name: &str) -> SimResult<FactionId> {
        self.factions
            .iter()
            .position(|f| f == name)
            .map(|i| FactionId(i as u16))
            .ok_or_else(|| SimError::data_integrity("faction", format!("unknown faction `{name}`")))
    }

    pub fn loot_table(&self, name: &str) -> SimResult<&LootTable> {
        self.loot
            .get(name)
            .ok_or_else(|| SimError::data_integrity("loot", format!("unknown loot table `{name}`")))
    }

    pub fn behavior(&self, name: &str) -> SimResult<&TreeDef> {
        self.behaviors.get(name).ok_or_else(|| {
            SimError::data_integrity("behavior", format!("unknown behavior preset `{name}`"))
        })
    }

    pub fn faction_table(&self) -> FactionTable {
        let mut matrix = BTreeMap::new();
        for (a, row) in &self.relations {
            let Ok(fa) = self.faction_id(a) else {
                tracing::warn!(faction = %a, "relation row for unknown faction ignored");
                continue;
            };
            for (b, threat) in row {
                match self.faction_id(b) {
                    Ok(fb) => {
                        matrix.insert((fa, fb), *threat);
                    }
                    Err(_) => tracing::warn!(faction = %b, "relation to unknown faction ignored"),
                }
            }
        }
        FactionTable { matrix }
    }
}

/// Resolved relation matrix. Same faction reads friendly, unlisted pairs read as the reverse
/// entry, then neutral.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactionTable {
    matrix: BTreeMap<(FactionId, FactionId), ThreatClass>,
}

impl FactionTable {
    pub fn threat(&self, observer: FactionId, other: FactionId) -> ThreatClass {
        if let Some(t) = self.matrix.get(&(observer, other)) {
            return *t;
        }
        if observer == other {
            return ThreatClass::Friendly;
        }
        self.matrix
            .get(&(other, observer))
            .copied()
            .unwrap_or(ThreatClass::Neutral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_bestiary_parses() {
        let defs = Definitions::builtin().expect("builtin definitions");
        assert!(defs.creatures.contains_key("goblin"));
        assert!(defs.behaviors.contains_key("skirmisher"));
        assert_eq!(defs.faction_id("party").expect("party faction"), FactionId(0));
        assert_eq!(defs.loot_table("ogre_hoard").expect("hoard").len(), 2);
    }

    #[test]
    fn written_definitions_load_back() {
        let defs = Definitions::builtin().expect("builtin definitions");
        let yaml = defs.to_yaml_string().expect("serialize");
        assert!(yaml.contains("selector:"));
        let back = Definitions::from_yaml_str(&yaml).expect("reload");
        assert_eq!(back.behaviors, defs.behaviors);
        assert_eq!(back.loot, defs.loot);
        assert_eq!(back.creatures.len(), defs.creatures.len());
    }

    #[test]
    fn relations_fall_back_to_reverse_then_neutral() {
        let defs = Definitions::from_yaml_str(
            "factions: [party, monsters, vermin]\nrelations:\n  monsters: { party: hostile }\n",
        )
        .expect("yaml");
        let table = defs.faction_table();
        assert_eq!(table.threat(FactionId(1), FactionId(0)), ThreatClass::Hostile);
        assert_eq!(table.threat(FactionId(0), FactionId(1)), ThreatClass::Hostile);
        assert_eq!(table.threat(FactionId(1), FactionId(1)), ThreatClass::Friendly);
        assert_eq!(table.threat(FactionId(2), FactionId(0)), ThreatClass::Neutral);
    }

    #[test]
    fn missing_creature_is_a_data_integrity_error() {
        let defs = Definitions::default();
        let err = defs.creature("lich").expect_err("unknown");
        assert!(matches!(err, SimError::DataIntegrity { .. }));
    }
}
