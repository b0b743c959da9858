//! The player party: four members in a 2×2 formation sharing one tile.

use crawl_core::{DeterministicRng, SplitMix64};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::FrontLeft, Slot::FrontRight, Slot::BackLeft, Slot::BackRight];

    pub fn is_front(self) -> bool {
        matches!(self, Slot::FrontLeft | Slot::FrontRight)
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Member {
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub min_atk: i32,
    pub max_atk: i32,
}

impl Default for Member {
    fn default() -> Self {
        Self {
            name: String::new(),
            hp: 10,
            max_hp: 10,
            mana: 0,
            max_mana: 0,
            min_atk: 1,
            max_atk: 3,
        }
    }
}

impl Member {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}

/// Who got hit by a blow aimed at the party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub slot: Slot,
    pub hp: i32,
}

/// 2×2 formation. Front-row members reach adjacent foes in melee; back-row members only act
/// through spells and ranged attacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Formation {
    slots: [Option<Member>; 4],
}

impl Formation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(mut self, slot: Slot, member: Member) -> Self {
        self.slots[slot.index()] = Some(member);
        self
    }

    /// Two fighters up front, a cleric and a wizard behind.
    pub fn standard() -> Self {
        let member = |name: &str, hp: i32, mana: i32, atk: (i32, i32)| Member {
            name: name.to_string(),
            hp,
            max_hp: hp,
            mana,
            max_mana: mana,
            min_atk: atk.0,
            max_atk: atk.1,
        };
        Self::new()
            .with_member(Slot::FrontLeft, member("fighter", 14, 0, (2, 4)))
            .with_member(Slot::FrontRight, member("rogue", 10, 0, (1, 4)))
            .with_member(Slot::BackLeft, member("cleric", 9, 8, (1, 2)))
            .with_member(Slot::BackRight, member("wizard", 7, 12, (1, 2)))
    }

    pub fn member(&self, slot: Slot) -> Option<&Member> {
        self.slots[slot.index()].as_ref()
    }

    pub fn member_mut(&mut self, slot: Slot) -> Option<&mut Member> {
        self.slots[slot.index()].as_mut()
    }

    /// Exchange two slots. The only way members change position.
    pub fn swap(&mut self, a: Slot, b: Slot) {
        self.slots.swap(a.index(), b.index());
    }

    pub fn members(&self) -> impl Iterator<Item = (Slot, &Member)> {
        Slot::ALL
            .into_iter()
            .filter_map(|slot| self.member(slot).map(|m| (slot, m)))
    }

    pub fn living(&self) -> impl Iterator<Item = (Slot, &Member)> {
        self.members().filter(|(_, m)| m.is_alive())
    }

    pub fn is_down(&self) -> bool {
        self.living().next().is_none()
    }

    pub fn total_hp(&self) -> i32 {
        self.living().map(|(_, m)| m.hp).sum()
    }

    pub fn total_max_hp(&self) -> i32 {
        self.members().map(|(_, m)| m.max_hp).sum()
    }

    /// First living front-row member, left before right.
    pub fn melee_member(&self) -> Option<Slot> {
        self.living().map(|(s, _)| s).find(|s| s.is_front())
    }

    /// A living member with at least `mana`, back row first.
    pub fn caster(&self, mana: i32) -> Option<Slot> {
        let mut candidates: Vec<Slot> = self
            .living()
            .filter(|(_, m)| m.mana >= mana)
            .map(|(s, _)| s)
            .collect();
        candidates.sort_by_key(|s| (s.is_front(), *s));
        candidates.first().copied()
    }

    /// Damage lands on a random living front-row member, or the back row when the front is down.
    pub fn take_hit(&mut self, amount: i32, rng: &mut SplitMix64) -> Option<Hit> {
        let front: Vec<Slot> = self.living().map(|(s, _)| s).filter(|s| s.is_front()).collect();
        let pool = if front.is_empty() {
            self.living().map(|(s, _)| s).collect()
        } else {
            front
        };
        let slot = *pool.get(rng.pick_index(pool.len())?)?;
        let member = self.member_mut(slot)?;
        member.hp -= amount;
        Some(Hit {
            slot,
            hp: member.hp,
        })
    }

    /// Heal the most wounded living member; returns the amount restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let target = self
            .living()
            .filter(|(_, m)| m.hp < m.max_hp)
            .min_by_key(|(s, m)| (m.hp - m.max_hp, *s))
            .map(|(s, _)| s);
        let Some(member) = target.and_then(|s| self.member_mut(s)) else {
            return 0;
        };
        let before = member.hp;
        member.hp = (member.hp + amount).min(member.max_hp);
        member.hp - before
    }

    pub fn spend_mana(&mut self, slot: Slot, mana: i32) -> bool {
        match self.member_mut(slot) {
            Some(m) if m.mana >= mana => {
                m.mana -= mana;
                true
            }
            _ => false,
        }
    }
}
