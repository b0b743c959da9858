use crawl_core::{KeyId, Tile};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Terrain {
    #[default]
    Floor,
    Wall,
    Pit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Door {
    pub open: bool,
    pub lock: Option<KeyId>,
    /// Remaining bash resistance; the door breaks open at zero.
    pub durability: u32,
    pub broken: bool,
}

impl Door {
    pub const DEFAULT_DURABILITY: u32 = 6;

    pub fn closed() -> Self {
        Self {
            open: false,
            lock: None,
            durability: Self::DEFAULT_DURABILITY,
            broken: false,
        }
    }

    pub fn locked(key: KeyId) -> Self {
        Self {
            lock: Some(key),
            ..Self::closed()
        }
    }

    pub fn is_locked(&self) -> bool {
        !self.open && self.lock.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trap {
    pub armed: bool,
    pub damage: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Item {
    Key(KeyId),
    Potion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InteractableKind {
    Button,
    Lever,
    Slot,
    Panel,
}

/// Wall-mounted mechanism; toggling it flips `active` and drives the linked door, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interactable {
    pub kind: InteractableKind,
    pub active: bool,
    pub target: Option<Tile>,
}

/// Special tile properties perception reports to agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SpecialFlag {
    Pit,
    Teleport,
    Trap,
    Door,
    Item,
    Interactable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileState {
    pub terrain: Terrain,
    #[cfg_attr(feature = "serde", serde(default))]
    pub door: Option<Door>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub trap: Option<Trap>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub teleport: Option<Tile>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub item: Option<Item>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub interactable: Option<Interactable>,
    #[cfg_attr(feature = "serde", serde(default = "default_light"))]
    pub light: u8,
    /// Additional traversal cost on top of the unit step cost.
    #[cfg_attr(feature = "serde", serde(default))]
    pub extra_cost: u32,
}

#[cfg(feature = "serde")]
fn default_light() -> u8 {
    TileState::AMBIENT_LIGHT
}

impl Default for TileState {
    fn default() -> Self {
        Self::floor()
    }
}

impl TileState {
    pub const AMBIENT_LIGHT: u8 = 3;

    pub fn floor() -> Self {
        Self {
            terrain: Terrain::Floor,
            door: None,
            trap: None,
            teleport: None,
            item: None,
            interactable: None,
            light: Self::AMBIENT_LIGHT,
            extra_cost: 0,
        }
    }

    pub fn wall() -> Self {
        Self {
            terrain: Terrain::Wall,
            ..Self::floor()
        }
    }

    /// Walls and closed doors stop sight.
    pub fn is_opaque(&self) -> bool {
        self.terrain == Terrain::Wall || self.door.map(|d| !d.open).unwrap_or(false)
    }

    /// Passable for a walking agent right now (ignores occupancy).
    pub fn is_walkable(&self) -> bool {
        self.terrain == Terrain::Floor && self.door.map(|d| d.open).unwrap_or(true)
    }

    pub fn flags(&self) -> Vec<SpecialFlag> {
        let mut out = Vec::new();
        if self.terrain == Terrain::Pit {
            out.push(SpecialFlag::Pit);
        }
        if self.teleport.is_some() {
            out.push(SpecialFlag::Teleport);
        }
        if self.trap.map(|t| t.armed).unwrap_or(false) {
            out.push(SpecialFlag::Trap);
        }
        if self.door.is_some() {
            out.push(SpecialFlag::Door);
        }
        if self.item.is_some() {
            out.push(SpecialFlag::Item);
        }
        if self.interactable.is_some() {
            out.push(SpecialFlag::Interactable);
        }
        out
    }
}

/// Static sound source registered with the world (waterfall, machinery).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NoiseEmitter {
    pub tile: Tile,
    pub intensity: u32,
}

/// Decaying trail left by moving agents.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scent {
    pub strength: f32,
    pub source: Option<crawl_core::AgentId>,
}
