//! Deferred event delivery.
//!
//! Events published during the act phase of tick `t` sit in the bus until the start of tick
//! `t + 1`, when they are copied into every subscriber's inbox. An agent drains its inbox during
//! its own act step, so two agents acting in the same tick never see each other's same-tick
//! events.

use std::collections::BTreeMap;

use crawl_core::{AgentId, Tile};
use crawl_perception::Noise;
use crawl_world::Item;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    DoorOpened { tile: Tile, by: AgentId },
    DoorClosed { tile: Tile, by: AgentId },
    DoorUnlocked { tile: Tile, by: AgentId },
    DoorBroken { tile: Tile, by: AgentId },
    NoiseMade { origin: Tile, intensity: u32, source: Option<AgentId> },
    AgentDamaged { agent: AgentId, by: Option<AgentId>, amount: i32, hp: i32 },
    AgentHealed { agent: AgentId, amount: i32 },
    AgentDown { agent: AgentId, by: Option<AgentId>, tile: Tile },
    ItemPicked { agent: AgentId, item: Item, tile: Tile },
    ItemDropped { item: Item, tile: Tile },
    TrapSprung { agent: AgentId, tile: Tile, damage: i32 },
    Teleported { agent: AgentId, from: Tile, to: Tile },
    InteractableToggled { tile: Tile, by: AgentId, active: bool },
    SpellCast { agent: AgentId, target: Option<AgentId> },
}

impl Event {
    /// The sound this event makes, if any.
    pub fn noise(&self) -> Option<Noise> {
        match *self {
            Event::NoiseMade {
                origin,
                intensity,
                source,
            } => Some(Noise {
                origin,
                intensity,
                source,
            }),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Event::DoorOpened { .. } => "door_opened",
            Event::DoorClosed { .. } => "door_closed",
            Event::DoorUnlocked { .. } => "door_unlocked",
            Event::DoorBroken { .. } => "door_broken",
            Event::NoiseMade { .. } => "noise_made",
            Event::AgentDamaged { .. } => "agent_damaged",
            Event::AgentHealed { .. } => "agent_healed",
            Event::AgentDown { .. } => "agent_down",
            Event::ItemPicked { .. } => "item_picked",
            Event::ItemDropped { .. } => "item_dropped",
            Event::TrapSprung { .. } => "trap_sprung",
            Event::Teleported { .. } => "teleported",
            Event::InteractableToggled { .. } => "interactable_toggled",
            Event::SpellCast { .. } => "spell_cast",
        }
    }
}

/// Append-only during a tick, delivered and cleared at the next tick boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBus {
    pending: Vec<Event>,
    inboxes: BTreeMap<AgentId, Vec<Event>>,
    /// The batch delivered at the start of the current tick, for outside collaborators.
    delivered: Vec<Event>,
    published_total: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for delivery at the next tick boundary. Never calls anyone.
    pub fn publish(&mut self, event: Event) {
        self.pending.push(event);
        self.published_total += 1;
    }

    pub fn pending(&self) -> &[Event] {
        &self.pending
    }

    pub fn published_total(&self) -> u64 {
        self.published_total
    }

    /// Move every pending event into each subscriber's inbox, in publish order. Undrained mail
    /// from the previous tick is dropped.
    pub fn deliver<I>(&mut self, subscribers: I)
    where
        I: IntoIterator<Item = AgentId>,
    {
        let batch = std::mem::take(&mut self.pending);
        self.inboxes.clear();
        for agent in subscribers {
            self.inboxes.insert(agent, batch.clone());
        }
        self.delivered = batch;
    }

    /// Take everything delivered to `agent` this tick.
    pub fn drain(&mut self, agent: AgentId) -> Vec<Event> {
        self.inboxes.remove(&agent).unwrap_or_default()
    }

    /// What was delivered at the start of this tick (renderers, audio, logs).
    pub fn delivered(&self) -> &[Event] {
        &self.delivered
    }
}
