use crawl_core::{AgentId, Tile};
use crawl_world::WorldView;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ConeShape;

/// Per-creature sense configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Senses {
    pub sight_radius: i32,
    pub cone: ConeShape,
    pub hearing_radius: u32,
    /// Minimum perceived intensity for a noise to register.
    pub hearing_threshold: f32,
    pub smell: bool,
}

impl Default for Senses {
    fn default() -> Self {
        Self {
            sight_radius: 6,
            cone: ConeShape::Forward,
            hearing_radius: 8,
            hearing_threshold: 0.5,
            smell: false,
        }
    }
}

/// A sound made somewhere in the world this tick (static emitter or event).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Noise {
    pub origin: Tile,
    pub intensity: u32,
    pub source: Option<AgentId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeardNoise {
    pub origin: Tile,
    /// Intensity after distance falloff.
    pub intensity: f32,
    pub source: Option<AgentId>,
}

/// Linear falloff: `intensity * (1 - d / radius)`, silent at and beyond `radius`. Walls do not
/// muffle sound.
pub fn perceived_intensity(listener: Tile, noise: &Noise, radius: u32) -> f32 {
    if radius == 0 {
        return 0.0;
    }
    let d = listener.manhattan(noise.origin);
    if d >= radius {
        return 0.0;
    }
    noise.intensity as f32 * (1.0 - d as f32 / radius as f32)
}

pub fn hear<'a>(
    listener: Tile,
    me: AgentId,
    senses: &Senses,
    noises: impl IntoIterator<Item = &'a Noise>,
) -> Vec<HeardNoise> {
    let mut heard: Vec<HeardNoise> = noises
        .into_iter()
        .filter(|n| n.source != Some(me))
        .filter_map(|n| {
            let intensity = perceived_intensity(listener, n, senses.hearing_radius);
            (intensity >= senses.hearing_threshold && intensity > 0.0).then_some(HeardNoise {
                origin: n.origin,
                intensity,
                source: n.source,
            })
        })
        .collect();
    heard.sort_by(|a, b| {
        b.intensity
            .total_cmp(&a.intensity)
            .then(a.origin.cmp(&b.origin))
            .then(a.source.cmp(&b.source))
    });
    heard
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScentTrace {
    pub tile: Tile,
    pub strength: f32,
    pub source: AgentId,
}

/// Strongest foreign scent on the agent's tile or a walkable neighbour (N, E, S, W order breaks
/// ties).
pub fn sniff<W: WorldView + ?Sized>(world: &W, at: Tile, me: AgentId) -> Option<ScentTrace> {
    let mut best: Option<ScentTrace> = None;
    for tile in std::iter::once(at).chain(at.neighbors()) {
        if tile != at && !world.is_walkable(tile) {
            continue;
        }
        let scent = world.scent(tile);
        let Some(source) = scent.source else { continue };
        if source == me || scent.strength <= 0.0 {
            continue;
        }
        if best.map(|b| scent.strength > b.strength).unwrap_or(true) {
            best = Some(ScentTrace {
                tile,
                strength: scent.strength,
                source,
            });
        }
    }
    best
}
