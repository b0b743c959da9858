//! Agent senses over the grid world: shadow-cast field of view restricted to a facing cone,
//! radius hearing with linear falloff and scent-trail sampling.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod cache;
pub mod fov;
pub mod observe;
pub mod senses;

pub use cache::{FovCache, FovCacheStats};
pub use fov::{compute_fov, has_line_of_sight, ConeShape};
pub use observe::{observe, Observations, Observer, Roster, SeenAgent};
pub use senses::{hear, perceived_intensity, sniff, HeardNoise, Noise, ScentTrace, Senses};
