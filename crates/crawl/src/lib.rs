//! Umbrella crate that re-exports the `crawl-*` building blocks.
//!
//! Most users want [`sim`]: spawn creatures from [`sim::Definitions`] into a
//! [`world::GridWorld`], then call [`sim::Simulation::step`] once per game tick.
//!
//! ```
//! # #[cfg(feature = "sim")]
//! # fn main() -> Result<(), crawl::core::SimError> {
//! use crawl::core::{Facing, Tile};
//! use crawl::sim::{Definitions, SimConfig, Simulation};
//! use crawl::world::{default_map, parse_map};
//!
//! let world = parse_map(&default_map()).map_err(|e| crawl::core::SimError::data_integrity("map", e.to_string()))?;
//! let mut sim = Simulation::new(SimConfig::default().with_seed(7), Definitions::builtin()?, world);
//! sim.spawn("goblin", Tile::new(1, 1), Facing::East)?;
//! sim.run(10);
//! assert_eq!(sim.tick(), 10);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sim"))]
//! # fn main() {}
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use crawl_core as core;

#[cfg(feature = "world")]
#[cfg_attr(docsrs, doc(cfg(feature = "world")))]
pub use crawl_world as world;

#[cfg(feature = "nav")]
#[cfg_attr(docsrs, doc(cfg(feature = "nav")))]
pub use crawl_nav as nav;

#[cfg(feature = "perception")]
#[cfg_attr(docsrs, doc(cfg(feature = "perception")))]
pub use crawl_perception as perception;

#[cfg(feature = "bt")]
#[cfg_attr(docsrs, doc(cfg(feature = "bt")))]
pub use crawl_bt as bt;

#[cfg(feature = "goap")]
#[cfg_attr(docsrs, doc(cfg(feature = "goap")))]
pub use crawl_goap as goap;

#[cfg(feature = "sim")]
#[cfg_attr(docsrs, doc(cfg(feature = "sim")))]
pub use crawl_sim as sim;
