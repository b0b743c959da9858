//! Grid pathfinding for dungeon agents: door-aware A*, multi-tile footprints, a per-agent path
//! cache invalidated by the world generation counter, and stuck detection with windowed local
//! replanning.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod cache;
pub mod grid;
pub mod path;
pub mod stuck;

pub use cache::{PathCache, PathCacheStats};
pub use grid::{cell_cost, find_path, fits, path_cost, step_cost};
pub use path::{Footprint, Path, PathConstraints, TraversalCosts};
pub use stuck::{local_replan, StuckTracker};
