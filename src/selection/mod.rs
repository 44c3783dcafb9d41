//! Selection of grid cells by elevation and connectivity.
//!
//! - **Flood fill**: multi-source breadth-first selection inside an elevation band
//! - **Masks**: boolean rasters congruent with a grid, combined element-wise
//!
//! Passes are chained by feeding one pass's mask as the next pass's seed.

pub mod flood;
pub mod mask;

pub use flood::{Adjacency, Bounds, FloodOutcome, FloodSelector, Selection};
pub use mask::SelectionMask;
