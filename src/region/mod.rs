//! Ruled-rectangle coverings of selections and their on-disk form.

pub mod ruled;
pub mod writer;

pub use ruled::{compress, RuledRectangleSet, RulingAxis, Strip};
pub use writer::{CoverageMethod, PhysicalStrip, RegionWriter};
