//! Refinement-region files for the mesh refinement engine.
//!
//! ```text
//! 2   ixy
//! 0   method
//! 0.25   ds
//! 2   nrules
//!      25.2500000000     -99.5000000000     -99.2500000000
//!      25.5000000000     -99.5000000000     -99.2500000000
//! ```
//!
//! `ixy` names the fixed coordinate (1 = x, 2 = y) and each rule line is
//! `fixed lower upper` in physical units. `ds` is the grid spacing along the
//! fixed axis when the rules sit on consecutive lines one span each, and `-1`
//! otherwise; readers must then take every fixed coordinate from its line.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::ruled::{RuledRectangleSet, RulingAxis, Strip};
use crate::atomic::publish;
use crate::error::{RefineError, RefineResult};
use crate::grid::GridGeometry;

/// How span endpoints map to physical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageMethod {
    /// Endpoints are the coordinates of the first and last selected cell.
    #[default]
    Points,
    /// Endpoints sit on the outer cell edges, half a cell beyond the points.
    Cells,
}

impl CoverageMethod {
    pub fn code(self) -> u8 {
        match self {
            CoverageMethod::Points => 0,
            CoverageMethod::Cells => 1,
        }
    }
}

/// A strip in physical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalStrip {
    pub fixed: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Serializes ruled rectangle sets against a grid geometry.
#[derive(Debug, Clone)]
pub struct RegionWriter {
    geometry: GridGeometry,
    method: CoverageMethod,
}

impl RegionWriter {
    pub fn new(geometry: GridGeometry, method: CoverageMethod) -> Self {
        Self { geometry, method }
    }

    /// Convert every strip to physical coordinates, in strip order.
    pub fn physical_strips(&self, set: &RuledRectangleSet) -> RefineResult<Vec<PhysicalStrip>> {
        if set.dim() != self.geometry.dim() {
            return Err(RefineError::mismatch(self.geometry.dim(), set.dim()));
        }
        Ok(set.iter().map(|s| self.to_physical(set.axis(), s)).collect())
    }

    fn to_physical(&self, axis: RulingAxis, s: &Strip) -> PhysicalStrip {
        let g = &self.geometry;
        let (fixed, lower, upper, step) = match axis {
            RulingAxis::Rows => (g.y(s.fixed), g.x(s.start), g.x(s.end), g.dx),
            RulingAxis::Columns => (g.x(s.fixed), g.y(s.start), g.y(s.end), g.dy),
        };
        let half = match self.method {
            CoverageMethod::Points => 0.0,
            CoverageMethod::Cells => 0.5 * step,
        };
        PhysicalStrip {
            fixed,
            lower: lower - half,
            upper: upper + half,
        }
    }

    /// Render the whole file in memory.
    pub fn render(&self, set: &RuledRectangleSet) -> RefineResult<String> {
        let strips = self.physical_strips(set)?;
        let ds = if set.is_uniform() {
            match set.axis() {
                RulingAxis::Rows => self.geometry.dy,
                RulingAxis::Columns => self.geometry.dx,
            }
        } else {
            -1.0
        };

        let mut out = String::with_capacity(64 + 60 * strips.len());
        out.push_str(&format!("{}   ixy\n", set.axis().ixy()));
        out.push_str(&format!("{}   method\n", self.method.code()));
        out.push_str(&format!("{ds}   ds\n"));
        out.push_str(&format!("{}   nrules\n", strips.len()));
        for s in &strips {
            out.push_str(&format!("{:18.10} {:18.10} {:18.10}\n", s.fixed, s.lower, s.upper));
        }
        Ok(out)
    }

    /// Render and atomically publish to `path`.
    ///
    /// # Errors
    /// `DimensionMismatch` if the set was built for another grid shape;
    /// `Write` if the destination cannot be written. No retry is attempted.
    pub fn write(&self, set: &RuledRectangleSet, path: &Path) -> RefineResult<()> {
        let text = self.render(set)?;
        publish(path, text.as_bytes())?;
        info!(path = %path.display(), rules = set.len(), "wrote refinement region");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::compress;
    use crate::selection::SelectionMask;
    use ndarray::Array2;
    use tempfile::TempDir;

    fn geometry() -> GridGeometry {
        GridGeometry::new((-100.0, 25.0), (0.5, 0.25), (4, 4)).unwrap()
    }

    fn center_set(axis: RulingAxis) -> RuledRectangleSet {
        let m = SelectionMask::from_array(Array2::from_shape_fn((4, 4), |(r, c)| {
            (1..=2).contains(&r) && (1..=2).contains(&c)
        }));
        compress(&m, axis, 0)
    }

    #[test]
    fn test_points_rows() {
        let writer = RegionWriter::new(geometry(), CoverageMethod::Points);
        let strips = writer.physical_strips(&center_set(RulingAxis::Rows)).unwrap();
        assert_eq!(
            strips,
            vec![
                PhysicalStrip { fixed: 25.25, lower: -99.5, upper: -99.0 },
                PhysicalStrip { fixed: 25.5, lower: -99.5, upper: -99.0 },
            ]
        );
    }

    #[test]
    fn test_cells_columns() {
        let writer = RegionWriter::new(geometry(), CoverageMethod::Cells);
        let strips = writer.physical_strips(&center_set(RulingAxis::Columns)).unwrap();
        assert_eq!(strips.len(), 2);
        assert_eq!(strips[0], PhysicalStrip { fixed: -99.5, lower: 25.125, upper: 25.625 });
        assert_eq!(strips[1].fixed, -99.0);
    }

    #[test]
    fn test_render_layout() {
        let writer = RegionWriter::new(geometry(), CoverageMethod::Points);
        let text = writer.render(&center_set(RulingAxis::Rows)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2   ixy");
        assert_eq!(lines[1], "0   method");
        assert_eq!(lines[2], "0.25   ds");
        assert_eq!(lines[3], "2   nrules");
        let nums: Vec<f64> = lines[4]
            .split_whitespace()
            .map(|t| t.parse().unwrap())
            .collect();
        assert_eq!(nums, vec![25.25, -99.5, -99.0]);
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_render_marks_uneven_rules() {
        let writer = RegionWriter::new(geometry(), CoverageMethod::Points);

        // rows 1 and 3: a skipped line
        let gapped = SelectionMask::from_array(Array2::from_shape_fn((4, 4), |(r, c)| {
            (r == 1 || r == 3) && c == 0
        }));
        let text = writer.render(&compress(&gapped, RulingAxis::Rows, 0)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[2], "-1   ds");
        assert_eq!(lines[3], "2   nrules");

        // two spans on row 2
        let split = SelectionMask::from_array(Array2::from_shape_fn((4, 4), |(r, c)| {
            r == 2 && c != 1
        }));
        let set = compress(&split, RulingAxis::Rows, 0);
        assert!(!set.is_uniform());
        let text = writer.render(&set).unwrap();
        assert_eq!(text.lines().nth(2), Some("-1   ds"));

        // the envelope of the split row is a single rule again
        let text = writer.render(&set.envelope()).unwrap();
        assert_eq!(text.lines().nth(2), Some("0.25   ds"));
    }

    #[test]
    fn test_write_and_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("region.data");
        let writer = RegionWriter::new(geometry(), CoverageMethod::Points);
        writer.write(&center_set(RulingAxis::Rows), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("2   ixy\n"));

        let other = compress(&SelectionMask::full((2, 2)), RulingAxis::Rows, 0);
        assert!(matches!(
            writer.write(&other, &path),
            Err(RefineError::DimensionMismatch { .. })
        ));
        // failed write leaves the previous file untouched
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
    }

    #[test]
    fn test_write_error_on_bad_destination() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("region.data");
        let writer = RegionWriter::new(geometry(), CoverageMethod::Points);
        let err = writer.write(&center_set(RulingAxis::Rows), &path).unwrap_err();
        assert!(matches!(err, RefineError::Write { .. }));
        assert!(!path.exists());
    }
}
