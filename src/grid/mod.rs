//! Elevation rasters and their coordinate metadata.
//!
//! A [`Grid`] is a regular 2D raster of `f64` elevations. Row `i` lies at
//! `y = y0 + i * dy` and column `j` at `x = x0 + j * dx`, so row 0 is the
//! southern edge and `(x0, y0)` is the coordinate of cell `(0, 0)`.
//!
//! Negative values are below the vertical datum (bathymetric depth), positive
//! values are above it. Missing data is stored as `NaN`.

pub mod ascii;

use std::ops::Range;
use std::str::FromStr;

use ndarray::{s, Array2, ArrayView2};

use crate::error::{RefineError, RefineResult};

pub use ascii::{write_mask, AsciiRaster};

/// Origin, spacing and shape of a raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub x0: f64,
    pub y0: f64,
    pub dx: f64,
    pub dy: f64,
    pub rows: usize,
    pub cols: usize,
}

impl GridGeometry {
    /// Validate and build a geometry.
    pub fn new(origin: (f64, f64), cell_size: (f64, f64), dim: (usize, usize)) -> RefineResult<Self> {
        let (x0, y0) = origin;
        let (dx, dy) = cell_size;
        if !(x0.is_finite() && y0.is_finite()) {
            return Err(RefineError::InvalidGeometry(format!(
                "origin ({x0}, {y0}) is not finite"
            )));
        }
        if !(dx.is_finite() && dy.is_finite() && dx > 0.0 && dy > 0.0) {
            return Err(RefineError::InvalidGeometry(format!(
                "cell size ({dx}, {dy}) must be finite and strictly positive"
            )));
        }
        Ok(Self {
            x0,
            y0,
            dx,
            dy,
            rows: dim.0,
            cols: dim.1,
        })
    }

    /// `(rows, cols)`
    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// X coordinate of column `col`.
    #[inline]
    pub fn x(&self, col: usize) -> f64 {
        self.x0 + col as f64 * self.dx
    }

    /// Y coordinate of row `row`.
    #[inline]
    pub fn y(&self, row: usize) -> f64 {
        self.y0 + row as f64 * self.dy
    }

    /// Extent spanned by the cell coordinates, `None` for an empty raster.
    pub fn extent(&self) -> Option<Extent> {
        if self.rows == 0 || self.cols == 0 {
            return None;
        }
        Some(Extent {
            x_min: self.x0,
            x_max: self.x(self.cols - 1),
            y_min: self.y0,
            y_max: self.y(self.rows - 1),
        })
    }
}

/// Axis-aligned physical rectangle, inclusive on all sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Extent {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> RefineResult<Self> {
        if !(x_min <= x_max && y_min <= y_max) {
            return Err(RefineError::InvalidGeometry(format!(
                "extent ({x_min}, {x_max}, {y_min}, {y_max}) is not ordered"
            )));
        }
        Ok(Self {
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }

    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.x_min <= x && x <= self.x_max && self.y_min <= y && y <= self.y_max
    }
}

/// Parses `x_min,x_max,y_min,y_max`.
impl FromStr for Extent {
    type Err = RefineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RefineError::Config(format!("extent '{s}': {e}")))?;
        match parts.as_slice() {
            [x_min, x_max, y_min, y_max] => Extent::new(*x_min, *x_max, *y_min, *y_max),
            _ => Err(RefineError::Config(format!(
                "extent '{s}' must have four comma-separated values"
            ))),
        }
    }
}

/// Immutable elevation raster.
#[derive(Debug, Clone)]
pub struct Grid {
    geometry: GridGeometry,
    values: Array2<f64>,
}

impl Grid {
    /// Build a grid from row-major elevations (`values[[row, col]]`).
    pub fn new(origin: (f64, f64), cell_size: (f64, f64), values: Array2<f64>) -> RefineResult<Self> {
        let geometry = GridGeometry::new(origin, cell_size, values.dim())?;
        Ok(Self { geometry, values })
    }

    /// Build a grid from an existing geometry, checking the shape agrees.
    pub fn from_geometry(geometry: GridGeometry, values: Array2<f64>) -> RefineResult<Self> {
        if values.dim() != geometry.dim() {
            return Err(RefineError::mismatch(geometry.dim(), values.dim()));
        }
        Ok(Self { geometry, values })
    }

    #[inline]
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        self.geometry.dim()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Elevation at `(row, col)`, `None` outside the raster.
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get((row, col)).copied()
    }

    /// Minimum and maximum elevation, ignoring no-data cells.
    pub fn elevation_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Sub-grid of the cells whose coordinates fall inside `extent`.
    ///
    /// The result may be empty when the extent misses the raster.
    pub fn crop(&self, extent: &Extent) -> Grid {
        let g = &self.geometry;
        let rows = index_range(extent.y_min, extent.y_max, g.y0, g.dy, g.rows);
        let cols = index_range(extent.x_min, extent.x_max, g.x0, g.dx, g.cols);
        let (rows, cols) = if rows.is_empty() || cols.is_empty() {
            (0..0, 0..0)
        } else {
            (rows, cols)
        };

        let values = self
            .values
            .slice(s![rows.clone(), cols.clone()])
            .to_owned();
        let geometry = GridGeometry {
            x0: g.x(cols.start),
            y0: g.y(rows.start),
            rows: values.nrows(),
            cols: values.ncols(),
            ..*g
        };
        Grid { geometry, values }
    }
}

/// Indices `k` in `0..n` with `origin + k * step` inside `[min, max]`.
fn index_range(min: f64, max: f64, origin: f64, step: f64, n: usize) -> Range<usize> {
    // Absorbs rounding when an extent edge sits exactly on a cell coordinate.
    const EPS: f64 = 1e-9;

    let first = ((min - origin) / step - EPS).ceil().max(0.0);
    let last = ((max - origin) / step + EPS).floor();
    if n == 0 || last < 0.0 || first > last || first >= n as f64 {
        return 0..0;
    }
    let first = first as usize;
    let last = (last as usize).min(n - 1);
    first..last + 1
}

/// Something that can hand the pipeline a grid.
pub trait GridSource {
    fn load(&self) -> RefineResult<Grid>;
}

impl GridSource for Grid {
    fn load(&self) -> RefineResult<Grid> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ramp() -> Grid {
        // 3 rows x 4 cols, value = 10 * row + col
        let values = Array2::from_shape_fn((3, 4), |(r, c)| (10 * r + c) as f64);
        Grid::new((-100.0, 25.0), (0.5, 0.25), values).unwrap()
    }

    #[test]
    fn test_rejects_bad_cell_size() {
        let values = array![[1.0, 2.0]];
        assert!(matches!(
            Grid::new((0.0, 0.0), (0.0, 1.0), values.clone()),
            Err(RefineError::InvalidGeometry(_))
        ));
        assert!(Grid::new((0.0, 0.0), (1.0, -1.0), values.clone()).is_err());
        assert!(Grid::new((0.0, 0.0), (f64::NAN, 1.0), values).is_err());
    }

    #[test]
    fn test_coordinates() {
        let grid = ramp();
        let g = grid.geometry();
        assert_eq!(g.dim(), (3, 4));
        assert_eq!(g.x(2), -99.0);
        assert_eq!(g.y(2), 25.5);
        let e = g.extent().unwrap();
        assert_eq!((e.x_min, e.x_max, e.y_min, e.y_max), (-100.0, -98.5, 25.0, 25.5));
    }

    #[test]
    fn test_empty_grid_allowed() {
        let grid = Grid::new((0.0, 0.0), (1.0, 1.0), Array2::zeros((0, 0))).unwrap();
        assert!(grid.is_empty());
        assert!(grid.geometry().extent().is_none());
        assert!(grid.elevation_range().is_none());
    }

    #[test]
    fn test_elevation_range_skips_nodata() {
        let values = array![[f64::NAN, -3.0], [7.5, 1.0]];
        let grid = Grid::new((0.0, 0.0), (1.0, 1.0), values).unwrap();
        assert_eq!(grid.elevation_range(), Some((-3.0, 7.5)));
    }

    #[test]
    fn test_crop_inclusive_edges() {
        let grid = ramp();
        let extent = Extent::new(-99.5, -99.0, 25.25, 25.5).unwrap();
        let cropped = grid.crop(&extent);
        assert_eq!(cropped.dim(), (2, 2));
        assert_eq!(cropped.geometry().x0, -99.5);
        assert_eq!(cropped.geometry().y0, 25.25);
        assert_eq!(cropped.values(), array![[11.0, 12.0], [21.0, 22.0]]);
    }

    #[test]
    fn test_crop_outside_is_empty() {
        let grid = ramp();
        let extent = Extent::new(0.0, 1.0, 0.0, 1.0).unwrap();
        assert!(grid.crop(&extent).is_empty());
    }

    #[test]
    fn test_extent_from_str() {
        let e: Extent = "-100, -92, 25, 30".parse().unwrap();
        assert_eq!(e, Extent::new(-100.0, -92.0, 25.0, 30.0).unwrap());
        assert!("1,2,3".parse::<Extent>().is_err());
        assert!("2,1,3,4".parse::<Extent>().is_err());
        assert!("a,1,3,4".parse::<Extent>().is_err());
    }

    #[test]
    fn test_from_geometry_checks_shape() {
        let geometry = GridGeometry::new((0.0, 0.0), (1.0, 1.0), (2, 2)).unwrap();
        let err = Grid::from_geometry(geometry, Array2::zeros((2, 3))).unwrap_err();
        assert!(matches!(
            err,
            RefineError::DimensionMismatch { expected: (2, 2), found: (2, 3) }
        ));
    }
}
