//! Coastal Refinement Regions
//!
//! Derives the high-resolution refinement region of a storm-surge run from a
//! bathymetry/topography raster, with Python bindings via PyO3 and WASM
//! bindings for JavaScript.
//!
//! ## Pipeline
//! - **Grid**: regular raster of `f64` elevations (negative = below datum)
//! - **Flood selection**: multi-source breadth-first fill inside an elevation
//!   band, optionally seeded by a previous pass and capped in rounds
//! - **Compression**: exact covering of the selected cells by ruled
//!   rectangles (one or more spans per grid row or column)
//! - **Writer**: strips in physical coordinates, published atomically
//!
//! ```no_run
//! use coastrefine::grid::{AsciiRaster, GridSource};
//! use coastrefine::pipeline::{NearshoreConfig, NearshorePipeline};
//!
//! # fn main() -> coastrefine::RefineResult<()> {
//! let grid = AsciiRaster::new("gulf.asc").load()?;
//! let pipeline = NearshorePipeline::new(NearshoreConfig::default())?;
//! let result = pipeline.run(&grid)?;
//! pipeline.writer(&grid).write(&result.region, "coastrr.data".as_ref())?;
//! # Ok(())
//! # }
//! ```

mod atomic;
pub mod error;
pub mod grid;
pub mod pipeline;
pub mod region;
pub mod selection;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{RefineError, RefineResult};
pub use grid::{Grid, GridGeometry, GridSource};
pub use region::{compress, CoverageMethod, RegionWriter, RuledRectangleSet, RulingAxis, Strip};
pub use selection::{Adjacency, Bounds, FloodOutcome, FloodSelector, Selection, SelectionMask};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::error::RefineError;
    use crate::grid::Grid;
    use crate::region::{compress, RulingAxis};
    use crate::selection::{Adjacency, Bounds, FloodSelector, SelectionMask};

    fn value_error(err: RefineError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }

    /// Flood-fill selection over a 2D elevation array.
    ///
    /// # Arguments
    /// * `z` - Elevations (rows, cols); NaN cells are never selected
    /// * `low` / `high` - Admissible band, inclusive; `None` is unbounded
    /// * `seed` - Optional boolean mask restricting the seed cells
    /// * `max_iterations` - Optional cap on propagation rounds
    /// * `eight_connected` - Propagate across diagonals too
    ///
    /// # Returns
    /// Boolean mask with the shape of `z`
    #[pyfunction]
    #[pyo3(signature = (z, low=None, high=None, seed=None, max_iterations=None, eight_connected=false))]
    pub fn select_by_flooding<'py>(
        py: Python<'py>,
        z: PyReadonlyArray2<'py, f64>,
        low: Option<f64>,
        high: Option<f64>,
        seed: Option<PyReadonlyArray2<'py, bool>>,
        max_iterations: Option<usize>,
        eight_connected: bool,
    ) -> PyResult<Bound<'py, PyArray2<bool>>> {
        let grid = Grid::new((0.0, 0.0), (1.0, 1.0), z.as_array().to_owned()).map_err(value_error)?;
        let bounds = Bounds::new(
            low.unwrap_or(f64::NEG_INFINITY),
            high.unwrap_or(f64::INFINITY),
        )
        .map_err(value_error)?;
        let seed = seed.map(|s| SelectionMask::from_array(s.as_array().to_owned()));
        let adjacency = if eight_connected {
            Adjacency::Eight
        } else {
            Adjacency::Four
        };

        let selection = FloodSelector::new(adjacency)
            .select(&grid, bounds, seed.as_ref(), max_iterations)
            .map_err(value_error)?;
        Ok(selection.into_mask().into_array().into_pyarray(py))
    }

    /// Compress a boolean mask into `(fixed, start, end)` index strips.
    ///
    /// `axis` is "rows" (strips fixed in y) or "columns" (fixed in x).
    #[pyfunction]
    #[pyo3(signature = (mask, axis="rows", padding=0))]
    pub fn ruled_strips<'py>(
        mask: PyReadonlyArray2<'py, bool>,
        axis: &str,
        padding: usize,
    ) -> PyResult<Vec<(usize, usize, usize)>> {
        let axis: RulingAxis = axis.parse().map_err(value_error)?;
        let mask = SelectionMask::from_array(mask.as_array().to_owned());
        let set = compress(&mask, axis, padding);
        Ok(set.iter().map(|s| (s.fixed, s.start, s.end)).collect())
    }

    #[pymodule]
    pub fn coastrefine(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(select_by_flooding, m)?)?;
        m.add_function(wrap_pyfunction!(ruled_strips, m)?)?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::coastrefine;
