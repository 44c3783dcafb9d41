//! WebAssembly exports for flood selection and strip compression.
//!
//! Rasters cross the boundary as flat row-major buffers with explicit
//! `rows`/`cols`. Masks are bytes (0 = unselected, 1 = selected).

use ndarray::Array2;
use wasm_bindgen::prelude::*;

use crate::error::RefineError;
use crate::grid::Grid;
use crate::region::{compress, RulingAxis, Strip};
use crate::selection::{Adjacency, Bounds, FloodSelector, SelectionMask};

fn js_error(err: RefineError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn mask_from_bytes(data: &[u8], rows: usize, cols: usize) -> Result<SelectionMask, JsValue> {
    SelectionMask::from_vec((rows, cols), data.iter().map(|&b| b != 0).collect()).map_err(js_error)
}

/// Flood-fill selection.
///
/// # Arguments
/// * `values` - Elevations, length = rows * cols
/// * `low` / `high` - Admissible band (use +/-Infinity for open ends)
/// * `seed` - Seed mask bytes, or an empty slice for self-seeding
/// * `max_iterations` - Round cap, negative for none
/// * `eight_connected` - Propagate across diagonals too
///
/// # Returns
/// Mask bytes, length = rows * cols
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn select_by_flooding_wasm(
    values: &[f64],
    rows: usize,
    cols: usize,
    low: f64,
    high: f64,
    seed: &[u8],
    max_iterations: i32,
    eight_connected: bool,
) -> Result<Vec<u8>, JsValue> {
    let values = Array2::from_shape_vec((rows, cols), values.to_vec())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let grid = Grid::new((0.0, 0.0), (1.0, 1.0), values).map_err(js_error)?;
    let bounds = Bounds::new(low, high).map_err(js_error)?;
    let seed = if seed.is_empty() {
        None
    } else {
        Some(mask_from_bytes(seed, rows, cols)?)
    };
    let adjacency = if eight_connected {
        Adjacency::Eight
    } else {
        Adjacency::Four
    };
    let cap = usize::try_from(max_iterations).ok();

    let selection = FloodSelector::new(adjacency)
        .select(&grid, bounds, seed.as_ref(), cap)
        .map_err(js_error)?;
    Ok(selection.mask.to_u8().into_raw_vec_and_offset().0)
}

/// Compress mask bytes into strips.
///
/// # Returns
/// Flat `[fixed, start, end, fixed, start, end, ...]`
#[wasm_bindgen]
pub fn ruled_strips_wasm(
    mask: &[u8],
    rows: usize,
    cols: usize,
    by_rows: bool,
    padding: usize,
) -> Result<Vec<u32>, JsValue> {
    let mask = mask_from_bytes(mask, rows, cols)?;
    let axis = if by_rows {
        RulingAxis::Rows
    } else {
        RulingAxis::Columns
    };
    let set = compress(&mask, axis, padding);
    flatten_strips(set.strips())
        .map_err(|v| JsValue::from_str(&format!("strip index {v} does not fit in u32")))
}

/// Flatten strips to `u32` triples, or return the first index that overflows.
fn flatten_strips(strips: &[Strip]) -> Result<Vec<u32>, usize> {
    let mut out = Vec::with_capacity(3 * strips.len());
    for s in strips {
        for v in [s.fixed, s.start, s.end] {
            out.push(u32::try_from(v).map_err(|_| v)?);
        }
    }
    Ok(out)
}
