//! ESRI ASCII rasters (GeoClaw topo type 3).
//!
//! ```text
//! ncols         4
//! nrows         3
//! xllcorner     -100.0
//! yllcorner     25.0
//! cellsize      0.25
//! nodata_value  -9999
//! <nrows lines of ncols values, northernmost row first>
//! ```
//!
//! `xllcenter`/`yllcenter` may replace the corner keys, and `dx`/`dy` may
//! replace `cellsize`. Corner registration is shifted by half a cell so the
//! resulting [`Grid`] origin is always the centre of its south-west cell.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::{s, Array2};
use tracing::debug;

use super::{Grid, GridGeometry, GridSource};
use crate::atomic::publish;
use crate::error::{RefineError, RefineResult};
use crate::selection::SelectionMask;

/// No-data marker written by [`write_mask`].
const MASK_NODATA: i32 = -9999;

/// ASCII raster on disk.
#[derive(Debug, Clone)]
pub struct AsciiRaster {
    path: PathBuf,
}

impl AsciiRaster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GridSource for AsciiRaster {
    fn load(&self) -> RefineResult<Grid> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| RefineError::Read {
            path: self.path.clone(),
            source,
        })?;
        let grid = parse(&self.path, &text)?;
        debug!(
            path = %self.path.display(),
            rows = grid.dim().0,
            cols = grid.dim().1,
            "loaded ascii raster"
        );
        Ok(grid)
    }
}

/// Parse raster text. `path` is only used in error messages.
pub fn parse(path: &Path, text: &str) -> RefineResult<Grid> {
    let format_err = |line: usize, message: String| RefineError::GridFormat {
        path: path.to_path_buf(),
        line,
        message,
    };

    let mut header: HashMap<String, (usize, f64)> = HashMap::new();
    let mut lines = text.lines().enumerate().peekable();

    while let Some(&(idx, line)) = lines.peek() {
        let mut tokens = line.split_whitespace();
        let Some(key) = tokens.next() else {
            lines.next();
            continue;
        };
        if !key.starts_with(|c: char| c.is_ascii_alphabetic()) {
            break;
        }
        let value = tokens
            .next()
            .ok_or_else(|| format_err(idx + 1, format!("header '{key}' has no value")))?
            .parse::<f64>()
            .map_err(|e| format_err(idx + 1, format!("header '{key}': {e}")))?;
        header.insert(key.to_ascii_lowercase(), (idx + 1, value));
        lines.next();
    }

    let get = |key: &str| header.get(key).map(|&(_, v)| v);
    let require = |key: &str| get(key).ok_or_else(|| format_err(0, format!("missing header '{key}'")));
    let count = |key: &str| -> RefineResult<usize> {
        let (line, v) = header
            .get(key)
            .copied()
            .ok_or_else(|| format_err(0, format!("missing header '{key}'")))?;
        if v < 0.0 || v.fract() != 0.0 {
            return Err(format_err(line, format!("'{key}' must be a non-negative integer")));
        }
        Ok(v as usize)
    };

    let cols = count("ncols")?;
    let rows = count("nrows")?;
    let (dx, dy) = match get("cellsize") {
        Some(c) => (c, c),
        None => (require("dx")?, require("dy")?),
    };
    let x0 = match get("xllcenter") {
        Some(x) => x,
        None => require("xllcorner")? + 0.5 * dx,
    };
    let y0 = match get("yllcenter") {
        Some(y) => y,
        None => require("yllcorner")? + 0.5 * dy,
    };
    let nodata = get("nodata_value");

    let geometry = GridGeometry::new((x0, y0), (dx, dy), (rows, cols))?;

    let expected = rows.checked_mul(cols).ok_or_else(|| {
        let line = header.get("nrows").map_or(0, |&(line, _)| line);
        format_err(line, format!("{rows} x {cols} cells overflow the address space"))
    })?;

    // values grow with the data actually present, never with the header
    let mut data: Vec<f64> = Vec::new();
    for (idx, line) in lines {
        for token in line.split_whitespace() {
            if data.len() >= expected {
                return Err(format_err(
                    idx + 1,
                    format!("more than {expected} data values"),
                ));
            }
            let v = token
                .parse::<f64>()
                .map_err(|e| format_err(idx + 1, format!("value '{token}': {e}")))?;
            data.push(match nodata {
                Some(nd) if v == nd => f64::NAN,
                _ => v,
            });
        }
    }
    if data.len() != expected {
        return Err(format_err(
            text.lines().count(),
            format!("expected {expected} data values, found {}", data.len()),
        ));
    }
    let north_first = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| format_err(0, e.to_string()))?;
    let values = north_first.slice(s![..;-1, ..]).to_owned();

    Grid::from_geometry(geometry, values)
}

/// Write `mask` as a 0/1 raster congruent with `geometry`.
pub fn write_mask(mask: &SelectionMask, geometry: &GridGeometry, path: &Path) -> RefineResult<()> {
    if mask.dim() != geometry.dim() {
        return Err(RefineError::mismatch(geometry.dim(), mask.dim()));
    }
    let text = render_mask(mask, geometry);
    publish(path, text.as_bytes())?;
    debug!(path = %path.display(), selected = mask.count(), "wrote mask raster");
    Ok(())
}

fn render_mask(mask: &SelectionMask, g: &GridGeometry) -> String {
    let mut out = String::with_capacity(128 + 2 * g.rows * g.cols);
    let mut header = |key: &str, value: String| out.push_str(&format!("{key:<14}{value}\n"));
    header("ncols", g.cols.to_string());
    header("nrows", g.rows.to_string());
    header("xllcenter", g.x0.to_string());
    header("yllcenter", g.y0.to_string());
    if g.dx == g.dy {
        header("cellsize", g.dx.to_string());
    } else {
        header("dx", g.dx.to_string());
        header("dy", g.dy.to_string());
    }
    header("nodata_value", MASK_NODATA.to_string());

    let cells = mask.as_array();
    for row in (0..g.rows).rev() {
        let line: Vec<&str> = cells
            .row(row)
            .iter()
            .map(|&b| if b { "1" } else { "0" })
            .collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}
