//! Compression of a selection mask into ruled rectangles.
//!
//! A ruled rectangle set is a list of strips. Each strip fixes one grid line
//! along the ruling axis (a row or a column) and covers a contiguous span of
//! cells along the other axis:
//!
//! ```text
//!   mask (rows ruling)          strips
//!   . . . . . .
//!   . # # . # .     ->   row 1: [1, 2]  row 1: [4, 4]
//!   . # # # # .     ->   row 2: [1, 4]
//!   . . . . . .
//! ```
//!
//! Without padding the strips reproduce the mask exactly.

use std::str::FromStr;

use ndarray::{Array2, ArrayView1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::RefineError;
use crate::selection::SelectionMask;

/// Which grid lines are held fixed by the strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulingAxis {
    /// One strip set per row; spans run along x.
    #[default]
    Rows,
    /// One strip set per column; spans run along y.
    Columns,
}

impl RulingAxis {
    #[inline]
    fn lane_axis(self) -> Axis {
        match self {
            RulingAxis::Rows => Axis(0),
            RulingAxis::Columns => Axis(1),
        }
    }

    /// Refinement-file code of the fixed coordinate (1 = x fixed, 2 = y fixed).
    pub fn ixy(self) -> u8 {
        match self {
            RulingAxis::Rows => 2,
            RulingAxis::Columns => 1,
        }
    }
}

impl FromStr for RulingAxis {
    type Err = RefineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rows" | "row" | "y" => Ok(RulingAxis::Rows),
            "columns" | "column" | "cols" | "x" => Ok(RulingAxis::Columns),
            other => Err(RefineError::Config(format!("unknown ruling axis '{other}'"))),
        }
    }
}

/// Cells `start..=end` of grid line `fixed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Strip {
    pub fixed: usize,
    pub start: usize,
    pub end: usize,
}

impl Strip {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Ordered strips covering a mask.
///
/// Strips are sorted by fixed coordinate, then by span start. Spans sharing
/// a fixed coordinate never overlap or touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuledRectangleSet {
    axis: RulingAxis,
    dim: (usize, usize),
    strips: Vec<Strip>,
}

impl RuledRectangleSet {
    #[inline]
    pub fn axis(&self) -> RulingAxis {
        self.axis
    }

    /// Shape `(rows, cols)` of the mask the set was built from.
    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    #[inline]
    pub fn strips(&self) -> &[Strip] {
        &self.strips
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strips.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Strip> {
        self.strips.iter()
    }

    /// Number of cells covered by the union of the strips.
    pub fn covered_cells(&self) -> usize {
        self.strips.iter().map(Strip::len).sum()
    }

    /// One strip on each of a run of consecutive lines, with no line
    /// skipped or repeated. Only such a set has evenly spaced rules.
    pub fn is_uniform(&self) -> bool {
        self.strips.windows(2).all(|w| w[1].fixed == w[0].fixed + 1)
    }

    /// Paint the strips back onto a mask of the original shape.
    pub fn rasterize(&self) -> SelectionMask {
        let mut cells = Array2::from_elem(self.dim, false);
        for s in &self.strips {
            for k in s.start..=s.end {
                let idx = match self.axis {
                    RulingAxis::Rows => [s.fixed, k],
                    RulingAxis::Columns => [k, s.fixed],
                };
                cells[idx] = true;
            }
        }
        SelectionMask::from_array(cells)
    }

    /// One strip per fixed coordinate, from its lowest start to its highest
    /// end. This is a single ruled polygon enclosing the set; it is no longer
    /// an exact covering when a line had several spans.
    pub fn envelope(&self) -> RuledRectangleSet {
        let mut strips: Vec<Strip> = Vec::new();
        for s in &self.strips {
            match strips.last_mut() {
                Some(last) if last.fixed == s.fixed => last.end = last.end.max(s.end),
                _ => strips.push(*s),
            }
        }
        RuledRectangleSet {
            axis: self.axis,
            dim: self.dim,
            strips,
        }
    }
}

/// Compress `mask` into strips ruled along `axis`.
///
/// Every span is widened by `padding` cells on both ends (clipped to the
/// grid) before spans on the same line are merged. With `padding == 0` the
/// result rasterizes back to `mask` exactly.
pub fn compress(mask: &SelectionMask, axis: RulingAxis, padding: usize) -> RuledRectangleSet {
    let cells = mask.as_array();
    let lane_axis = axis.lane_axis();
    let lanes = cells.len_of(lane_axis);

    // Lanes are independent; collect keeps them in fixed-coordinate order.
    let per_lane: Vec<Vec<Strip>> = (0..lanes)
        .into_par_iter()
        .map(|fixed| lane_strips(fixed, cells.index_axis(lane_axis, fixed), padding))
        .collect();

    RuledRectangleSet {
        axis,
        dim: mask.dim(),
        strips: per_lane.into_iter().flatten().collect(),
    }
}

/// Maximal runs of `true` in one lane, padded and merged.
fn lane_strips(fixed: usize, lane: ArrayView1<'_, bool>, padding: usize) -> Vec<Strip> {
    let n = lane.len();
    let mut strips: Vec<Strip> = Vec::new();
    let mut push = |start: usize, end: usize| {
        let start = start.saturating_sub(padding);
        let end = end.saturating_add(padding).min(n - 1);
        match strips.last_mut() {
            // padded starts stay sorted, so only the last span can touch
            Some(last) if start <= last.end + 1 => last.end = last.end.max(end),
            _ => strips.push(Strip { fixed, start, end }),
        }
    };

    let mut run_start: Option<usize> = None;
    for (k, &on) in lane.iter().enumerate() {
        match (on, run_start) {
            (true, None) => run_start = Some(k),
            (false, Some(s)) => {
                push(s, k - 1);
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = run_start {
        push(s, n - 1);
    }
    strips
}
