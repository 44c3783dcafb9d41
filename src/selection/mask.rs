//! Boolean masks congruent with a grid.

use ndarray::{Array2, ArrayView2, Zip};

use crate::error::{RefineError, RefineResult};

/// Cells chosen by a flood pass (`true` = selected).
///
/// A mask owns its cells and keeps no reference to the grid it was computed
/// from; congruence is checked by shape whenever two masks or a mask and a
/// grid meet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMask {
    cells: Array2<bool>,
}

impl SelectionMask {
    /// Mask with no cell selected.
    pub fn empty(dim: (usize, usize)) -> Self {
        Self {
            cells: Array2::from_elem(dim, false),
        }
    }

    /// Mask with every cell selected.
    pub fn full(dim: (usize, usize)) -> Self {
        Self {
            cells: Array2::from_elem(dim, true),
        }
    }

    pub fn from_array(cells: Array2<bool>) -> Self {
        Self { cells }
    }

    /// Build from a flat row-major buffer.
    pub fn from_vec(dim: (usize, usize), cells: Vec<bool>) -> RefineResult<Self> {
        let found = cells.len();
        Array2::from_shape_vec(dim, cells)
            .map(Self::from_array)
            .map_err(|_| RefineError::mismatch(dim, (found, 1)))
    }

    /// `(rows, cols)`
    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        self.cells.dim()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells.get((row, col)).copied().unwrap_or(false)
    }

    #[inline]
    pub fn as_array(&self) -> ArrayView2<'_, bool> {
        self.cells.view()
    }

    pub fn into_array(self) -> Array2<bool> {
        self.cells
    }

    /// Number of selected cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&b| b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|&b| b)
    }

    /// `true` when every selected cell of `self` is also selected in `other`.
    pub fn is_subset_of(&self, other: &SelectionMask) -> bool {
        self.dim() == other.dim()
            && Zip::from(&self.cells)
                .and(&other.cells)
                .all(|&a, &b| !a || b)
    }

    /// Element-wise AND, e.g. the nearshore intersection of two passes.
    pub fn and(&self, other: &SelectionMask) -> RefineResult<SelectionMask> {
        self.combine(other, |a, b| a && b)
    }

    /// Element-wise OR.
    pub fn or(&self, other: &SelectionMask) -> RefineResult<SelectionMask> {
        self.combine(other, |a, b| a || b)
    }

    fn combine(&self, other: &SelectionMask, op: impl Fn(bool, bool) -> bool) -> RefineResult<SelectionMask> {
        if self.dim() != other.dim() {
            return Err(RefineError::mismatch(self.dim(), other.dim()));
        }
        let cells = Zip::from(&self.cells)
            .and(&other.cells)
            .map_collect(|&a, &b| op(a, b));
        Ok(Self { cells })
    }

    /// Mask as 0/1 values, the layout of the diagnostic raster export.
    pub fn to_u8(&self) -> Array2<u8> {
        self.cells.mapv(u8::from)
    }
}
