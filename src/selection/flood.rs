//! Flood-fill selection of grid cells within an elevation band.
//!
//! Selects every cell reachable from a seed set by stepping only through
//! *admissible* cells (`low <= z <= high`). Propagation is breadth-first in
//! rounds so an iteration cap yields a deterministic partial result.

use std::collections::VecDeque;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::mask::SelectionMask;
use crate::error::{RefineError, RefineResult};
use crate::grid::Grid;

/// Admissible elevation band, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    low: f64,
    high: f64,
}

impl Bounds {
    /// Band `[low, high]`. Either end may be infinite.
    pub fn new(low: f64, high: f64) -> RefineResult<Self> {
        if low.is_nan() || high.is_nan() || low > high {
            return Err(RefineError::InvalidBounds { low, high });
        }
        Ok(Self { low, high })
    }

    /// `(-inf, high]`
    pub fn at_most(high: f64) -> RefineResult<Self> {
        Self::new(f64::NEG_INFINITY, high)
    }

    /// `[low, +inf)`
    pub fn at_least(low: f64) -> RefineResult<Self> {
        Self::new(low, f64::INFINITY)
    }

    #[inline]
    pub fn low(&self) -> f64 {
        self.low
    }

    #[inline]
    pub fn high(&self) -> f64 {
        self.high
    }

    /// NaN (no-data) is never contained.
    #[inline]
    pub fn contains(&self, z: f64) -> bool {
        self.low <= z && z <= self.high
    }
}

/// Neighbourhood used for propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adjacency {
    /// Orthogonal neighbours only.
    #[default]
    Four,
    /// Orthogonal and diagonal neighbours.
    Eight,
}

impl Adjacency {
    fn offsets(self) -> &'static [(isize, isize)] {
        const FOUR: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        const EIGHT: [(isize, isize); 8] = [
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ];
        match self {
            Adjacency::Four => &FOUR,
            Adjacency::Eight => &EIGHT,
        }
    }
}

/// How a flood pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodOutcome {
    /// The frontier emptied on its own.
    Converged,
    /// The round cap stopped propagation while admissible cells were still
    /// reachable. The mask is the documented partial result, not an error.
    IterationLimitReached,
}

/// Result of one flood pass.
#[derive(Debug, Clone)]
pub struct Selection {
    pub mask: SelectionMask,
    /// Propagation rounds that added at least one cell.
    pub rounds: usize,
    pub outcome: FloodOutcome,
}

impl Selection {
    pub fn into_mask(self) -> SelectionMask {
        self.mask
    }

    #[inline]
    pub fn limit_reached(&self) -> bool {
        self.outcome == FloodOutcome::IterationLimitReached
    }
}

/// Multi-source breadth-first flood fill over a [`Grid`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FloodSelector {
    adjacency: Adjacency,
}

impl FloodSelector {
    pub fn new(adjacency: Adjacency) -> Self {
        Self { adjacency }
    }

    pub fn adjacency(&self) -> Adjacency {
        self.adjacency
    }

    /// Select the cells of `grid` connected to the seeds through cells
    /// inside `bounds`.
    ///
    /// # Arguments
    /// * `grid` - Elevations, read only
    /// * `bounds` - Admissible band
    /// * `seed` - Restricts the seeds to admissible cells inside this mask.
    ///   Without it every admissible cell seeds itself.
    /// * `max_iterations` - Maximum number of propagation rounds. `Some(0)`
    ///   still returns the admissible seeds.
    ///
    /// # Errors
    /// `DimensionMismatch` when `seed` is not congruent with `grid`. Nothing
    /// is computed in that case.
    pub fn select(
        &self,
        grid: &Grid,
        bounds: Bounds,
        seed: Option<&SelectionMask>,
        max_iterations: Option<usize>,
    ) -> RefineResult<Selection> {
        let (rows, cols) = grid.dim();
        if let Some(seed) = seed {
            if seed.dim() != (rows, cols) {
                return Err(RefineError::mismatch((rows, cols), seed.dim()));
            }
        }

        let values = grid.values();
        let admissible = values.mapv(|z| bounds.contains(z));

        // `selected` doubles as the visited set: a cell is only ever enqueued
        // once, at the moment it is selected.
        let mut selected = Array2::from_elem((rows, cols), false);
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

        for ((r, c), &ok) in admissible.indexed_iter() {
            let seeded = seed.map_or(true, |s| s.get(r, c));
            if ok && seeded {
                selected[[r, c]] = true;
                queue.push_back((r, c));
            }
        }
        let seeds = queue.len();

        let offsets = self.adjacency.offsets();
        let neighbours = |r: usize, c: usize| {
            offsets.iter().filter_map(move |&(dr, dc)| {
                let nr = r.checked_add_signed(dr)?;
                let nc = c.checked_add_signed(dc)?;
                (nr < rows && nc < cols).then_some((nr, nc))
            })
        };

        let mut rounds = 0usize;
        let mut outcome = FloodOutcome::Converged;
        while !queue.is_empty() {
            if max_iterations.is_some_and(|cap| rounds >= cap) {
                let can_grow = queue.iter().any(|&(r, c)| {
                    neighbours(r, c).any(|(nr, nc)| admissible[[nr, nc]] && !selected[[nr, nc]])
                });
                if can_grow {
                    outcome = FloodOutcome::IterationLimitReached;
                }
                break;
            }

            let mut added = 0usize;
            for _ in 0..queue.len() {
                let Some((r, c)) = queue.pop_front() else {
                    break;
                };
                for (nr, nc) in neighbours(r, c) {
                    if admissible[[nr, nc]] && !selected[[nr, nc]] {
                        selected[[nr, nc]] = true;
                        queue.push_back((nr, nc));
                        added += 1;
                    }
                }
            }
            if added == 0 {
                break;
            }
            rounds += 1;
        }

        let mask = SelectionMask::from_array(selected);
        debug!(
            low = bounds.low(),
            high = bounds.high(),
            seeds,
            rounds,
            selected = mask.count(),
            "flood pass finished"
        );
        if outcome == FloodOutcome::IterationLimitReached {
            info!(rounds, "flood propagation stopped at iteration cap");
        }

        Ok(Selection {
            mask,
            rounds,
            outcome,
        })
    }
}
