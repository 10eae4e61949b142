//! Fixed-width bin grids over a window.
//!
//! Edges are `start + i * width` for `i = 0..=n`, computed by multiplication
//! so that no rounding error accumulates along the grid. The grid is built
//! once per alignment call and shared by every (event, unit) pair.
//!
//! ## Conventions
//!
//! - Every bin is half-open, `[edges[b], edges[b + 1])`, including the last.
//! - `n = ceil((end - start) / width)`, with a relative tolerance of
//!   [`BIN_COUNT_RTOL`] on the ratio so that `0.2 / 0.01 = 20.000000000000004`
//!   gives 20 bins, not 21.
//! - A grid holds at most [`MAX_BINS`] bins; a width that would exceed it
//!   is rejected as [`AlignError::InvalidBinWidth`].
//! - The last edge is raised to `end` if the product falls a few ulps short,
//!   so the grid always covers the whole window.

use crate::error::{AlignError, Result};
use crate::window::Window;

/// Relative tolerance applied to `span / width` before taking the ceiling.
pub const BIN_COUNT_RTOL: f64 = 1e-9;

/// Largest number of bins a single grid may hold.
pub const MAX_BINS: usize = 100_000_000;

/// Bin edges derived from a window and a bin width.
#[derive(Debug, Clone, PartialEq)]
pub struct BinGrid {
    edges: Vec<f64>,
    width: f64,
}

impl BinGrid {
    /// Build the grid for `window` with bins of `width` seconds.
    ///
    /// # Errors
    /// [`AlignError::InvalidBinWidth`] if `width` is not finite and positive,
    /// or so small that the window would need more than [`MAX_BINS`] bins.
    ///
    /// # Examples
    ///
    /// ```
    /// use spike_align::binning::BinGrid;
    /// use spike_align::window::Window;
    ///
    /// let grid = BinGrid::new(&Window::new(-0.1, 0.1).unwrap(), 0.01).unwrap();
    /// assert_eq!(grid.len(), 20);
    /// assert!(*grid.edges().last().unwrap() >= 0.1);
    /// ```
    pub fn new(window: &Window, width: f64) -> Result<Self> {
        if !width.is_finite() || width <= 0.0 {
            return Err(AlignError::InvalidBinWidth(width));
        }

        let n = bin_count(window.span(), width)?;
        let start = window.start();
        let mut edges: Vec<f64> = (0..=n).map(|i| start + i as f64 * width).collect();
        if let Some(last) = edges.last_mut() {
            if *last < window.end() {
                *last = window.end();
            }
        }

        Ok(Self { edges, width })
    }

    /// Number of bins.
    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nominal bin width.
    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// All `len() + 1` edges.
    #[inline]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Left edge of every bin.
    #[inline]
    pub fn left_edges(&self) -> &[f64] {
        &self.edges[..self.len()]
    }

    /// Midpoint of every bin.
    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|e| 0.5 * (e[0] + e[1])).collect()
    }

    /// Index of the first bin whose left edge is at or after `t`.
    ///
    /// Uses a tolerance of `BIN_COUNT_RTOL * width`, so a left edge that is
    /// a few ulps below `t` still counts as starting at `t`.
    pub fn first_bin_at_or_after(&self, t: f64) -> usize {
        let tol = BIN_COUNT_RTOL * self.width;
        self.left_edges().partition_point(|&e| e < t - tol)
    }

    /// Bin containing `t`, or `None` outside `[edges[0], edges[len])`.
    #[inline]
    pub fn bin_index(&self, t: f64) -> Option<usize> {
        let n = self.len();
        if n == 0 || !(t >= self.edges[0] && t < self.edges[n]) {
            return None;
        }
        // Number of edges <= t, minus one, is the bin holding t.
        let idx = self.edges.partition_point(|&e| e <= t) - 1;
        Some(idx.min(n - 1))
    }

    /// Add the histogram of `relative_times` into `counts` (length `len()`).
    ///
    /// Values outside the grid are ignored. Returns the number of values
    /// counted.
    pub fn count_into(&self, relative_times: &[f64], counts: &mut [f64]) -> usize {
        self.accumulate(relative_times.iter().copied(), counts)
    }

    /// Like [`BinGrid::count_into`] for any iterator of relative times.
    pub fn accumulate<I>(&self, relative_times: I, counts: &mut [f64]) -> usize
    where
        I: IntoIterator<Item = f64>,
    {
        debug_assert_eq!(counts.len(), self.len());
        let mut counted = 0;
        for t in relative_times {
            if let Some(b) = self.bin_index(t) {
                counts[b] += 1.0;
                counted += 1;
            }
        }
        counted
    }

    /// Histogram of `relative_times` over this grid.
    pub fn counts(&self, relative_times: &[f64]) -> Vec<f64> {
        let mut counts = vec![0.0; self.len()];
        self.count_into(relative_times, &mut counts);
        counts
    }
}

/// `ceil(span / width)` with a relative tolerance on the ratio.
fn bin_count(span: f64, width: f64) -> Result<usize> {
    if span <= 0.0 {
        return Ok(0);
    }
    let ratio = span / width;
    let n = (ratio * (1.0 - BIN_COUNT_RTOL)).ceil().max(1.0);
    if !n.is_finite() || n > MAX_BINS as f64 {
        return Err(AlignError::InvalidBinWidth(width));
    }
    Ok(n as usize)
}
