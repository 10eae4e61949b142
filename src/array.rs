//! Column-major count storage for binned alignments.
//!
//! [`CountArray`] holds counts indexed by `(bin, event)` or
//! `(bin, event, unit)` in a flat `Vec<f64>` with column-major (Fortran)
//! layout: element `(b, e, u)` is at `b + e * n_bins + u * n_bins * n_events`.
//! The bins of one (event, unit) pair are therefore contiguous, which gives
//! zero-copy access to a single trial's histogram and lets the engine fill
//! pairs in parallel without synchronization.

use nalgebra::DMatrix;

/// Dense 2-D or 3-D array of counts.
///
/// The unit axis is only present when more than one unit was aligned; a
/// 2-D array behaves as a 3-D array with a single unit slot.
///
/// # Examples
///
/// ```
/// use spike_align::array::CountArray;
///
/// let mut counts = CountArray::zeros(4, 2, None);
/// counts.trace_mut(1, 0)[2] = 3.0;
///
/// assert_eq!(counts.shape(), vec![4, 2]);
/// assert_eq!(counts[(2, 1)], 3.0);
/// assert_eq!(counts.trace(1, 0), &[0.0, 0.0, 3.0, 0.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CountArray {
    data: Vec<f64>,
    n_bins: usize,
    n_events: usize,
    n_units: Option<usize>,
}

impl CountArray {
    /// Zero-filled array; `n_units = None` drops the unit axis.
    pub fn zeros(n_bins: usize, n_events: usize, n_units: Option<usize>) -> Self {
        let slots = n_units.unwrap_or(1);
        Self {
            data: vec![0.0; n_bins * n_events * slots],
            n_bins,
            n_events,
            n_units,
        }
    }

    /// Create from flat column-major data.
    ///
    /// Returns `None` if `data.len()` does not match the dimensions.
    pub fn from_column_major(
        data: Vec<f64>,
        n_bins: usize,
        n_events: usize,
        n_units: Option<usize>,
    ) -> Option<Self> {
        if data.len() != n_bins * n_events * n_units.unwrap_or(1) {
            return None;
        }
        Some(Self {
            data,
            n_bins,
            n_events,
            n_units,
        })
    }

    #[inline]
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    #[inline]
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Number of unit slots (1 for a 2-D array).
    #[inline]
    pub fn n_units(&self) -> usize {
        self.n_units.unwrap_or(1)
    }

    /// Whether the unit axis is present.
    #[inline]
    pub fn has_unit_axis(&self) -> bool {
        self.n_units.is_some()
    }

    /// 2 or 3.
    #[inline]
    pub fn ndim(&self) -> usize {
        if self.has_unit_axis() {
            3
        } else {
            2
        }
    }

    /// Dimensions, `[bins, events]` or `[bins, events, units]`.
    pub fn shape(&self) -> Vec<usize> {
        match self.n_units {
            Some(u) => vec![self.n_bins, self.n_events, u],
            None => vec![self.n_bins, self.n_events],
        }
    }

    /// Total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    fn offset(&self, bin: usize, event: usize, unit: usize) -> usize {
        bin + event * self.n_bins + unit * self.n_bins * self.n_events
    }

    /// Histogram of one (event, unit) pair (zero-copy).
    ///
    /// # Panics
    /// Panics if `event` or `unit` is out of range.
    #[inline]
    pub fn trace(&self, event: usize, unit: usize) -> &[f64] {
        assert!(event < self.n_events && unit < self.n_units());
        let start = self.offset(0, event, unit);
        &self.data[start..start + self.n_bins]
    }

    /// Mutable histogram of one (event, unit) pair.
    ///
    /// # Panics
    /// Panics if `event` or `unit` is out of range.
    #[inline]
    pub fn trace_mut(&mut self, event: usize, unit: usize) -> &mut [f64] {
        assert!(event < self.n_events && unit < self.n_units());
        let start = self.offset(0, event, unit);
        let n = self.n_bins;
        &mut self.data[start..start + n]
    }

    /// Element with bounds checking.
    #[inline]
    pub fn get(&self, bin: usize, event: usize, unit: usize) -> Option<f64> {
        if bin < self.n_bins && event < self.n_events && unit < self.n_units() {
            Some(self.data[self.offset(bin, event, unit)])
        } else {
            None
        }
    }

    /// Sum over all elements.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Total count of one (event, unit) pair.
    pub fn trace_sum(&self, event: usize, unit: usize) -> f64 {
        self.trace(event, unit).iter().sum()
    }

    /// Per-bin mean across events for one unit slot.
    ///
    /// Returns zeros if there are no events.
    pub fn mean_over_events(&self, unit: usize) -> Vec<f64> {
        let mut mean = vec![0.0; self.n_bins];
        if self.n_events == 0 {
            return mean;
        }
        for e in 0..self.n_events {
            for (m, &c) in mean.iter_mut().zip(self.trace(e, unit)) {
                *m += c;
            }
        }
        let n = self.n_events as f64;
        for m in &mut mean {
            *m /= n;
        }
        mean
    }

    /// Flat column-major data (zero-copy).
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable flat column-major data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Consume and return the underlying data.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Bins × events matrix of one unit slot as a nalgebra `DMatrix`.
    ///
    /// Both use column-major layout, so this is a single slice copy.
    pub fn to_dmatrix(&self, unit: usize) -> DMatrix<f64> {
        assert!(unit < self.n_units());
        let start = self.offset(0, 0, unit);
        let len = self.n_bins * self.n_events;
        DMatrix::from_column_slice(self.n_bins, self.n_events, &self.data[start..start + len])
    }
}

impl std::ops::Index<(usize, usize)> for CountArray {
    type Output = f64;

    /// `(bin, event)` of the first unit slot.
    #[inline]
    fn index(&self, (bin, event): (usize, usize)) -> &f64 {
        &self[(bin, event, 0)]
    }
}

impl std::ops::Index<(usize, usize, usize)> for CountArray {
    type Output = f64;

    #[inline]
    fn index(&self, (bin, event, unit): (usize, usize, usize)) -> &f64 {
        debug_assert!(
            bin < self.n_bins && event < self.n_events && unit < self.n_units(),
            "CountArray index ({}, {}, {}) out of bounds for {:?}",
            bin,
            event,
            unit,
            self.shape()
        );
        &self.data[self.offset(bin, event, unit)]
    }
}

impl std::ops::IndexMut<(usize, usize, usize)> for CountArray {
    #[inline]
    fn index_mut(&mut self, (bin, event, unit): (usize, usize, usize)) -> &mut f64 {
        debug_assert!(
            bin < self.n_bins && event < self.n_events && unit < self.n_units(),
            "CountArray index ({}, {}, {}) out of bounds for {:?}",
            bin,
            event,
            unit,
            self.shape()
        );
        let idx = self.offset(bin, event, unit);
        &mut self.data[idx]
    }
}

impl std::fmt::Display for CountArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.n_units {
            Some(u) => write!(f, "CountArray({}x{}x{})", self.n_bins, self.n_events, u),
            None => write!(f, "CountArray({}x{})", self.n_bins, self.n_events),
        }
    }
}
