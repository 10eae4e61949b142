//! Event alignment.
//!
//! [`align`] resolves the units once, then visits every (event, unit) pair:
//! events outer, units inner. Without a bin width each pair contributes its
//! relative timestamps to an [`AlignedTimes`]; with one, each pair fills its
//! own contiguous histogram inside a [`BinnedCounts`].
//!
//! All validation (bin width, label count, unit resolution) happens before
//! any extraction, so a call either fails without work or returns a complete
//! result.

use crate::array::CountArray;
use crate::binning::BinGrid;
use crate::error::{AlignError, Result};
use crate::labeled::{Axis, Column, Label, LabeledArray, Table};
use crate::parallel::{iter_maybe_parallel, maybe_par_chunks_mut_enumerate};
use crate::units::{ResolvedUnits, TimesInput, UnitId, DEFAULT_SPIKE_FIELD};
use crate::window::{extract_into, relative_times, Window};
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use std::iter::repeat;
use std::ops::Range;
use tracing::{debug, instrument};

// =============================================================================
// Options
// =============================================================================

/// Options for [`align`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AlignOptions {
    /// Bin width in seconds; `None` returns relative timestamps.
    pub bin_width: Option<f64>,
    /// One label per event, carried into the output.
    pub event_labels: Option<Vec<Label>>,
    /// Units to align, in output order; `None` aligns every unit.
    pub unit_ids: Option<Vec<UnitId>>,
    /// Table field holding the timestamps (table input only).
    pub spike_field: String,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            bin_width: None,
            event_labels: None,
            unit_ids: None,
            spike_field: DEFAULT_SPIKE_FIELD.to_string(),
        }
    }
}

impl AlignOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bin_width(mut self, bin_width: f64) -> Self {
        self.bin_width = Some(bin_width);
        self
    }

    pub fn with_event_labels<I, L>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        self.event_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_unit_ids<I, U>(mut self, unit_ids: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UnitId>,
    {
        self.unit_ids = Some(unit_ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_spike_field(mut self, field: impl Into<String>) -> Self {
        self.spike_field = field.into();
        self
    }
}

// =============================================================================
// Results
// =============================================================================

/// Unbinned alignment: one entry per (event, unit, timestamp in window).
///
/// Entries are grouped by event (CSR style: `event_offsets[e]..event_offsets[e + 1]`
/// holds event `e`), then by unit slot, then in timestamp order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTimes {
    times: Vec<f64>,
    event_index: Vec<usize>,
    unit_id: Vec<UnitId>,
    unit_slot: Vec<usize>,
    event_label: Option<Vec<Label>>,
    event_offsets: Vec<usize>,
    unit_ids: Vec<UnitId>,
}

impl AlignedTimes {
    /// Relative times.
    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    #[inline]
    pub fn event_index(&self) -> &[usize] {
        &self.event_index
    }

    #[inline]
    pub fn unit_id(&self) -> &[UnitId] {
        &self.unit_id
    }

    /// Position of each entry's unit in the resolved unit order.
    #[inline]
    pub fn unit_slot(&self) -> &[usize] {
        &self.unit_slot
    }

    /// Event label of each entry, if labels were supplied.
    #[inline]
    pub fn event_label(&self) -> Option<&[Label]> {
        self.event_label.as_deref()
    }

    /// Resolved units, in slot order.
    #[inline]
    pub fn unit_ids(&self) -> &[UnitId] {
        &self.unit_ids
    }

    #[inline]
    pub fn n_events(&self) -> usize {
        self.event_offsets.len() - 1
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Entry range of event `e`.
    ///
    /// # Panics
    /// Panics if `e >= n_events()`.
    #[inline]
    pub fn event_range(&self, e: usize) -> Range<usize> {
        self.event_offsets[e]..self.event_offsets[e + 1]
    }

    /// Relative times of event `e`, all units.
    pub fn for_event(&self, e: usize) -> &[f64] {
        &self.times[self.event_range(e)]
    }

    /// Earliest relative time of each event that has one.
    ///
    /// # Returns
    /// `(event_index, time)` pairs in event order.
    pub fn first_per_event(&self) -> Vec<(usize, f64)> {
        (0..self.n_events())
            .filter_map(|e| {
                self.for_event(e)
                    .iter()
                    .copied()
                    .reduce(f64::min)
                    .map(|t| (e, t))
            })
            .collect()
    }

    /// Row table with columns `time, event_index, unit_id[, event_label]`.
    pub fn to_table(&self) -> Result<Table> {
        let mut columns = vec![
            ("time".to_string(), Column::Float(self.times.clone())),
            (
                "event_index".to_string(),
                Column::Index(self.event_index.clone()),
            ),
            ("unit_id".to_string(), Column::Unit(self.unit_id.clone())),
        ];
        if let Some(labels) = &self.event_label {
            columns.push(("event_label".to_string(), Column::Label(labels.clone())));
        }
        Table::new(columns)
    }
}

/// Binned alignment: a count per (bin, event[, unit]).
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedCounts {
    grid: BinGrid,
    counts: CountArray,
    unit_ids: Vec<UnitId>,
    event_labels: Option<Vec<Label>>,
}

impl BinnedCounts {
    #[inline]
    pub fn grid(&self) -> &BinGrid {
        &self.grid
    }

    /// Left edge of every bin.
    #[inline]
    pub fn bins(&self) -> &[f64] {
        self.grid.left_edges()
    }

    #[inline]
    pub fn counts(&self) -> &CountArray {
        &self.counts
    }

    pub fn into_counts(self) -> CountArray {
        self.counts
    }

    /// Resolved units, in slot order.
    #[inline]
    pub fn unit_ids(&self) -> &[UnitId] {
        &self.unit_ids
    }

    #[inline]
    pub fn event_labels(&self) -> Option<&[Label]> {
        self.event_labels.as_deref()
    }

    #[inline]
    pub fn n_events(&self) -> usize {
        self.counts.n_events()
    }

    /// Per-bin mean count across events for one unit slot.
    ///
    /// # Panics
    /// Panics if `unit_slot` is out of range.
    pub fn mean_over_events(&self, unit_slot: usize) -> Vec<f64> {
        self.counts.mean_over_events(unit_slot)
    }

    /// Per-bin mean rate (counts per second) across events for one unit slot.
    pub fn rate(&self, unit_slot: usize) -> Vec<f64> {
        let width = self.grid.width();
        let mut rate = self.mean_over_events(unit_slot);
        for r in &mut rate {
            *r /= width;
        }
        rate
    }

    /// Count array with axes `time`, `event_index` (or `event_label`) and,
    /// for multiple units, `unit_id`.
    pub fn to_labeled_array(&self) -> Result<LabeledArray> {
        let mut axes = vec![Axis::new("time", Column::Float(self.bins().to_vec()))];
        axes.push(match &self.event_labels {
            Some(labels) => Axis::new("event_label", Column::Label(labels.clone())),
            None => Axis::new("event_index", Column::Index((0..self.n_events()).collect())),
        });
        if self.counts.has_unit_axis() {
            axes.push(Axis::new("unit_id", Column::Unit(self.unit_ids.clone())));
        }
        LabeledArray::new(self.counts.clone(), axes)
    }
}

/// Result of [`align`].
#[derive(Debug, Clone, PartialEq)]
pub enum Alignment {
    Times(AlignedTimes),
    Counts(BinnedCounts),
}

/// Labeled form of an [`Alignment`].
#[derive(Debug, Clone, PartialEq)]
pub enum Labeled {
    Table(Table),
    Array(LabeledArray),
}

impl Alignment {
    #[inline]
    pub fn is_binned(&self) -> bool {
        matches!(self, Alignment::Counts(_))
    }

    pub fn as_times(&self) -> Option<&AlignedTimes> {
        match self {
            Alignment::Times(t) => Some(t),
            Alignment::Counts(_) => None,
        }
    }

    pub fn as_counts(&self) -> Option<&BinnedCounts> {
        match self {
            Alignment::Counts(c) => Some(c),
            Alignment::Times(_) => None,
        }
    }

    pub fn into_times(self) -> Option<AlignedTimes> {
        match self {
            Alignment::Times(t) => Some(t),
            Alignment::Counts(_) => None,
        }
    }

    pub fn into_counts(self) -> Option<BinnedCounts> {
        match self {
            Alignment::Counts(c) => Some(c),
            Alignment::Times(_) => None,
        }
    }

    /// Table for unbinned results, labeled array for binned ones.
    pub fn to_labeled(&self) -> Result<Labeled> {
        match self {
            Alignment::Times(t) => t.to_table().map(Labeled::Table),
            Alignment::Counts(c) => c.to_labeled_array().map(Labeled::Array),
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Validated inputs of one alignment call.
struct Plan<'a> {
    units: ResolvedUnits<'a>,
    events: &'a [f64],
    window: Window,
    labels: Option<&'a [Label]>,
}

impl<'a> Plan<'a> {
    fn new(
        times: TimesInput<'a>,
        events: &'a [f64],
        window: Window,
        opts: &'a AlignOptions,
    ) -> Result<Self> {
        let labels = opts.event_labels.as_deref();
        if let Some(labels) = labels {
            if labels.len() != events.len() {
                return Err(AlignError::LengthMismatch {
                    labels: labels.len(),
                    events: events.len(),
                });
            }
        }
        let units = times.resolve(opts.unit_ids.as_deref(), &opts.spike_field)?;
        debug!(n_units = units.len(), n_events = events.len(), "resolved units");
        Ok(Self {
            units,
            events,
            window,
            labels,
        })
    }

    fn aligned_times(&self) -> AlignedTimes {
        let series = self.units.series();
        let window = self.window;

        // Each event collects its units' windows independently.
        let per_event: Vec<(Vec<f64>, Vec<usize>)> = iter_maybe_parallel!(0..self.events.len())
            .map(|e| {
                let event = self.events[e];
                let mut times = Vec::new();
                let mut slots = Vec::new();
                for (slot, unit_times) in series.iter().enumerate() {
                    let n = extract_into(unit_times, event, &window, &mut times);
                    slots.extend(repeat(slot).take(n));
                }
                (times, slots)
            })
            .collect();

        let total: usize = per_event.iter().map(|(t, _)| t.len()).sum();
        let ids = self.units.ids();
        let mut times = Vec::with_capacity(total);
        let mut event_index = Vec::with_capacity(total);
        let mut unit_id = Vec::with_capacity(total);
        let mut unit_slot = Vec::with_capacity(total);
        let mut event_label = self.labels.map(|_| Vec::with_capacity(total));
        let mut event_offsets = Vec::with_capacity(self.events.len() + 1);
        event_offsets.push(0);

        for (e, (event_times, slots)) in per_event.into_iter().enumerate() {
            let n = event_times.len();
            event_index.extend(repeat(e).take(n));
            unit_id.extend(slots.iter().map(|&s| ids[s].clone()));
            if let (Some(out), Some(labels)) = (event_label.as_mut(), self.labels) {
                out.extend(repeat(labels[e].clone()).take(n));
            }
            unit_slot.extend(slots);
            times.extend(event_times);
            event_offsets.push(times.len());
        }

        debug!(n_samples = times.len(), "aligned timestamps");
        AlignedTimes {
            times,
            event_index,
            unit_id,
            unit_slot,
            event_label,
            event_offsets,
            unit_ids: ids.to_vec(),
        }
    }

    fn binned_counts(&self, grid: BinGrid) -> BinnedCounts {
        let n_bins = grid.len();
        let n_events = self.events.len();
        let n_units = self.units.len();
        let unit_axis = if n_units == 1 { None } else { Some(n_units) };
        let mut counts = CountArray::zeros(n_bins, n_events, unit_axis);

        if !counts.is_empty() {
            let series = self.units.series();
            let events = self.events;
            let window = self.window;
            let grid = &grid;
            // Chunk k is the histogram of event k % n_events, unit k / n_events.
            maybe_par_chunks_mut_enumerate!(
                counts.as_mut_slice(),
                n_bins,
                |(k, trace): (usize, &mut [f64])| {
                    let (e, u) = (k % n_events, k / n_events);
                    grid.accumulate(relative_times(series[u], events[e], &window), trace);
                }
            );
        }

        debug!(n_bins, n_units, total = counts.sum(), "binned counts");
        BinnedCounts {
            grid,
            counts,
            unit_ids: self.units.ids().to_vec(),
            event_labels: self.labels.map(<[Label]>::to_vec),
        }
    }
}

/// Align timestamps to events.
///
/// # Arguments
/// * `times` - Timestamps: a series, a list of series, a map or a
///   [`UnitTable`](crate::units::UnitTable)
/// * `events` - Reference event times
/// * `window` - Relative window `[start, end)` around each event
/// * `opts` - Binning, labels and unit selection
///
/// # Returns
/// [`Alignment::Counts`] when `opts.bin_width` is set, else [`Alignment::Times`].
///
/// # Errors
/// * [`AlignError::InvalidBinWidth`] for a non-positive or non-finite bin width
/// * [`AlignError::LengthMismatch`] if labels and events differ in length
/// * any unit resolution error of [`TimesInput::resolve`]
///
/// # Examples
///
/// ```
/// use spike_align::align::{align, AlignOptions};
/// use spike_align::window::Window;
///
/// let spikes = vec![0.95, 1.02, 2.01, 2.5];
/// let events = [1.0, 2.0];
/// let window = Window::new(-0.1, 0.1).unwrap();
///
/// let aligned = align(&spikes, &events, window, &AlignOptions::default()).unwrap();
/// let times = aligned.as_times().unwrap();
/// assert_eq!(times.event_index(), &[0, 0, 1]);
///
/// let opts = AlignOptions::new().with_bin_width(0.05);
/// let binned = align(&spikes, &events, window, &opts).unwrap();
/// assert_eq!(binned.as_counts().unwrap().counts().shape(), vec![4, 2]);
/// ```
#[instrument(
    skip_all,
    level = "debug",
    fields(n_events = events.len(), binned = opts.bin_width.is_some())
)]
pub fn align<'a>(
    times: impl Into<TimesInput<'a>>,
    events: &[f64],
    window: Window,
    opts: &AlignOptions,
) -> Result<Alignment> {
    let grid = opts
        .bin_width
        .map(|width| BinGrid::new(&window, width))
        .transpose()?;
    let plan = Plan::new(times.into(), events, window, opts)?;
    Ok(match grid {
        Some(grid) => Alignment::Counts(plan.binned_counts(grid)),
        None => Alignment::Times(plan.aligned_times()),
    })
}

/// Unbinned alignment; `opts.bin_width` is ignored.
pub fn align_times<'a>(
    times: impl Into<TimesInput<'a>>,
    events: &[f64],
    window: Window,
    opts: &AlignOptions,
) -> Result<AlignedTimes> {
    Ok(Plan::new(times.into(), events, window, opts)?.aligned_times())
}

/// Binned alignment with `bin_width`, overriding `opts.bin_width`.
pub fn align_counts<'a>(
    times: impl Into<TimesInput<'a>>,
    events: &[f64],
    window: Window,
    bin_width: f64,
    opts: &AlignOptions,
) -> Result<BinnedCounts> {
    let grid = BinGrid::new(&window, bin_width)?;
    Ok(Plan::new(times.into(), events, window, opts)?.binned_counts(grid))
}
