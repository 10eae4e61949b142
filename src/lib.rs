//! # spike-align
//!
//! Alignment of sorted timestamps (e.g. neural spike times) to reference
//! events.
//!
//! This crate provides:
//! - Input normalization for a single series, a list, a keyed map or a
//!   row-labeled table of series
//! - Window extraction by binary search over sorted timestamps
//! - Fixed-width binning into per-event, per-unit count arrays
//! - Labeled outputs (row tables and axis-labeled arrays)
//! - Response latency estimation (PSTH threshold or first spike)
//! - Stable multi-column table sorting
//! - Seeded spike-train simulation
//!
//! ## Data Layout
//!
//! Binned counts are stored column-major in flat vectors: element
//! `(bin, event, unit)` sits at `bin + event * n_bins + unit * n_bins * n_events`,
//! so the histogram of one (event, unit) pair is a contiguous slice.
//!
//! ## Example
//!
//! ```
//! use spike_align::{align, AlignOptions, Window};
//!
//! let units = vec![vec![0.98, 1.01, 1.5], vec![1.02, 2.03]];
//! let events = [1.0, 2.0];
//! let window = Window::new(-0.05, 0.05).unwrap();
//!
//! let binned = align(&units, &events, window, &AlignOptions::new().with_bin_width(0.01))
//!     .unwrap()
//!     .into_counts()
//!     .unwrap();
//!
//! // 10 bins x 2 events x 2 units
//! assert_eq!(binned.counts().shape(), vec![10, 2, 2]);
//! assert_eq!(binned.counts().trace_sum(0, 0), 2.0);
//! assert_eq!(binned.counts().trace_sum(1, 1), 1.0);
//! ```

#![allow(clippy::needless_range_loop)]

mod parallel;

pub mod align;
pub mod array;
pub mod binning;
pub mod error;
pub mod labeled;
pub mod latency;
pub mod simulation;
pub mod sort;
pub mod units;
pub mod window;

// Re-export commonly used items
pub use align::{
    align, align_counts, align_times, AlignOptions, AlignedTimes, Alignment, BinnedCounts, Labeled,
};
pub use array::CountArray;
pub use binning::BinGrid;
pub use error::{AlignError, Result};
pub use labeled::{Axis, Column, Label, LabeledArray, Table};
pub use window::Window;

// Re-export latency types
pub use latency::{estimate_latency, LatencyDetail, LatencyEstimate, LatencyMethod, LatencyOptions};

// Re-export sorting helpers
pub use sort::{by_condition, sort_table};

// Re-export unit input types
pub use units::{TimesInput, UnitField, UnitId, UnitTable};
