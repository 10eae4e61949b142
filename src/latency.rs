//! Response-onset latency.
//!
//! Two estimators over one unit's timestamps:
//!
//! - **PSTH**: bin the window around every event, average the counts across
//!   events into a rate curve, smooth it with a 5-point triangular kernel and
//!   report the first post-event bin whose rate exceeds
//!   `baseline mean + k * baseline std`.
//! - **First spike**: take the earliest timestamp after each event (within
//!   `window.end`) and report the median over responsive trials.

use crate::align::{align_counts, align_times, AlignOptions};
use crate::error::{AlignError, Result};
use crate::window::Window;
use tracing::{debug, instrument, warn};

/// Smoothing kernel applied to the PSTH rate curve.
pub const TRIANGULAR_KERNEL: [f64; 5] = [0.0, 0.25, 0.5, 0.25, 0.0];

/// Latency estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LatencyMethod {
    /// Threshold crossing of the averaged, smoothed rate curve.
    #[default]
    Psth,
    /// Median time to the first timestamp on each trial.
    FirstSpike,
}

/// Options for [`estimate_latency`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LatencyOptions {
    pub method: LatencyMethod,
    /// Threshold in baseline standard deviations above the baseline mean.
    pub std_above_baseline: f64,
    /// PSTH bin width in seconds.
    pub bin_width: f64,
}

impl Default for LatencyOptions {
    fn default() -> Self {
        Self {
            method: LatencyMethod::Psth,
            std_above_baseline: 2.0,
            bin_width: 0.001,
        }
    }
}

impl LatencyOptions {
    pub fn with_method(mut self, method: LatencyMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_std_above_baseline(mut self, k: f64) -> Self {
        self.std_above_baseline = k;
        self
    }

    pub fn with_bin_width(mut self, bin_width: f64) -> Self {
        self.bin_width = bin_width;
        self
    }
}

/// Intermediate results of an estimate.
#[derive(Debug, Clone, PartialEq)]
pub enum LatencyDetail {
    Psth {
        /// Bin left edges.
        bins: Vec<f64>,
        /// Smoothed mean rate per bin, in counts per second.
        rate: Vec<f64>,
        /// Index of the first bin at or after the event.
        onset: usize,
        /// `NaN` when there are no baseline bins.
        threshold: f64,
    },
    FirstSpike {
        /// First relative time of each responsive trial.
        per_trial: Vec<f64>,
        /// Event index of each entry of `per_trial`.
        event_index: Vec<usize>,
    },
}

/// Latency in seconds plus the data it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyEstimate {
    pub latency: f64,
    pub detail: LatencyDetail,
}

/// Estimate the response latency of one unit to a set of events.
///
/// # Arguments
/// * `times` - Sorted timestamps of one unit
/// * `events` - Reference event times
/// * `window` - `start` is the baseline start (PSTH only), `end` the
///   maximum latency
/// * `opts` - Method, threshold and bin width
///
/// # Returns
/// The latency, `0.0` for PSTH mode when nothing crosses the threshold and
/// `NaN` for first-spike mode when no trial responds.
///
/// # Errors
/// * [`AlignError::InvalidParameter`] if `std_above_baseline` is not finite
/// * alignment errors for a bad window or bin width
#[instrument(
    skip_all,
    level = "debug",
    fields(n_events = events.len(), method = ?opts.method)
)]
pub fn estimate_latency(
    times: &[f64],
    events: &[f64],
    window: Window,
    opts: &LatencyOptions,
) -> Result<LatencyEstimate> {
    if !opts.std_above_baseline.is_finite() {
        return Err(AlignError::InvalidParameter(format!(
            "std_above_baseline must be finite, got {}",
            opts.std_above_baseline
        )));
    }
    let estimate = match opts.method {
        LatencyMethod::Psth => psth_latency(times, events, window, opts)?,
        LatencyMethod::FirstSpike => first_spike_latency(times, events, window)?,
    };
    debug!(latency = estimate.latency, "estimated latency");
    Ok(estimate)
}

fn psth_latency(
    times: &[f64],
    events: &[f64],
    window: Window,
    opts: &LatencyOptions,
) -> Result<LatencyEstimate> {
    let binned = align_counts(
        times,
        events,
        window,
        opts.bin_width,
        &AlignOptions::default(),
    )?;
    let rate = smooth_triangular(&binned.rate(0));
    let onset = binned.grid().first_bin_at_or_after(0.0);

    let baseline = &rate[..onset];
    if baseline.is_empty() {
        warn!(
            start = window.start(),
            "window has no baseline bins before the event"
        );
    }
    let (mean, std) = mean_std(baseline);
    let threshold = mean + opts.std_above_baseline * std;

    let latency = rate[onset..]
        .iter()
        .position(|&r| r > threshold)
        .map_or(0.0, |i| i as f64 * opts.bin_width);

    Ok(LatencyEstimate {
        latency,
        detail: LatencyDetail::Psth {
            bins: binned.bins().to_vec(),
            rate,
            onset,
            threshold,
        },
    })
}

fn first_spike_latency(times: &[f64], events: &[f64], window: Window) -> Result<LatencyEstimate> {
    let response = Window::new(0.0, window.end())?;
    let aligned = align_times(times, events, response, &AlignOptions::default())?;
    let (event_index, per_trial): (Vec<usize>, Vec<f64>) =
        aligned.first_per_event().into_iter().unzip();

    let latency = median(&per_trial).unwrap_or_else(|| {
        warn!(n_events = events.len(), "no trial has a timestamp in the response window");
        f64::NAN
    });

    Ok(LatencyEstimate {
        latency,
        detail: LatencyDetail::FirstSpike {
            per_trial,
            event_index,
        },
    })
}

/// Smooth a rate curve with [`TRIANGULAR_KERNEL`].
pub fn smooth_triangular(rate: &[f64]) -> Vec<f64> {
    convolve_same(rate, &TRIANGULAR_KERNEL)
}

/// Discrete convolution, centered and truncated to the signal length.
///
/// The full convolution is cut starting at `(kernel.len() - 1) / 2`, with
/// zeros assumed outside the signal. The output always has
/// `signal.len()` elements; an empty kernel yields zeros.
pub fn convolve_same(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = signal.len();
    let m = kernel.len();
    let offset = m.saturating_sub(1) / 2;
    (0..n)
        .map(|i| {
            let k = i + offset;
            let j_lo = (k + 1).saturating_sub(n);
            let j_hi = m.min(k + 1);
            (j_lo..j_hi).map(|j| kernel[j] * signal[k - j]).sum::<f64>()
        })
        .collect()
}

/// Mean and population standard deviation (`NaN` for an empty slice).
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Median, averaging the two middle values for even lengths.
fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    })
}
