//! Window extraction over sorted timestamps.
//!
//! A [`Window`] is the half-open interval `[start, end)` relative to an
//! event. Localizing it in a sorted series is two binary searches, so the
//! cost per (event, unit) pair is O(log n) plus the number of matches.

use crate::error::{AlignError, Result};
use std::ops::Range;

/// Relative time window `[start, end)` around an event, in seconds.
///
/// With the `serde` feature a window reads and writes as
/// `{"start": .., "end": ..}`; deserialization goes through [`Window::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Window {
    start: f64,
    end: f64,
}

impl Window {
    /// Create a window.
    ///
    /// `start == end` is a valid, always-empty window.
    ///
    /// # Errors
    /// [`AlignError::InvalidWindow`] if `end < start` or either bound is not
    /// finite.
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || end < start {
            return Err(AlignError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    #[inline]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[inline]
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Window length `end - start`.
    #[inline]
    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// Whether a relative time falls inside the window.
    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

impl TryFrom<(f64, f64)> for Window {
    type Error = AlignError;

    fn try_from((start, end): (f64, f64)) -> Result<Self> {
        Window::new(start, end)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Window {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct Bounds {
            start: f64,
            end: f64,
        }

        let Bounds { start, end } = Bounds::deserialize(deserializer)?;
        Window::new(start, end).map_err(serde::de::Error::custom)
    }
}

/// First index `i` with `times[i] >= target`.
#[inline]
pub fn lower_bound(times: &[f64], target: f64) -> usize {
    times.partition_point(|&t| t < target)
}

/// Index range of `times` inside `[event + start, event + end)`.
///
/// `times` must be sorted ascending.
#[inline]
pub fn window_range(times: &[f64], event: f64, window: &Window) -> Range<usize> {
    let lo = lower_bound(times, event + window.start);
    let hi = lower_bound(times, event + window.end);
    // Guard against `event + end` rounding below `event + start`.
    lo..hi.max(lo)
}

/// Number of timestamps inside the window around `event`.
#[inline]
pub fn count_in_window(times: &[f64], event: f64, window: &Window) -> usize {
    window_range(times, event, window).len()
}

/// Timestamps inside the window around `event`, relative to `event`.
///
/// # Examples
///
/// ```
/// use spike_align::window::{extract, Window};
///
/// let times = [0.5, 0.95, 1.0, 1.02, 1.3];
/// let w = Window::new(-0.1, 0.1).unwrap();
/// let rel = extract(&times, 1.0, &w);
/// assert_eq!(rel.len(), 3);
/// assert!((rel[0] + 0.05).abs() < 1e-12);
/// assert_eq!(rel[1], 0.0);
/// ```
pub fn extract(times: &[f64], event: f64, window: &Window) -> Vec<f64> {
    let mut out = Vec::new();
    extract_into(times, event, window, &mut out);
    out
}

/// Append the relative timestamps of one window to `out`.
///
/// Returns the number of values appended.
pub fn extract_into(times: &[f64], event: f64, window: &Window, out: &mut Vec<f64>) -> usize {
    let before = out.len();
    out.extend(relative_times(times, event, window));
    out.len() - before
}

/// Lazy iterator over the relative timestamps of one window.
pub fn relative_times<'t>(
    times: &'t [f64],
    event: f64,
    window: &Window,
) -> impl ExactSizeIterator<Item = f64> + 't {
    let range = window_range(times, event, window);
    let window = *window;
    times[range]
        .iter()
        .map(move |&t| clamp_relative(t - event, &window))
}

/// Keep a relative time inside `[start, end)` after the subtraction.
///
/// A timestamp selected as `>= event + start` can map to a value a few ulps
/// below `start` (and likewise near `end`) once `event` is subtracted.
#[inline]
fn clamp_relative(rel: f64, window: &Window) -> f64 {
    if rel < window.start {
        window.start
    } else if rel >= window.end {
        prev_float(window.end).max(window.start)
    } else {
        rel
    }
}

/// Largest float strictly below `x` (for finite `x`).
#[inline]
fn prev_float(x: f64) -> f64 {
    if x == 0.0 {
        -f64::from_bits(1)
    } else if x > 0.0 {
        f64::from_bits(x.to_bits() - 1)
    } else {
        f64::from_bits(x.to_bits() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(start: f64, end: f64) -> Window {
        Window::new(start, end).unwrap()
    }

    #[test]
    fn test_window_validation() {
        assert!(Window::new(-0.1, 0.1).is_ok());
        assert!(Window::new(0.2, 0.2).is_ok());
        assert_eq!(
            Window::new(0.2, 0.1).unwrap_err(),
            AlignError::InvalidWindow {
                start: 0.2,
                end: 0.1
            }
        );
        assert!(Window::new(f64::NAN, 0.1).is_err());
        assert!(Window::new(0.0, f64::INFINITY).is_err());
        assert!(Window::try_from((0.0, 1.0)).is_ok());
    }

    #[test]
    fn test_lower_bound() {
        let times = [1.0, 2.0, 2.0, 3.0];
        assert_eq!(lower_bound(&times, 0.0), 0);
        assert_eq!(lower_bound(&times, 2.0), 1);
        assert_eq!(lower_bound(&times, 2.5), 3);
        assert_eq!(lower_bound(&times, 9.0), 4);
        assert_eq!(lower_bound(&[], 1.0), 0);
    }

    #[test]
    fn test_window_is_half_open() {
        let times = [0.9, 1.0, 1.1, 1.2];
        // [0.9, 1.1): includes 0.9 and 1.0, excludes 1.1
        let r = window_range(&times, 1.0, &w(-0.1, 0.1));
        assert_eq!(r, 0..2);
    }

    #[test]
    fn test_extract_relative() {
        let times = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(extract(&times, 2.0, &w(-1.5, 0.5)), vec![-1.0, 0.0]);
    }

    #[test]
    fn test_empty_cases() {
        let times = [1.0, 2.0, 3.0];
        // No timestamps inside
        assert!(extract(&times, 1.5, &w(-0.1, 0.1)).is_empty());
        // Window entirely before / after the data
        assert!(extract(&times, -10.0, &w(0.0, 1.0)).is_empty());
        assert!(extract(&times, 10.0, &w(0.0, 1.0)).is_empty());
        // Zero-length window, even on an exact hit
        assert!(extract(&times, 2.0, &w(0.0, 0.0)).is_empty());
        // Empty series
        assert!(extract(&[], 2.0, &w(-1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_duplicates_kept() {
        let times = [1.0, 1.0, 1.0, 2.0];
        assert_eq!(extract(&times, 1.0, &w(0.0, 0.5)), vec![0.0, 0.0, 0.0]);
        assert_eq!(count_in_window(&times, 1.0, &w(0.0, 0.5)), 3);
    }

    #[test]
    fn test_extract_into_appends() {
        let times = [0.5, 1.5, 2.5];
        let mut buf = vec![42.0];
        let n = extract_into(&times, 1.0, &w(0.0, 1.0), &mut buf);
        assert_eq!(n, 1);
        assert_eq!(buf, vec![42.0, 0.5]);
    }

    #[test]
    fn test_input_not_mutated() {
        let times = vec![0.1, 0.2, 0.3];
        let copy = times.clone();
        let _ = extract(&times, 0.2, &w(-1.0, 1.0));
        assert_eq!(times, copy);
    }

    #[test]
    fn test_relative_times_stay_in_window() {
        // Large absolute times make `t - event` lose precision.
        let event = 123_456.789;
        let times: Vec<f64> = (0..200).map(|i| event - 0.1 + i as f64 * 0.001).collect();
        let win = w(-0.1, 0.1);
        for rel in extract(&times, event, &win) {
            assert!(win.contains(rel), "relative time {} outside window", rel);
        }
    }

    #[test]
    fn test_prev_float() {
        assert!(prev_float(1.0) < 1.0);
        assert!(prev_float(0.0) < 0.0);
        assert!(prev_float(-1.0) < -1.0);
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn test_deserialize_valid_window() {
        let w: Window = serde_json::from_str(r#"{"start": -0.1, "end": 0.2}"#).unwrap();
        assert_eq!(w, Window::new(-0.1, 0.2).unwrap());
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(serde_json::from_str::<Window>(&json).unwrap(), w);
    }

    #[test]
    fn test_deserialize_rejects_reversed_window() {
        let err = serde_json::from_str::<Window>(r#"{"start": 0.5, "end": -0.5}"#).unwrap_err();
        assert!(err.to_string().contains("invalid window"), "{}", err);
        // A zero-length window stays valid.
        assert!(serde_json::from_str::<Window>(r#"{"start": 0.5, "end": 0.5}"#).is_ok());
    }
}
