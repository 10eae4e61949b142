//! Synthetic spike trains.
//!
//! Generators for background and event-locked activity, used to exercise the
//! alignment and latency code on data with known structure:
//!
//! - **Poisson**: homogeneous Poisson process from exponential inter-spike
//!   intervals
//! - **Evoked**: at most one spike per event at `event + latency + jitter`,
//!   jitter ~ N(0, jitter_sd²)
//!
//! Every generator takes `seed: Option<u64>`; `None` seeds from entropy.

use crate::error::{AlignError, Result};
use rand::prelude::*;
use rand_distr::{Exp, Normal};

/// Upper bound on `rate_hz * (t_stop - t_start)` for [`poisson_spike_train`].
pub const MAX_EXPECTED_SPIKES: f64 = 1e9;

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

fn invalid(msg: String) -> AlignError {
    AlignError::InvalidParameter(msg)
}

/// Homogeneous Poisson spike train on `[t_start, t_stop)`.
///
/// # Arguments
/// * `rate_hz` - Mean firing rate in spikes per second (`>= 0`)
/// * `t_start` - Start of the recording
/// * `t_stop` - End of the recording (`>= t_start`)
/// * `seed` - Optional random seed for reproducibility
///
/// # Returns
/// Sorted spike times.
///
/// # Errors
/// [`AlignError::InvalidParameter`] for a negative or non-finite rate, a
/// reversed interval, or an expected count above [`MAX_EXPECTED_SPIKES`].
pub fn poisson_spike_train(
    rate_hz: f64,
    t_start: f64,
    t_stop: f64,
    seed: Option<u64>,
) -> Result<Vec<f64>> {
    if !rate_hz.is_finite() || rate_hz < 0.0 {
        return Err(invalid(format!(
            "rate must be finite and non-negative, got {}",
            rate_hz
        )));
    }
    if !t_start.is_finite() || !t_stop.is_finite() || t_stop < t_start {
        return Err(invalid(format!(
            "invalid recording interval [{}, {})",
            t_start, t_stop
        )));
    }
    if rate_hz == 0.0 {
        return Ok(Vec::new());
    }
    let duration = t_stop - t_start;
    let expected = rate_hz * duration;
    if !expected.is_finite() || expected > MAX_EXPECTED_SPIKES {
        return Err(invalid(format!(
            "expected spike count {} exceeds {}",
            expected, MAX_EXPECTED_SPIKES
        )));
    }

    let isi = Exp::new(rate_hz).map_err(|e| invalid(e.to_string()))?;
    let mut rng = rng_from_seed(seed);
    let mut times = Vec::with_capacity(expected.ceil() as usize);
    // Accumulate from zero so the step never vanishes against a large t_start.
    let mut elapsed = rng.sample::<f64, _>(isi);
    while elapsed < duration {
        let t = t_start + elapsed;
        if t >= t_stop {
            break;
        }
        times.push(t);
        elapsed += rng.sample::<f64, _>(isi);
    }
    Ok(times)
}

/// Event-locked spike train.
///
/// # Arguments
/// * `events` - Event times
/// * `latency` - Mean response delay after each event
/// * `jitter_sd` - Standard deviation of the delay (`>= 0`)
/// * `probability` - Chance that an event evokes a spike, in `[0, 1]`
/// * `seed` - Optional random seed for reproducibility
///
/// # Returns
/// Sorted spike times, at most one per event.
pub fn evoked_spike_train(
    events: &[f64],
    latency: f64,
    jitter_sd: f64,
    probability: f64,
    seed: Option<u64>,
) -> Result<Vec<f64>> {
    if !latency.is_finite() {
        return Err(invalid(format!("latency must be finite, got {}", latency)));
    }
    if !jitter_sd.is_finite() || jitter_sd < 0.0 {
        return Err(invalid(format!(
            "jitter_sd must be finite and non-negative, got {}",
            jitter_sd
        )));
    }
    if !(0.0..=1.0).contains(&probability) {
        return Err(invalid(format!(
            "probability must be in [0, 1], got {}",
            probability
        )));
    }

    let jitter = Normal::new(0.0, jitter_sd).map_err(|e| invalid(e.to_string()))?;
    let mut rng = rng_from_seed(seed);
    let mut times: Vec<f64> = events
        .iter()
        .filter_map(|&e| {
            if rng.gen_bool(probability) {
                Some(e + latency + rng.sample::<f64, _>(jitter))
            } else {
                None
            }
        })
        .collect();
    times.sort_by(|a, b| a.total_cmp(b));
    Ok(times)
}

/// Merge two sorted spike trains into one sorted train.
pub fn merge_spike_trains(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] <= b[j] {
            merged.push(a[i]);
            i += 1;
        } else {
            merged.push(b[j]);
            j += 1;
        }
    }
    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    merged
}
