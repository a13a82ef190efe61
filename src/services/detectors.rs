//! Attractor detection over a sliding window of the trajectory.
//!
//! Three independent heuristics look at the most recent `window_size`
//! observations. None of them fire until the window holds at least
//! `min_observations` states.
//!
//! ## Fixed point
//!
//! Per-dimension sample variance is summed and normalized by the largest
//! variance the value range allows in the formula (`dims × 100²`).
//! `stability = 1 − normalized`; at or above `stability_threshold` the window
//! mean becomes a fixed-point candidate with `strength = stability`.
//!
//! ## Limit cycle
//!
//! For each lag `p` in `2..=max_period` (while the window holds `2p`
//! states) the lag similarity is the mean of `1 / (1 + ‖s[i] − s[i−p]‖)`.
//! The best lag wins, smallest first on ties, and must exceed the threshold.
//! A constant window matches itself at every lag and so reads as period 2.
//!
//! ## Strange attractor
//!
//! Every dimension's range over the window stays under `boundedness_cap`,
//! and neither other detector fires on the same window. The center is the
//! midpoint of the bounds; `strength` is the mean of `1 − range/100`.

use crate::domain::models::config::DetectorConfig;
use crate::domain::models::state::{euclidean_distance, MAX_VALUE};
use crate::domain::models::{Bounds, Candidate, StateVector};

// ---------------------------------------------------------------------------
// Window statistics
// ---------------------------------------------------------------------------

fn dims_of(window: &[StateVector]) -> usize {
    window.first().map_or(0, |s| s.values.len())
}

/// Per-dimension mean of the window.
pub fn window_mean(window: &[StateVector]) -> Vec<f64> {
    let dims = dims_of(window);
    let n = window.len() as f64;
    (0..dims)
        .map(|d| window.iter().map(|s| s.values[d]).sum::<f64>() / n)
        .collect()
}

/// Per-dimension sample variance (denominator `n − 1`).
pub fn window_variance(window: &[StateVector], mean: &[f64]) -> Vec<f64> {
    if window.len() < 2 {
        return vec![0.0; mean.len()];
    }
    let denom = (window.len() - 1) as f64;
    mean.iter()
        .enumerate()
        .map(|(d, m)| {
            window
                .iter()
                .map(|s| (s.values[d] - m).powi(2))
                .sum::<f64>()
                / denom
        })
        .collect()
}

/// Per-dimension `[min, max]` of the window.
pub fn window_bounds(window: &[StateVector]) -> Vec<Bounds> {
    (0..dims_of(window))
        .map(|d| {
            window.iter().fold(
                Bounds {
                    min: f64::INFINITY,
                    max: f64::NEG_INFINITY,
                },
                |b, s| Bounds {
                    min: b.min.min(s.values[d]),
                    max: b.max.max(s.values[d]),
                },
            )
        })
        .collect()
}

/// Mean of `1 / (1 + distance)` between each state and the one `lag` earlier.
pub fn lag_similarity(window: &[StateVector], lag: usize) -> f64 {
    if lag == 0 || window.len() <= lag {
        return 0.0;
    }
    let total: f64 = (lag..window.len())
        .map(|i| 1.0 / (1.0 + euclidean_distance(&window[i].values, &window[i - lag].values)))
        .sum();
    total / (window.len() - lag) as f64
}

/// `1 − Σvariance / (dims × 100²)` together with the window mean.
pub fn stability(window: &[StateVector]) -> Option<(f64, Vec<f64>)> {
    let dims = dims_of(window);
    if dims == 0 {
        return None;
    }
    let mean = window_mean(window);
    let total_variance: f64 = window_variance(window, &mean).iter().sum();
    let max_variance = dims as f64 * MAX_VALUE * MAX_VALUE;
    Some((1.0 - total_variance / max_variance, mean))
}

fn has_enough(window: &[StateVector], config: &DetectorConfig) -> bool {
    window.len() >= config.min_observations && dims_of(window) > 0
}

// ---------------------------------------------------------------------------
// Detectors
// ---------------------------------------------------------------------------

/// Fixed point: low total variance.
pub fn detect_fixed_point(window: &[StateVector], config: &DetectorConfig) -> Option<Candidate> {
    if !has_enough(window, config) {
        return None;
    }
    let (stability, center) = stability(window)?;
    (stability >= config.stability_threshold).then(|| Candidate::fixed_point(center, stability))
}

/// Limit cycle: the window repeats itself with some period `p ≥ 2`.
pub fn detect_limit_cycle(window: &[StateVector], config: &DetectorConfig) -> Option<Candidate> {
    if !has_enough(window, config) {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for period in 2..=config.max_period {
        if window.len() < 2 * period {
            break;
        }
        let similarity = lag_similarity(window, period);
        if best.is_none_or(|(_, s)| similarity > s) {
            best = Some((period, similarity));
        }
    }

    let (period, similarity) = best?;
    if similarity <= config.stability_threshold {
        return None;
    }

    let start = window.len() - period;
    let cycle_states = window[start..].to_vec();
    let center = window[start].values.clone();
    Some(Candidate::limit_cycle(center, similarity, period, cycle_states))
}

fn strange_candidate(window: &[StateVector], config: &DetectorConfig) -> Option<Candidate> {
    let bounds = window_bounds(window);
    if bounds.iter().any(|b| b.range() >= config.boundedness_cap) {
        return None;
    }
    let center = bounds.iter().map(Bounds::midpoint).collect();
    let strength =
        bounds.iter().map(|b| 1.0 - b.range() / MAX_VALUE).sum::<f64>() / bounds.len() as f64;
    Some(Candidate::strange_attractor(center, strength, bounds))
}

/// Strange attractor: bounded, but neither a fixed point nor a cycle.
///
/// Re-runs the other two detectors on the same window and stays silent if
/// either of them fires.
pub fn detect_strange_attractor(
    window: &[StateVector],
    config: &DetectorConfig,
) -> Option<Candidate> {
    if !has_enough(window, config) {
        return None;
    }
    if detect_fixed_point(window, config).is_some() || detect_limit_cycle(window, config).is_some()
    {
        return None;
    }
    strange_candidate(window, config)
}

/// Run every detector over `window` and return this call's candidates:
/// fixed point, then limit cycle, then strange attractor.
pub fn check_for_attractors(window: &[StateVector], config: &DetectorConfig) -> Vec<Candidate> {
    if !has_enough(window, config) {
        return Vec::new();
    }

    let fixed = detect_fixed_point(window, config);
    let cycle = detect_limit_cycle(window, config);

    if fixed.is_none() && cycle.is_none() {
        return strange_candidate(window, config).into_iter().collect();
    }

    fixed.into_iter().chain(cycle).collect()
}
