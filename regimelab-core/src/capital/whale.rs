//! Whale-activity detection from a dynamic volume quantile threshold.

use crate::rolling::{rolling_quantile, rolling_sum, shift};

const EPS: f64 = 1e-10;

/// Cap on the intensity ratio so one outlier day cannot dominate plots.
pub const INTENSITY_CAP: f64 = 10.0;

/// Rolling `quantile` of volume over `window` days — the dynamic whale
/// threshold. NaN during warmup.
pub fn threshold(volumes: &[f64], window: usize, quantile: f64) -> Vec<f64> {
    rolling_quantile(volumes, window, quantile)
}

/// 1.0 where volume exceeds the threshold, 0.0 elsewhere (including the
/// warmup where no threshold exists yet).
pub fn flags(volumes: &[f64], threshold: &[f64]) -> Vec<f64> {
    volumes
        .iter()
        .zip(threshold)
        .map(|(v, t)| {
            if !t.is_nan() && v > t {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Volume over threshold, capped at `INTENSITY_CAP`. NaN during warmup.
pub fn intensity(volumes: &[f64], threshold: &[f64]) -> Vec<f64> {
    volumes
        .iter()
        .zip(threshold)
        .map(|(v, t)| {
            if t.is_nan() {
                f64::NAN
            } else {
                (v / (t + EPS)).min(INTENSITY_CAP)
            }
        })
        .collect()
}

/// Rolling count of whale flags over `window` days.
pub fn frequency(flags: &[f64], window: usize) -> Vec<f64> {
    rolling_sum(flags, window)
}

/// Week-over-week change in whale frequency:
/// (recent - previous) / (previous + 1).
pub fn trend(frequency: &[f64], window: usize) -> Vec<f64> {
    let previous = shift(frequency, window);
    frequency
        .iter()
        .zip(&previous)
        .map(|(recent, prev)| {
            if recent.is_nan() || prev.is_nan() {
                f64::NAN
            } else {
                (recent - prev) / (prev + 1.0)
            }
        })
        .collect()
}
