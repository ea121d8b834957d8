//! Flow-concentration measures over a rolling window.

use crate::rolling::{gini, quantile, rolling_apply, rolling_mean, rolling_std};

const EPS: f64 = 1e-10;

/// Rolling Gini coefficient of flow magnitude: how unevenly capital
/// movement concentrates on a few days.
pub fn flow_gini(flow: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(flow, window, gini)
}

/// Share of total flow magnitude contributed by days at or above the
/// window's 80th percentile.
pub fn top20_share(flow: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(flow, window, |w| {
        let abs: Vec<f64> = w.iter().map(|v| v.abs()).collect();
        let threshold = quantile(&abs, 0.80);
        let total: f64 = abs.iter().sum();
        if total <= 0.0 {
            return 0.5;
        }
        let top: f64 = abs.iter().filter(|&&v| v >= threshold).sum();
        top / (total + EPS)
    })
}

/// Flow dispersion: rolling std over rolling mean.
pub fn dispersion(flow: &[f64], window: usize) -> Vec<f64> {
    let sd = rolling_std(flow, window);
    let mean = rolling_mean(flow, window);
    sd.iter()
        .zip(&mean)
        .map(|(s, m)| {
            if s.is_nan() || m.is_nan() {
                f64::NAN
            } else {
                s / (m + EPS)
            }
        })
        .collect()
}
