//! Volatility cone: percentile summary of rolling volatility per window.

use serde::Serialize;

use crate::rolling::quantile;
use crate::volatility::realized::realized_volatility;

/// Percentile summary of one look-back window's rolling-volatility history.
#[derive(Debug, Clone, Serialize)]
pub struct ConeRow {
    pub window: usize,
    pub min: f64,
    pub p05: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub p95: f64,
    pub max: f64,
    /// Most recent rolling volatility, NaN when history is too short.
    pub current: f64,
}

/// Build the cone over annualized rolling volatility for each window.
pub fn volatility_cone(returns: &[f64], windows: &[usize]) -> Vec<ConeRow> {
    windows
        .iter()
        .map(|&window| {
            let series = realized_volatility(returns, window);
            let current = series
                .iter()
                .rev()
                .copied()
                .find(|v| !v.is_nan())
                .unwrap_or(f64::NAN);
            ConeRow {
                window,
                min: quantile(&series, 0.0),
                p05: quantile(&series, 0.05),
                p25: quantile(&series, 0.25),
                median: quantile(&series, 0.50),
                p75: quantile(&series, 0.75),
                p95: quantile(&series, 0.95),
                max: quantile(&series, 1.0),
                current,
            }
        })
        .collect()
}
