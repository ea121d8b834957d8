//! Realized and range-based volatility estimators, annualized by √252.

use crate::domain::Bar;
use crate::rolling::{rolling_mean, rolling_std};

/// Trading days per year, the annualization base for daily series.
pub const TRADING_DAYS: f64 = 252.0;

/// Annualized close-to-close realized volatility: rolling std of daily
/// returns × √252.
pub fn realized_volatility(returns: &[f64], window: usize) -> Vec<f64> {
    rolling_std(returns, window)
        .into_iter()
        .map(|v| v * TRADING_DAYS.sqrt())
        .collect()
}

/// Parkinson estimator over high/low ranges:
/// √(mean(ln(H/L)²) / (4 ln 2)) × √252.
pub fn parkinson_volatility(bars: &[Bar], window: usize) -> Vec<f64> {
    let sq_log_hl: Vec<f64> = bars
        .iter()
        .map(|b| {
            if b.high > 0.0 && b.low > 0.0 {
                (b.high / b.low).ln().powi(2)
            } else {
                f64::NAN
            }
        })
        .collect();
    rolling_mean(&sq_log_hl, window)
        .into_iter()
        .map(|m| (m / (4.0 * std::f64::consts::LN_2)).sqrt() * TRADING_DAYS.sqrt())
        .collect()
}

/// Garman-Klass estimator, adding the open-close term:
/// √(0.5·mean(ln(H/L)²) − (2 ln 2 − 1)·mean(ln(C/O)²)) × √252.
/// Windows where the weighted difference goes negative yield NaN.
pub fn garman_klass_volatility(bars: &[Bar], window: usize) -> Vec<f64> {
    let sq_log_hl: Vec<f64> = bars
        .iter()
        .map(|b| {
            if b.high > 0.0 && b.low > 0.0 {
                (b.high / b.low).ln().powi(2)
            } else {
                f64::NAN
            }
        })
        .collect();
    let sq_log_co: Vec<f64> = bars
        .iter()
        .map(|b| {
            if b.close > 0.0 && b.open > 0.0 {
                (b.close / b.open).ln().powi(2)
            } else {
                f64::NAN
            }
        })
        .collect();
    let hl_mean = rolling_mean(&sq_log_hl, window);
    let co_mean = rolling_mean(&sq_log_co, window);
    hl_mean
        .iter()
        .zip(&co_mean)
        .map(|(hl, co)| {
            let var = 0.5 * hl - (2.0 * std::f64::consts::LN_2 - 1.0) * co;
            if var < 0.0 {
                f64::NAN
            } else {
                var.sqrt() * TRADING_DAYS.sqrt()
            }
        })
        .collect()
}
