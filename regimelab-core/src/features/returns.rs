//! Return and intraday-range features.

use crate::domain::Bar;
use crate::rolling::pct_change;

/// Fractional return over `period` days.
pub fn simple_returns(closes: &[f64], period: usize) -> Vec<f64> {
    pct_change(closes, period)
}

/// Natural-log daily returns.
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    for i in 1..n {
        let prev = closes[i - 1];
        let cur = closes[i];
        if prev > 0.0 && cur > 0.0 {
            out[i] = (cur / prev).ln();
        }
    }
    out
}

/// Intraday range as a fraction of close: (high - low) / close.
pub fn price_range_pct(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .map(|b| {
            if b.close == 0.0 {
                f64::NAN
            } else {
                (b.high - b.low) / b.close
            }
        })
        .collect()
}

/// Where the close sits within the day's range: 0 at the low, 1 at the high.
/// NaN on zero-range days.
pub fn close_position(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .map(|b| {
            let range = b.high - b.low;
            if range == 0.0 {
                f64::NAN
            } else {
                (b.close - b.low) / range
            }
        })
        .collect()
}
