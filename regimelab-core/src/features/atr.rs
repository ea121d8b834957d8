//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! TR[0] falls back to high-low (no previous close).
//! ATR is a plain rolling mean of the true range.

use crate::domain::Bar;
use crate::rolling::rolling_mean;

/// Compute the True Range series from bars.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];
    if n == 0 {
        return tr;
    }

    tr[0] = bars[0].high - bars[0].low;
    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// ATR over `period` days.
pub fn atr(bars: &[Bar], period: usize) -> Vec<f64> {
    rolling_mean(&true_range(bars), period)
}
