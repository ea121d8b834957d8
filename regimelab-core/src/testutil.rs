//! Shared synthetic-data helpers for unit tests.

use chrono::NaiveDate;

use crate::domain::Bar;
use crate::table::MarketTable;

/// Create synthetic bars from close prices.
///
/// Generates plausible OHLCV: open = prev_close (or close for the first
/// bar), high = max(open, close) + 1.0, low = min(open, close) - 1.0,
/// volume = 1000.
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = (open.min(close) - 1.0).max(0.01);
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Like `make_bars` but with explicit per-bar volume.
pub fn make_bars_with_volume(closes: &[f64], volumes: &[f64]) -> Vec<Bar> {
    assert_eq!(closes.len(), volumes.len());
    let mut bars = make_bars(closes);
    for (bar, &v) in bars.iter_mut().zip(volumes) {
        bar.volume = v;
    }
    bars
}

/// Validated table over `make_bars` output.
pub fn make_table(closes: &[f64]) -> MarketTable {
    MarketTable::from_bars(make_bars(closes)).unwrap()
}

/// A deterministic pseudo-random walk of `n` closes starting at `start`.
///
/// Uses a small LCG so tests stay seed-stable without pulling in `rand`.
pub fn random_walk(n: usize, start: f64, seed: u64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    let mut closes = Vec::with_capacity(n);
    let mut price = start;
    for _ in 0..n {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let unit = (state >> 11) as f64 / (1u64 << 53) as f64; // [0, 1)
        price *= 1.0 + (unit - 0.5) * 0.04;
        closes.push(price.max(0.5));
    }
    closes
}

/// Assert two tables are identical, treating NaN as equal to NaN (bit-for-
/// bit recomputation is the contract for idempotent engines).
pub fn assert_tables_equal(a: &MarketTable, b: &MarketTable) {
    use crate::table::Column;

    assert_eq!(a.len(), b.len(), "row count differs");
    assert_eq!(a.bars(), b.bars(), "bars differ");
    let a_names: Vec<&str> = a.column_names().collect();
    let b_names: Vec<&str> = b.column_names().collect();
    assert_eq!(a_names, b_names, "column sets differ");
    for name in a_names {
        match (a.column(name).unwrap(), b.column(name).unwrap()) {
            (Column::Float(x), Column::Float(y)) => {
                for (i, (xv, yv)) in x.iter().zip(y).enumerate() {
                    assert!(
                        xv == yv || (xv.is_nan() && yv.is_nan()),
                        "column {name} differs at row {i}: {xv} vs {yv}"
                    );
                }
            }
            (Column::Category(x), Column::Category(y)) => {
                assert_eq!(x, y, "category column {name} differs");
            }
            _ => panic!("column {name} changed kind"),
        }
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for numeric tests.
pub const DEFAULT_EPSILON: f64 = 1e-10;
