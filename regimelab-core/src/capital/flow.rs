//! Money-flow series: typical price, signed flow, cumulative flow and the
//! flow-strength oscillator.

use crate::domain::Bar;
use crate::rolling::{cumsum_skipna, diff, rolling_sum};

const EPS: f64 = 1e-10;

/// Typical price per bar: mean of high, low, close.
pub fn typical_prices(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(Bar::typical_price).collect()
}

/// Money flow per bar: typical price × volume.
pub fn money_flow(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.typical_price() * b.volume).collect()
}

/// Money flow signed by the direction of the typical-price change.
/// The first bar has no direction and yields NaN.
pub fn signed_flow(typical: &[f64], flow: &[f64]) -> Vec<f64> {
    let dtp = diff(typical, 1);
    flow.iter()
        .zip(&dtp)
        .map(|(f, d)| {
            if d.is_nan() {
                f64::NAN
            } else if *d > 0.0 {
                *f
            } else {
                -f
            }
        })
        .collect()
}

/// Cumulative signed flow: net directional capital movement to date.
pub fn cumulative_flow(signed: &[f64]) -> Vec<f64> {
    cumsum_skipna(signed)
}

/// Rolling sums of positive and negative flow over `window` days.
/// Directionless days (including the first) contribute zero.
pub fn directional_sums(typical: &[f64], flow: &[f64], window: usize) -> (Vec<f64>, Vec<f64>) {
    let dtp = diff(typical, 1);
    let positive: Vec<f64> = flow
        .iter()
        .zip(&dtp)
        .map(|(f, d)| if *d > 0.0 { *f } else { 0.0 })
        .collect();
    let negative: Vec<f64> = flow
        .iter()
        .zip(&dtp)
        .map(|(f, d)| if *d < 0.0 { *f } else { 0.0 })
        .collect();
    (
        rolling_sum(&positive, window),
        rolling_sum(&negative, window),
    )
}

/// Flow-strength oscillator on [0, 100]: ratio of summed positive to summed
/// negative flow, money-flow-index construction.
pub fn flow_strength_index(positive: &[f64], negative: &[f64]) -> Vec<f64> {
    positive
        .iter()
        .zip(negative)
        .map(|(p, n)| {
            if p.is_nan() || n.is_nan() {
                f64::NAN
            } else {
                let ratio = p / (n + EPS);
                100.0 - 100.0 / (1.0 + ratio)
            }
        })
        .collect()
}

/// Net flow: positive minus negative rolling sums.
pub fn net_flow(positive: &[f64], negative: &[f64]) -> Vec<f64> {
    positive
        .iter()
        .zip(negative)
        .map(|(p, n)| p - n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_approx, make_bars_with_volume};

    #[test]
    fn signed_flow_follows_typical_price_direction() {
        let bars = make_bars_with_volume(&[100.0, 105.0, 95.0], &[10.0, 10.0, 10.0]);
        let tp = typical_prices(&bars);
        let mf = money_flow(&bars);
        let signed = signed_flow(&tp, &mf);
        assert!(signed[0].is_nan());
        assert!(signed[1] > 0.0); // up day
        assert!(signed[2] < 0.0); // down day
    }

    #[test]
    fn cumulative_flow_accumulates() {
        let signed = [f64::NAN, 10.0, -4.0];
        let cum = cumulative_flow(&signed);
        assert!(cum[0].is_nan());
        assert_approx(cum[1], 10.0, 1e-12);
        assert_approx(cum[2], 6.0, 1e-12);
    }

    #[test]
    fn flow_strength_index_bounds() {
        // All positive flow -> near 100; all negative -> near 0.
        let all_up = flow_strength_index(&[1000.0], &[0.0]);
        assert!(all_up[0] > 99.0);
        let all_down = flow_strength_index(&[0.0], &[1000.0]);
        assert!(all_down[0] < 1.0);
        let balanced = flow_strength_index(&[500.0], &[500.0]);
        assert_approx(balanced[0], 50.0, 1e-6);
    }

    #[test]
    fn directional_sums_warm_up_after_window() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + (i % 3) as f64).collect();
        let volumes = vec![1000.0; 20];
        let bars = make_bars_with_volume(&closes, &volumes);
        let tp = typical_prices(&bars);
        let mf = money_flow(&bars);
        let (pos, neg) = directional_sums(&tp, &mf, 14);
        assert!(pos[12].is_nan());
        assert!(!pos[13].is_nan());
        assert!(!neg[13].is_nan());
        assert!(pos[13] >= 0.0 && neg[13] >= 0.0);
    }
}
