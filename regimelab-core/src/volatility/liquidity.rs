//! Liquidity metrics: turnover, Amihud illiquidity, relative spread,
//! volume volatility and a simplified price-impact ratio.

use crate::domain::Bar;
use crate::rolling::{pct_change, rolling_std};

const EPS: f64 = 1e-10;

/// Dollar turnover: volume × close.
pub fn turnover(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.volume * b.close).collect()
}

/// Amihud illiquidity: |return| / turnover. Higher = a dollar moves the
/// price more.
pub fn amihud_illiquidity(returns: &[f64], turnover: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .zip(turnover)
        .map(|(r, t)| {
            if r.is_nan() {
                f64::NAN
            } else {
                let v = r.abs() / (t + EPS);
                if v.is_finite() {
                    v
                } else {
                    f64::NAN
                }
            }
        })
        .collect()
}

/// Intraday relative spread: (high - low) / close.
pub fn relative_spread(bars: &[Bar]) -> Vec<f64> {
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

/// Rolling std of daily volume changes.
pub fn volume_volatility(volumes: &[f64], window: usize) -> Vec<f64> {
    rolling_std(&pct_change(volumes, 1), window)
}

/// Simplified price impact: |price change| / |volume change|.
pub fn price_impact(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    let dp = pct_change(closes, 1);
    let dv = pct_change(volumes, 1);
    dp.iter()
        .zip(&dv)
        .map(|(p, v)| {
            if p.is_nan() || v.is_nan() {
                f64::NAN
            } else {
                let out = p.abs() / (v.abs() + EPS);
                if out.is_finite() {
                    out
                } else {
                    f64::NAN
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_approx, make_bars_with_volume};

    #[test]
    fn turnover_is_volume_times_close() {
        let bars = make_bars_with_volume(&[100.0, 110.0], &[10.0, 20.0]);
        let t = turnover(&bars);
        assert_approx(t[0], 1000.0, 1e-9);
        assert_approx(t[1], 2200.0, 1e-9);
    }

    #[test]
    fn amihud_higher_when_turnover_lower() {
        let returns = [f64::NAN, 0.01, 0.01];
        let turnover = [1000.0, 1_000_000.0, 1000.0];
        let a = amihud_illiquidity(&returns, &turnover);
        assert!(a[0].is_nan());
        assert!(a[2] > a[1]);
    }

    #[test]
    fn volume_volatility_warms_up() {
        let volumes: Vec<f64> = (1..=40).map(|i| i as f64 * 100.0).collect();
        let vv = volume_volatility(&volumes, 30);
        assert!(vv[29].is_nan()); // first change is NaN, so window 30 completes at 30
        assert!(!vv[30].is_nan());
    }

    #[test]
    fn price_impact_scales_with_price_move() {
        let closes = [100.0, 101.0, 104.0];
        let volumes = [1000.0, 1100.0, 1210.0];
        let pi = price_impact(&closes, &volumes);
        assert!(pi[2] > pi[1]);
    }
}
