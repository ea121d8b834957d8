//! Rolling statistics and normalization primitives.
//!
//! All series functions take `&[f64]` and return a vector of the same
//! length. Windows require a full complement of non-NaN values; positions
//! without one yield NaN (warmup prefix convention). Scalar reductions skip
//! NaN inputs.

/// Mean over non-NaN values. NaN if none.
pub fn mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for &v in values {
        if !v.is_nan() {
            sum += v;
            n += 1;
        }
    }
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Sample standard deviation (ddof = 1) over non-NaN values.
pub fn std_dev(values: &[f64]) -> f64 {
    let clean: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if clean.len() < 2 {
        return f64::NAN;
    }
    let m = clean.iter().sum::<f64>() / clean.len() as f64;
    let ss: f64 = clean.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (clean.len() - 1) as f64).sqrt()
}

/// Quantile with linear interpolation over non-NaN finite values.
/// `q` in [0, 1]. NaN if no valid values.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut clean: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    if clean.is_empty() {
        return f64::NAN;
    }
    clean.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let q = q.clamp(0.0, 1.0);
    let pos = q * (clean.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        clean[lo]
    } else {
        let frac = pos - lo as f64;
        clean[lo] + frac * (clean[hi] - clean[lo])
    }
}

/// Apply `f` to each full non-NaN window; positions without one yield NaN.
pub fn rolling_apply(values: &[f64], window: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    windowed(values, window, f)
}

fn windowed(values: &[f64], window: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    assert!(window >= 1, "window must be >= 1");
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if n < window {
        return out;
    }
    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = f(slice);
    }
    out
}

/// Rolling mean. Full non-NaN window required.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    windowed(values, window, |s| s.iter().sum::<f64>() / s.len() as f64)
}

/// Rolling sum. Full non-NaN window required.
pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    windowed(values, window, |s| s.iter().sum::<f64>())
}

/// Rolling sample standard deviation (ddof = 1).
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    windowed(values, window, |s| {
        let m = s.iter().sum::<f64>() / s.len() as f64;
        let ss: f64 = s.iter().map(|v| (v - m).powi(2)).sum();
        (ss / (s.len() - 1) as f64).sqrt()
    })
}

/// Rolling quantile with linear interpolation.
pub fn rolling_quantile(values: &[f64], window: usize, q: f64) -> Vec<f64> {
    windowed(values, window, |s| quantile(s, q))
}

/// Rolling z-score of the last window element against the window mean/std.
/// Zero-variance windows yield NaN.
pub fn rolling_zscore(values: &[f64], window: usize) -> Vec<f64> {
    windowed(values, window, |s| {
        let m = s.iter().sum::<f64>() / s.len() as f64;
        let ss: f64 = s.iter().map(|v| (v - m).powi(2)).sum();
        let sd = (ss / (s.len() - 1) as f64).sqrt();
        if sd == 0.0 {
            f64::NAN
        } else {
            (s[s.len() - 1] - m) / sd
        }
    })
}

/// Z-score of each element against the full-series mean/std.
pub fn zscore_full(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    let sd = std_dev(values);
    values
        .iter()
        .map(|&v| {
            if v.is_nan() || sd.is_nan() || sd == 0.0 {
                f64::NAN
            } else {
                (v - m) / sd
            }
        })
        .collect()
}

/// Neutral midpoint of the bounded [0, 100] scale.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Normalize a series onto [0, 100] with quantile clipping.
///
/// The scale anchors are the 1st/99th percentiles of the finite values, so a
/// handful of extreme observations cannot flatten the rest of the series.
/// Degenerate input (no finite values, or a flat series) maps everything to
/// the neutral 50.
pub fn normalize_0_100(values: &[f64]) -> Vec<f64> {
    let lo = quantile(values, 0.01);
    let hi = quantile(values, 0.99);
    if lo.is_nan() || hi.is_nan() || hi == lo {
        return vec![NEUTRAL_SCORE; values.len()];
    }
    values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                f64::NAN
            } else {
                ((v - lo) / (hi - lo) * 100.0).clamp(0.0, 100.0)
            }
        })
        .collect()
}

/// Gini coefficient of the absolute values: 0 = evenly spread, →1 = all
/// mass on a single observation.
pub fn gini(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mut abs: Vec<f64> = values.iter().map(|v| v.abs()).collect();
    abs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = abs.len() as f64;
    let total: f64 = abs.iter().sum();
    if total == 0.0 {
        return 0.0;
    }
    let weighted: f64 = abs
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64 + 1.0) * v)
        .sum();
    (2.0 * weighted) / (n * total) - (n + 1.0) / n
}

/// Pearson correlation, skipping pairs where either side is NaN.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "series length mismatch");
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(&x, &y)| (x, y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in pairs {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }
    if vx == 0.0 || vy == 0.0 {
        return f64::NAN;
    }
    cov / (vx.sqrt() * vy.sqrt())
}

/// Rolling Pearson correlation over a full non-NaN window.
pub fn rolling_corr(a: &[f64], b: &[f64], window: usize) -> Vec<f64> {
    assert_eq!(a.len(), b.len(), "series length mismatch");
    assert!(window >= 2, "correlation window must be >= 2");
    let n = a.len();
    let mut out = vec![f64::NAN; n];
    if n < window {
        return out;
    }
    for i in (window - 1)..n {
        let sa = &a[i + 1 - window..=i];
        let sb = &b[i + 1 - window..=i];
        if sa.iter().any(|v| v.is_nan()) || sb.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = pearson(sa, sb);
    }
    out
}

/// Fractional change over `periods` steps: v[i] / v[i-periods] - 1.
pub fn pct_change(values: &[f64], periods: usize) -> Vec<f64> {
    assert!(periods >= 1, "periods must be >= 1");
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    for i in periods..n {
        let prev = values[i - periods];
        let cur = values[i];
        if prev.is_nan() || cur.is_nan() || prev == 0.0 {
            continue;
        }
        out[i] = cur / prev - 1.0;
    }
    out
}

/// Difference over `periods` steps: v[i] - v[i-periods].
pub fn diff(values: &[f64], periods: usize) -> Vec<f64> {
    assert!(periods >= 1, "periods must be >= 1");
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    for i in periods..n {
        out[i] = values[i] - values[i - periods];
    }
    out
}

/// Shift a series forward: the value at index i appears at index i + lag.
/// `lag == 0` is the identity.
pub fn shift(values: &[f64], lag: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    for i in lag..n {
        out[i] = values[i - lag];
    }
    out
}

/// Cumulative sum that skips NaN contributions. NaN inputs stay NaN in the
/// output; the running total continues past them.
pub fn cumsum_skipna(values: &[f64]) -> Vec<f64> {
    let mut total = 0.0;
    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                f64::NAN
            } else {
                total += v;
                total
            }
        })
        .collect()
}

/// Exponentially weighted moving average, span form (alpha = 2/(span+1)),
/// recursive weighting. NaN inputs leave the state untouched and emit NaN.
pub fn ewma(values: &[f64], span: usize) -> Vec<f64> {
    assert!(span >= 1, "span must be >= 1");
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut state: Option<f64> = None;
    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                return f64::NAN;
            }
            let next = match state {
                None => v,
                Some(prev) => alpha * v + (1.0 - alpha) * prev,
            };
            state = Some(next);
            next
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn mean_skips_nan() {
        assert_approx(mean(&[1.0, f64::NAN, 3.0]), 2.0, DEFAULT_EPSILON);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn std_dev_is_sample_std() {
        // [2, 4, 6]: mean 4, ss = 8, ddof=1 variance = 4, std = 2
        assert_approx(std_dev(&[2.0, 4.0, 6.0]), 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_approx(quantile(&v, 0.0), 1.0, DEFAULT_EPSILON);
        assert_approx(quantile(&v, 1.0), 4.0, DEFAULT_EPSILON);
        assert_approx(quantile(&v, 0.5), 2.5, DEFAULT_EPSILON);
        // pos = 0.6 * 3 = 1.8 -> 2 + 0.8 * 1 = 2.8
        assert_approx(quantile(&v, 0.6), 2.8, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_mean_warmup_and_values() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(out[0].is_nan());
        assert_approx(out[1], 1.5, DEFAULT_EPSILON);
        assert_approx(out[3], 3.5, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_mean_nan_window_is_nan() {
        let out = rolling_mean(&[1.0, f64::NAN, 3.0, 4.0], 2);
        assert!(out[1].is_nan());
        assert!(out[2].is_nan());
        assert_approx(out[3], 3.5, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_std_matches_sample_std() {
        let out = rolling_std(&[2.0, 4.0, 6.0, 8.0], 3);
        assert!(out[1].is_nan());
        assert_approx(out[2], 2.0, DEFAULT_EPSILON);
        assert_approx(out[3], 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_quantile_tracks_window() {
        let out = rolling_quantile(&[1.0, 2.0, 3.0, 100.0], 3, 0.5);
        assert_approx(out[2], 2.0, DEFAULT_EPSILON);
        assert_approx(out[3], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn zscore_full_centers_series() {
        let z = zscore_full(&[1.0, 2.0, 3.0]);
        assert_approx(z[1], 0.0, DEFAULT_EPSILON);
        assert!(z[0] < 0.0 && z[2] > 0.0);
    }

    #[test]
    fn normalize_flat_series_is_neutral() {
        let out = normalize_0_100(&[5.0, 5.0, 5.0]);
        assert!(out.iter().all(|&v| v == NEUTRAL_SCORE));
    }

    #[test]
    fn normalize_bounds_and_nan() {
        let mut values = vec![f64::NAN];
        values.extend((0..100).map(|i| i as f64));
        let out = normalize_0_100(&values);
        assert!(out[0].is_nan());
        for &v in &out[1..] {
            assert!((0.0..=100.0).contains(&v));
        }
        assert!(out[1] < out[100]);
    }

    #[test]
    fn gini_extremes() {
        // Even spread -> 0
        assert_approx(gini(&[1.0, 1.0, 1.0, 1.0]), 0.0, DEFAULT_EPSILON);
        // Concentrated -> close to 1 - 1/n
        let concentrated = gini(&[0.0, 0.0, 0.0, 100.0]);
        assert_approx(concentrated, 0.75, 1e-9);
        // Sign-insensitive
        assert_approx(
            gini(&[-1.0, 2.0, -3.0]),
            gini(&[1.0, 2.0, 3.0]),
            DEFAULT_EPSILON,
        );
    }

    #[test]
    fn pearson_perfect_correlation() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        assert_approx(pearson(&a, &b), 1.0, 1e-9);
        let c = [4.0, 3.0, 2.0, 1.0];
        assert_approx(pearson(&a, &c), -1.0, 1e-9);
    }

    #[test]
    fn pct_change_and_diff() {
        let v = [100.0, 110.0, 99.0];
        let pc = pct_change(&v, 1);
        assert!(pc[0].is_nan());
        assert_approx(pc[1], 0.10, 1e-12);
        assert_approx(pc[2], -0.10, 1e-12);

        let d = diff(&v, 2);
        assert!(d[1].is_nan());
        assert_approx(d[2], -1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn shift_moves_values_forward() {
        let out = shift(&[1.0, 2.0, 3.0], 1);
        assert!(out[0].is_nan());
        assert_approx(out[1], 1.0, DEFAULT_EPSILON);
        assert_approx(out[2], 2.0, DEFAULT_EPSILON);
        assert_eq!(shift(&[1.0, 2.0], 0), vec![1.0, 2.0]);
    }

    #[test]
    fn cumsum_continues_past_nan() {
        let out = cumsum_skipna(&[1.0, f64::NAN, 2.0]);
        assert_approx(out[0], 1.0, DEFAULT_EPSILON);
        assert!(out[1].is_nan());
        assert_approx(out[2], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ewma_recursive_form() {
        // span 3 -> alpha 0.5
        let out = ewma(&[2.0, 4.0], 3);
        assert_approx(out[0], 2.0, DEFAULT_EPSILON);
        assert_approx(out[1], 3.0, DEFAULT_EPSILON);
    }
}
