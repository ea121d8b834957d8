//! Bollinger bands.
//!
//! Middle = SMA(window), upper/lower = middle ± num_std · rolling std,
//! width = (upper - lower) / middle, %B = (close - lower) / (upper - lower).

use crate::rolling::{rolling_mean, rolling_std};

#[derive(Debug, Clone)]
pub struct Bollinger {
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    pub width: Vec<f64>,
    pub percent_b: Vec<f64>,
}

pub fn bollinger(closes: &[f64], window: usize, num_std: f64) -> Bollinger {
    let middle = rolling_mean(closes, window);
    let sd = rolling_std(closes, window);
    let n = closes.len();

    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];
    let mut width = vec![f64::NAN; n];
    let mut percent_b = vec![f64::NAN; n];

    for i in 0..n {
        if middle[i].is_nan() || sd[i].is_nan() {
            continue;
        }
        upper[i] = middle[i] + num_std * sd[i];
        lower[i] = middle[i] - num_std * sd[i];
        if middle[i] != 0.0 {
            width[i] = (upper[i] - lower[i]) / middle[i];
        }
        let band = upper[i] - lower[i];
        if band != 0.0 {
            percent_b[i] = (closes[i] - lower[i]) / band;
        }
    }

    Bollinger {
        middle,
        upper,
        lower,
        width,
        percent_b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn bands_bracket_the_mean() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 5) as f64).collect();
        let bb = bollinger(&closes, 20, 2.0);
        for i in 19..30 {
            assert!(bb.upper[i] > bb.middle[i]);
            assert!(bb.lower[i] < bb.middle[i]);
            assert!(bb.width[i] > 0.0);
        }
    }

    #[test]
    fn warmup_is_nan() {
        let closes = vec![100.0; 25];
        let bb = bollinger(&closes, 20, 2.0);
        assert!(bb.middle[18].is_nan());
        assert!(!bb.middle[19].is_nan());
    }

    #[test]
    fn flat_series_has_zero_width() {
        let closes = vec![100.0; 25];
        let bb = bollinger(&closes, 20, 2.0);
        assert_approx(bb.width[20], 0.0, DEFAULT_EPSILON);
        // zero band -> %B undefined
        assert!(bb.percent_b[20].is_nan());
    }

    #[test]
    fn percent_b_centered_for_mean_reverting_close() {
        // Close equal to the middle of the band -> %B = 0.5
        let mut closes: Vec<f64> = Vec::new();
        for i in 0..40 {
            closes.push(if i % 2 == 0 { 99.0 } else { 101.0 });
        }
        let bb = bollinger(&closes, 20, 2.0);
        let i = 39;
        let expected = (closes[i] - bb.lower[i]) / (bb.upper[i] - bb.lower[i]);
        assert_approx(bb.percent_b[i], expected, DEFAULT_EPSILON);
    }
}
