//! Volume features: on-balance volume and price-volume trend.

use crate::rolling::{cumsum_skipna, pct_change};

/// On-Balance Volume: running volume total, added on up-days and
/// subtracted on down-days. Starts at 0.
pub fn obv(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    assert_eq!(closes.len(), volumes.len());
    let mut out = Vec::with_capacity(closes.len());
    let mut total = 0.0;
    for i in 0..closes.len() {
        if i > 0 {
            if closes[i] > closes[i - 1] {
                total += volumes[i];
            } else if closes[i] < closes[i - 1] {
                total -= volumes[i];
            }
        }
        out.push(total);
    }
    out
}

/// Price-Volume Trend: cumulative sum of daily return × volume.
pub fn pvt(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    assert_eq!(closes.len(), volumes.len());
    let r1 = pct_change(closes, 1);
    let contributions: Vec<f64> = r1
        .iter()
        .zip(volumes)
        .map(|(r, v)| if r.is_nan() { f64::NAN } else { r * v })
        .collect();
    cumsum_skipna(&contributions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn obv_accumulates_by_direction() {
        let closes = [100.0, 101.0, 100.0, 100.0];
        let volumes = [10.0, 20.0, 30.0, 40.0];
        let out = obv(&closes, &volumes);
        assert_approx(out[0], 0.0, DEFAULT_EPSILON);
        assert_approx(out[1], 20.0, DEFAULT_EPSILON);
        assert_approx(out[2], -10.0, DEFAULT_EPSILON);
        assert_approx(out[3], -10.0, DEFAULT_EPSILON); // unchanged close
    }

    #[test]
    fn pvt_first_element_nan() {
        let closes = [100.0, 110.0];
        let volumes = [1000.0, 1000.0];
        let out = pvt(&closes, &volumes);
        assert!(out[0].is_nan());
        assert_approx(out[1], 100.0, 1e-9);
    }
}
