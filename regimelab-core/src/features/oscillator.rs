//! Relative Strength Index (RSI).
//!
//! Rolling-mean form: average gain / average loss over a plain rolling
//! window (not Wilder smoothing). RSI = 100 - 100 / (1 + avg_gain/avg_loss).
//! Edge cases: avg_loss == 0 → 100; avg_gain == 0 → 0; no movement → 50.

pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "RSI period must be >= 1");
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if n < period + 1 {
        return result;
    }

    let mut changes = vec![f64::NAN; n];
    for i in 1..n {
        if !closes[i].is_nan() && !closes[i - 1].is_nan() {
            changes[i] = closes[i] - closes[i - 1];
        }
    }

    for i in period..n {
        let window = &changes[i + 1 - period..=i];
        if window.iter().any(|c| c.is_nan()) {
            continue;
        }
        let avg_gain: f64 =
            window.iter().filter(|&&c| c > 0.0).sum::<f64>() / period as f64;
        let avg_loss: f64 =
            -window.iter().filter(|&&c| c < 0.0).sum::<f64>() / period as f64;
        result[i] = rsi_value(avg_gain, avg_loss);
    }

    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
