//! Flow anomaly detection: rolling z-score of net flow.

/// Anomaly labels.
pub const LARGE_INFLOW: &str = "Large Inflow";
pub const LARGE_OUTFLOW: &str = "Large Outflow";
pub const NORMAL: &str = "Normal";

/// Minimum valid observations before a z-score is produced. The net-flow
/// series starts with a NaN warmup, so a strict full-window requirement
/// would leave short samples with no z-scores at all.
pub const MIN_OBSERVATIONS: usize = 30;

const EPS: f64 = 1e-10;

/// Trailing-window z-score of net flow.
///
/// The window is the last `window` values; NaN entries are skipped and a
/// z-score appears once `MIN_OBSERVATIONS` (capped at the window size)
/// valid values have accumulated.
pub fn zscores(net_flow: &[f64], window: usize) -> Vec<f64> {
    let min_obs = MIN_OBSERVATIONS.min(window);
    let n = net_flow.len();
    let mut out = vec![f64::NAN; n];
    for i in 0..n {
        let x = net_flow[i];
        if x.is_nan() {
            continue;
        }
        let start = (i + 1).saturating_sub(window);
        let valid: Vec<f64> = net_flow[start..=i]
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect();
        if valid.len() < min_obs {
            continue;
        }
        let m = valid.iter().sum::<f64>() / valid.len() as f64;
        let var = valid.iter().map(|v| (v - m).powi(2)).sum::<f64>()
            / (valid.len() - 1) as f64;
        out[i] = (x - m) / (var.sqrt() + EPS);
    }
    out
}

/// Label each day by its z-score against ±threshold. NaN (warmup) is Normal.
pub fn labels(zscores: &[f64], threshold: f64) -> Vec<String> {
    zscores
        .iter()
        .map(|&z| {
            if z < -threshold {
                LARGE_OUTFLOW.to_string()
            } else if z > threshold {
                LARGE_INFLOW.to_string()
            } else {
                NORMAL.to_string()
            }
        })
        .collect()
}
