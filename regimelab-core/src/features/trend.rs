//! Trend features: moving averages, MACD, moving-average spread.

use crate::rolling::{ewma, rolling_mean};

/// Simple moving average.
pub fn sma(closes: &[f64], window: usize) -> Vec<f64> {
    rolling_mean(closes, window)
}

/// Exponential moving average, span form.
pub fn ema(closes: &[f64], span: usize) -> Vec<f64> {
    ewma(closes, span)
}

/// MACD output series.
#[derive(Debug, Clone)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// MACD: fast EMA minus slow EMA, an EMA signal line, and the histogram.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_span: usize) -> Macd {
    let fast_ema = ewma(closes, fast);
    let slow_ema = ewma(closes, slow);
    let macd: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ewma(&macd, signal_span);
    let histogram: Vec<f64> = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();
    Macd {
        macd,
        signal,
        histogram,
    }
}

/// Short/long SMA spread normalized by price: (sma_short - sma_long) / close.
/// Positive when the short average rides above the long one.
pub fn ma_spread(sma_short: &[f64], sma_long: &[f64], closes: &[f64]) -> Vec<f64> {
    sma_short
        .iter()
        .zip(sma_long)
        .zip(closes)
        .map(|((s, l), c)| {
            if s.is_nan() || l.is_nan() || *c == 0.0 {
                f64::NAN
            } else {
                (s - l) / c
            }
        })
        .collect()
}
