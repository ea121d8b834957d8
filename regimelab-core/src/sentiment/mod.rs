//! Sentiment composite engine.
//!
//! Six normalized sub-indicators combine into one bounded fear/greed index
//! with fixed weights, range buckets, z-score extreme detection and a
//! sentiment-vs-return lag analysis.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::columns;
use crate::regime::REGIME;
use crate::rolling::{
    self, diff, normalize_0_100, pct_change, pearson, rolling_mean, shift, zscore_full,
    NEUTRAL_SCORE,
};
use crate::table::{MarketTable, TableError};

/// Appended column names.
pub const FG_VOLATILITY: &str = "fg_volatility";
pub const FG_MOMENTUM: &str = "fg_momentum";
pub const FG_VOLUME: &str = "fg_volume";
pub const FG_DOMINANCE: &str = "fg_dominance";
pub const FG_SOCIAL: &str = "fg_social";
pub const FG_TRENDS: &str = "fg_trends";
pub const FEAR_GREED_INDEX: &str = "fear_greed_index";
pub const FG_CATEGORY: &str = "fg_category";
pub const FG_ZSCORE: &str = "fg_zscore";
pub const FG_EXTREME: &str = "fg_extreme";
pub const FG_CHANGE_1D: &str = "fg_change_1d";
pub const FG_CHANGE_7D: &str = "fg_change_7d";
pub const FG_CHANGE_30D: &str = "fg_change_30d";
pub const FG_CHANGE_RATE_1D: &str = "fg_change_rate_1d";

/// Range buckets over the composite index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentBucket {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

impl SentimentBucket {
    pub const ALL: [SentimentBucket; 5] = [
        SentimentBucket::ExtremeFear,
        SentimentBucket::Fear,
        SentimentBucket::Neutral,
        SentimentBucket::Greed,
        SentimentBucket::ExtremeGreed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SentimentBucket::ExtremeFear => "Extreme Fear",
            SentimentBucket::Fear => "Fear",
            SentimentBucket::Neutral => "Neutral",
            SentimentBucket::Greed => "Greed",
            SentimentBucket::ExtremeGreed => "Extreme Greed",
        }
    }

    /// Bucket for a composite value. Boundaries 25/45/55/75, each half-open
    /// below (value 25 is Fear, not Extreme Fear). None for NaN.
    pub fn from_value(value: f64) -> Option<SentimentBucket> {
        if value.is_nan() {
            return None;
        }
        Some(if value < 25.0 {
            SentimentBucket::ExtremeFear
        } else if value < 45.0 {
            SentimentBucket::Fear
        } else if value < 55.0 {
            SentimentBucket::Neutral
        } else if value < 75.0 {
            SentimentBucket::Greed
        } else {
            SentimentBucket::ExtremeGreed
        })
    }
}

/// Sub-indicator weights. Must sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FgWeights {
    pub volatility: f64,
    pub momentum: f64,
    pub volume: f64,
    pub dominance: f64,
    pub social: f64,
    pub trends: f64,
}

impl Default for FgWeights {
    fn default() -> Self {
        Self {
            volatility: 0.25,
            momentum: 0.25,
            volume: 0.15,
            dominance: 0.10,
            social: 0.15,
            trends: 0.10,
        }
    }
}

impl FgWeights {
    pub fn sum(&self) -> f64 {
        self.volatility + self.momentum + self.volume + self.dominance + self.social + self.trends
    }
}

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("invalid sentiment config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Engine configuration. The neutral fallback is explicit and injectable so
/// downstream consumers can tell a genuine mid-scale reading from a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    pub weights: FgWeights,
    /// Score used when a sub-indicator's source column is absent.
    pub neutral: f64,
    pub momentum_window: usize,
    pub volume_window: usize,
    pub social_window: usize,
    pub max_lag: usize,
    /// |z| beyond this flags an extreme sentiment event.
    pub extreme_threshold: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            weights: FgWeights::default(),
            neutral: NEUTRAL_SCORE,
            momentum_window: 30,
            volume_window: 30,
            social_window: 7,
            max_lag: 7,
            extreme_threshold: 2.0,
        }
    }
}

impl SentimentConfig {
    pub fn validate(&self) -> Result<(), SentimentError> {
        if (self.weights.sum() - 1.0).abs() > 1e-9 {
            return Err(SentimentError::InvalidConfig(format!(
                "weights sum to {}, expected 1.0",
                self.weights.sum()
            )));
        }
        if self.momentum_window == 0 || self.volume_window == 0 || self.social_window == 0 {
            return Err(SentimentError::InvalidConfig(
                "windows must be >= 1".into(),
            ));
        }
        if self.extreme_threshold <= 0.0 {
            return Err(SentimentError::InvalidConfig(
                "extreme_threshold must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Correlation of the forward-shifted composite against same-day returns.
#[derive(Debug, Clone, Serialize)]
pub struct LagCorrelation {
    pub lag: usize,
    pub correlation: f64,
}

/// Per-regime composite statistics.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentSentiment {
    pub regime: crate::domain::Regime,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// Bucket name → percentage of the segment's days.
    pub bucket_pct: BTreeMap<String, f64>,
}

/// Engine output beyond the augmented table.
#[derive(Debug, Clone, Serialize)]
pub struct SentimentResult {
    /// Sub-indicators that fell back to the neutral default.
    pub defaulted: Vec<String>,
    pub lags: Vec<LagCorrelation>,
    /// Lag with the strongest absolute correlation, when any is defined.
    pub best_lag: Option<LagCorrelation>,
    pub extreme_fear_days: usize,
    pub extreme_greed_days: usize,
    pub segments: Vec<SegmentSentiment>,
}

/// Run the engine.
pub fn process(
    table: &MarketTable,
    config: &SentimentConfig,
) -> Result<(MarketTable, SentimentResult), SentimentError> {
    config.validate()?;
    let mut out = table.clone();
    let n = table.len();
    let mut defaulted = Vec::new();

    let returns = match table.float(columns::RETURN_1D) {
        Some(r) => r.to_vec(),
        None => pct_change(&table.closes(), 1),
    };
    let volumes = table.volumes();

    // 1. Volatility: higher volatility reads as fear, so the score inverts.
    let vol_source = table
        .float(&crate::volatility::realized_vol_col(30))
        .or_else(|| table.float(columns::VOL_30D));
    let fg_volatility: Vec<f64> = match vol_source {
        Some(vol) => normalize_0_100(vol).iter().map(|v| 100.0 - v).collect(),
        None => {
            defaulted.push("volatility".to_string());
            vec![config.neutral; n]
        }
    };

    // 2. Momentum: mean return over the momentum window.
    let fg_momentum = normalize_0_100(&rolling_mean(&returns, config.momentum_window));

    // 3. Volume: volume relative to its rolling average.
    let volume_ma = rolling_mean(&volumes, config.volume_window);
    let volume_ratio: Vec<f64> = volumes
        .iter()
        .zip(&volume_ma)
        .map(|(v, ma)| if *ma == 0.0 { f64::NAN } else { v / ma - 1.0 })
        .collect();
    let fg_volume = normalize_0_100(&volume_ratio);

    // 4. Dominance proxy: the momentum oscillator, already bounded 0-100.
    let fg_dominance: Vec<f64> = match table.float(columns::RSI_14) {
        Some(rsi) => rsi.to_vec(),
        None => {
            defaulted.push("dominance".to_string());
            vec![config.neutral; n]
        }
    };

    // 5. Social proxy: short-horizon mean return.
    let fg_social = normalize_0_100(&rolling_mean(&returns, config.social_window));

    // 6. Trend proxy: volume rate of change.
    let volume_change = match table.float(columns::VOLUME_CHANGE) {
        Some(vc) => vc.to_vec(),
        None => pct_change(&volumes, 1),
    };
    let fg_trends = normalize_0_100(&volume_change);

    let w = &config.weights;
    let composite: Vec<f64> = (0..n)
        .map(|i| {
            fg_volatility[i] * w.volatility
                + fg_momentum[i] * w.momentum
                + fg_volume[i] * w.volume
                + fg_dominance[i] * w.dominance
                + fg_social[i] * w.social
                + fg_trends[i] * w.trends
        })
        .collect();

    let categories: Vec<String> = composite
        .iter()
        .map(|&v| {
            SentimentBucket::from_value(v)
                .map(|b| b.name().to_string())
                .unwrap_or_else(|| "Unknown".to_string())
        })
        .collect();

    // Distribution-based extremes, distinct from the range buckets.
    let z = zscore_full(&composite);
    let extremes: Vec<String> = z
        .iter()
        .map(|&zv| {
            if zv < -config.extreme_threshold {
                "Extreme Fear".to_string()
            } else if zv > config.extreme_threshold {
                "Extreme Greed".to_string()
            } else {
                "Normal".to_string()
            }
        })
        .collect();
    let extreme_fear_days = extremes.iter().filter(|e| *e == "Extreme Fear").count();
    let extreme_greed_days = extremes.iter().filter(|e| *e == "Extreme Greed").count();

    // Lag analysis: does sentiment lead returns?
    let lags: Vec<LagCorrelation> = (0..=config.max_lag)
        .map(|lag| LagCorrelation {
            lag,
            correlation: pearson(&shift(&composite, lag), &returns),
        })
        .collect();
    let best_lag = lags
        .iter()
        .filter(|l| !l.correlation.is_nan())
        .max_by(|a, b| {
            a.correlation
                .abs()
                .partial_cmp(&b.correlation.abs())
                .unwrap()
        })
        .cloned();

    out.set_float(FG_VOLATILITY, fg_volatility)?;
    out.set_float(FG_MOMENTUM, fg_momentum)?;
    out.set_float(FG_VOLUME, fg_volume)?;
    out.set_float(FG_DOMINANCE, fg_dominance)?;
    out.set_float(FG_SOCIAL, fg_social)?;
    out.set_float(FG_TRENDS, fg_trends)?;
    out.set_float(FG_CHANGE_1D, diff(&composite, 1))?;
    out.set_float(FG_CHANGE_7D, diff(&composite, 7))?;
    out.set_float(FG_CHANGE_30D, diff(&composite, 30))?;
    out.set_float(FG_CHANGE_RATE_1D, scaled_pct_change(&composite))?;
    out.set_float(FG_ZSCORE, z)?;
    out.set_category(FG_EXTREME, extremes)?;
    out.set_float(FEAR_GREED_INDEX, composite)?;
    out.set_category(FG_CATEGORY, categories)?;

    let segments = segment_stats(&out);
    if !defaulted.is_empty() {
        tracing::warn!(?defaulted, "sentiment sub-indicators fell back to neutral");
    }

    Ok((
        out,
        SentimentResult {
            defaulted,
            lags,
            best_lag,
            extreme_fear_days,
            extreme_greed_days,
            segments,
        },
    ))
}

fn scaled_pct_change(values: &[f64]) -> Vec<f64> {
    pct_change(values, 1)
        .into_iter()
        .map(|v| v * 100.0)
        .collect()
}

fn segment_stats(table: &MarketTable) -> Vec<SegmentSentiment> {
    let Some(groups) = crate::segment::regime_rows(table, REGIME) else {
        return Vec::new();
    };
    let Some(fg) = table.float(FEAR_GREED_INDEX) else {
        return Vec::new();
    };
    let categories = table.category(FG_CATEGORY);
    groups
        .into_iter()
        .map(|(regime, rows)| {
            let values = crate::segment::select(fg, &rows);
            let clean: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
            let mut bucket_pct = BTreeMap::new();
            if let Some(cats) = categories {
                for bucket in SentimentBucket::ALL {
                    let count = rows
                        .iter()
                        .filter(|&&i| cats[i] == bucket.name())
                        .count();
                    bucket_pct.insert(
                        bucket.name().to_string(),
                        count as f64 / rows.len() as f64 * 100.0,
                    );
                }
            }
            SegmentSentiment {
                regime,
                count: rows.len(),
                mean: rolling::mean(&values),
                std: rolling::std_dev(&values),
                min: clean.iter().copied().fold(f64::NAN, f64::min),
                max: clean.iter().copied().fold(f64::NAN, f64::max),
                bucket_pct,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::derive_features;
    use crate::testutil::{make_table, random_walk};
    use proptest::prelude::*;

    fn processed_table(n: usize) -> MarketTable {
        derive_features(&make_table(&random_walk(n, 100.0, 13))).unwrap()
    }

    #[test]
    fn default_weights_sum_to_one() {
        assert!((FgWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_weights_are_rejected() {
        let mut config = SentimentConfig::default();
        config.weights.volatility = 0.5; // sum now 1.25
        let table = processed_table(60);
        assert!(matches!(
            process(&table, &config),
            Err(SentimentError::InvalidConfig(_))
        ));
    }

    #[test]
    fn composite_stays_in_bounds() {
        let table = processed_table(120);
        let (out, _) = process(&table, &SentimentConfig::default()).unwrap();
        for &v in out.float(FEAR_GREED_INDEX).unwrap() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v), "composite out of bounds: {v}");
            }
        }
    }

    #[test]
    fn bucket_boundaries_are_half_open_below() {
        assert_eq!(
            SentimentBucket::from_value(24.999),
            Some(SentimentBucket::ExtremeFear)
        );
        assert_eq!(SentimentBucket::from_value(25.0), Some(SentimentBucket::Fear));
        assert_eq!(SentimentBucket::from_value(45.0), Some(SentimentBucket::Neutral));
        assert_eq!(SentimentBucket::from_value(55.0), Some(SentimentBucket::Greed));
        assert_eq!(
            SentimentBucket::from_value(75.0),
            Some(SentimentBucket::ExtremeGreed)
        );
        assert_eq!(
            SentimentBucket::from_value(100.0),
            Some(SentimentBucket::ExtremeGreed)
        );
        assert_eq!(SentimentBucket::from_value(f64::NAN), None);
    }

    proptest! {
        #[test]
        fn every_value_maps_to_exactly_one_bucket(v in 0.0f64..=100.0) {
            let bucket = SentimentBucket::from_value(v).unwrap();
            let matches = SentimentBucket::ALL
                .iter()
                .filter(|b| **b == bucket)
                .count();
            prop_assert_eq!(matches, 1);
        }
    }

    #[test]
    fn missing_feature_columns_surface_as_defaulted() {
        // Raw table, no derived features: volatility and dominance default.
        let table = make_table(&random_walk(60, 100.0, 3));
        let (out, result) = process(&table, &SentimentConfig::default()).unwrap();
        assert!(result.defaulted.contains(&"volatility".to_string()));
        assert!(result.defaulted.contains(&"dominance".to_string()));
        assert!(out
            .float(FG_DOMINANCE)
            .unwrap()
            .iter()
            .all(|&v| v == NEUTRAL_SCORE));
    }

    #[test]
    fn fully_featured_table_defaults_nothing() {
        let table = processed_table(120);
        let (_, result) = process(&table, &SentimentConfig::default()).unwrap();
        assert!(result.defaulted.is_empty());
    }

    #[test]
    fn lag_analysis_covers_all_lags() {
        let table = processed_table(150);
        let (_, result) = process(&table, &SentimentConfig::default()).unwrap();
        assert_eq!(result.lags.len(), 8);
        assert_eq!(result.lags[0].lag, 0);
        assert!(result.best_lag.is_some());
    }

    #[test]
    fn extremes_use_distribution_not_range() {
        let table = processed_table(150);
        let (out, result) = process(&table, &SentimentConfig::default()).unwrap();
        let z = out.float(FG_ZSCORE).unwrap();
        let flagged = z.iter().filter(|&&zv| zv.abs() > 2.0).count();
        assert_eq!(
            flagged,
            result.extreme_fear_days + result.extreme_greed_days
        );
    }

    #[test]
    fn process_is_idempotent() {
        let table = processed_table(100);
        let config = SentimentConfig::default();
        let (once, _) = process(&table, &config).unwrap();
        let (twice, _) = process(&once, &config).unwrap();
        crate::testutil::assert_tables_equal(&once, &twice);
    }

    #[test]
    fn segment_stats_report_bucket_distribution() {
        let mut table = processed_table(80);
        let labels: Vec<String> = (0..80)
            .map(|i| {
                if i % 2 == 0 {
                    "Trending".to_string()
                } else {
                    "Panic".to_string()
                }
            })
            .collect();
        table.set_category(REGIME, labels).unwrap();
        let (_, result) = process(&table, &SentimentConfig::default()).unwrap();
        assert_eq!(result.segments.len(), 2);
        for segment in &result.segments {
            let total: f64 = segment.bucket_pct.values().sum();
            assert!(total <= 100.0 + 1e-9);
        }
    }
}
