//! Volatility engine: realized/range estimators, GARCH forecast, cone,
//! liquidity metrics and per-regime segment statistics.

pub mod cone;
pub mod garch;
pub mod liquidity;
pub mod realized;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::columns;
use crate::regime::REGIME;
use crate::rolling;
use crate::table::{MarketTable, TableError};

pub use cone::ConeRow;
pub use garch::{Garch11, GarchError};
pub use realized::TRADING_DAYS;

/// Appended column names.
pub const GARCH_COND_VOL: &str = "garch_cond_vol";
pub const TURNOVER: &str = "turnover";
pub const AMIHUD: &str = "amihud_illiquidity";
pub const RELATIVE_SPREAD: &str = "relative_spread";
pub const VOLUME_VOLATILITY: &str = "volume_volatility";
pub const PRICE_IMPACT: &str = "price_impact";

pub fn realized_vol_col(window: usize) -> String {
    format!("realized_vol_{window}d")
}

pub fn parkinson_col(window: usize) -> String {
    format!("parkinson_vol_{window}d")
}

pub fn garman_klass_col(window: usize) -> String {
    format!("gk_vol_{window}d")
}

#[derive(Debug, Error)]
pub enum VolatilityError {
    #[error("invalid volatility config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatilityConfig {
    /// Realized-volatility look-back windows.
    pub windows: Vec<usize>,
    /// Window for the range-based estimators.
    pub range_window: usize,
    /// Cone look-back windows.
    pub cone_windows: Vec<usize>,
    /// GARCH forecast horizon in days.
    pub garch_horizon: usize,
    /// Window whose realized volatility feeds segment statistics.
    pub segment_window: usize,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            windows: vec![7, 14, 30, 60, 90],
            range_window: 30,
            cone_windows: vec![7, 14, 30, 60, 90, 180],
            garch_horizon: 30,
            segment_window: 7,
        }
    }
}

impl VolatilityConfig {
    pub fn validate(&self) -> Result<(), VolatilityError> {
        if self.windows.is_empty() {
            return Err(VolatilityError::InvalidConfig(
                "windows must not be empty".into(),
            ));
        }
        if self.windows.iter().any(|&w| w < 2)
            || self.range_window < 2
            || self.cone_windows.iter().any(|&w| w < 2)
        {
            return Err(VolatilityError::InvalidConfig(
                "volatility windows must be >= 2".into(),
            ));
        }
        if self.garch_horizon == 0 {
            return Err(VolatilityError::InvalidConfig(
                "garch_horizon must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// GARCH fit summary carried in the result.
#[derive(Debug, Clone, Serialize)]
pub struct GarchSummary {
    pub omega: f64,
    pub alpha: f64,
    pub beta: f64,
    pub aic: f64,
    pub log_likelihood: f64,
    pub n_obs: usize,
}

/// Annualized N-day-ahead volatility forecast.
#[derive(Debug, Clone, Serialize)]
pub struct VolForecast {
    pub horizon: usize,
    /// σ per day ahead, annualized fraction.
    pub annualized: Vec<f64>,
}

/// Per-regime volatility statistics.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentVolatility {
    pub regime: crate::domain::Regime,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub mean_illiquidity: f64,
    pub mean_spread: f64,
}

/// Engine output beyond the augmented table.
#[derive(Debug, Clone, Serialize)]
pub struct VolatilityResult {
    pub cone: Vec<ConeRow>,
    pub garch: Option<GarchSummary>,
    /// Present when the GARCH fit failed; the rest of the analysis stands.
    pub garch_error: Option<String>,
    pub forecast: Option<VolForecast>,
    pub segments: Vec<SegmentVolatility>,
}

/// Run the engine: append volatility and liquidity columns, fit the
/// conditional-variance model, build the cone and segment statistics.
pub fn process(
    table: &MarketTable,
    config: &VolatilityConfig,
) -> Result<(MarketTable, VolatilityResult), VolatilityError> {
    config.validate()?;
    let mut out = table.clone();

    let returns = match table.float(columns::RETURN_1D) {
        Some(r) => r.to_vec(),
        None => rolling::pct_change(&table.closes(), 1),
    };

    for &window in &config.windows {
        out.set_float(
            realized_vol_col(window),
            realized::realized_volatility(&returns, window),
        )?;
    }
    out.set_float(
        parkinson_col(config.range_window),
        realized::parkinson_volatility(table.bars(), config.range_window),
    )?;
    out.set_float(
        garman_klass_col(config.range_window),
        realized::garman_klass_volatility(table.bars(), config.range_window),
    )?;

    // Liquidity
    let turnover = liquidity::turnover(table.bars());
    out.set_float(AMIHUD, liquidity::amihud_illiquidity(&returns, &turnover))?;
    out.set_float(TURNOVER, turnover)?;
    out.set_float(RELATIVE_SPREAD, liquidity::relative_spread(table.bars()))?;
    let volumes = table.volumes();
    out.set_float(
        VOLUME_VOLATILITY,
        liquidity::volume_volatility(&volumes, config.range_window),
    )?;
    out.set_float(
        PRICE_IMPACT,
        liquidity::price_impact(&table.closes(), &volumes),
    )?;

    // GARCH on percentage returns. A failed fit is reported, not fatal.
    let returns_pct: Vec<f64> = returns.iter().map(|r| r * 100.0).collect();
    let (garch_summary, garch_error, forecast) = match Garch11::fit(&returns_pct) {
        Ok(model) => {
            let cond: Vec<f64> = model
                .conditional_volatility(&returns_pct)
                .into_iter()
                .map(|s| s / 100.0 * TRADING_DAYS.sqrt())
                .collect();
            out.set_float(GARCH_COND_VOL, cond)?;
            let annualized: Vec<f64> = model
                .forecast(config.garch_horizon)
                .into_iter()
                .map(|s| s / 100.0 * TRADING_DAYS.sqrt())
                .collect();
            let summary = GarchSummary {
                omega: model.omega,
                alpha: model.alpha,
                beta: model.beta,
                aic: model.aic,
                log_likelihood: model.log_likelihood,
                n_obs: model.n_obs,
            };
            (
                Some(summary),
                None,
                Some(VolForecast {
                    horizon: config.garch_horizon,
                    annualized,
                }),
            )
        }
        Err(err) => {
            tracing::warn!(error = %err, "GARCH fit failed; continuing without forecast");
            (None, Some(err.to_string()), None)
        }
    };

    let cone = cone::volatility_cone(&returns, &config.cone_windows);
    let segments = segment_stats(&out, config.segment_window);

    Ok((
        out,
        VolatilityResult {
            cone,
            garch: garch_summary,
            garch_error,
            forecast,
            segments,
        },
    ))
}

fn segment_stats(table: &MarketTable, segment_window: usize) -> Vec<SegmentVolatility> {
    let Some(groups) = crate::segment::regime_rows(table, REGIME) else {
        return Vec::new();
    };
    let vol_col = realized_vol_col(segment_window);
    let Some(vol) = table.float(&vol_col) else {
        return Vec::new();
    };
    let illiq = table.float(AMIHUD);
    let spread = table.float(RELATIVE_SPREAD);
    groups
        .into_iter()
        .map(|(regime, rows)| {
            let values = crate::segment::select(vol, &rows);
            let clean: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
            SegmentVolatility {
                regime,
                count: rows.len(),
                mean: rolling::mean(&values),
                std: rolling::std_dev(&values),
                min: clean.iter().copied().fold(f64::NAN, f64::min),
                max: clean.iter().copied().fold(f64::NAN, f64::max),
                mean_illiquidity: illiq
                    .map_or(f64::NAN, |s| rolling::mean(&crate::segment::select(s, &rows))),
                mean_spread: spread
                    .map_or(f64::NAN, |s| rolling::mean(&crate::segment::select(s, &rows))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::derive_features;
    use crate::testutil::{make_table, random_walk};

    fn processed_table(n: usize) -> MarketTable {
        derive_features(&make_table(&random_walk(n, 100.0, 5))).unwrap()
    }

    #[test]
    fn process_appends_estimator_columns() {
        let table = processed_table(120);
        let (out, result) = process(&table, &VolatilityConfig::default()).unwrap();
        for window in [7, 14, 30, 60, 90] {
            assert!(out.has_column(&realized_vol_col(window)));
        }
        assert!(out.has_column(&parkinson_col(30)));
        assert!(out.has_column(&garman_klass_col(30)));
        assert!(out.has_column(TURNOVER));
        assert!(out.has_column(AMIHUD));
        assert_eq!(result.cone.len(), 6);
    }

    #[test]
    fn garch_fit_succeeds_on_long_series() {
        let table = processed_table(250);
        let (out, result) = process(&table, &VolatilityConfig::default()).unwrap();
        assert!(result.garch.is_some(), "garch error: {:?}", result.garch_error);
        assert!(out.has_column(GARCH_COND_VOL));
        let forecast = result.forecast.unwrap();
        assert_eq!(forecast.annualized.len(), 30);
        assert!(forecast.annualized.iter().all(|v| *v > 0.0));
    }

    #[test]
    fn garch_failure_is_reported_not_fatal() {
        // 20 rows cannot support a GARCH fit.
        let table = processed_table(20);
        let (out, result) = process(&table, &VolatilityConfig::default()).unwrap();
        assert!(result.garch.is_none());
        assert!(result.garch_error.is_some());
        assert!(result.forecast.is_none());
        assert!(!out.has_column(GARCH_COND_VOL));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let table = processed_table(60);
        let bad = VolatilityConfig {
            windows: vec![],
            ..VolatilityConfig::default()
        };
        assert!(matches!(
            process(&table, &bad),
            Err(VolatilityError::InvalidConfig(_))
        ));
    }

    #[test]
    fn process_is_idempotent() {
        let table = processed_table(150);
        let config = VolatilityConfig::default();
        let (once, _) = process(&table, &config).unwrap();
        let (twice, _) = process(&once, &config).unwrap();
        crate::testutil::assert_tables_equal(&once, &twice);
    }

    #[test]
    fn segment_stats_appear_with_regime_labels() {
        let table = processed_table(100);
        let mut labeled = table.clone();
        let labels: Vec<String> = (0..labeled.len())
            .map(|i| {
                if i < 50 {
                    "Consolidation".to_string()
                } else {
                    "Trending".to_string()
                }
            })
            .collect();
        labeled.set_category(REGIME, labels).unwrap();
        let (_, result) = process(&labeled, &VolatilityConfig::default()).unwrap();
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[0].count, 50);
    }

    #[test]
    fn no_regime_column_means_no_segments() {
        let table = processed_table(100);
        let (_, result) = process(&table, &VolatilityConfig::default()).unwrap();
        assert!(result.segments.is_empty());
    }
}
