//! Capital-flow engine: money flow, whale detection, concentration,
//! behavior classification, anomaly flags and per-regime statistics.

pub mod anomaly;
pub mod behavior;
pub mod concentration;
pub mod flow;
pub mod whale;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::columns;
use crate::regime::REGIME;
use crate::rolling::{self, pct_change, pearson, rolling_corr, rolling_mean};
use crate::table::{MarketTable, TableError};

pub use behavior::{Behavior, BehaviorThresholds};

/// Appended column names.
pub const TYPICAL_PRICE: &str = "typical_price";
pub const MONEY_FLOW: &str = "money_flow";
pub const SIGNED_FLOW: &str = "signed_flow";
pub const CUM_FLOW: &str = "cum_flow";
pub const MFI: &str = "mfi";
pub const NET_FLOW: &str = "net_flow";
pub const WHALE_FLAG: &str = "whale_flag";
pub const WHALE_INTENSITY: &str = "whale_intensity";
pub const WHALE_FREQ: &str = "whale_freq";
pub const WHALE_TREND: &str = "whale_trend";
pub const FLOW_GINI: &str = "flow_gini";
pub const TOP20_SHARE: &str = "top20_share";
pub const FLOW_DISPERSION: &str = "flow_dispersion";
pub const BEHAVIOR: &str = "behavior";
pub const BEHAVIOR_LOCAL: &str = "behavior_local";
pub const CAPITAL_ZSCORE: &str = "capital_zscore";
pub const FLOW_ANOMALY: &str = "flow_anomaly";
pub const FLOW_RETURN_CORR: &str = "flow_return_corr";

const EPS: f64 = 1e-10;

#[derive(Debug, Error)]
pub enum CapitalError {
    #[error("invalid capital config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalConfig {
    /// Window for the flow-strength oscillator and net flow.
    pub mfi_window: usize,
    /// Rolling window for the dynamic whale threshold.
    pub whale_window: usize,
    /// Volume quantile defining whale activity.
    pub whale_quantile: f64,
    /// Window for whale frequency and its week-over-week trend.
    pub whale_freq_window: usize,
    /// Window for the concentration measures.
    pub concentration_window: usize,
    /// Volume-average window for behavior classification.
    pub behavior_volume_window: usize,
    pub behavior: BehaviorThresholds,
    /// Window for the net-flow anomaly z-score.
    pub anomaly_window: usize,
    /// |z| beyond this flags a Large Inflow/Outflow.
    pub anomaly_threshold: f64,
    /// Window for the rolling flow-return correlation.
    pub corr_window: usize,
}

impl Default for CapitalConfig {
    fn default() -> Self {
        Self {
            mfi_window: 14,
            whale_window: 90,
            whale_quantile: 0.95,
            whale_freq_window: 7,
            concentration_window: 30,
            behavior_volume_window: 20,
            behavior: BehaviorThresholds::default(),
            anomaly_window: 90,
            anomaly_threshold: 2.5,
            corr_window: 30,
        }
    }
}

impl CapitalConfig {
    pub fn validate(&self) -> Result<(), CapitalError> {
        if self.mfi_window < 2
            || self.whale_window < 2
            || self.whale_freq_window < 1
            || self.concentration_window < 2
            || self.behavior_volume_window < 2
            || self.anomaly_window < 2
            || self.corr_window < 2
        {
            return Err(CapitalError::InvalidConfig("windows are too small".into()));
        }
        if !(0.0 < self.whale_quantile && self.whale_quantile < 1.0) {
            return Err(CapitalError::InvalidConfig(
                "whale_quantile must be in (0, 1)".into(),
            ));
        }
        if self.anomaly_threshold <= 0.0 {
            return Err(CapitalError::InvalidConfig(
                "anomaly_threshold must be positive".into(),
            ));
        }
        if self.behavior.volume_high <= self.behavior.volume_low {
            return Err(CapitalError::InvalidConfig(
                "volume_high must exceed volume_low".into(),
            ));
        }
        Ok(())
    }
}

/// Per-regime capital statistics.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentCapital {
    pub regime: crate::domain::Regime,
    pub count: usize,
    pub mean_net_flow: f64,
    pub total_inflow: f64,
    pub total_outflow: f64,
    /// Mean of the whale flag: fraction of whale days in the segment.
    pub whale_frequency: f64,
    /// Behavior name → percentage of the segment's days.
    pub behavior_pct: BTreeMap<String, f64>,
}

/// Engine output beyond the augmented table.
#[derive(Debug, Clone, Serialize)]
pub struct CapitalResult {
    pub whale_days: usize,
    /// Full-history correlation of net flow vs daily return.
    pub flow_return_correlation: f64,
    pub behavior_counts: BTreeMap<String, usize>,
    pub large_inflow_days: usize,
    pub large_outflow_days: usize,
    pub segments: Vec<SegmentCapital>,
}

/// Run the engine.
pub fn process(
    table: &MarketTable,
    config: &CapitalConfig,
) -> Result<(MarketTable, CapitalResult), CapitalError> {
    config.validate()?;
    let mut out = table.clone();

    let returns = match table.float(columns::RETURN_1D) {
        Some(r) => r.to_vec(),
        None => pct_change(&table.closes(), 1),
    };
    let volumes = table.volumes();

    // Money flow
    let typical = flow::typical_prices(table.bars());
    let mf = flow::money_flow(table.bars());
    let signed = flow::signed_flow(&typical, &mf);
    let cum = flow::cumulative_flow(&signed);
    let (positive, negative) = flow::directional_sums(&typical, &mf, config.mfi_window);
    let mfi = flow::flow_strength_index(&positive, &negative);
    let net = flow::net_flow(&positive, &negative);

    // Whale activity
    let threshold = whale::threshold(&volumes, config.whale_window, config.whale_quantile);
    let whale_flags = whale::flags(&volumes, &threshold);
    let whale_intensity = whale::intensity(&volumes, &threshold);
    let whale_freq = whale::frequency(&whale_flags, config.whale_freq_window);
    let whale_trend = whale::trend(&whale_freq, config.whale_freq_window);
    let whale_days = whale_flags.iter().filter(|&&f| f > 0.0).count();

    // Concentration
    let gini = concentration::flow_gini(&mf, config.concentration_window);
    let top20 = concentration::top20_share(&mf, config.concentration_window);
    let dispersion = concentration::dispersion(&mf, config.concentration_window);

    // Behavior
    let volume_ma = rolling_mean(&volumes, config.behavior_volume_window);
    let volume_ratio: Vec<f64> = volumes
        .iter()
        .zip(&volume_ma)
        .map(|(v, ma)| if ma.is_nan() { f64::NAN } else { v / (ma + EPS) })
        .collect();
    let behaviors = behavior::classify_series(&returns, &volume_ratio, &config.behavior);
    let mut behavior_counts: BTreeMap<String, usize> = BTreeMap::new();
    for b in &behaviors {
        *behavior_counts.entry(b.name().to_string()).or_default() += 1;
    }

    // Anomalies
    let z = anomaly::zscores(&net, config.anomaly_window);
    let anomaly_labels = anomaly::labels(&z, config.anomaly_threshold);
    let large_inflow_days = anomaly_labels
        .iter()
        .filter(|l| *l == anomaly::LARGE_INFLOW)
        .count();
    let large_outflow_days = anomaly_labels
        .iter()
        .filter(|l| *l == anomaly::LARGE_OUTFLOW)
        .count();

    // Flow-price relationship
    let corr_series = rolling_corr(&net, &returns, config.corr_window);
    let flow_return_correlation = pearson(&net, &returns);

    out.set_float(TYPICAL_PRICE, typical)?;
    out.set_float(MONEY_FLOW, mf)?;
    out.set_float(SIGNED_FLOW, signed)?;
    out.set_float(CUM_FLOW, cum)?;
    out.set_float(MFI, mfi)?;
    out.set_float(NET_FLOW, net)?;
    out.set_float(WHALE_FLAG, whale_flags)?;
    out.set_float(WHALE_INTENSITY, whale_intensity)?;
    out.set_float(WHALE_FREQ, whale_freq)?;
    out.set_float(WHALE_TREND, whale_trend)?;
    out.set_float(FLOW_GINI, gini)?;
    out.set_float(TOP20_SHARE, top20)?;
    out.set_float(FLOW_DISPERSION, dispersion)?;
    out.set_category(
        BEHAVIOR,
        behaviors.iter().map(|b| b.name().to_string()).collect(),
    )?;
    out.set_category(
        BEHAVIOR_LOCAL,
        behaviors.iter().map(|b| b.local_name().to_string()).collect(),
    )?;
    out.set_float(CAPITAL_ZSCORE, z)?;
    out.set_category(FLOW_ANOMALY, anomaly_labels)?;
    out.set_float(FLOW_RETURN_CORR, corr_series)?;

    let segments = segment_stats(&out);
    tracing::debug!(
        whale_days,
        large_inflow_days,
        large_outflow_days,
        "capital-flow analysis complete"
    );

    Ok((
        out,
        CapitalResult {
            whale_days,
            flow_return_correlation,
            behavior_counts,
            large_inflow_days,
            large_outflow_days,
            segments,
        },
    ))
}

fn segment_stats(table: &MarketTable) -> Vec<SegmentCapital> {
    let Some(groups) = crate::segment::regime_rows(table, REGIME) else {
        return Vec::new();
    };
    let Some(net) = table.float(NET_FLOW) else {
        return Vec::new();
    };
    let flags = table.float(WHALE_FLAG);
    let behaviors = table.category(BEHAVIOR);
    groups
        .into_iter()
        .map(|(regime, rows)| {
            let values = crate::segment::select(net, &rows);
            let clean: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
            let total_inflow: f64 = clean.iter().filter(|&&v| v > 0.0).sum();
            let total_outflow: f64 = clean.iter().filter(|&&v| v < 0.0).sum();
            let mut behavior_pct = BTreeMap::new();
            if let Some(cats) = behaviors {
                for b in Behavior::ALL {
                    let count = rows.iter().filter(|&&i| cats[i] == b.name()).count();
                    behavior_pct.insert(
                        b.name().to_string(),
                        count as f64 / rows.len() as f64 * 100.0,
                    );
                }
            }
            SegmentCapital {
                regime,
                count: rows.len(),
                mean_net_flow: rolling::mean(&values),
                total_inflow,
                total_outflow,
                whale_frequency: flags
                    .map_or(f64::NAN, |f| rolling::mean(&crate::segment::select(f, &rows))),
                behavior_pct,
            }
        })
        .collect()
}
