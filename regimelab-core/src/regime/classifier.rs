//! Regime classifier: feature extraction, clustering, semantic mapping.
//!
//! `fit` clusters standardized features into `k` groups and maps each raw
//! cluster onto a canonical regime by its mean return / mean volatility
//! profile. The mapping is kept for `predict` on new data.
//!
//! Mapping policy: clusters whose mean volatility clears the 60th
//! percentile of all cluster means are Panic/Euphoria candidates (lowest /
//! highest mean return); that step needs at least two candidates. Of the
//! rest, the lowest-volatility cluster is Consolidation and everything else
//! Trending. Clusters without an explicit mapping (possible when k != 4)
//! are applied as Trending.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Regime;
use crate::features::columns;
use crate::regime::kmeans::{self, KMeansError, KMeansModel, Standardizer};
use crate::rolling;
use crate::table::{MarketTable, TableError};

/// Appended column names.
pub const REGIME_ID: &str = "regime_id";
pub const REGIME: &str = "regime";
pub const REGIME_LOCAL: &str = "regime_local";

/// Candidate feature columns, used when present in the table.
const FEATURE_CANDIDATES: [&str; 12] = [
    columns::RETURN_1D,
    columns::RETURN_7D,
    columns::RETURN_30D,
    columns::VOL_7D,
    columns::VOL_30D,
    columns::RSI_14,
    columns::MACD,
    columns::BB_WIDTH,
    columns::ATR_14,
    columns::VOLUME_CHANGE,
    columns::OBV,
    columns::MA_SPREAD,
];

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("empty table")]
    EmptyTable,

    #[error("table has none of the candidate feature columns")]
    NoFeatures,

    #[error("predict called before fit")]
    Unfitted,

    #[error(transparent)]
    Clustering(#[from] KMeansError),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// Number of clusters.
    pub k: usize,
    /// Master seed; restarts derive their seeds from it.
    pub seed: u64,
    /// Clustering restarts, lowest inertia wins.
    pub n_init: usize,
    /// Lloyd iteration cap per restart.
    pub max_iter: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            k: 4,
            seed: 42,
            n_init: 50,
            max_iter: 500,
        }
    }
}

/// Mean profile of one raw cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterProfile {
    pub cluster: usize,
    pub count: usize,
    pub mean_return: f64,
    pub mean_volatility: f64,
}

/// Descriptive statistics for one canonical regime.
#[derive(Debug, Clone, Serialize)]
pub struct RegimeCharacteristics {
    pub regime: Regime,
    pub count: usize,
    pub mean_return: f64,
    pub std_return: f64,
    pub mean_volatility: f64,
    pub mean_rsi: f64,
    pub mean_volume_change: f64,
}

/// Result of fitting the classifier.
#[derive(Debug, Clone)]
pub struct RegimeFit {
    /// Input table plus `regime_id`, `regime`, `regime_local` columns.
    pub table: MarketTable,
    /// Raw cluster id → canonical regime. Only explicit assignments;
    /// unmapped clusters apply as Trending.
    pub mapping: BTreeMap<usize, Regime>,
    /// Per-cluster mean profiles that drove the mapping.
    pub profiles: Vec<ClusterProfile>,
    /// Per-regime descriptive statistics.
    pub characteristics: Vec<RegimeCharacteristics>,
}

#[derive(Debug)]
struct FittedModel {
    scaler: Standardizer,
    kmeans: KMeansModel,
    mapping: BTreeMap<usize, Regime>,
    feature_names: Vec<String>,
}

/// Unsupervised market-state classifier. `Unfitted` until `fit` succeeds.
#[derive(Debug)]
pub struct RegimeClassifier {
    config: RegimeConfig,
    fitted: Option<FittedModel>,
}

impl RegimeClassifier {
    pub fn new(config: RegimeConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Extract the feature matrix: one row per bar over whichever candidate
    /// columns the table carries. NaN and infinite values become 0 so the
    /// clustering step never sees non-finite input.
    fn feature_matrix(
        &self,
        table: &MarketTable,
    ) -> Result<(Vec<Vec<f64>>, Vec<String>), ClassifierError> {
        let names: Vec<String> = FEATURE_CANDIDATES
            .iter()
            .filter(|name| table.float(name).is_some())
            .map(|name| name.to_string())
            .collect();
        if names.is_empty() {
            return Err(ClassifierError::NoFeatures);
        }
        let series: Vec<&[f64]> = names
            .iter()
            .map(|name| table.float(name).expect("filtered above"))
            .collect();
        let rows = (0..table.len())
            .map(|i| {
                series
                    .iter()
                    .map(|col| {
                        let v = col[i];
                        if v.is_finite() {
                            v
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect();
        Ok((rows, names))
    }

    /// Fit on a feature-bearing table; returns the labeled table, the
    /// cluster→regime mapping and per-regime statistics.
    pub fn fit(&mut self, table: &MarketTable) -> Result<RegimeFit, ClassifierError> {
        if table.is_empty() {
            return Err(ClassifierError::EmptyTable);
        }
        let (matrix, feature_names) = self.feature_matrix(table)?;
        let scaler = Standardizer::fit(&matrix);
        let scaled = scaler.transform(&matrix);
        let (model, raw_labels) = kmeans::fit(
            &scaled,
            self.config.k,
            self.config.seed,
            self.config.n_init,
            self.config.max_iter,
        )?;
        tracing::debug!(
            k = self.config.k,
            inertia = model.inertia,
            features = feature_names.len(),
            "k-means fit complete"
        );

        let profiles = cluster_profiles(table, &raw_labels, self.config.k);
        let mapping = map_clusters(&profiles);
        for profile in &profiles {
            let assigned = mapping
                .get(&profile.cluster)
                .copied()
                .unwrap_or(Regime::Trending);
            tracing::debug!(
                cluster = profile.cluster,
                regime = assigned.name(),
                days = profile.count,
                "cluster mapped"
            );
        }

        let mut out = table.clone();
        apply_labels(&mut out, &raw_labels, &mapping)?;
        let characteristics = regime_characteristics(&out);

        self.fitted = Some(FittedModel {
            scaler,
            kmeans: model,
            mapping: mapping.clone(),
            feature_names,
        });

        Ok(RegimeFit {
            table: out,
            mapping,
            profiles,
            characteristics,
        })
    }

    /// Label new data with the fitted model. Errors if `fit` has not run.
    pub fn predict(&self, table: &MarketTable) -> Result<Vec<Regime>, ClassifierError> {
        let fitted = self.fitted.as_ref().ok_or(ClassifierError::Unfitted)?;
        let series: Vec<&[f64]> = fitted
            .feature_names
            .iter()
            .map(|name| table.float(name).ok_or(ClassifierError::NoFeatures))
            .collect::<Result<_, _>>()?;
        let matrix: Vec<Vec<f64>> = (0..table.len())
            .map(|i| {
                series
                    .iter()
                    .map(|col| {
                        let v = col[i];
                        if v.is_finite() {
                            v
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect();
        let scaled = fitted.scaler.transform(&matrix);
        Ok(fitted
            .kmeans
            .predict(&scaled)
            .into_iter()
            .map(|raw| fitted.mapping.get(&raw).copied().unwrap_or(Regime::Trending))
            .collect())
    }
}

fn cluster_profiles(table: &MarketTable, labels: &[usize], k: usize) -> Vec<ClusterProfile> {
    let returns = table.float(columns::RETURN_1D);
    let vols = table.float(columns::VOL_7D);
    (0..k)
        .map(|cluster| {
            let rows: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == cluster)
                .map(|(i, _)| i)
                .collect();
            let pick = |col: Option<&[f64]>| -> f64 {
                match col {
                    Some(values) => {
                        rolling::mean(&rows.iter().map(|&i| values[i]).collect::<Vec<_>>())
                    }
                    None => 0.0,
                }
            };
            ClusterProfile {
                cluster,
                count: rows.len(),
                mean_return: pick(returns),
                mean_volatility: pick(vols),
            }
        })
        .collect()
}

/// The order-dependent mapping heuristic described at module level.
fn map_clusters(profiles: &[ClusterProfile]) -> BTreeMap<usize, Regime> {
    let mut mapping = BTreeMap::new();
    let vols: Vec<f64> = profiles.iter().map(|p| p.mean_volatility).collect();
    let threshold = rolling::quantile(&vols, 0.6);

    // High-volatility candidates: Panic (lowest return) and Euphoria
    // (highest return), only when at least two clusters qualify.
    let high: Vec<&ClusterProfile> = profiles
        .iter()
        .filter(|p| !p.mean_volatility.is_nan() && p.mean_volatility > threshold)
        .collect();
    if high.len() >= 2 {
        let panic = high
            .iter()
            .min_by(|a, b| cmp_nan_last(a.mean_return, b.mean_return))
            .expect("non-empty");
        let euphoria = high
            .iter()
            .max_by(|a, b| cmp_nan_last(a.mean_return, b.mean_return))
            .expect("non-empty");
        mapping.insert(panic.cluster, Regime::Panic);
        mapping.insert(euphoria.cluster, Regime::Euphoria);
    }

    // Remaining clusters: lowest volatility is Consolidation, rest Trending.
    let remaining: Vec<&ClusterProfile> = profiles
        .iter()
        .filter(|p| !mapping.contains_key(&p.cluster))
        .collect();
    if let Some(consolidation) = remaining
        .iter()
        .filter(|p| !p.mean_volatility.is_nan())
        .min_by(|a, b| cmp_nan_last(a.mean_volatility, b.mean_volatility))
    {
        mapping.insert(consolidation.cluster, Regime::Consolidation);
    }
    for p in remaining {
        mapping.entry(p.cluster).or_insert(Regime::Trending);
    }

    mapping
}

fn cmp_nan_last(a: f64, b: f64) -> std::cmp::Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| {
        if a.is_nan() && !b.is_nan() {
            std::cmp::Ordering::Greater
        } else if !a.is_nan() && b.is_nan() {
            std::cmp::Ordering::Less
        } else {
            std::cmp::Ordering::Equal
        }
    })
}

fn apply_labels(
    table: &mut MarketTable,
    raw_labels: &[usize],
    mapping: &BTreeMap<usize, Regime>,
) -> Result<(), TableError> {
    let regimes: Vec<Regime> = raw_labels
        .iter()
        .map(|raw| mapping.get(raw).copied().unwrap_or(Regime::Trending))
        .collect();
    table.set_float(
        REGIME_ID,
        regimes.iter().map(|r| r.id() as f64).collect(),
    )?;
    table.set_category(REGIME, regimes.iter().map(|r| r.name().into()).collect())?;
    table.set_category(
        REGIME_LOCAL,
        regimes.iter().map(|r| r.local_name().into()).collect(),
    )?;
    Ok(())
}

/// Per-regime descriptive statistics from a labeled table.
pub fn regime_characteristics(table: &MarketTable) -> Vec<RegimeCharacteristics> {
    let Some(groups) = crate::segment::regime_rows(table, REGIME) else {
        return Vec::new();
    };
    let col = |name: &str| table.float(name);
    groups
        .into_iter()
        .map(|(regime, rows)| {
            let stat = |series: Option<&[f64]>, f: fn(&[f64]) -> f64| -> f64 {
                series.map_or(f64::NAN, |s| f(&crate::segment::select(s, &rows)))
            };
            RegimeCharacteristics {
                regime,
                count: rows.len(),
                mean_return: stat(col(columns::RETURN_1D), rolling::mean),
                std_return: stat(col(columns::RETURN_1D), rolling::std_dev),
                mean_volatility: stat(col(columns::VOL_7D), rolling::mean),
                mean_rsi: stat(col(columns::RSI_14), rolling::mean),
                mean_volume_change: stat(col(columns::VOLUME_CHANGE), rolling::mean),
            }
        })
        .collect()
}
