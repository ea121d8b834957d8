//! Key-stats snapshot: the flattened view of a run handed to the
//! language-model collaborator for insight and report generation.

use serde::Serialize;

use regimelab_core::capital::BEHAVIOR;
use regimelab_core::regime::REGIME;
use regimelab_core::sentiment::{FEAR_GREED_INDEX, FG_CATEGORY};
use regimelab_core::table::MarketTable;
use regimelab_core::volatility::realized_vol_col;

/// Latest-state summary extracted from the most enriched table.
#[derive(Debug, Clone, Serialize)]
pub struct KeyStats {
    pub latest_close: f64,
    pub week_ago_close: f64,
    /// Week-over-week return, percent.
    pub week_return_pct: f64,
    pub regime: Option<String>,
    /// Current 30-day realized volatility, percent annualized.
    pub volatility_pct: Option<f64>,
    pub fear_greed: Option<f64>,
    pub fear_greed_category: Option<String>,
    pub dominant_behavior: Option<String>,
}

impl KeyStats {
    /// Extract from a table. None when the table is empty.
    pub fn from_table(table: &MarketTable) -> Option<Self> {
        let bars = table.bars();
        let latest = bars.last()?;
        let week_ago = if bars.len() >= 7 {
            &bars[bars.len() - 7]
        } else {
            &bars[0]
        };
        let week_return_pct = if week_ago.close != 0.0 {
            (latest.close / week_ago.close - 1.0) * 100.0
        } else {
            f64::NAN
        };
        Some(Self {
            latest_close: latest.close,
            week_ago_close: week_ago.close,
            week_return_pct,
            regime: table.latest_category(REGIME).map(String::from),
            volatility_pct: table
                .latest_float(&realized_vol_col(30))
                .map(|v| v * 100.0),
            fear_greed: table.latest_float(FEAR_GREED_INDEX),
            fear_greed_category: table.latest_category(FG_CATEGORY).map(String::from),
            dominant_behavior: table.latest_category(BEHAVIOR).map(String::from),
        })
    }

    /// Flattened key-value pairs, absent metrics reported as "n/a".
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let opt_num = |v: Option<f64>| {
            v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "n/a".into())
        };
        let opt_str =
            |v: &Option<String>| v.clone().unwrap_or_else(|| "n/a".into());
        vec![
            ("latest_close", format!("{:.2}", self.latest_close)),
            ("week_return_pct", format!("{:.2}", self.week_return_pct)),
            ("regime", opt_str(&self.regime)),
            ("volatility_pct", opt_num(self.volatility_pct)),
            ("fear_greed", opt_num(self.fear_greed)),
            (
                "fear_greed_category",
                opt_str(&self.fear_greed_category),
            ),
            ("dominant_behavior", opt_str(&self.dominant_behavior)),
        ]
    }

    /// Render the snapshot as prompt text.
    pub fn render(&self) -> String {
        self.entries()
            .into_iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
