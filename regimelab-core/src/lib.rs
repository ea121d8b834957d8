//! RegimeLab Core — market table, rolling statistics and the four
//! quantitative analysis engines.
//!
//! This crate is pure computation over daily OHLCV tables:
//! - Domain types (bars, regime labels) and the column-bearing MarketTable
//! - Canonical schema resolution at the ingestion boundary
//! - Rolling-statistics primitives shared by every engine
//! - Feature derivation (returns, trend, RSI, Bollinger, ATR, volume)
//! - Regime classifier (seeded k-means + semantic label mapping)
//! - Volatility engine (realized/range estimators, GARCH, cone, liquidity)
//! - Sentiment composite engine (fear/greed index)
//! - Capital-flow engine (money flow, whales, concentration, anomalies)
//!
//! Engines are pure functions `&MarketTable -> (MarketTable, result)`: they
//! append derived columns and never remove or overwrite upstream ones.

pub mod capital;
pub mod domain;
pub mod features;
pub mod regime;
pub mod rolling;
pub mod schema;
pub mod segment;
pub mod sentiment;
pub mod table;
pub mod volatility;

#[cfg(test)]
pub(crate) mod testutil;

pub use domain::{Bar, Regime};
pub use table::{Column, MarketTable, TableError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: engine inputs/outputs cross thread boundaries
    /// when the pipeline fans the analysis stages out.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Bar>();
        require_sync::<Bar>();
        require_send::<Regime>();
        require_sync::<Regime>();
        require_send::<MarketTable>();
        require_sync::<MarketTable>();
        require_send::<regime::RegimeFit>();
        require_send::<regime::RegimeClassifier>();
        require_send::<volatility::VolatilityResult>();
        require_send::<sentiment::SentimentResult>();
        require_send::<capital::CapitalResult>();
    }
}
