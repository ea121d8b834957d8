//! Canonical feature derivation — the ProcessData stage.
//!
//! `derive_features` appends the full canonical feature set to a market
//! table: returns and realized dispersion, trend (SMA/EMA/MACD), the RSI
//! oscillator, Bollinger bands, ATR, and volume features. Engines
//! downstream consume these columns by canonical name only.
//!
//! Missing history yields NaN warmup prefixes, never an error.

pub mod atr;
pub mod bands;
pub mod oscillator;
pub mod returns;
pub mod trend;
pub mod volume;

use crate::table::{MarketTable, TableError};

/// Canonical derived-column names.
pub mod columns {
    pub const RETURN_1D: &str = "return_1d";
    pub const RETURN_7D: &str = "return_7d";
    pub const RETURN_30D: &str = "return_30d";
    pub const LOG_RETURN: &str = "log_return";
    pub const VOL_7D: &str = "vol_7d";
    pub const VOL_30D: &str = "vol_30d";
    pub const PRICE_RANGE_PCT: &str = "price_range_pct";
    pub const CLOSE_POSITION: &str = "close_position";

    pub const SMA_7: &str = "sma_7";
    pub const SMA_30: &str = "sma_30";
    pub const EMA_7: &str = "ema_7";
    pub const EMA_30: &str = "ema_30";
    pub const MACD: &str = "macd";
    pub const MACD_SIGNAL: &str = "macd_signal";
    pub const MACD_HIST: &str = "macd_hist";
    pub const MA_SPREAD: &str = "ma_spread";

    pub const RSI_14: &str = "rsi_14";

    pub const BB_MIDDLE: &str = "bb_middle";
    pub const BB_UPPER: &str = "bb_upper";
    pub const BB_LOWER: &str = "bb_lower";
    pub const BB_WIDTH: &str = "bb_width";
    pub const BB_PERCENT_B: &str = "bb_percent_b";

    pub const ATR_14: &str = "atr_14";

    pub const VOLUME_SMA_7: &str = "volume_sma_7";
    pub const VOLUME_SMA_30: &str = "volume_sma_30";
    pub const VOLUME_CHANGE: &str = "volume_change";
    pub const OBV: &str = "obv";
    pub const PVT: &str = "pvt";
}

/// Append the canonical feature set to the table.
///
/// Returns a new table; the input's existing columns are preserved.
pub fn derive_features(table: &MarketTable) -> Result<MarketTable, TableError> {
    let mut out = table.clone();
    let closes = table.closes();
    let volumes = table.volumes();

    // Returns and dispersion
    let r1 = returns::simple_returns(&closes, 1);
    out.set_float(columns::RETURN_1D, r1.clone())?;
    out.set_float(columns::RETURN_7D, returns::simple_returns(&closes, 7))?;
    out.set_float(columns::RETURN_30D, returns::simple_returns(&closes, 30))?;
    out.set_float(columns::LOG_RETURN, returns::log_returns(&closes))?;
    out.set_float(columns::VOL_7D, crate::rolling::rolling_std(&r1, 7))?;
    out.set_float(columns::VOL_30D, crate::rolling::rolling_std(&r1, 30))?;
    out.set_float(
        columns::PRICE_RANGE_PCT,
        returns::price_range_pct(table.bars()),
    )?;
    out.set_float(columns::CLOSE_POSITION, returns::close_position(table.bars()))?;

    // Trend
    let sma7 = trend::sma(&closes, 7);
    let sma30 = trend::sma(&closes, 30);
    out.set_float(columns::SMA_7, sma7.clone())?;
    out.set_float(columns::SMA_30, sma30.clone())?;
    out.set_float(columns::EMA_7, trend::ema(&closes, 7))?;
    out.set_float(columns::EMA_30, trend::ema(&closes, 30))?;
    let macd = trend::macd(&closes, 12, 26, 9);
    out.set_float(columns::MACD, macd.macd)?;
    out.set_float(columns::MACD_SIGNAL, macd.signal)?;
    out.set_float(columns::MACD_HIST, macd.histogram)?;
    out.set_float(columns::MA_SPREAD, trend::ma_spread(&sma7, &sma30, &closes))?;

    // Oscillator
    out.set_float(columns::RSI_14, oscillator::rsi(&closes, 14))?;

    // Bands
    let bb = bands::bollinger(&closes, 20, 2.0);
    out.set_float(columns::BB_MIDDLE, bb.middle)?;
    out.set_float(columns::BB_UPPER, bb.upper)?;
    out.set_float(columns::BB_LOWER, bb.lower)?;
    out.set_float(columns::BB_WIDTH, bb.width)?;
    out.set_float(columns::BB_PERCENT_B, bb.percent_b)?;

    // Range
    out.set_float(columns::ATR_14, atr::atr(table.bars(), 14))?;

    // Volume
    out.set_float(
        columns::VOLUME_SMA_7,
        crate::rolling::rolling_mean(&volumes, 7),
    )?;
    out.set_float(
        columns::VOLUME_SMA_30,
        crate::rolling::rolling_mean(&volumes, 30),
    )?;
    out.set_float(
        columns::VOLUME_CHANGE,
        crate::rolling::pct_change(&volumes, 1),
    )?;
    out.set_float(columns::OBV, volume::obv(&closes, &volumes))?;
    out.set_float(columns::PVT, volume::pvt(&closes, &volumes))?;

    tracing::debug!(
        rows = out.len(),
        columns = out.column_count(),
        "derived canonical features"
    );

    Ok(out)
}
