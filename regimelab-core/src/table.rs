//! MarketTable — an ordered daily OHLCV series plus derived columns.
//!
//! The table is the unit of exchange between pipeline stages. Bars are
//! validated at construction (ascending dates, no duplicates, sane OHLCV);
//! engines append named derived columns and never remove or shrink
//! existing ones. Every column has exactly table length.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

/// A derived column: numeric series or per-row category labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Float(Vec<f64>),
    Category(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Category(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_float(&self) -> Option<&[f64]> {
        match self {
            Column::Float(v) => Some(v),
            Column::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&[String]> {
        match self {
            Column::Category(v) => Some(v),
            Column::Float(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("bar dates must be strictly ascending (index {index}, date {date})")]
    UnsortedDates { index: usize, date: NaiveDate },

    #[error("duplicate date {0}")]
    DuplicateDate(NaiveDate),

    #[error("malformed bar at index {index} ({date})")]
    MalformedBar { index: usize, date: NaiveDate },

    #[error("column '{name}' has length {actual}, table has {expected} rows")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Time-indexed market table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTable {
    bars: Vec<Bar>,
    columns: BTreeMap<String, Column>,
}

impl MarketTable {
    /// Build a table from pre-validated bars. Rejects unsorted or duplicate
    /// dates and malformed OHLCV rows.
    pub fn from_bars(bars: Vec<Bar>) -> Result<Self, TableError> {
        for (i, bar) in bars.iter().enumerate() {
            if !bar.is_sane() {
                return Err(TableError::MalformedBar {
                    index: i,
                    date: bar.date,
                });
            }
            if i > 0 {
                match bar.date.cmp(&bars[i - 1].date) {
                    std::cmp::Ordering::Greater => {}
                    std::cmp::Ordering::Equal => {
                        return Err(TableError::DuplicateDate(bar.date));
                    }
                    std::cmp::Ordering::Less => {
                        return Err(TableError::UnsortedDates {
                            index: i,
                            date: bar.date,
                        });
                    }
                }
            }
        }
        Ok(Self {
            bars,
            columns: BTreeMap::new(),
        })
    }

    /// Canonicalize raw bars: sort by date, keep the first of any duplicate
    /// date, drop malformed rows. Returns the table and the number of rows
    /// dropped. This is the ingestion path for external feeds.
    pub fn canonicalize(mut bars: Vec<Bar>) -> (Self, usize) {
        let raw_len = bars.len();
        bars.sort_by_key(|b| b.date);
        let mut seen: Option<NaiveDate> = None;
        bars.retain(|b| {
            if !b.is_sane() {
                return false;
            }
            if seen == Some(b.date) {
                return false;
            }
            seen = Some(b.date);
            true
        });
        let dropped = raw_len - bars.len();
        (
            Self {
                bars,
                columns: BTreeMap::new(),
            },
            dropped,
        )
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|b| b.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Numeric column by name, or None if absent or categorical.
    pub fn float(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).and_then(Column::as_float)
    }

    /// Category column by name, or None if absent or numeric.
    pub fn category(&self, name: &str) -> Option<&[String]> {
        self.columns.get(name).and_then(Column::as_category)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Insert or replace a numeric column. Length must match the table.
    pub fn set_float(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), TableError> {
        let name = name.into();
        if values.len() != self.bars.len() {
            return Err(TableError::LengthMismatch {
                expected: self.bars.len(),
                actual: values.len(),
                name,
            });
        }
        self.columns.insert(name, Column::Float(values));
        Ok(())
    }

    /// Insert or replace a category column. Length must match the table.
    pub fn set_category(
        &mut self,
        name: impl Into<String>,
        values: Vec<String>,
    ) -> Result<(), TableError> {
        let name = name.into();
        if values.len() != self.bars.len() {
            return Err(TableError::LengthMismatch {
                expected: self.bars.len(),
                actual: values.len(),
                name,
            });
        }
        self.columns.insert(name, Column::Category(values));
        Ok(())
    }

    /// Most recent non-NaN value of a numeric column.
    pub fn latest_float(&self, name: &str) -> Option<f64> {
        self.float(name)?
            .iter()
            .rev()
            .copied()
            .find(|v| !v.is_nan())
    }

    /// Most recent value of a category column.
    pub fn latest_category(&self, name: &str) -> Option<&str> {
        self.category(name)?.last().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_bars;

    #[test]
    fn from_bars_accepts_ordered_series() {
        let table = MarketTable::from_bars(make_bars(&[100.0, 101.0, 102.0])).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.closes(), vec![100.0, 101.0, 102.0]);
    }

    #[test]
    fn from_bars_rejects_duplicate_date() {
        let mut bars = make_bars(&[100.0, 101.0]);
        bars[1].date = bars[0].date;
        assert!(matches!(
            MarketTable::from_bars(bars),
            Err(TableError::DuplicateDate(_))
        ));
    }

    #[test]
    fn from_bars_rejects_unsorted_dates() {
        let mut bars = make_bars(&[100.0, 101.0]);
        bars.swap(0, 1);
        assert!(matches!(
            MarketTable::from_bars(bars),
            Err(TableError::UnsortedDates { .. })
        ));
    }

    #[test]
    fn from_bars_rejects_malformed_bar() {
        let mut bars = make_bars(&[100.0, 101.0]);
        bars[1].high = bars[1].low - 1.0;
        assert!(matches!(
            MarketTable::from_bars(bars),
            Err(TableError::MalformedBar { index: 1, .. })
        ));
    }

    #[test]
    fn canonicalize_sorts_dedupes_and_filters() {
        let mut bars = make_bars(&[100.0, 101.0, 102.0, 103.0]);
        bars[3].high = 0.0; // malformed
        let dup = bars[1].clone();
        bars.push(dup); // duplicate of index 1
        bars.swap(0, 2); // unsorted

        let (table, dropped) = MarketTable::canonicalize(bars);
        assert_eq!(table.len(), 3);
        assert_eq!(dropped, 2);
        assert_eq!(table.closes(), vec![100.0, 101.0, 102.0]);
    }

    #[test]
    fn set_float_rejects_length_mismatch() {
        let mut table = MarketTable::from_bars(make_bars(&[100.0, 101.0])).unwrap();
        let err = table.set_float("x", vec![1.0]).unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { .. }));
    }

    #[test]
    fn columns_are_retrievable_by_kind() {
        let mut table = MarketTable::from_bars(make_bars(&[100.0, 101.0])).unwrap();
        table.set_float("x", vec![1.0, 2.0]).unwrap();
        table
            .set_category("label", vec!["a".into(), "b".into()])
            .unwrap();

        assert_eq!(table.float("x"), Some(&[1.0, 2.0][..]));
        assert!(table.float("label").is_none());
        assert_eq!(table.category("label").unwrap()[1], "b");
        assert_eq!(table.latest_category("label"), Some("b"));
    }

    #[test]
    fn latest_float_skips_nan_tail() {
        let mut table = MarketTable::from_bars(make_bars(&[100.0, 101.0, 102.0])).unwrap();
        table.set_float("x", vec![1.0, 2.0, f64::NAN]).unwrap();
        assert_eq!(table.latest_float("x"), Some(2.0));
    }
}
