//! Collaborator seams: the language model and the market data source.
//!
//! The pipeline only ever talks to these traits. Hosted implementations
//! (LLM APIs, exchange collectors) live outside this repository; the
//! CSV-backed source below is the in-repo implementation used for local
//! runs and tests.

use std::path::{Path, PathBuf};

use thiserror::Error;

use regimelab_core::domain::Bar;
use regimelab_core::schema::{resolve_header, SchemaError};
use regimelab_core::table::MarketTable;

#[derive(Debug, Error)]
pub enum CollabError {
    #[error("language model call failed: {0}")]
    Model(String),

    #[error("data source failed: {0}")]
    Source(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Natural-language collaborator. The whole contract: text in, text out.
pub trait LanguageModel: Send + Sync {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, CollabError>;
}

/// Market-data collaborator: deliver a canonical daily table.
pub trait MarketDataSource: Send + Sync {
    fn collect(&self) -> Result<MarketTable, CollabError>;
}

/// CSV-backed data source.
///
/// Headers are alias-resolved once (either bare or `market_`-prefixed
/// names); rows that fail to parse or violate bar sanity are dropped and
/// counted, per the malformed-rows-excluded-upstream policy.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl MarketDataSource for CsvSource {
    fn collect(&self) -> Result<MarketTable, CollabError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
        let idx = resolve_header(&header_refs)?;

        let mut bars = Vec::new();
        let mut unparsable = 0usize;
        for record in reader.records() {
            let record = record?;
            let parsed = (|| -> Option<Bar> {
                let date =
                    chrono::NaiveDate::parse_from_str(record.get(idx.date)?, "%Y-%m-%d").ok()?;
                Some(Bar {
                    date,
                    open: record.get(idx.open)?.trim().parse().ok()?,
                    high: record.get(idx.high)?.trim().parse().ok()?,
                    low: record.get(idx.low)?.trim().parse().ok()?,
                    close: record.get(idx.close)?.trim().parse().ok()?,
                    volume: record.get(idx.volume)?.trim().parse().ok()?,
                })
            })();
            match parsed {
                Some(bar) => bars.push(bar),
                None => unparsable += 1,
            }
        }

        let (table, dropped) = MarketTable::canonicalize(bars);
        if unparsable + dropped > 0 {
            tracing::warn!(
                unparsable,
                dropped,
                path = %self.path.display(),
                "excluded malformed rows during ingestion"
            );
        }
        if table.is_empty() {
            return Err(CollabError::Source(format!(
                "no usable rows in {}",
                self.path.display()
            )));
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_bare_headers() {
        let file = write_csv(
            "date,open,high,low,close,volume\n\
             2024-01-02,100,105,98,103,1000\n\
             2024-01-03,103,106,101,104,1100\n",
        );
        let table = CsvSource::new(file.path()).collect().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.closes(), vec![103.0, 104.0]);
    }

    #[test]
    fn reads_prefixed_headers() {
        let file = write_csv(
            "Date,market_Open,market_High,market_Low,market_Close,market_Volume\n\
             2024-01-02,100,105,98,103,1000\n",
        );
        let table = CsvSource::new(file.path()).collect().unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn drops_malformed_rows() {
        let file = write_csv(
            "date,open,high,low,close,volume\n\
             2024-01-02,100,105,98,103,1000\n\
             2024-01-03,not_a_number,106,101,104,1100\n\
             2024-01-04,104,90,101,105,1200\n\
             2024-01-05,105,108,103,106,1300\n",
        );
        // Row 2 fails to parse; row 3 has high < low.
        let table = CsvSource::new(file.path()).collect().unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn missing_column_is_an_error() {
        let file = write_csv("date,open,high,low,close\n2024-01-02,100,105,98,103\n");
        assert!(matches!(
            CsvSource::new(file.path()).collect(),
            Err(CollabError::Schema(_))
        ));
    }

    #[test]
    fn empty_file_is_an_error() {
        let file = write_csv("date,open,high,low,close,volume\n");
        assert!(matches!(
            CsvSource::new(file.path()).collect(),
            Err(CollabError::Source(_))
        ));
    }
}
