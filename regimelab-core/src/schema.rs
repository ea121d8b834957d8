//! Canonical schema resolution for ingested market data.
//!
//! Upstream feeds deliver either bare column names (`Close`) or
//! source-prefixed ones (`market_Close`). Resolution happens exactly once,
//! at the ingestion boundary; engines only ever see the canonical fields,
//! so no alias branching survives past this module.

use thiserror::Error;

/// The canonical base fields of a market table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Field {
    pub const REQUIRED: [Field; 6] = [
        Field::Date,
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::Close => "close",
            Field::Volume => "volume",
        }
    }
}

/// Map a raw header name onto a canonical field, accepting both naming
/// conventions seen in source feeds.
pub fn canonical_field(raw: &str) -> Option<Field> {
    let name = raw.trim();
    let name = name.strip_prefix("market_").unwrap_or(name);
    match name.to_ascii_lowercase().as_str() {
        "date" | "timestamp" | "time" => Some(Field::Date),
        "open" => Some(Field::Open),
        "high" => Some(Field::High),
        "low" => Some(Field::Low),
        "close" | "adj_close" | "adjclose" => Some(Field::Close),
        "volume" => Some(Field::Volume),
        _ => None,
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),
}

/// Positions of the canonical fields within a raw header row.
#[derive(Debug, Clone, Copy)]
pub struct HeaderIndices {
    pub date: usize,
    pub open: usize,
    pub high: usize,
    pub low: usize,
    pub close: usize,
    pub volume: usize,
}

/// Resolve a raw header row to canonical field positions.
///
/// The first header matching each field wins; unknown headers are ignored.
pub fn resolve_header(headers: &[&str]) -> Result<HeaderIndices, SchemaError> {
    let mut slots: [Option<usize>; 6] = [None; 6];
    for (i, raw) in headers.iter().enumerate() {
        if let Some(field) = canonical_field(raw) {
            let slot = &mut slots[field as usize];
            if slot.is_none() {
                *slot = Some(i);
            }
        }
    }
    for field in Field::REQUIRED {
        if slots[field as usize].is_none() {
            return Err(SchemaError::MissingColumn(field.name()));
        }
    }
    Ok(HeaderIndices {
        date: slots[Field::Date as usize].unwrap(),
        open: slots[Field::Open as usize].unwrap(),
        high: slots[Field::High as usize].unwrap(),
        low: slots[Field::Low as usize].unwrap(),
        close: slots[Field::Close as usize].unwrap(),
        volume: slots[Field::Volume as usize].unwrap(),
    })
}
