//! Ticker Types
//!
//! The per-instrument record held in a snapshot. Records carry no history:
//! each frame from the feed replaces every record wholesale.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// A ticker symbol such as `BTC` or `ETH`.
pub type Symbol = String;

/// Latest known values for one traded instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerRecord {
    /// Instrument key, unique within a snapshot.
    pub symbol: Symbol,
    /// Last traded price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Price change over the feed's reference window, in percent.
    #[serde(with = "rust_decimal::serde::float")]
    pub change_percent: Decimal,
    /// When the frame carrying this record was received.
    pub last_updated: DateTime<Utc>,
}

impl TickerRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(
        symbol: impl Into<Symbol>,
        price: Decimal,
        change_percent: Decimal,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change_percent,
            last_updated,
        }
    }
}

/// Canonical lookup form of a caller-supplied symbol.
///
/// Trims whitespace and upper-cases ASCII letters so `" btc"` and `"BTC"`
/// resolve to the same key.
#[must_use]
pub fn normalize_symbol(raw: &str) -> Symbol {
    raw.trim().to_ascii_uppercase()
}
