//! Ticker Frame Codec
//!
//! Decodes frames from the upstream ticker socket. Each frame is a full
//! replacement snapshot: a JSON object keyed by symbol.
//!
//! ```json
//! {"BTC": {"p": 50500, "c": 3.1}, "ETH": {"p": 3000, "c": -1.0}}
//! ```
//!
//! `p` (price) is required. `c` (change percent) defaults to zero when absent.
//! Unknown fields are ignored. A frame with any malformed entry is rejected as
//! a whole so a partial snapshot never reaches the store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::snapshot::Snapshot;
use crate::domain::ticker::TickerRecord;

/// Longest frame prefix quoted in error messages.
const PREVIEW_LEN: usize = 64;

/// Errors produced while decoding a frame. Always recoverable: the frame is
/// dropped and the previous snapshot stays in place.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Payload is not valid JSON or does not match the frame schema.
    #[error("invalid ticker frame: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is JSON but not an object keyed by symbol.
    #[error("expected JSON object keyed by symbol, got: {0}")]
    NotAnObject(String),

    /// Binary payload is not UTF-8.
    #[error("binary frame is not valid UTF-8")]
    InvalidUtf8,

    /// An entry has an empty symbol key.
    #[error("frame contains an empty symbol")]
    EmptySymbol,
}

/// Wire representation of one ticker entry.
#[derive(Debug, Deserialize)]
struct FrameEntry {
    #[serde(rename = "p")]
    price: Decimal,
    #[serde(rename = "c", default)]
    change_percent: Decimal,
}

/// JSON codec for ticker frames.
#[derive(Debug, Default, Clone)]
pub struct TickerCodec;

impl TickerCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a text frame received at `received_at` into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the frame is not a JSON object of ticker
    /// entries.
    pub fn decode(&self, text: &str, received_at: DateTime<Utc>) -> Result<Snapshot, DecodeError> {
        let trimmed = text.trim();

        if !trimmed.starts_with('{') {
            return Err(DecodeError::NotAnObject(preview(trimmed)));
        }

        let entries: HashMap<String, FrameEntry> = serde_json::from_str(trimmed)?;

        if entries.keys().any(|symbol| symbol.trim().is_empty()) {
            return Err(DecodeError::EmptySymbol);
        }

        let records = entries.into_iter().map(|(symbol, entry)| {
            TickerRecord::new(symbol, entry.price, entry.change_percent, received_at)
        });

        Ok(Snapshot::from_records(records, received_at))
    }

    /// Decode a binary frame carrying UTF-8 JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidUtf8`] for non-UTF-8 payloads, otherwise
    /// the same errors as [`TickerCodec::decode`].
    pub fn decode_binary(
        &self,
        data: &[u8],
        received_at: DateTime<Utc>,
    ) -> Result<Snapshot, DecodeError> {
        let text = std::str::from_utf8(data).map_err(|_| DecodeError::InvalidUtf8)?;
        self.decode(text, received_at)
    }
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_LEN).collect()
}
